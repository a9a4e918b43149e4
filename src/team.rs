// src/team.rs
//
// Team assignment strategies. The baseline is a pure spatial split; the
// interface is the contract, so a jersey-color or roster-lookup strategy can
// replace it without touching the aggregator.

use crate::types::{CourtConfig, CourtPoint, Team, TeamConfig};
use std::collections::{HashMap, VecDeque};

/// Pluggable team classifier. Must be answerable from the position alone;
/// stateful strategies own their history and clear it in `reset`, which the
/// session calls once at start.
pub trait TeamClassifier {
    fn classify(&mut self, track_id: u64, position: CourtPoint, frame_index: u64) -> Team;

    /// Session-start semantics for stateful strategies. No-op for pure ones.
    fn reset(&mut self) {}
}

/// Baseline: left half of court-space is home, right half is away.
/// Placeholder until a visual-feature classifier exists.
pub struct SpatialSplitClassifier {
    split_axis: f64,
}

impl SpatialSplitClassifier {
    pub fn new(split_axis: f64) -> Self {
        Self { split_axis }
    }
}

impl TeamClassifier for SpatialSplitClassifier {
    fn classify(&mut self, _track_id: u64, position: CourtPoint, _frame_index: u64) -> Team {
        if position.x < self.split_axis {
            Team::Home
        } else {
            Team::Away
        }
    }
}

/// Smooths an inner strategy's labels per track id over a sliding window:
/// the most common label in the window wins, ties go to the most recently
/// observed of the tied labels. Owns per-track history; `reset` clears it
/// and resets the inner strategy.
pub struct MajorityVoteClassifier<C: TeamClassifier> {
    inner: C,
    window_size: usize,
    history: HashMap<u64, VecDeque<Team>>,
}

impl<C: TeamClassifier> MajorityVoteClassifier<C> {
    pub fn new(inner: C, window_size: usize) -> Self {
        Self {
            inner,
            window_size: window_size.max(1),
            history: HashMap::new(),
        }
    }

    fn vote(history: &VecDeque<Team>, newest: Team) -> Team {
        let mut counts: HashMap<Team, usize> = HashMap::new();
        for team in history {
            *counts.entry(*team).or_insert(0) += 1;
        }

        // Walk newest-first and replace only on a strictly higher count, so
        // tied labels resolve to the most recently observed one regardless
        // of map iteration order.
        let mut winner = newest;
        let mut winner_count = 0;
        for team in history.iter().rev() {
            let count = counts[team];
            if count > winner_count {
                winner = *team;
                winner_count = count;
            }
        }
        winner
    }
}

impl<C: TeamClassifier> TeamClassifier for MajorityVoteClassifier<C> {
    fn classify(&mut self, track_id: u64, position: CourtPoint, frame_index: u64) -> Team {
        let raw = self.inner.classify(track_id, position, frame_index);

        let history = self.history.entry(track_id).or_default();
        history.push_back(raw);
        if history.len() > self.window_size {
            history.pop_front();
        }

        Self::vote(history, raw)
    }

    fn reset(&mut self) {
        self.history.clear();
        self.inner.reset();
    }
}

/// Builds the configured classifier stack.
pub fn build_classifier(team: &TeamConfig, court: &CourtConfig) -> Box<dyn TeamClassifier> {
    let split_axis = team.split_axis.unwrap_or(court.length / 2.0);
    let baseline = SpatialSplitClassifier::new(split_axis);

    if team.smoothing_window > 1 {
        Box::new(MajorityVoteClassifier::new(baseline, team.smoothing_window))
    } else {
        Box::new(baseline)
    }
}
