//! The per-group hourly outage schedule: one state for each hour of the
//! day, in the region's local time.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HourState {
    Yes,
    No,
    First,
    Second,
}

impl HourState {
    /// Whether this hour state describes power being present.
    pub fn implies_online(self) -> bool {
        matches!(self, HourState::Yes)
    }
}

/// 24 entries, index 0 = midnight, in the group's local time.
pub type GroupFact = [HourState; 24];

/// `true` when the hour at `current` and the hour after it both disagree
/// with `is_online` — the schedule contradicts what was actually observed,
/// so an annotation would mislead rather than clarify.
pub fn contradicts(fact: &GroupFact, current_hour: usize, is_online: bool) -> bool {
    let next_hour = (current_hour + 1) % 24;
    let current_says_online = fact[current_hour].implies_online();
    let next_says_online = fact[next_hour].implies_online();
    current_says_online != is_online && next_says_online != is_online
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contradiction_detected_when_both_hours_disagree() {
        let mut fact = [HourState::No; 24];
        fact[14] = HourState::Yes;
        fact[15] = HourState::Yes;
        // Observed offline at 14:20, but schedule says power is on both
        // this hour and the next.
        assert!(contradicts(&fact, 14, false));
    }

    #[test]
    fn no_contradiction_when_next_hour_agrees() {
        let mut fact = [HourState::Yes; 24];
        fact[14] = HourState::Yes;
        fact[15] = HourState::No;
        assert!(!contradicts(&fact, 14, false));
    }
}
