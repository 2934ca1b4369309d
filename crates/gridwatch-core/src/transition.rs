//! The online/offline transition table, factored into pure functions with
//! no I/O so the decision logic is exercised by ordinary `#[test]`s.
//!
//! Two details worth spelling out:
//!
//! - The demotion instant is `max(last_heartbeat + threshold, now −
//!   threshold)` — the moment staleness actually began, clamped so a wiped
//!   cache (`last_heartbeat` at the epoch) falls back to `now − threshold`
//!   instead of a nonsensical 1970 timestamp.
//! - `duration_sec` is `changed_at − prior_last_change` for both directions:
//!   how long the monitor held its previous state. A rendered message wants
//!   "offline for Nh" either way, so demotion uses the same definition
//!   promotion does.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Promote { changed_at: i64, duration_sec: i64 },
    Demote { changed_at: i64, duration_sec: i64 },
    NoOp,
}

/// A heartbeat is fresh iff it arrived within one threshold window.
pub fn is_fresh(now: i64, last_heartbeat: i64, threshold_seconds: i64) -> bool {
    now - last_heartbeat <= threshold_seconds
}

/// Whether `now` is still inside the post-startup grace window, during
/// which demotions are suppressed but promotions are not.
pub fn in_grace_period(now: i64, process_start: i64, threshold_seconds: i64) -> bool {
    now < process_start + threshold_seconds
}

/// Evaluate one cycle of the transition table for a single monitor. Callers
/// hold the per-entry lock for the duration of this call and release it
/// before acting on the result.
#[allow(clippy::too_many_arguments)]
pub fn decide(
    prior_is_online: bool,
    now: i64,
    last_heartbeat: i64,
    prior_last_change: i64,
    threshold_seconds: i64,
    process_start: i64,
) -> Action {
    let fresh = is_fresh(now, last_heartbeat, threshold_seconds);
    let in_grace = in_grace_period(now, process_start, threshold_seconds);

    match (prior_is_online, fresh) {
        (false, true) => Action::Promote {
            changed_at: now,
            duration_sec: (now - prior_last_change).max(0),
        },
        (true, false) => {
            if in_grace {
                Action::NoOp
            } else {
                let changed_at =
                    (last_heartbeat + threshold_seconds).max(now - threshold_seconds);
                Action::Demote {
                    changed_at,
                    duration_sec: (changed_at - prior_last_change).max(0),
                }
            }
        }
        _ => Action::NoOp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Heartbeat detection, threshold=60s.
    #[test]
    fn promotion_then_demotion_after_silence() {
        let threshold = 60;
        let process_start = -1000; // well before the grace window matters here

        // Ping arrives at t=0 (last_heartbeat=0); checker runs at t=5.
        let action = decide(false, 5, 0, -500, threshold, process_start);
        assert_eq!(
            action,
            Action::Promote {
                changed_at: 5,
                duration_sec: 505,
            }
        );

        // No further pings; checker runs at t=70. Demotion instant is
        // computed from last_heartbeat (=0), not detection time (=70).
        let action = decide(true, 70, 0, 5, threshold, process_start);
        assert_eq!(
            action,
            Action::Demote {
                changed_at: 60,
                duration_sec: 55,
            }
        );
    }

    #[test]
    fn grace_period_suppresses_demotion_but_not_promotion() {
        let threshold = 60;
        let process_start = 0;

        // K empty (no evidence ever, treated as a distant epoch), checker
        // at t=10 — still inside the grace window (10 < 0 + 60).
        let never = -1_000_000;
        let action = decide(true, 10, never, -1, threshold, process_start);
        assert_eq!(action, Action::NoOp);

        // Same empty K, checker at t=70 — grace has elapsed.
        let action = decide(true, 70, never, -1, threshold, process_start);
        assert!(matches!(action, Action::Demote { .. }));

        // Promotion is allowed at any point during the grace window.
        let action = decide(false, 10, 10, -1, threshold, process_start);
        assert!(matches!(action, Action::Promote { .. }));
    }

    #[test]
    fn already_online_and_fresh_is_a_no_op() {
        let action = decide(true, 100, 95, 0, 60, 0);
        assert_eq!(action, Action::NoOp);
    }

    #[test]
    fn already_offline_and_stale_is_a_no_op() {
        let action = decide(false, 1000, 0, 0, 60, 0);
        assert_eq!(action, Action::NoOp);
    }

    #[test]
    fn at_most_one_transition_per_call() {
        // `decide` returns a single enum variant, never a batch — assert it
        // explicitly for the boundary case of exactly one threshold past due.
        let action = decide(true, 61, 0, 0, 60, -1000);
        assert!(matches!(action, Action::Demote { .. }));
    }

    #[test]
    fn demotion_instant_falls_back_to_now_minus_threshold_when_cache_wiped() {
        // last_heartbeat is a real Unix epoch (cache was wiped): 0 is nowhere
        // near `now`, so the fallback term must win.
        let now = 10_000_000_i64;
        let threshold = 300;
        let action = decide(true, now, 0, 0, threshold, -1_000_000);
        match action {
            Action::Demote { changed_at, .. } => assert_eq!(changed_at, now - threshold),
            other => panic!("expected Demote, got {other:?}"),
        }
    }
}
