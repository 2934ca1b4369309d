//! Turns a `status.change` envelope into outbound message text: localized
//! power-restored/power-lost wording, elapsed duration, and an optional
//! schedule annotation.

use chrono::{Timelike, Utc};
use chrono_tz::Tz;
use gridwatch_protocol::envelope::StatusChangeEnvelope;
use gridwatch_schedule::client::ScheduleClient;
use gridwatch_schedule::fact::contradicts;
use tracing::warn;

const KYIV: Tz = chrono_tz::Europe::Kyiv;

fn format_duration(total_seconds: i64) -> String {
    let total_seconds = total_seconds.max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    match (hours, minutes) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// The next planned outage window (going ONLINE) or expected restoration
/// hour (going OFFLINE) for this monitor's schedule group, or `None` when
/// lookup fails or the schedule contradicts the observed transition.
async fn schedule_line(
    client: &dyn ScheduleClient,
    envelope: &StatusChangeEnvelope,
) -> Option<String> {
    let fact = match client
        .group_fact(&envelope.outage_region, &envelope.outage_group)
        .await
    {
        Ok(fact) => fact,
        Err(e) => {
            warn!(monitor_id = envelope.monitor_id, error = %e, "schedule lookup failed");
            return None;
        }
    };

    let current_hour = Utc::now().with_timezone(&KYIV).hour() as usize;
    next_change_line(&fact, current_hour, envelope.is_online)
}

fn next_change_line(
    fact: &gridwatch_schedule::fact::GroupFact,
    current_hour: usize,
    is_online: bool,
) -> Option<String> {
    if contradicts(fact, current_hour, is_online) {
        return None;
    }

    let mut hour = current_hour;
    for _ in 0..24 {
        let next_hour = (hour + 1) % 24;
        if fact[next_hour].implies_online() != is_online {
            return Some(format!("Next schedule change expected around {next_hour:02}:00."));
        }
        hour = next_hour;
    }
    None
}

pub async fn render_status_change(
    client: &dyn ScheduleClient,
    envelope: &StatusChangeEnvelope,
) -> String {
    let mut lines = Vec::new();
    if envelope.is_online {
        lines.push(format!(
            "\u{1F7E2} {} is back online after {}.",
            envelope.name,
            format_duration(envelope.duration_sec)
        ));
    } else {
        lines.push(format!(
            "\u{1F534} {} went offline after {}.",
            envelope.name,
            format_duration(envelope.duration_sec)
        ));
    }

    if envelope.notify_address && !envelope.address.is_empty() {
        lines.push(envelope.address.clone());
    }

    if envelope.notify_outage {
        if let Some(schedule) = schedule_line(client, envelope).await {
            lines.push(schedule);
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use gridwatch_schedule::fact::{GroupFact, HourState};

    use super::*;

    #[test]
    fn duration_formats_hours_and_minutes() {
        assert_eq!(format_duration(0), "0m");
        assert_eq!(format_duration(59), "0m");
        assert_eq!(format_duration(60), "1m");
        assert_eq!(format_duration(3600), "1h");
        assert_eq!(format_duration(3660), "1h 1m");
    }

    #[test]
    fn next_change_line_finds_the_upcoming_flip() {
        let mut fact = [HourState::Yes; 24];
        fact[15] = HourState::No;
        fact[16] = HourState::No;
        // At 14:xx, online, power is scheduled to go out at 15:00.
        assert_eq!(
            next_change_line(&fact, 14, true),
            Some("Next schedule change expected around 15:00.".to_string())
        );
    }

    #[test]
    fn next_change_line_suppressed_on_contradiction() {
        let mut fact = [HourState::No; 24];
        fact[14] = HourState::Yes;
        fact[15] = HourState::Yes;
        // Observed offline, but schedule says power is on this hour and next.
        assert_eq!(next_change_line(&fact, 14, false), None);
    }

    struct FakeScheduleClient(GroupFact);

    #[async_trait]
    impl ScheduleClient for FakeScheduleClient {
        async fn regions(&self) -> anyhow::Result<Vec<String>> {
            Ok(vec![])
        }
        async fn groups(&self, _region: &str) -> anyhow::Result<Vec<String>> {
            Ok(vec![])
        }
        async fn group_fact(&self, _region: &str, _group: &str) -> anyhow::Result<GroupFact> {
            Ok(self.0)
        }
    }

    fn sample_envelope(is_online: bool) -> StatusChangeEnvelope {
        StatusChangeEnvelope {
            monitor_id: 1,
            channel_id: 42,
            name: "Pump house".to_string(),
            address: "12 River Rd".to_string(),
            notify_address: true,
            is_online,
            duration_sec: 3660,
            when: "2026-07-28T10:00:00Z".to_string(),
            outage_region: "kyiv".to_string(),
            outage_group: "3.1".to_string(),
            notify_outage: false,
        }
    }

    #[tokio::test]
    async fn render_includes_address_when_notify_address() {
        let client = FakeScheduleClient([HourState::Yes; 24]);
        let text = render_status_change(&client, &sample_envelope(true)).await;
        assert!(text.contains("back online"));
        assert!(text.contains("12 River Rd"));
    }

    #[tokio::test]
    async fn render_omits_address_when_not_notifying() {
        let client = FakeScheduleClient([HourState::Yes; 24]);
        let mut envelope = sample_envelope(false);
        envelope.notify_address = false;
        let text = render_status_change(&client, &envelope).await;
        assert!(text.contains("went offline"));
        assert!(!text.contains("12 River Rd"));
    }
}
