//! The hourly outage-photo refresh loop. Reads the durable store for
//! monitors with a configured channel and `outage_photo_enabled=true`,
//! conditionally re-fetches each group's schedule image, and publishes
//! `outage.photo` envelopes for Delivery to act on.
//!
//! Schedule Enrichment owns the ETag and the stored day (it decides when a
//! fetch happened and what day it happened on); Delivery owns the message
//! id (it decides the outcome of actually sending or editing).

use std::time::Duration;

use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use gridwatch_protocol::bus::{publish_json, Bus};
use gridwatch_protocol::db::{Db, PhotoState};
use gridwatch_protocol::envelope::{OutagePhotoEnvelope, PhotoAction};
use gridwatch_protocol::ROUTING_KEY_OUTAGE_PHOTO;
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const IMAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const KYIV: Tz = chrono_tz::Europe::Kyiv;

pub struct PhotoFetch {
    pub image: Vec<u8>,
    pub etag: Option<String>,
}

pub enum FetchOutcome {
    NotModified,
    Fetched(PhotoFetch),
}

pub struct PhotoFetcher {
    base_url: String,
    http: reqwest::Client,
}

impl PhotoFetcher {
    pub fn new(base_url: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(IMAGE_FETCH_TIMEOUT)
            .build()?;
        Ok(Self { base_url, http })
    }

    async fn fetch(
        &self,
        region: &str,
        group: &str,
        if_none_match: Option<&str>,
    ) -> anyhow::Result<FetchOutcome> {
        let url = format!("{}/regions/{region}/groups/{group}/photo", self.base_url);
        let mut request = self.http.get(url);
        if let Some(etag) = if_none_match {
            request = request.header(reqwest::header::IF_NONE_MATCH, etag);
        }
        let response = request.send().await?;

        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(FetchOutcome::NotModified);
        }
        let etag = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let image = response.bytes().await?.to_vec();
        Ok(FetchOutcome::Fetched(PhotoFetch { image, etag }))
    }
}

fn today_in_kyiv(unix_seconds: i64) -> String {
    Utc.timestamp_opt(unix_seconds, 0)
        .single()
        .unwrap_or_else(Utc::now)
        .with_timezone(&KYIV)
        .date_naive()
        .to_string()
}

/// Pure rollover decision: whether the stored day has changed and, if so,
/// whether there's a previous message/etag worth tearing down. Kept free of
/// D/B/HTTP so the day-rollover and conditional-fetch branching can be
/// exercised without any of them.
struct RolloverPlan {
    rolled_over: bool,
    needs_delete: bool,
}

fn plan_rollover(photo_day: Option<&str>, stored_msg_id: Option<i64>, stored_etag: Option<&str>, today: &str) -> RolloverPlan {
    let rolled_over = photo_day.map(|day| day != today).unwrap_or(true);
    let needs_delete = rolled_over && (stored_msg_id.is_some() || stored_etag.is_some());
    RolloverPlan {
        rolled_over,
        needs_delete,
    }
}

async fn refresh_one(
    db: &Db,
    bus: &Bus,
    fetcher: &PhotoFetcher,
    monitor: PhotoState,
    now: i64,
) -> anyhow::Result<()> {
    let today = today_in_kyiv(now);
    let mut stored_msg_id = monitor.photo_msg_id;
    let mut stored_etag = monitor.photo_etag.clone();

    let plan = plan_rollover(monitor.photo_day.as_deref(), stored_msg_id, stored_etag.as_deref(), &today);

    if plan.needs_delete {
        db.clear_photo_state(monitor.monitor_id).await?;
        let envelope = OutagePhotoEnvelope {
            monitor_id: monitor.monitor_id,
            channel_id: monitor.channel_id,
            monitor_name: monitor.name.clone(),
            action: PhotoAction::Delete,
            old_msg_id: stored_msg_id,
            image_data: None,
            filename: None,
            etag: None,
        };
        publish(bus, &envelope).await;
        stored_msg_id = None;
        stored_etag = None;
    }

    let if_none_match = if plan.rolled_over {
        None
    } else {
        stored_etag.as_deref()
    };

    let outcome = fetcher
        .fetch(&monitor.outage_region, &monitor.outage_group, if_none_match)
        .await?;

    let FetchOutcome::Fetched(fetch) = outcome else {
        return Ok(());
    };

    let action = if stored_msg_id.is_some() {
        PhotoAction::Edit
    } else {
        PhotoAction::Send
    };
    let envelope = OutagePhotoEnvelope {
        monitor_id: monitor.monitor_id,
        channel_id: monitor.channel_id,
        monitor_name: monitor.name.clone(),
        action,
        old_msg_id: stored_msg_id,
        image_data: Some(fetch.image),
        filename: Some(format!("{}-{}.png", monitor.outage_region, monitor.outage_group)),
        etag: fetch.etag.clone(),
    };
    publish(bus, &envelope).await;

    db.update_photo_state(monitor.monitor_id, stored_msg_id, fetch.etag.as_deref(), Some(&today))
        .await?;
    Ok(())
}

async fn publish(bus: &Bus, envelope: &OutagePhotoEnvelope) {
    match bus.producer_channel().await {
        Ok(channel) => {
            if let Err(e) = publish_json(&channel, ROUTING_KEY_OUTAGE_PHOTO, envelope).await {
                warn!(monitor_id = envelope.monitor_id, error = %e, "failed to publish outage.photo");
            }
        }
        Err(e) => warn!(monitor_id = envelope.monitor_id, error = %e, "failed to open producer channel"),
    }
}

pub async fn run(
    db: Db,
    bus: Bus,
    fetcher: PhotoFetcher,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("photo refresh shutting down");
                return;
            }
            _ = ticker.tick() => {}
        }

        let monitors = match db.list_photo_enabled().await {
            Ok(monitors) => monitors,
            Err(e) => {
                error!(error = %e, "photo refresh: failed to list photo-enabled monitors");
                continue;
            }
        };

        let now = gridwatch_protocol::now_unix() as i64;
        for monitor in monitors {
            let monitor_id = monitor.monitor_id;
            if let Err(e) = refresh_one(&db, &bus, &fetcher, monitor, now).await {
                warn!(monitor_id, error = %e, "photo refresh: failed to refresh monitor");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_day_with_stored_etag_reuses_it_and_skips_teardown() {
        let plan = plan_rollover(Some("2026-07-28"), Some(55), Some("W/\"abc\""), "2026-07-28");
        assert!(!plan.rolled_over);
        assert!(!plan.needs_delete);
    }

    #[test]
    fn day_rollover_with_prior_state_requires_teardown_and_drops_the_etag() {
        let plan = plan_rollover(Some("2026-07-28"), Some(55), Some("W/\"abc\""), "2026-07-29");
        assert!(plan.rolled_over);
        assert!(plan.needs_delete);
    }

    #[test]
    fn day_rollover_with_no_prior_state_needs_no_teardown() {
        let plan = plan_rollover(None, None, None, "2026-07-29");
        assert!(plan.rolled_over);
        assert!(!plan.needs_delete);
    }

    #[test]
    fn today_in_kyiv_formats_as_an_iso_date() {
        let day = today_in_kyiv(1785398400);
        assert_eq!(day.len(), 10);
        assert!(day.starts_with("2026-07-"));
    }
}
