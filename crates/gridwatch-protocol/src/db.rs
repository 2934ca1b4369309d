//! The durable relational store (PostgreSQL). Row-level write discipline is
//! enforced by convention here: only `apply_transition` ever writes
//! `is_online`/`last_status_change_at`, and only Liveness Core calls it.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::backoff::connect_with_backoff;
use crate::error::DbError;
use crate::monitor::{MapEntry, Monitor, MonitorConfig, MonitorType};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

/// A monitor row's outage-photo bookkeeping.
#[derive(Debug, Clone)]
pub struct PhotoState {
    pub monitor_id: i64,
    pub channel_id: i64,
    pub name: String,
    pub outage_region: String,
    pub outage_group: String,
    pub photo_msg_id: Option<i64>,
    pub photo_etag: Option<String>,
    pub photo_day: Option<String>,
}

impl Db {
    /// Connect with the shared startup backoff and run migrations. Failure
    /// is fatal at startup.
    pub async fn connect(database_url: &str, run_migrations: bool) -> anyhow::Result<Self> {
        let pool = connect_with_backoff("postgres", || {
            PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
        })
        .await?;

        if run_migrations {
            MIGRATOR.run(&pool).await?;
        }

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Token lookup: no caching, by design.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<Monitor>, DbError> {
        let row = sqlx::query_as::<_, Monitor>(
            "SELECT id, token, settings_token, owner_id, name, address, lat, lng, \
             monitor_type, ping_target, channel_id, is_online, is_active, is_public, \
             notify_address, notify_outage, outage_region, outage_group, \
             outage_photo_enabled, graph_enabled, last_heartbeat_at, last_status_change_at \
             FROM monitors WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn find_by_settings_token(&self, token: &str) -> Result<Option<Monitor>, DbError> {
        let row = sqlx::query_as::<_, Monitor>(
            "SELECT id, token, settings_token, owner_id, name, address, lat, lng, \
             monitor_type, ping_target, channel_id, is_online, is_active, is_public, \
             notify_address, notify_outage, outage_region, outage_group, \
             outage_photo_enabled, graph_enabled, last_heartbeat_at, last_status_change_at \
             FROM monitors WHERE settings_token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get(&self, monitor_id: i64) -> Result<Option<Monitor>, DbError> {
        let row = sqlx::query_as::<_, Monitor>(
            "SELECT id, token, settings_token, owner_id, name, address, lat, lng, \
             monitor_type, ping_target, channel_id, is_online, is_active, is_public, \
             notify_address, notify_outage, outage_region, outage_group, \
             outage_photo_enabled, graph_enabled, last_heartbeat_at, last_status_change_at \
             FROM monitors WHERE id = $1",
        )
        .bind(monitor_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Full registry load at Liveness Core startup.
    pub async fn list_all(&self) -> Result<Vec<Monitor>, DbError> {
        let rows = sqlx::query_as::<_, Monitor>(
            "SELECT id, token, settings_token, owner_id, name, address, lat, lng, \
             monitor_type, ping_target, channel_id, is_online, is_active, is_public, \
             notify_address, notify_outage, outage_region, outage_group, \
             outage_photo_enabled, graph_enabled, last_heartbeat_at, last_status_change_at \
             FROM monitors",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Editable-column snapshot for the config-sync reconciliation loop.
    /// Deliberately excludes `is_online` and `last_status_change_at`.
    pub async fn list_configs(&self) -> Result<Vec<MonitorConfig>, DbError> {
        let rows = sqlx::query_as::<_, MonitorConfig>(
            "SELECT id, name, address, lat, lng, ping_target, channel_id, is_active, \
             is_public, notify_address, notify_outage, outage_region, outage_group, \
             outage_photo_enabled, graph_enabled \
             FROM monitors",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn update_last_heartbeat(&self, monitor_id: i64, unix_seconds: i64) -> Result<(), DbError> {
        sqlx::query("UPDATE monitors SET last_heartbeat_at = $2 WHERE id = $1")
            .bind(monitor_id)
            .bind(unix_seconds)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Author a status transition: update the monitor row and append the
    /// status-event row in one transaction. The only writer of
    /// `is_online`/`last_status_change_at`.
    pub async fn apply_transition(
        &self,
        monitor_id: i64,
        is_online: bool,
        changed_at: i64,
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE monitors SET is_online = $2, last_status_change_at = $3 WHERE id = $1")
            .bind(monitor_id)
            .bind(is_online)
            .bind(changed_at)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO status_events (monitor_id, is_online, \"timestamp\") VALUES ($1, $2, $3)")
            .bind(monitor_id)
            .bind(is_online)
            .bind(changed_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Delivery's channel-access-loss auto-pause.
    pub async fn set_active(&self, monitor_id: i64, active: bool) -> Result<(), DbError> {
        sqlx::query("UPDATE monitors SET is_active = $2 WHERE id = $1")
            .bind(monitor_id)
            .bind(active)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn owner_telegram_id(&self, monitor_id: i64) -> Result<Option<i64>, DbError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT u.telegram_id FROM users u JOIN monitors m ON m.owner_id = u.id WHERE m.id = $1",
        )
        .bind(monitor_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id,)| id))
    }

    /// Public-map read path.
    pub async fn list_public(&self) -> Result<Vec<MapEntry>, DbError> {
        let rows: Vec<(i64, String, f64, f64, bool, MonitorType)> = sqlx::query_as(
            "SELECT id, name, lat, lng, is_online, monitor_type FROM monitors \
             WHERE is_public = TRUE AND is_active = TRUE",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name, lat, lng, is_online, monitor_type)| MapEntry {
                id,
                name,
                lat,
                lng,
                is_online,
                monitor_type,
            })
            .collect())
    }

    /// Monitors eligible for outage-photo enrichment: channel configured and
    /// `outage_photo_enabled=true`.
    pub async fn list_photo_enabled(&self) -> Result<Vec<PhotoState>, DbError> {
        let rows: Vec<(i64, i64, String, String, String, Option<i64>, Option<String>, Option<String>)> =
            sqlx::query_as(
                "SELECT id, channel_id, name, outage_region, outage_group, \
                 photo_msg_id, photo_etag, photo_day \
                 FROM monitors WHERE outage_photo_enabled = TRUE AND channel_id <> 0 AND is_active = TRUE",
            )
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(
                |(monitor_id, channel_id, name, outage_region, outage_group, photo_msg_id, photo_etag, photo_day)| {
                    PhotoState {
                        monitor_id,
                        channel_id,
                        name,
                        outage_region,
                        outage_group,
                        photo_msg_id,
                        photo_etag,
                        photo_day,
                    }
                },
            )
            .collect())
    }

    pub async fn update_photo_state(
        &self,
        monitor_id: i64,
        msg_id: Option<i64>,
        etag: Option<&str>,
        day: Option<&str>,
    ) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE monitors SET photo_msg_id = $2, photo_etag = $3, photo_day = $4 WHERE id = $1",
        )
        .bind(monitor_id)
        .bind(msg_id)
        .bind(etag)
        .bind(day)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn clear_photo_state(&self, monitor_id: i64) -> Result<(), DbError> {
        self.update_photo_state(monitor_id, None, None, None).await
    }

    /// Delivery's half of outage-photo bookkeeping: record the message id
    /// a send/edit produced without disturbing the ETag or day Schedule
    /// Enrichment already wrote for this fetch.
    pub async fn update_photo_msg_id(&self, monitor_id: i64, msg_id: Option<i64>) -> Result<(), DbError> {
        sqlx::query("UPDATE monitors SET photo_msg_id = $2 WHERE id = $1")
            .bind(monitor_id)
            .bind(msg_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_graph_state(
        &self,
        monitor_id: i64,
        msg_id: Option<i64>,
        week_start: &str,
    ) -> Result<(), DbError> {
        sqlx::query("UPDATE monitors SET graph_msg_id = $2, graph_week_start = $3 WHERE id = $1")
            .bind(monitor_id)
            .bind(msg_id)
            .bind(week_start)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
