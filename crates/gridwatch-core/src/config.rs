use std::time::Duration;

use gridwatch_protocol::config::{optional_bool, optional_parsed, required};

pub struct CoreConfig {
    pub database_url: String,
    pub redis_url: String,
    pub rabbitmq_url: String,
    pub offline_threshold_seconds: i64,
    pub heartbeat_check_interval: Duration,
    pub ping_check_interval: Duration,
    pub ping_privileged: bool,
    pub config_sync_interval: Duration,
    pub heartbeat_db_coalesce_seconds: i64,
}

impl CoreConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            rabbitmq_url: required("RABBITMQ_URL")?,
            offline_threshold_seconds: optional_parsed("OFFLINE_THRESHOLD", 300)?,
            heartbeat_check_interval: Duration::from_secs(optional_parsed(
                "HEARTBEAT_CHECK_INTERVAL",
                15,
            )?),
            ping_check_interval: Duration::from_secs(optional_parsed(
                "PING_CHECK_INTERVAL",
                60,
            )?),
            ping_privileged: optional_bool("PING_PRIVILEGED", true)?,
            config_sync_interval: Duration::from_secs(optional_parsed(
                "CONFIG_SYNC_INTERVAL",
                30,
            )?),
            heartbeat_db_coalesce_seconds: optional_parsed(
                "HEARTBEAT_DB_COALESCE_SECONDS",
                30,
            )?,
        })
    }
}
