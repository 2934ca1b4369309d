use std::time::Duration;

use gridwatch_protocol::config::{optional_parsed, required};

pub struct ScheduleConfig {
    pub database_url: String,
    pub rabbitmq_url: String,
    pub schedule_api_base_url: String,
    pub photo_refresh_interval: Duration,
}

impl ScheduleConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            rabbitmq_url: required("RABBITMQ_URL")?,
            schedule_api_base_url: required("SCHEDULE_API_BASE_URL")?,
            photo_refresh_interval: Duration::from_secs(optional_parsed(
                "PHOTO_REFRESH_INTERVAL",
                3600,
            )?),
        })
    }
}
