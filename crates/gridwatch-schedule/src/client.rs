//! A trait-typed schedule-lookup client, so the annotation and
//! photo-refresh logic can be tested against a stub instead of a live
//! upstream.

use std::time::Duration;

use async_trait::async_trait;

use crate::fact::GroupFact;

const SCHEDULE_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait ScheduleClient: Send + Sync {
    async fn regions(&self) -> anyhow::Result<Vec<String>>;
    async fn groups(&self, region: &str) -> anyhow::Result<Vec<String>>;
    async fn group_fact(&self, region: &str, group: &str) -> anyhow::Result<GroupFact>;
}

pub struct HttpScheduleClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpScheduleClient {
    pub fn new(base_url: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(SCHEDULE_FETCH_TIMEOUT)
            .build()?;
        Ok(Self { base_url, http })
    }
}

#[async_trait]
impl ScheduleClient for HttpScheduleClient {
    async fn regions(&self) -> anyhow::Result<Vec<String>> {
        let url = format!("{}/regions", self.base_url);
        let regions = self.http.get(url).send().await?.json().await?;
        Ok(regions)
    }

    async fn groups(&self, region: &str) -> anyhow::Result<Vec<String>> {
        let url = format!("{}/regions/{region}/groups", self.base_url);
        let groups = self.http.get(url).send().await?.json().await?;
        Ok(groups)
    }

    async fn group_fact(&self, region: &str, group: &str) -> anyhow::Result<GroupFact> {
        let url = format!("{}/regions/{region}/groups/{group}/fact", self.base_url);
        let fact = self.http.get(url).send().await?.json().await?;
        Ok(fact)
    }
}
