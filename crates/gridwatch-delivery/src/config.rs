use gridwatch_protocol::config::{optional, required};

pub struct DeliveryConfig {
    pub database_url: String,
    pub rabbitmq_url: String,
    pub chat_api_base_url: String,
    pub chat_api_token: String,
    pub schedule_api_base_url: String,
    pub public_base_url: String,
    /// Upstream for the out-of-scope graph-rendering service. Accepted for
    /// environment-surface completeness; this process never calls out to
    /// it, since `graph.ready` envelopes already carry the rendered image.
    pub graph_api_base_url: String,
}

impl DeliveryConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            rabbitmq_url: required("RABBITMQ_URL")?,
            chat_api_base_url: required("CHAT_API_BASE_URL")?,
            chat_api_token: required("CHAT_API_TOKEN")?,
            schedule_api_base_url: required("SCHEDULE_API_BASE_URL")?,
            public_base_url: required("PUBLIC_BASE_URL")?,
            graph_api_base_url: optional("GRAPH_API_BASE_URL", ""),
        })
    }
}
