use gridwatch_protocol::config::{optional, optional_parsed, required};

pub struct IngestConfig {
    pub database_url: String,
    pub redis_url: String,
    pub bind_addr: String,
    pub map_cache_ttl_seconds: u64,
    pub admin_username: String,
    pub admin_password: String,
    pub heartbeat_db_coalesce_seconds: i64,
}

impl IngestConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            bind_addr: optional("INGEST_BIND_ADDR", "0.0.0.0:8080"),
            map_cache_ttl_seconds: optional_parsed("INGEST_MAP_CACHE_TTL_SECONDS", 5)?,
            admin_username: optional("ADMIN_USERNAME", ""),
            admin_password: optional("ADMIN_PASSWORD", ""),
            heartbeat_db_coalesce_seconds: optional_parsed("HEARTBEAT_DB_COALESCE_SECONDS", 30)?,
        })
    }
}
