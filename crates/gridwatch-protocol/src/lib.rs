pub mod backoff;
pub mod bus;
pub mod cache;
pub mod config;
pub mod db;
pub mod envelope;
pub mod error;
pub mod monitor;
pub mod status_event;

/// Name of the durable topic exchange shared by every process on B.
pub const EXCHANGE_NAME: &str = "nlm";

/// Queue/routing-key pairs declared on B. Order matches the table in
/// "Message Bus Topology".
pub const QUEUE_STATUS_CHANGE: &str = "status_change";
pub const ROUTING_KEY_STATUS_CHANGE: &str = "status.change";

pub const QUEUE_GRAPH_READY: &str = "graph_ready";
pub const ROUTING_KEY_GRAPH_READY: &str = "graph.ready";

pub const QUEUE_OUTAGE_PHOTO: &str = "outage_photo";
pub const ROUTING_KEY_OUTAGE_PHOTO: &str = "outage.photo";

pub const QUEUE_GRAPH_REQUEST: &str = "graph_request";
pub const ROUTING_KEY_GRAPH_REQUEST: &str = "graph.request";

/// Default offline threshold, in seconds. A heartbeat older than this is stale.
pub const DEFAULT_OFFLINE_THRESHOLD_SECONDS: u64 = 300;

/// Unix-seconds "now", used throughout the checker and emit paths.
pub fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
