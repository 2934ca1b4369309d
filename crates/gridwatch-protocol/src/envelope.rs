//! Message envelopes carried on the bus. Each struct's field set and
//! routing key is normative — consumers deserialize exactly this shape.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChangeEnvelope {
    pub monitor_id: i64,
    pub channel_id: i64,
    pub name: String,
    pub address: String,
    pub notify_address: bool,
    pub is_online: bool,
    pub duration_sec: i64,
    /// RFC3339 timestamp of the transition instant.
    pub when: String,
    pub outage_region: String,
    pub outage_group: String,
    pub notify_outage: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphReadyEnvelope {
    pub monitor_id: i64,
    pub channel_id: i64,
    pub monitor_name: String,
    pub monitor_address: String,
    pub notify_address: bool,
    pub week_start: String,
    pub old_msg_id: Option<i64>,
    pub needs_new_msg: bool,
    pub image_png: Vec<u8>,
    pub caption: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoAction {
    Send,
    Edit,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutagePhotoEnvelope {
    pub monitor_id: i64,
    pub channel_id: i64,
    pub monitor_name: String,
    pub action: PhotoAction,
    pub old_msg_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphRequestEnvelope {
    pub monitor_id: i64,
    pub channel_id: i64,
}
