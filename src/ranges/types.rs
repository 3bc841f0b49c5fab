// src/ranges/types.rs
use serde::{Deserialize, Serialize};

/// Published IP range document (`ip-ranges.json` format)
#[derive(Debug, Serialize, Deserialize)]
pub struct IpRangeDocument {
    #[serde(rename = "syncToken", default)]
    pub sync_token: Option<String>,
    #[serde(rename = "createDate", default)]
    pub create_date: Option<String>,
    #[serde(default)]
    pub prefixes: Vec<IpRangePrefix>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpRangePrefix {
    pub ip_prefix: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub network_border_group: Option<String>,
}
