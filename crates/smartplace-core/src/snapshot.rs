//! Snapshot file naming

use chrono::{DateTime, Utc};

const SNAPSHOT_PREFIX: &str = "smartplace3d";

/// `smartplace3d-<unix epoch ms>.png`
pub fn snapshot_file_name(at: DateTime<Utc>) -> String {
    format!("{}-{}.png", SNAPSHOT_PREFIX, at.timestamp_millis())
}
