use crate::model::error::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// One artifact to send. The file is streamed from `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub origin_id: i64,
    pub destination: String,
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
    /// Hex SHA-256 of the file at `path`.
    pub checksum: String,
}

/// What the server said about an upload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub accepted: bool,
    #[serde(default)]
    pub remote_id: Option<i64>,
    /// Checksum the server computed over what it received, when it reports one.
    #[serde(default)]
    pub checksum: Option<String>,
}

#[async_trait]
pub trait RemoteBackupService: Send + Sync {
    async fn check_destinations(&self, origin_id: i64) -> Result<BTreeSet<String>, Error>;
    async fn upload(&self, request: UploadRequest) -> Result<UploadReceipt, Error>;
}
