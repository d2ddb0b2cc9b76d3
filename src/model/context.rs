use serde::{Deserialize, Serialize};

/// The machine whose data is backed up, as registered on the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OriginContext {
    pub id: i64,
    pub name: String,
}

/// Where the backup server lives and how to authenticate against it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub url: String,
    pub api_key: String,
    pub request_timeout: u64, // second
}
