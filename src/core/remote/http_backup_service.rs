use crate::interface::remote_backup_service::{RemoteBackupService, UploadReceipt, UploadRequest};
use crate::model::context::ServiceEndpoint;
use crate::model::error::Error;
use crate::model::error::io::IOError;
use crate::model::error::transport::TransportError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct DestinationListing {
    destinations: Vec<String>,
}

/// Talks to the backup server over HTTP with token authentication.
#[derive(Debug, Clone)]
pub struct HttpBackupService {
    client: Client,
    endpoint: ServiceEndpoint,
}

impl HttpBackupService {
    pub fn new(endpoint: ServiceEndpoint) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(endpoint.request_timeout))
            .build()
            .map_err(TransportError::ClientBuildFailed)?;
        Ok(Self { client, endpoint })
    }

    fn url(&self, origin_id: i64, path: &str) -> String {
        format!(
            "{}/server/{}/{}/",
            self.endpoint.url.trim_end_matches('/'),
            origin_id,
            path
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, TransportError> {
        let response = request
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Token {}", self.endpoint.api_key),
            )
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    TransportError::Timeout(self.endpoint.request_timeout)
                } else {
                    TransportError::ConnectionFailed(err)
                }
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::UnexpectedStatus(status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl RemoteBackupService for HttpBackupService {
    async fn check_destinations(&self, origin_id: i64) -> Result<BTreeSet<String>, Error> {
        let request = self.client.get(self.url(origin_id, "destinations"));
        let listing = self
            .send(request)
            .await?
            .json::<DestinationListing>()
            .await
            .map_err(TransportError::InvalidResponse)?;
        Ok(listing.destinations.into_iter().collect())
    }

    async fn upload(&self, request: UploadRequest) -> Result<UploadReceipt, Error> {
        let file = tokio::fs::File::open(&request.path)
            .await
            .map_err(|err| IOError::ReadFileFailed(request.path.display().to_string(), err))?;
        let file = Part::stream_with_length(file, request.size)
            .file_name(request.filename.clone())
            .mime_str("application/gzip")
            .map_err(TransportError::ClientBuildFailed)?;
        let form = Form::new()
            .text("destination", request.destination)
            .text("filename", request.filename)
            .text("checksum", request.checksum)
            .part("file", file);
        let request = self
            .client
            .post(self.url(request.origin_id, "backup"))
            .multipart(form);
        let receipt = self
            .send(request)
            .await?
            .json::<UploadReceipt>()
            .await
            .map_err(TransportError::InvalidResponse)?;
        Ok(receipt)
    }
}
