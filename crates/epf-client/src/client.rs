//! EPF session client
//!
//! Every protected call is a single POST whose form field `obj` carries a JSON
//! object. Once logged in, that object includes the current `logonkey` and
//! `tokenkey`, and the response headers carry the pair for the next call.
//! All methods take `&mut self`, which keeps calls on one session strictly
//! sequential.

use crate::config::{validate_download_dir, EpfConfig};
use crate::endpoints;
use crate::error::{EpfError, Result};
use crate::headers::HeaderParams;
use crate::session::{Credentials, Session, SessionState};
use crate::types::{
    file_name_of, newest_file, DownloadOutcome, DownloadResult, EpfResponse, FileDescriptor,
    ListFilesRequest, ServiceResponse, STATUS_COMPLETED,
};
use chrono::Local;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

/// Client for the EPF distribution service, bound to one session
pub struct EpfClient {
    http: Client,
    config: EpfConfig,
    credentials: Credentials,
    session: Session,
}

impl EpfClient {
    /// Create a client; no network traffic happens until the first call
    pub fn new(config: EpfConfig, credentials: Credentials) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| EpfError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            credentials,
            session: Session::new(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &EpfConfig {
        &self.config
    }

    /// Set the directory streamed downloads are written into
    pub fn set_download_location(&mut self, dir: impl Into<PathBuf>) -> Result<()> {
        let dir = dir.into();
        validate_download_dir(&dir)?;
        self.config.download_dir = Some(dir);
        Ok(())
    }

    /// Unauthenticated liveness probe
    #[instrument(skip(self))]
    pub async fn version(&mut self) -> Result<ServiceResponse> {
        self.send(endpoints::VERSION, None).await
    }

    /// Open the session
    ///
    /// On failure the session stays unauthenticated and the error carries the
    /// service's messages.
    #[instrument(skip(self))]
    pub async fn login(&mut self) -> Result<ServiceResponse> {
        let mut payload = Map::new();
        payload.insert("login".to_string(), Value::String(self.credentials.user.clone()));
        payload.insert("pword".to_string(), Value::String(self.credentials.password.clone()));

        let response = self.send(endpoints::LOGIN, Some(payload)).await?;

        if !response.is_success() {
            return Err(EpfError::Authentication(response.body.messages_text()));
        }

        if self.session.token_key().is_none() {
            warn!("Login succeeded without a token key; the next call will likely be rejected");
        }

        self.session.set_state(SessionState::Authenticated);
        info!(user = %self.credentials.user, "Logged in to EPF");

        Ok(response)
    }

    /// Close the session
    ///
    /// The session is considered closed whether or not the service
    /// acknowledges the logout.
    #[instrument(skip(self))]
    pub async fn logout(&mut self) -> Result<ServiceResponse> {
        self.require_session(endpoints::LOGOUT)?;

        let result = self.send(endpoints::LOGOUT, Some(Map::new())).await;
        self.session.set_state(SessionState::Closed);

        let response = result?;
        if !response.is_success() {
            return Err(EpfError::Logout(response.body.messages_text()));
        }

        info!("Logged out of EPF");
        Ok(response)
    }

    /// List files available for a product code/id
    #[instrument(skip(self), fields(product_code = %request.product_code, product_id = %request.product_id))]
    pub async fn list_files(&mut self, request: &ListFilesRequest) -> Result<Vec<FileDescriptor>> {
        self.require_session(endpoints::LIST_FILES)?;

        let Value::Object(payload) = serde_json::to_value(request)? else {
            return Err(EpfError::invalid_response(
                endpoints::LIST_FILES,
                "list request did not serialize to an object",
            ));
        };

        let response = self.send(endpoints::LIST_FILES, Some(payload)).await?;

        if !response.is_success() {
            return Err(EpfError::List(response.body.messages_text()));
        }

        let files: Vec<FileDescriptor> = match response.body.data.get("fileList") {
            None | Some(Value::Null) => Vec::new(),
            Some(list) => serde_json::from_value(list.clone())
                .map_err(|e| EpfError::invalid_response(endpoints::LIST_FILES, e.to_string()))?,
        };

        debug!(count = files.len(), "Listed EPF files");
        Ok(files)
    }

    /// The listed file with the latest fulfilled timestamp, if any
    pub async fn find_newest_file(
        &mut self,
        request: &ListFilesRequest,
    ) -> Result<Option<FileDescriptor>> {
        let files = self.list_files(request).await?;
        let newest = newest_file(&files).cloned();

        match newest {
            Some(ref file) => info!(
                file_id = %file.file_id,
                fulfilled = %file.fulfilled,
                "Found newest file"
            ),
            None => info!(listed = files.len(), "No file available to download"),
        }

        Ok(newest)
    }

    /// Download through the responding web server (`/download/epf`)
    pub async fn download_epf(&mut self, file_id: &str, file_path: &str) -> Result<DownloadResult> {
        self.stream_to_disk(endpoints::DOWNLOAD_EPF, file_id, file_path)
            .await
    }

    /// Download from the edge servers (`/download/file`)
    pub async fn download_file(&mut self, file_id: &str, file_path: &str) -> Result<DownloadResult> {
        self.stream_to_disk(endpoints::DOWNLOAD_FILE, file_id, file_path)
            .await
    }

    /// Find, download and mark complete the newest file of a product
    pub async fn download_newest_file(
        &mut self,
        request: &ListFilesRequest,
    ) -> Result<DownloadOutcome> {
        let Some(file) = self.find_newest_file(request).await? else {
            return Ok(DownloadOutcome::NoFileToDownload);
        };

        let download = self.download_epf(&file.file_id, &file.file_path).await?;
        self.set_status(&file.file_id, STATUS_COMPLETED).await?;

        Ok(DownloadOutcome::Downloaded { file, download })
    }

    /// Set a file's fulfillment status
    #[instrument(skip(self))]
    pub async fn set_status(&mut self, file_id: &str, status: &str) -> Result<ServiceResponse> {
        self.require_session(endpoints::SET_STATUS)?;

        let mut payload = Map::new();
        payload.insert("fileid".to_string(), Value::String(file_id.to_string()));
        payload.insert("newstatus".to_string(), Value::String(status.to_string()));

        let response = self.send(endpoints::SET_STATUS, Some(payload)).await?;

        if !response.is_success() {
            return Err(EpfError::StatusUpdate(response.body.messages_text()));
        }

        info!(file_id, status, "Updated file status");
        Ok(response)
    }

    fn require_session(&self, endpoint: &'static str) -> Result<()> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(EpfError::NotAuthenticated { endpoint })
        }
    }

    /// Buffered exchange: POST with a JSON payload, or GET when `payload` is None
    async fn send(
        &mut self,
        endpoint: &'static str,
        payload: Option<Map<String, Value>>,
    ) -> Result<ServiceResponse> {
        let url = endpoints::url(&self.config.base_url, endpoint);
        let secs = self.config.timeout.as_secs();

        let request = match payload {
            Some(mut payload) => {
                self.session.attach_keys(&mut payload);
                let obj = serde_json::to_string(&payload)?;
                self.http.post(&url).form(&[("obj", obj)])
            },
            None => self.http.get(&url),
        };

        self.session.begin_request();
        debug!(endpoint, "Sending EPF request");

        let response = request
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| EpfError::from_transport(endpoint, secs, e))?;

        let status = response.status();
        let headers = HeaderParams::from_response(status, response.headers());
        self.session.rotate(&headers);

        let text = response
            .text()
            .await
            .map_err(|e| EpfError::from_transport(endpoint, secs, e))?;

        let body = match serde_json::from_str::<EpfResponse>(&text) {
            Ok(body) => body,
            Err(e) => {
                warn!(endpoint, status = status.as_u16(), error = %e, "Response body is not EPF JSON");
                EpfResponse::failed(format!("HTTP {}: unreadable response body", status.as_u16()))
            },
        };

        self.session.record_outcome(body.is_success());
        debug!(endpoint, status = status.as_u16(), response = %body.response, "EPF response");

        Ok(ServiceResponse {
            http_status: status.as_u16(),
            headers,
            body,
        })
    }

    /// Streamed exchange: headers to `<name>.header`, body to `<name>`
    ///
    /// The service gives no reliable success flag for downloads, so a
    /// non-empty payload on disk is treated as success.
    #[instrument(skip(self))]
    async fn stream_to_disk(
        &mut self,
        endpoint: &'static str,
        file_id: &str,
        file_path: &str,
    ) -> Result<DownloadResult> {
        self.require_session(endpoint)?;

        let dir = self
            .config
            .download_dir
            .clone()
            .ok_or_else(|| EpfError::configuration("No file save location specified"))?;

        let name = match file_name_of(file_path) {
            "" => "download",
            name => name,
        };
        let saved_name = format!("{}_{}", Local::now().format("%Y-%m-%d_%H.%M.%S"), name);
        let save_path = dir.join(&saved_name);
        let header_path = dir.join(format!("{}.header", saved_name));

        let mut payload = Map::new();
        payload.insert("fileid".to_string(), Value::String(file_id.to_string()));
        payload.insert("filepath".to_string(), Value::String(file_path.to_string()));
        self.session.attach_keys(&mut payload);
        let obj = serde_json::to_string(&payload)?;

        let mut request = self
            .http
            .post(endpoints::url(&self.config.base_url, endpoint))
            .timeout(self.config.download_timeout)
            .header("Akamai-File-Request", file_path)
            .header("fileid", file_id);
        if let Some(logon) = self.session.logon_key() {
            request = request.header("logonkey", logon);
        }
        if let Some(token) = self.session.token_key() {
            request = request.header("tokenkey", token);
        }

        let secs = self.config.download_timeout.as_secs();
        self.session.begin_request();
        info!(file_id, file_path, save_path = %save_path.display(), "Starting download");

        let response = request
            .form(&[("obj", obj)])
            .send()
            .await
            .map_err(|e| EpfError::from_transport(endpoint, secs, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint, status = status.as_u16(), "Download responded with a non-success status");
        }

        let headers = HeaderParams::from_response(status, response.headers());
        self.session.rotate(&headers);
        tokio::fs::write(&header_path, headers.to_raw()).await?;

        let mut file = tokio::fs::File::create(&save_path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| EpfError::from_transport(endpoint, secs, e))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        let file_size = tokio::fs::metadata(&save_path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);

        let succeeded = file_size > 0;
        self.session.record_outcome(succeeded);

        if !succeeded {
            return Err(EpfError::Download(format!(
                "{} is empty after transfer",
                save_path.display()
            )));
        }

        let digest_path = save_path.clone();
        let sha256 = tokio::task::spawn_blocking(move || epf_common::checksum::sha256_file(digest_path))
            .await
            .map_err(|e| EpfError::Io(std::io::Error::other(e)))?
            .map_err(|e| EpfError::Io(std::io::Error::other(e)))?;

        info!(file_id, file_size, %sha256, "Download complete");

        Ok(DownloadResult {
            file_id: file_id.to_string(),
            file_path: save_path,
            header_path,
            file_size,
            sha256,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn client() -> EpfClient {
        EpfClient::new(EpfConfig::default(), Credentials::new("user", "pass")).unwrap()
    }

    #[tokio::test]
    async fn test_protected_calls_require_login() {
        let mut client = client();

        let err = client
            .list_files(&ListFilesRequest::new("AIS", "CS215N"))
            .await
            .unwrap_err();
        assert!(matches!(err, EpfError::NotAuthenticated { endpoint } if endpoint == endpoints::LIST_FILES));

        let err = client.set_status("1", STATUS_COMPLETED).await.unwrap_err();
        assert!(matches!(err, EpfError::NotAuthenticated { .. }));

        let err = client.download_epf("1", "/a/b.tar").await.unwrap_err();
        assert!(matches!(err, EpfError::NotAuthenticated { .. }));
    }

    #[test]
    fn test_set_download_location_validates() {
        let mut client = client();
        assert!(matches!(
            client.set_download_location("/no/such/epf/dir"),
            Err(EpfError::Configuration(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        client.set_download_location(dir.path()).unwrap();
        assert_eq!(client.config().download_dir.as_deref(), Some(dir.path()));
    }
}
