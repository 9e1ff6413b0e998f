use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::DriveConfig;

use super::{BackupError, BackupRemote, BackupResult};

const APP_DATA_SPACE: &str = "appDataFolder";
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileRef>,
}

#[derive(Debug, Deserialize)]
struct FileRef {
    id: String,
}

/// Google Drive v3 client scoped to the application data folder.
#[derive(Debug, Clone)]
pub struct DriveClient {
    http: Client,
    config: DriveConfig,
}

impl DriveClient {
    /// Build a client from configuration; fails when no token is configured.
    pub fn new(config: DriveConfig) -> BackupResult<Self> {
        if config.access_token.as_deref().map_or(true, str::is_empty) {
            return Err(BackupError::MissingToken);
        }
        let http = Client::builder()
            .user_agent(concat!("backlog/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    fn token(&self) -> BackupResult<&str> {
        self.config
            .access_token
            .as_deref()
            .ok_or(BackupError::MissingToken)
    }

    fn files_url(&self) -> String {
        format!("{}/files", self.config.api_base.trim_end_matches('/'))
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/{file_id}", self.files_url())
    }

    fn upload_url(&self, file_id: &str) -> String {
        format!(
            "{}/files/{file_id}",
            self.config.upload_base.trim_end_matches('/')
        )
    }

    async fn send(&self, request: RequestBuilder) -> BackupResult<Response> {
        let response = request.bearer_auth(self.token()?).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|index| body.is_char_boundary(*index))
                .unwrap_or(0);
            body.truncate(cut);
        }
        Err(BackupError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn find_file(&self) -> BackupResult<Option<String>> {
        let query = format!(
            "name = '{}' and trashed = false",
            self.config.file_name.replace('\'', "\\'")
        );
        let request = self.http.get(self.files_url()).query(&[
            ("spaces", APP_DATA_SPACE),
            ("q", query.as_str()),
            ("fields", "files(id,name)"),
        ]);
        let list: FileList = self.send(request).await?.json().await?;
        Ok(list.files.into_iter().next().map(|file| file.id))
    }

    async fn create_file(&self) -> BackupResult<String> {
        let metadata = json!({
            "name": self.config.file_name,
            "parents": [APP_DATA_SPACE],
            "mimeType": "application/json",
        });
        let request = self
            .http
            .post(self.files_url())
            .query(&[("fields", "id")])
            .json(&metadata);
        let created: FileRef = self.send(request).await?.json().await?;
        if created.id.is_empty() {
            return Err(BackupError::Unexpected("created file has no id".into()));
        }
        self.upload(&created.id, "[]").await?;
        info!(file_id = %created.id, "created backup file in app data folder");
        Ok(created.id)
    }
}

#[async_trait]
impl BackupRemote for DriveClient {
    async fn ensure_file(&self) -> BackupResult<String> {
        if let Some(id) = self.find_file().await? {
            debug!(file_id = %id, "found existing backup file");
            return Ok(id);
        }
        self.create_file().await
    }

    async fn upload(&self, file_id: &str, content: &str) -> BackupResult<()> {
        let request = self
            .http
            .patch(self.upload_url(file_id))
            .query(&[("uploadType", "media")])
            .header(CONTENT_TYPE, "application/json")
            .body(content.to_string());
        self.send(request).await?;
        debug!(file_id, bytes = content.len(), "uploaded backup");
        Ok(())
    }

    async fn download(&self, file_id: &str) -> BackupResult<String> {
        let request = self
            .http
            .get(self.file_url(file_id))
            .query(&[("alt", "media")]);
        let content = self.send(request).await?.text().await?;
        debug!(file_id, bytes = content.len(), "downloaded backup");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>) -> DriveConfig {
        DriveConfig {
            api_base: "https://www.googleapis.com/drive/v3/".into(),
            upload_base: "https://www.googleapis.com/upload/drive/v3".into(),
            file_name: "gametracker-backup.json".into(),
            access_token: token.map(str::to_string),
        }
    }

    #[test]
    fn requires_token() {
        assert!(matches!(
            DriveClient::new(config(None)),
            Err(BackupError::MissingToken)
        ));
        assert!(matches!(
            DriveClient::new(config(Some(""))),
            Err(BackupError::MissingToken)
        ));
    }

    #[test]
    fn builds_endpoints() {
        let client = DriveClient::new(config(Some("token"))).expect("client");
        assert_eq!(
            client.files_url(),
            "https://www.googleapis.com/drive/v3/files"
        );
        assert_eq!(
            client.file_url("abc"),
            "https://www.googleapis.com/drive/v3/files/abc"
        );
        assert_eq!(
            client.upload_url("abc"),
            "https://www.googleapis.com/upload/drive/v3/files/abc"
        );
    }
}
