//! Google Drive v3 transport: folder listing, text export, and media download.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use docchat_shared::{ContentType, DocChatError, DriveConfig, Result, ServiceAccountKey, SourceItem};

use crate::DocumentSource;
use crate::auth::{DRIVE_READONLY_SCOPE, ServiceAccountAuth, snippet};

/// User-Agent string for Drive requests.
const USER_AGENT: &str = concat!("DocChat/", env!("CARGO_PKG_VERSION"));

/// Fields requested from `files.list`.
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType)";

/// Export format for native documents.
const EXPORT_MIME: &str = "text/plain";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    mime_type: String,
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Build the `files.list` query for accepted, non-trashed children of `folder_id`.
pub fn listing_query(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    let mimes = ContentType::ACCEPTED
        .iter()
        .map(|ct| format!("mimeType='{}'", ct.mime_type()))
        .collect::<Vec<_>>()
        .join(" or ");
    format!("'{escaped}' in parents and ({mimes}) and trashed=false")
}

// ---------------------------------------------------------------------------
// DriveClient
// ---------------------------------------------------------------------------

/// Drive v3 document source authenticated with a service account.
pub struct DriveClient {
    config: DriveConfig,
    client: Client,
    auth: ServiceAccountAuth,
    base_url: Url,
}

impl DriveClient {
    /// Create a client for the given key and transport settings.
    pub fn new(key: ServiceAccountKey, config: DriveConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DocChatError::source_unavailable("failed to build HTTP client", e))?;

        let base_url = Url::parse(&config.api_base_url).map_err(|e| {
            DocChatError::config(format!(
                "invalid drive.api_base_url {:?}: {e}",
                config.api_base_url
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(DocChatError::config(format!(
                "drive.api_base_url {:?} cannot be used as a base URL",
                config.api_base_url
            )));
        }

        let auth = ServiceAccountAuth::new(key, client.clone(), DRIVE_READONLY_SCOPE);

        Ok(Self {
            config,
            client,
            auth,
            base_url,
        })
    }

    /// `{base}/files` followed by `segments`.
    fn files_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("files").extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let token = self.auth.access_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| DocChatError::source_unavailable(format!("{what} failed"), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocChatError::source_status(format!(
                "{what} returned HTTP {status}: {}",
                snippet(&body)
            )));
        }
        Ok(response)
    }

    /// Read the body chunk by chunk, refusing anything over `max_file_bytes`.
    async fn read_limited(&self, mut response: Response, name: &str) -> Result<Vec<u8>> {
        let limit = self.config.max_file_bytes;
        if let Some(len) = response.content_length() {
            if len > limit {
                return Err(too_large(name, limit));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| DocChatError::source_unavailable(format!("reading {name:?} failed"), e))?
        {
            if (body.len() + chunk.len()) as u64 > limit {
                return Err(too_large(name, limit));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

fn too_large(name: &str, limit: u64) -> DocChatError {
    DocChatError::source_status(format!(
        "document {name:?} exceeds the {limit} byte download limit"
    ))
}

#[async_trait]
impl DocumentSource for DriveClient {
    fn identity(&self) -> String {
        self.auth.key().identity()
    }

    #[instrument(skip_all, fields(folder_id = %folder_id))]
    async fn list(&self, folder_id: &str) -> Result<Vec<SourceItem>> {
        let query = listing_query(folder_id);
        let page_size = self.config.page_size.to_string();
        let mut page_token: Option<String> = None;
        let mut items = Vec::new();
        let mut pages = 0usize;

        loop {
            let mut params = vec![
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", page_size.as_str()),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let request = self.client.get(self.files_url(&[])).query(&params);
            let response = self
                .send(request, &format!("listing folder {folder_id}"))
                .await?;
            let list: FileList = response.json().await.map_err(|e| {
                DocChatError::source_unavailable("invalid folder listing response", e)
            })?;
            pages += 1;

            for file in list.files {
                match ContentType::from_mime(&file.mime_type) {
                    Some(content_type) => items.push(SourceItem {
                        id: file.id,
                        name: file.name,
                        content_type,
                    }),
                    None => debug!(name = %file.name, mime = %file.mime_type, "skipping unsupported file"),
                }
            }

            match list.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(documents = items.len(), pages, "listed folder");
        Ok(items)
    }

    #[instrument(skip_all, fields(document = %item.name, kind = %item.content_type))]
    async fn download(&self, item: &SourceItem) -> Result<Vec<u8>> {
        let request = match item.content_type {
            ContentType::NativeDocument => self
                .client
                .get(self.files_url(&[item.id.as_str(), "export"]))
                .query(&[("mimeType", EXPORT_MIME)]),
            ContentType::PagedDocument => self
                .client
                .get(self.files_url(&[item.id.as_str()]))
                .query(&[("alt", "media"), ("supportsAllDrives", "true")]),
        };

        let response = self
            .send(request, &format!("downloading {:?}", item.name))
            .await?;
        let bytes = self.read_limited(response, &item.name).await?;
        if bytes.is_empty() {
            warn!("document body is empty");
        }
        debug!(bytes = bytes.len(), "downloaded document");
        Ok(bytes)
    }
}
