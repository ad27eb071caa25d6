//! Drive v3 REST client.
//!
//! Async HTTP client using `reqwest` with Bearer token authentication.
//! Redirects are not followed: the resumable protocol answers non-final
//! chunks with 308, which must reach the caller untouched.

use bytes::Bytes;
use drivedrop_protocol::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_UPLOAD_BASE_URL, ENTRY_FIELDS, FOLDER_MIME_TYPE,
    RESUME_INCOMPLETE,
};
use drivedrop_protocol::{EntryList, EntryMetadata, RemoteEntry};
use reqwest::header::{
    AUTHORIZATION, CONTENT_RANGE, CONTENT_TYPE, HeaderMap, HeaderValue, LOCATION, RANGE,
};
use tracing::debug;

use crate::error::StoreError;
use crate::store::{ByteRange, ChunkOutcome, RemoteStore, SessionEndpoint, StoreFuture};

const PAGE_SIZE: &str = "100";

/// Remote drive client.
pub struct DriveClient {
    http: reqwest::Client,
    api_base: String,
    upload_base: String,
}

impl DriveClient {
    /// Creates a new client with the given OAuth access token.
    pub fn new(access_token: &str) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {access_token}"))
                .map_err(|_| StoreError::InvalidToken)?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            http,
            api_base: DEFAULT_API_BASE_URL.to_string(),
            upload_base: DEFAULT_UPLOAD_BASE_URL.to_string(),
        })
    }

    /// Points the client at different metadata and upload endpoints.
    pub fn with_base_urls(
        mut self,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        self.api_base = api_base.into();
        self.upload_base = upload_base.into();
        self
    }

    async fn list(
        &self,
        parent_id: &str,
        name: Option<&str>,
        folders_only: bool,
    ) -> Result<Vec<RemoteEntry>, StoreError> {
        let url = format!("{}/files", self.api_base);
        let query = build_list_query(parent_id, name, folders_only);
        let fields = format!("nextPageToken,files({ENTRY_FIELDS})");

        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut params = vec![
                ("q", query.clone()),
                ("fields", fields.clone()),
                ("pageSize", PAGE_SIZE.to_string()),
                ("supportsAllDrives", "true".to_string()),
                ("includeItemsFromAllDrives", "true".to_string()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let resp = self.http.get(&url).query(&params).send().await?;
            let body = check_status(resp).await?.bytes().await?;
            let page: EntryList = serde_json::from_slice(&body)?;
            entries.extend(page.files);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(parent = %parent_id, name = ?name, found = entries.len(), "listed entries");
        Ok(entries)
    }

    async fn mkdir(&self, name: &str, parent_id: &str) -> Result<RemoteEntry, StoreError> {
        let url = format!("{}/files", self.api_base);
        let resp = self
            .http
            .post(&url)
            .query(&[("fields", ENTRY_FIELDS), ("supportsAllDrives", "true")])
            .json(&EntryMetadata::folder(name, parent_id))
            .send()
            .await?;
        let body = check_status(resp).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn upload_simple(
        &self,
        name: &str,
        parent_id: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<RemoteEntry, StoreError> {
        let url = format!("{}/files", self.upload_base);
        let metadata = serde_json::to_vec(&EntryMetadata::file(name, parent_id, content_type))?;
        let boundary = format!("drivedrop-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related(&boundary, &metadata, content_type, &data);

        let resp = self
            .http
            .post(&url)
            .query(&[
                ("uploadType", "multipart"),
                ("fields", ENTRY_FIELDS),
                ("supportsAllDrives", "true"),
            ])
            .header(CONTENT_TYPE, format!("multipart/related; boundary={boundary}"))
            .body(body)
            .send()
            .await?;
        let body = check_status(resp).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn open_session(
        &self,
        name: &str,
        parent_id: &str,
        content_type: &str,
        total_size: u64,
    ) -> Result<SessionEndpoint, StoreError> {
        let url = format!("{}/files", self.upload_base);
        let resp = self
            .http
            .post(&url)
            .query(&[
                ("uploadType", "resumable"),
                ("fields", ENTRY_FIELDS),
                ("supportsAllDrives", "true"),
            ])
            .header("X-Upload-Content-Type", content_type)
            .header("X-Upload-Content-Length", total_size.to_string())
            .json(&EntryMetadata::file(name, parent_id, content_type))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::SessionInit(format!("HTTP {}: {body}", status.as_u16())));
        }

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| StoreError::SessionInit("response carried no session location".into()))?;

        Ok(SessionEndpoint::new(location))
    }

    async fn put_chunk(
        &self,
        session: &SessionEndpoint,
        range: ByteRange,
        data: Bytes,
    ) -> Result<ChunkOutcome, StoreError> {
        let resp = self
            .http
            .put(session.as_str())
            .header(CONTENT_RANGE, range.content_range())
            .body(data)
            .send()
            .await?;

        let status = resp.status().as_u16();
        match status {
            RESUME_INCOMPLETE => {
                let committed = resp
                    .headers()
                    .get(RANGE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_committed_range);
                Ok(ChunkOutcome::Continue { committed })
            }
            200 | 201 => {
                let body = resp.bytes().await?;
                Ok(ChunkOutcome::Complete(serde_json::from_slice(&body)?))
            }
            _ => {
                let body = resp.text().await.unwrap_or_default();
                Ok(ChunkOutcome::Error { status, body })
            }
        }
    }
}

impl RemoteStore for DriveClient {
    fn list_entries<'a>(
        &'a self,
        parent_id: &'a str,
        name: Option<&'a str>,
        folders_only: bool,
    ) -> StoreFuture<'a, Vec<RemoteEntry>> {
        Box::pin(self.list(parent_id, name, folders_only))
    }

    fn create_folder<'a>(
        &'a self,
        name: &'a str,
        parent_id: &'a str,
    ) -> StoreFuture<'a, RemoteEntry> {
        Box::pin(self.mkdir(name, parent_id))
    }

    fn create_file_simple<'a>(
        &'a self,
        name: &'a str,
        parent_id: &'a str,
        content_type: &'a str,
        data: Bytes,
    ) -> StoreFuture<'a, RemoteEntry> {
        Box::pin(self.upload_simple(name, parent_id, content_type, data))
    }

    fn begin_resumable_session<'a>(
        &'a self,
        name: &'a str,
        parent_id: &'a str,
        content_type: &'a str,
        total_size: u64,
    ) -> StoreFuture<'a, SessionEndpoint> {
        Box::pin(self.open_session(name, parent_id, content_type, total_size))
    }

    fn send_chunk<'a>(
        &'a self,
        session: &'a SessionEndpoint,
        range: ByteRange,
        data: Bytes,
    ) -> StoreFuture<'a, ChunkOutcome> {
        Box::pin(self.put_chunk(session, range, data))
    }
}

/// Passes a success response through, classifying everything else.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::from_status(status.as_u16(), body))
}

/// Builds the `q` parameter of a list call.
fn build_list_query(parent_id: &str, name: Option<&str>, folders_only: bool) -> String {
    let mut q = format!("'{}' in parents and trashed = false", escape_query_value(parent_id));
    if let Some(name) = name {
        q.push_str(&format!(" and name = '{}'", escape_query_value(name)));
    }
    if folders_only {
        q.push_str(&format!(" and mimeType = '{FOLDER_MIME_TYPE}'"));
    }
    q
}

/// Escapes a string literal for the drive query language.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Parses a `Range: bytes=0-N` header into the next offset to send (N + 1).
fn parse_committed_range(value: &str) -> Option<u64> {
    let (_, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    end.trim().parse::<u64>().ok().map(|n| n + 1)
}

/// Builds a `multipart/related` body: JSON metadata part, then content part.
fn multipart_related(boundary: &str, metadata: &[u8], content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + metadata.len() + 256);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{boundary}\r\nContent-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
