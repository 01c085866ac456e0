//! Authenticated Confluence Cloud REST client.
//!
//! The client verifies the session at construction time, resolves the target
//! space, then pages through the space's content with `body.storage`
//! expansion. Text attachments can be downloaded alongside their owning page.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use confeed_shared::{ConfeedError, ContentSource, Document, LoadOptions, Result};

use crate::text::storage_to_text;

/// User-Agent string for Confluence requests.
const USER_AGENT: &str = concat!("confeed/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Connection parameters for a Confluence instance.
#[derive(Debug, Clone)]
pub struct ConfluenceConfig {
    /// Base URL of the instance (e.g. `https://example.atlassian.net/wiki/`).
    pub base_url: Url,
    /// Account username (usually an email address).
    pub username: String,
    /// API token used as the basic-auth password.
    pub api_key: String,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ContentList {
    results: Vec<ContentPage>,
}

#[derive(Debug, Deserialize)]
struct ContentPage {
    id: String,
    title: String,
    #[serde(default)]
    body: Option<PageBody>,
    #[serde(rename = "_links", default)]
    links: Option<ContentLinks>,
}

#[derive(Debug, Deserialize)]
struct PageBody {
    #[serde(default)]
    storage: Option<StorageBody>,
}

#[derive(Debug, Deserialize)]
struct StorageBody {
    value: String,
}

#[derive(Debug, Deserialize)]
struct ContentLinks {
    #[serde(default)]
    webui: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttachmentList {
    results: Vec<Attachment>,
}

#[derive(Debug, Deserialize)]
struct Attachment {
    title: String,
    #[serde(default)]
    metadata: Option<AttachmentMetadata>,
    #[serde(rename = "_links", default)]
    links: Option<AttachmentLinks>,
}

#[derive(Debug, Deserialize)]
struct AttachmentMetadata {
    #[serde(rename = "mediaType", default)]
    media_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttachmentLinks {
    #[serde(default)]
    download: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// An authenticated session against one Confluence instance.
pub struct ConfluenceClient {
    config: ConfluenceConfig,
    client: Client,
}

impl ConfluenceClient {
    /// Build the HTTP client and verify that the credentials establish a
    /// session. Fails with [`ConfeedError::Auth`] on 401/403.
    pub async fn connect(config: ConfluenceConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfeedError::Network(format!("failed to build HTTP client: {e}")))?;

        let config = ConfluenceConfig {
            base_url: ensure_trailing_slash(config.base_url),
            ..config
        };

        let this = Self { config, client };
        this.verify_session().await?;
        Ok(this)
    }

    /// `GET rest/api/user/current` — cheap credential check before any
    /// space access.
    async fn verify_session(&self) -> Result<()> {
        let url = self.api_url("rest/api/user/current")?;
        let response = self.get(&url).await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ConfeedError::Auth(format!(
                "credentials rejected by {}",
                self.config.base_url
            ))),
            status if !status.is_success() => Err(ConfeedError::Api {
                status: status.as_u16(),
                message: format!("session check failed against {url}"),
            }),
            _ => {
                debug!(base_url = %self.config.base_url, user = %self.config.username, "session verified");
                Ok(())
            }
        }
    }

    /// `GET rest/api/space/{key}` — 404 means the key does not resolve.
    async fn verify_space(&self, space_key: &str) -> Result<()> {
        let url = self.api_url(&format!("rest/api/space/{space_key}"))?;
        let response = self.get(&url).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ConfeedError::SpaceNotFound {
                space_key: space_key.to_string(),
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ConfeedError::Auth(format!(
                "no permission to read space {space_key}"
            ))),
            status if !status.is_success() => Err(ConfeedError::Api {
                status: status.as_u16(),
                message: format!("space lookup failed for {space_key}"),
            }),
            _ => Ok(()),
        }
    }

    /// Fetch one batch of pages with storage-format bodies expanded.
    async fn fetch_batch(&self, space_key: &str, start: u32, limit: u32) -> Result<ContentList> {
        let mut url = self.api_url("rest/api/content")?;
        url.query_pairs_mut()
            .append_pair("spaceKey", space_key)
            .append_pair("type", "page")
            .append_pair("status", "current")
            .append_pair("expand", "body.storage")
            .append_pair("limit", &limit.to_string())
            .append_pair("start", &start.to_string());

        debug!(space_key, start, limit, "fetching content batch");

        let response = self.get(&url).await?;
        let response = self.check_status(response, "content listing")?;

        response
            .json::<ContentList>()
            .await
            .map_err(|e| ConfeedError::parse(format!("content listing: {e}")))
    }

    /// List a page's attachments and download the text ones.
    ///
    /// Non-text media types are skipped; extracting binary formats would
    /// need external tooling and is out of scope.
    async fn load_attachments(&self, page_id: &str, page_title: &str) -> Result<Vec<Document>> {
        let url = self.api_url(&format!("rest/api/content/{page_id}/child/attachment"))?;
        let response = self.get(&url).await?;
        let response = self.check_status(response, "attachment listing")?;

        let list = response
            .json::<AttachmentList>()
            .await
            .map_err(|e| ConfeedError::parse(format!("attachment listing: {e}")))?;

        let mut documents = Vec::new();

        for attachment in list.results {
            let media_type = attachment
                .metadata
                .as_ref()
                .and_then(|m| m.media_type.as_deref())
                .unwrap_or("application/octet-stream");

            if !media_type.starts_with("text/") {
                debug!(
                    page_title,
                    attachment = %attachment.title,
                    media_type,
                    "skipping non-text attachment"
                );
                continue;
            }

            let Some(download) = attachment.links.as_ref().and_then(|l| l.download.as_deref())
            else {
                warn!(attachment = %attachment.title, "attachment has no download link");
                continue;
            };

            let download_url = self.download_url(download);
            let response = self.get_raw(&download_url).await?;
            let response = self.check_status(response, "attachment download")?;

            let content = response
                .text()
                .await
                .map_err(|e| ConfeedError::Network(format!("{download_url}: {e}")))?;

            documents.push(Document {
                source: download_url,
                title: Some(attachment.title),
                content,
                fetched_at: Utc::now(),
            });
        }

        Ok(documents)
    }

    // -- request plumbing ---------------------------------------------------

    fn api_url(&self, path: &str) -> Result<Url> {
        self.config
            .base_url
            .join(path)
            .map_err(|e| ConfeedError::config(format!("invalid API path {path}: {e}")))
    }

    /// Attachment download links are relative to the instance root including
    /// any context path, so plain `Url::join` would drop it.
    fn download_url(&self, download: &str) -> String {
        format!(
            "{}{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            download
        )
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response> {
        self.get_raw(url.as_str()).await
    }

    async fn get_raw(&self, url: &str) -> Result<reqwest::Response> {
        self.client
            .get(url)
            .basic_auth(&self.config.username, Some(&self.config.api_key))
            .send()
            .await
            .map_err(|e| ConfeedError::Network(format!("{url}: {e}")))
    }

    /// Map non-success statuses to the error taxonomy.
    fn check_status(
        &self,
        response: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ConfeedError::Auth(format!("{context}: HTTP {status}")))
            }
            s if !s.is_success() => Err(ConfeedError::Api {
                status: s.as_u16(),
                message: context.to_string(),
            }),
            _ => Ok(response),
        }
    }
}

impl ContentSource for ConfluenceClient {
    /// Retrieve all pages of `space_key` (and their text attachments when
    /// requested), in API return order, up to the `max_pages` ceiling.
    #[instrument(skip_all, fields(space_key = %space_key))]
    async fn load(&self, space_key: &str, opts: &LoadOptions) -> Result<Vec<Document>> {
        self.verify_space(space_key).await?;

        let mut documents = Vec::new();
        let mut start: u32 = 0;
        let mut pages_retrieved: u32 = 0;

        'batches: loop {
            if pages_retrieved >= opts.max_pages {
                warn!(
                    max_pages = opts.max_pages,
                    "page ceiling reached, stopping retrieval"
                );
                break;
            }

            let batch = self.fetch_batch(space_key, start, opts.limit).await?;
            let batch_len = batch.results.len();

            if batch_len == 0 {
                break;
            }

            for page in batch.results {
                if pages_retrieved >= opts.max_pages {
                    break 'batches;
                }
                pages_retrieved += 1;

                let content = page
                    .body
                    .as_ref()
                    .and_then(|b| b.storage.as_ref())
                    .map(|s| storage_to_text(&s.value))
                    .unwrap_or_default();

                let source = page
                    .links
                    .as_ref()
                    .and_then(|l| l.webui.as_deref())
                    .map(|webui| self.download_url(webui))
                    .unwrap_or_else(|| self.download_url(&format!("/rest/api/content/{}", page.id)));

                documents.push(Document {
                    source,
                    title: Some(page.title.clone()),
                    content,
                    fetched_at: Utc::now(),
                });

                if opts.include_attachments {
                    let attachments = self.load_attachments(&page.id, &page.title).await?;
                    documents.extend(attachments);
                }
            }

            // A short batch means the listing is exhausted.
            if batch_len < opts.limit as usize {
                break;
            }
            start += batch_len as u32;
        }

        info!(
            space_key,
            pages = pages_retrieved,
            documents = documents.len(),
            "space loaded"
        );

        Ok(documents)
    }
}

/// `Url::join` treats a path without a trailing slash as a file, which would
/// drop context paths like `/wiki`.
fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> ConfluenceConfig {
        ConfluenceConfig {
            base_url: Url::parse(&server.uri()).unwrap(),
            username: "ops@example.com".into(),
            api_key: "token-123".into(),
            timeout_secs: 5,
        }
    }

    async fn mount_session_ok(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/rest/api/user/current"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "type": "known",
                "username": "ops@example.com",
            })))
            .mount(server)
            .await;
    }

    async fn mount_space_ok(server: &MockServer, key: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/rest/api/space/{key}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "key": key,
                "name": "Test Space",
            })))
            .mount(server)
            .await;
    }

    fn page_json(id: &str, title: &str, body_html: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "title": title,
            "body": { "storage": { "value": body_html, "representation": "storage" } },
            "_links": { "webui": format!("/spaces/TEST/pages/{id}") },
        })
    }

    #[tokio::test]
    async fn connect_rejects_bad_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/user/current"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = ConfluenceClient::connect(test_config(&server))
            .await
            .err()
            .expect("connect should fail");
        assert!(matches!(err, ConfeedError::Auth(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn connect_verifies_session() {
        let server = MockServer::start().await;
        mount_session_ok(&server).await;

        ConfluenceClient::connect(test_config(&server))
            .await
            .expect("connect should succeed");
    }

    #[tokio::test]
    async fn unknown_space_is_not_found() {
        let server = MockServer::start().await;
        mount_session_ok(&server).await;
        Mock::given(method("GET"))
            .and(path("/rest/api/space/NOPE"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ConfluenceClient::connect(test_config(&server)).await.unwrap();
        let err = client
            .load("NOPE", &LoadOptions::default())
            .await
            .err()
            .expect("load should fail");
        assert!(
            matches!(err, ConfeedError::SpaceNotFound { ref space_key } if space_key == "NOPE"),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn empty_space_yields_no_documents() {
        let server = MockServer::start().await;
        mount_session_ok(&server).await;
        mount_space_ok(&server, "EMPTY").await;
        Mock::given(method("GET"))
            .and(path("/rest/api/content"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "results": [], "size": 0 })),
            )
            .mount(&server)
            .await;

        let client = ConfluenceClient::connect(test_config(&server)).await.unwrap();
        let docs = client.load("EMPTY", &LoadOptions::default()).await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn load_paginates_in_order() {
        let server = MockServer::start().await;
        mount_session_ok(&server).await;
        mount_space_ok(&server, "ENG").await;

        // Full first batch, short second batch.
        Mock::given(method("GET"))
            .and(path("/rest/api/content"))
            .and(query_param("start", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    page_json("1", "Alpha", "<p>first page</p>"),
                    page_json("2", "Beta", "<p>second page</p>"),
                ],
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/api/content"))
            .and(query_param("start", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [page_json("3", "Gamma", "<p>third page</p>")],
            })))
            .mount(&server)
            .await;

        let client = ConfluenceClient::connect(test_config(&server)).await.unwrap();
        let opts = LoadOptions {
            include_attachments: false,
            limit: 2,
            max_pages: 100,
        };
        let docs = client.load("ENG", &opts).await.unwrap();

        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].content, "first page");
        assert_eq!(docs[1].content, "second page");
        assert_eq!(docs[2].content, "third page");
        assert_eq!(docs[0].title.as_deref(), Some("Alpha"));
        assert!(docs[0].source.ends_with("/spaces/TEST/pages/1"));
    }

    #[tokio::test]
    async fn page_ceiling_stops_retrieval() {
        let server = MockServer::start().await;
        mount_session_ok(&server).await;
        mount_space_ok(&server, "BIG").await;

        // Only the first batch is mocked; hitting start=1 would 404 and the
        // test would fail, so the ceiling must stop further requests.
        Mock::given(method("GET"))
            .and(path("/rest/api/content"))
            .and(query_param("start", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [page_json("1", "Only", "<p>kept</p>")],
            })))
            .mount(&server)
            .await;

        let client = ConfluenceClient::connect(test_config(&server)).await.unwrap();
        let opts = LoadOptions {
            include_attachments: false,
            limit: 1,
            max_pages: 1,
        };
        let docs = client.load("BIG", &opts).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "kept");
    }

    #[tokio::test]
    async fn text_attachments_follow_their_page() {
        let server = MockServer::start().await;
        mount_session_ok(&server).await;
        mount_space_ok(&server, "ENG").await;

        Mock::given(method("GET"))
            .and(path("/rest/api/content"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [page_json("42", "Runbook", "<p>page body</p>")],
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/api/content/42/child/attachment"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {
                        "title": "notes.txt",
                        "metadata": { "mediaType": "text/plain" },
                        "_links": { "download": "/download/attachments/42/notes.txt" },
                    },
                    {
                        "title": "diagram.png",
                        "metadata": { "mediaType": "image/png" },
                        "_links": { "download": "/download/attachments/42/diagram.png" },
                    },
                ],
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/download/attachments/42/notes.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("attached notes"))
            .mount(&server)
            .await;

        let client = ConfluenceClient::connect(test_config(&server)).await.unwrap();
        let opts = LoadOptions {
            include_attachments: true,
            limit: 50,
            max_pages: 100,
        };
        let docs = client.load("ENG", &opts).await.unwrap();

        // Page first, then its text attachment; the PNG is skipped.
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].content, "page body");
        assert_eq!(docs[1].content, "attached notes");
        assert_eq!(docs[1].title.as_deref(), Some("notes.txt"));
    }

    #[test]
    fn trailing_slash_is_preserved_for_context_paths() {
        let url = ensure_trailing_slash(Url::parse("https://example.atlassian.net/wiki").unwrap());
        assert_eq!(url.as_str(), "https://example.atlassian.net/wiki/");
        assert_eq!(
            url.join("rest/api/content").unwrap().as_str(),
            "https://example.atlassian.net/wiki/rest/api/content"
        );
    }
}
