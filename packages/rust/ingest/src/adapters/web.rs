use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument, warn};
use url::Url;

use meetnotes_shared::{FetchConfig, MeetNotesError, Result};

use super::pdf::PdfTextExtractor;
use super::{Extraction, WebFetcher};

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("meetnotes/", env!("CARGO_PKG_VERSION"));

/// Note attached when only the tag-stripped body could be recovered.
const FALLBACK_NOTE: &str = "page structure could not be converted; kept visible text only";

/// Fetches a single URL over HTTP(S) and reduces it to readable text.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MeetNotesError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl WebFetcher for HttpFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &str) -> Result<Extraction> {
        let parsed = Url::parse(url)
            .map_err(|e| MeetNotesError::Ingestion(format!("invalid URL: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(MeetNotesError::Ingestion(format!(
                "unsupported URL scheme `{}`",
                parsed.scheme()
            )));
        }

        let response = self
            .client
            .get(parsed.as_str())
            .send()
            .await
            .map_err(|e| MeetNotesError::Ingestion(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MeetNotesError::Ingestion(format!("HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        debug!(%status, %content_type, "response received");

        if content_type.starts_with("application/pdf") {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| MeetNotesError::Ingestion(format!("body read failed: {e}")))?;
            return PdfTextExtractor::extract_bytes(bytes.to_vec()).await;
        }

        let body = response
            .text()
            .await
            .map_err(|e| MeetNotesError::Ingestion(format!("body read failed: {e}")))?;

        if is_html(&content_type, &body) {
            Ok(html_extraction(&body, parsed.as_str()))
        } else if content_type.is_empty() || content_type.starts_with("text/") {
            Ok(Extraction::complete(body))
        } else {
            Err(MeetNotesError::Ingestion(format!(
                "unsupported content type `{content_type}`"
            )))
        }
    }
}

fn is_html(content_type: &str, body: &str) -> bool {
    if content_type.contains("html") {
        return true;
    }
    // Some servers label HTML as text/plain.
    let head = body
        .trim_start()
        .chars()
        .take(15)
        .collect::<String>()
        .to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

/// Main-content conversion first; tag-stripped body as a lossy fallback.
fn html_extraction(html: &str, url: &str) -> Extraction {
    match meetnotes_markdown::html_to_text(html, url) {
        Ok(page) if page.word_count > 0 => Extraction::complete(page.text),
        Ok(_) => {
            debug!("main-content conversion was empty, falling back to visible text");
            Extraction::lossy(meetnotes_markdown::strip_tags(html), FALLBACK_NOTE)
        }
        Err(e) => {
            warn!(error = %e, "conversion failed, falling back to visible text");
            Extraction::lossy(meetnotes_markdown::strip_tags(html), FALLBACK_NOTE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&FetchConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn html_page_is_converted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notes"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(
                    "<html><body><nav>Menu</nav><main><h1>Standup</h1>\
                     <p>We decided to freeze the API.</p></main></body></html>",
                    "text/html; charset=utf-8",
                ),
            )
            .mount(&server)
            .await;

        let ex = fetcher().fetch(&format!("{}/notes", server.uri())).await.unwrap();
        assert!(ex.text.contains("We decided to freeze the API."));
        assert!(!ex.text.contains("Menu"));
        assert!(ex.lossy.is_none());
    }

    #[tokio::test]
    async fn plain_text_passes_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notes.txt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("Decision: ship v2"),
            )
            .mount(&server)
            .await;

        let ex = fetcher().fetch(&format!("{}/notes.txt", server.uri())).await.unwrap();
        assert_eq!(ex.text, "Decision: ship v2");
        assert!(ex.lossy.is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher().fetch(&format!("{}/gone", server.uri())).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn non_http_scheme_is_rejected() {
        let err = fetcher().fetch("file:///etc/passwd").await.unwrap_err();
        assert!(err.to_string().contains("unsupported URL scheme"));
    }

    #[tokio::test]
    async fn unparseable_url_is_rejected() {
        let err = fetcher().fetch("not a url").await.unwrap_err();
        assert!(err.to_string().contains("invalid URL"));
    }

    #[test]
    fn empty_main_content_falls_back_to_visible_text() {
        let html = "<html><body><main></main><div>Owner: Kim</div></body></html>";
        let ex = html_extraction(html, "https://example.com/");
        assert!(ex.text.contains("Owner: Kim"));
        assert_eq!(ex.lossy.as_deref(), Some(FALLBACK_NOTE));
    }

    #[test]
    fn sniffs_html_without_content_type() {
        assert!(is_html("", "  <!DOCTYPE html><html></html>"));
        assert!(is_html("text/plain", "<html><body>x</body></html>"));
        assert!(!is_html("", "Just notes"));
        assert!(is_html("application/xhtml+xml", "x"));
    }
}
