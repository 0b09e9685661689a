use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::candidate::{parse_dimension, ImageCandidate, Landmark, LandmarkKind, ParentInfo};
use crate::classify::LogoClassifier;
use crate::dom::{Document, Element};

// ── Constants ────────────────────────────────────────────────────────────────

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const LANDMARK_TAGS: &[&str] = &["header", "nav"];

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("{0}")]
    InvalidUrl(String),
    #[error("Upstream returned status {0}")]
    Upstream(u16),
    #[error("{0}")]
    Request(String),
    #[error("extraction task failed: {0}")]
    Task(String),
}

// ── HTTP client ──────────────────────────────────────────────────────────────

/// Build the process-wide client used for page and image fetches.
pub fn build_client(timeout: Duration, insecure: bool) -> Result<reqwest::Client, ExtractionError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        reqwest::header::HeaderValue::from_static("en-US,en;q=0.9"),
    );

    let mut builder = reqwest::ClientBuilder::new()
        .connect_timeout(Duration::from_secs(5).min(timeout))
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .user_agent(USER_AGENT)
        .default_headers(headers);

    if insecure {
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder
        .build()
        .map_err(|e| ExtractionError::Request(e.to_string()))
}

// ── URL validation ───────────────────────────────────────────────────────────

pub fn validate_url(url: &str) -> Result<Url, ExtractionError> {
    let parsed = Url::parse(url)
        .map_err(|e| ExtractionError::InvalidUrl(format!("Invalid URL {url:?}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ExtractionError::InvalidUrl(format!(
            "Unsupported scheme {other:?} in {url:?}"
        ))),
    }
}

// ── HTTP fetch ───────────────────────────────────────────────────────────────

async fn fetch_html(client: &reqwest::Client, url: &Url) -> Result<String, ExtractionError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(request_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ExtractionError::Upstream(status.as_u16()));
    }

    response.text().await.map_err(request_error)
}

pub(crate) fn request_error(e: reqwest::Error) -> ExtractionError {
    if e.is_timeout() {
        ExtractionError::Request(format!("TimeoutError: {}", e))
    } else if e.is_connect() {
        ExtractionError::Request(format!("ConnectError: {}", e))
    } else {
        ExtractionError::Request(format!("RequestError: {}", e))
    }
}

// ── Page extractor ───────────────────────────────────────────────────────────

/// Fetches one page and returns the logo URLs found on it.
#[derive(Clone)]
pub struct PageExtractor {
    client: reqwest::Client,
    classifier: Arc<LogoClassifier>,
}

impl PageExtractor {
    pub fn new(client: reqwest::Client, classifier: LogoClassifier) -> Self {
        Self {
            client,
            classifier: Arc::new(classifier),
        }
    }

    /// Logo URLs for `url`, or an empty list when anything goes wrong.
    pub async fn extract(&self, url: &str) -> Vec<String> {
        match self.try_extract(url).await {
            Ok(logos) => logos,
            Err(e) => {
                tracing::warn!(url, error = %e, "error processing page");
                Vec::new()
            }
        }
    }

    pub async fn try_extract(&self, url: &str) -> Result<Vec<String>, ExtractionError> {
        let page = validate_url(url)?;
        let html = fetch_html(&self.client, &page).await?;
        let logos = logos_from_html(&html, &page, &self.classifier);
        tracing::debug!(url, count = logos.len(), "page classified");
        Ok(logos)
    }
}

// ── Candidate pipeline ───────────────────────────────────────────────────────

/// Classify every image on the page; accepted absolute URLs in first-seen order.
pub fn logos_from_html(html: &str, page: &Url, classifier: &LogoClassifier) -> Vec<String> {
    let document = Document::parse(html);
    let mut seen: HashSet<String> = HashSet::new();
    let mut logos = Vec::new();

    for img in document.images() {
        let Some(candidate) = build_candidate(img, page) else {
            continue;
        };
        let verdict = classifier.evaluate(&candidate);
        tracing::debug!(
            page = %candidate.page_url,
            src = %candidate.src,
            parent = candidate.parent.as_ref().map(|p| p.tag.as_str()),
            landmark = ?candidate.landmark.as_ref().map(|l| l.kind),
            ?verdict,
            "candidate evaluated"
        );
        if !verdict.is_logo() {
            continue;
        }
        let absolute = candidate.absolute_url.to_string();
        if seen.insert(absolute.clone()) {
            logos.push(absolute);
        }
    }

    logos
}

/// Snapshot an `<img>` element into a candidate. `None` when it has no
/// resolvable `src`.
pub fn build_candidate(img: Element<'_>, page: &Url) -> Option<ImageCandidate> {
    let mut candidate = ImageCandidate::new(img.attr("src")?, page)?;

    candidate.alt = img.attr("alt").map(str::to_string);
    candidate.classes = img.classes();
    candidate.id = img.id().map(str::to_string);
    candidate.width = img.attr("width").and_then(parse_dimension);
    candidate.height = img.attr("height").and_then(parse_dimension);
    candidate.parent = img.parent().map(|p| ParentInfo {
        tag: p.tag().to_string(),
        classes: p.classes(),
        id: p.id().map(str::to_string),
    });
    candidate.landmark = img.closest(LANDMARK_TAGS).and_then(|landmark| {
        let kind = LandmarkKind::from_tag(landmark.tag())?;
        Some(Landmark {
            kind,
            first_image: landmark.images().next() == Some(img),
        })
    });

    Some(candidate)
}
