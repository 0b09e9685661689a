use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use futures::stream::{self, StreamExt};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::extract::{request_error, validate_url, ExtractionError};

const DEFAULT_CONTENT_TYPE: &str = "image/png";
const DEFAULT_EXTENSION: &str = "png";
const DEFAULT_NAME: &str = "logo";
const MAX_EXTENSION_LEN: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct ImageFile {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub extension: String,
}

/// Fetch one discovered image with the shared browser-like client.
pub async fn fetch_image(client: &reqwest::Client, url: &str) -> Result<ImageFile, ExtractionError> {
    let parsed = validate_url(url)?;
    let response = client.get(parsed).send().await.map_err(request_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ExtractionError::Upstream(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let extension = infer_extension(url, content_type.as_deref());
    let bytes = response.bytes().await.map_err(request_error)?.to_vec();

    Ok(ImageFile {
        bytes,
        content_type: content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        extension,
    })
}

/// File extension from the URL path, else the content-type subtype, else `png`.
pub fn infer_extension(url: &str, content_type: Option<&str>) -> String {
    let from_url = url
        .rsplit('.')
        .next()
        .and_then(|seg| seg.split('?').next())
        .unwrap_or("");
    if !from_url.is_empty() && from_url.chars().count() <= MAX_EXTENSION_LEN {
        return from_url.to_string();
    }

    content_type
        .and_then(|ct| ct.split_once('/'))
        .map(|(_, subtype)| subtype.to_string())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Filesystem-safe form of a user-supplied brand/site name.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// `<brand>[-<index>].<ext>`
pub fn attachment_filename(brand: &str, index: Option<&str>, extension: &str) -> String {
    let brand = sanitize_name(brand);
    let extension = sanitize_name(extension);
    match index.map(str::trim).filter(|i| !i.is_empty()) {
        Some(index) => format!("{}-{}.{}", brand, sanitize_name(index), extension),
        None => format!("{}.{}", brand, extension),
    }
}

// ── Bulk archive ─────────────────────────────────────────────────────────────

/// Name of the `index`-th (zero-based) of `count` files inside a brand folder:
/// `logo.ext` when the brand has one image, `logo-N.ext` otherwise.
pub fn archive_entry_name(folder: &str, index: usize, count: usize, extension: &str) -> String {
    let extension = sanitize_name(extension);
    if count > 1 {
        format!("{}/logo-{}.{}", folder, index + 1, extension)
    } else {
        format!("{}/logo.{}", folder, extension)
    }
}

/// Fetch every image and pack them into a zip, one folder per brand.
///
/// Images that cannot be fetched are logged and left out. At most
/// `max_workers` downloads run at once.
pub async fn build_archive(
    client: &reqwest::Client,
    logos: &BTreeMap<String, Vec<String>>,
    max_workers: usize,
) -> Result<Vec<u8>, ArchiveError> {
    let jobs: Vec<(String, usize, usize, String)> = logos
        .iter()
        .flat_map(|(brand, urls)| {
            let folder = sanitize_name(brand);
            let count = urls.len();
            urls.iter()
                .enumerate()
                .map(move |(index, url)| (folder.clone(), index, count, url.clone()))
        })
        .collect();

    let fetched: Vec<_> = stream::iter(jobs)
        .map(|(folder, index, count, url)| async move {
            let result = fetch_image(client, &url).await;
            (folder, index, count, url, result)
        })
        .buffered(max_workers.max(1))
        .collect()
        .await;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut written = 0usize;

    for (folder, index, count, url, result) in fetched {
        match result {
            Ok(image) => {
                let name = archive_entry_name(&folder, index, count, &image.extension);
                // images are already compressed
                let options =
                    SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
                writer.start_file(name, options)?;
                writer.write_all(&image.bytes)?;
                written += 1;
            }
            Err(e) => tracing::warn!(url, error = %e, "error downloading image for archive"),
        }
    }

    let cursor = writer.finish()?;
    tracing::info!(brands = logos.len(), files = written, "archive built");
    Ok(cursor.into_inner())
}
