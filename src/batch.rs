use std::collections::{HashMap, HashSet};
use std::future::Future;

use futures::stream::{self, StreamExt};

use crate::extract::{ExtractionError, PageExtractor};

pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Site URL → logo URLs for that site.
pub type LogoMap = HashMap<String, Vec<String>>;

/// Trim, drop blanks and drop repeats, keeping first-seen order.
pub fn normalize_urls<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter_map(|u| {
            let trimmed = u.as_ref().trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .filter(|u| seen.insert(u.clone()))
        .collect()
}

/// Extract logos from every site, at most `max_workers` pages in flight.
///
/// The result has one key per distinct non-blank input URL. Sites that
/// failed for any reason map to an empty list.
pub async fn extract_batch<I, S>(extractor: &PageExtractor, urls: I, max_workers: usize) -> LogoMap
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let urls = normalize_urls(urls);
    if urls.is_empty() {
        return LogoMap::new();
    }

    tracing::info!(sites = urls.len(), max_workers, "starting logo extraction batch");
    let results = run_bounded(urls, max_workers, |url| {
        let extractor = extractor.clone();
        async move { extractor.try_extract(&url).await }
    })
    .await;

    let found: usize = results.values().map(Vec::len).sum();
    tracing::info!(sites = results.len(), logos = found, "logo extraction batch finished");
    results
}

/// Run one task per URL on a pool of `max_workers` and collect the results.
///
/// Each task runs on its own tokio task so that a panic is contained to its
/// slot; both errors and panics are recorded as an empty list.
pub async fn run_bounded<F, Fut>(urls: Vec<String>, max_workers: usize, task: F) -> LogoMap
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Vec<String>, ExtractionError>> + Send + 'static,
{
    let workers = max_workers.max(1);

    stream::iter(urls)
        .map(|url| {
            let work = task(url.clone());
            async move {
                let outcome = match tokio::spawn(work).await {
                    Ok(result) => result,
                    Err(join_err) => Err(ExtractionError::Task(join_err.to_string())),
                };
                (url, outcome)
            }
        })
        .buffer_unordered(workers)
        .map(|(url, outcome)| match outcome {
            Ok(logos) => (url, logos),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "error processing site");
                (url, Vec::new())
            }
        })
        .collect()
        .await
}
