use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

/// `urls` may be a list or a single newline-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UrlInput {
    Many(Vec<String>),
    One(String),
}

impl UrlInput {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            UrlInput::Many(urls) => urls,
            UrlInput::One(text) => text.lines().map(str::to_string).collect(),
        }
    }
}

impl Default for UrlInput {
    fn default() -> Self {
        UrlInput::Many(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    #[serde(default)]
    pub urls: UrlInput,
    pub max_workers: Option<usize>,
}

/// Brand/site name → image URLs to pack under that name.
pub type DownloadAllRequest = BTreeMap<String, Vec<String>>;

#[derive(Debug, Deserialize)]
pub struct DownloadImageRequest {
    pub url: Option<String>,
    pub brand_name: Option<String>,
    /// Number or string in practice.
    pub index: Option<Value>,
}

impl DownloadImageRequest {
    pub fn index_label(&self) -> Option<String> {
        match self.index.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
