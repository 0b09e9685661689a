use std::num::IntErrorKind;

use url::Url;

/// Which structural landmark an image sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkKind {
    Header,
    Nav,
}

impl LandmarkKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "header" => Some(Self::Header),
            "nav" => Some(Self::Nav),
            _ => None,
        }
    }
}

/// Nearest `<header>`/`<nav>` ancestor of a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Landmark {
    pub kind: LandmarkKind,
    /// True when the candidate is the first `<img>` (document order) inside
    /// this landmark, counting images without a `src` too.
    pub first_image: bool,
}

/// The element directly enclosing the image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentInfo {
    pub tag: String,
    pub classes: Vec<String>,
    pub id: Option<String>,
}

/// One `<img>` discovered on a page.
///
/// Only `src` and the owning page are mandatory; elements without a
/// resolvable `src` never become candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    /// Raw `src` attribute as written in the markup.
    pub src: String,
    /// `src` resolved against `page_url`.
    pub absolute_url: Url,
    pub page_url: Url,
    pub alt: Option<String>,
    pub classes: Vec<String>,
    pub id: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub parent: Option<ParentInfo>,
    pub landmark: Option<Landmark>,
}

impl ImageCandidate {
    /// Minimal candidate: resolves `src` against `page_url`, everything else empty.
    pub fn new(src: &str, page_url: &Url) -> Option<Self> {
        let trimmed = src.trim();
        if trimmed.is_empty() {
            return None;
        }
        let absolute_url = page_url.join(trimmed).ok()?;
        Some(Self {
            src: src.to_string(),
            absolute_url,
            page_url: page_url.clone(),
            alt: None,
            classes: Vec::new(),
            id: None,
            width: None,
            height: None,
            parent: None,
            landmark: None,
        })
    }

    /// The six lowercase text fields keyword rules are matched against:
    /// src, alt, class list, id, parent class list, parent id.
    pub fn signal_fields(&self) -> [String; 6] {
        let parent_classes = self
            .parent
            .as_ref()
            .map(|p| p.classes.join(" "))
            .unwrap_or_default();
        let parent_id = self
            .parent
            .as_ref()
            .and_then(|p| p.id.clone())
            .unwrap_or_default();
        [
            self.src.to_lowercase(),
            self.alt.as_deref().unwrap_or("").to_lowercase(),
            self.classes.join(" ").to_lowercase(),
            self.id.as_deref().unwrap_or("").to_lowercase(),
            parent_classes.to_lowercase(),
            parent_id.to_lowercase(),
        ]
    }
}

/// Parse a `width`/`height` attribute such as `"120"`, `"120px"` or `" 64 px"`.
///
/// Returns `None` for anything that isn't an integer once trailing `p`/`x`
/// characters are stripped. Integers beyond `i64` saturate so the size
/// limits still reject them.
pub fn parse_dimension(raw: &str) -> Option<i64> {
    let stripped = raw.trim().trim_end_matches(['p', 'x']).trim();
    if stripped.is_empty() {
        return None;
    }
    match stripped.parse::<i64>() {
        Ok(value) => Some(value),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("http://example.com/about").unwrap()
    }

    #[test]
    fn relative_src_resolves_against_page() {
        let c = ImageCandidate::new("/img/logo.png", &page()).unwrap();
        assert_eq!(c.absolute_url.as_str(), "http://example.com/img/logo.png");
        assert_eq!(c.src, "/img/logo.png");
    }

    #[test]
    fn blank_src_is_not_a_candidate() {
        assert!(ImageCandidate::new("", &page()).is_none());
        assert!(ImageCandidate::new("   ", &page()).is_none());
    }

    #[test]
    fn dimensions_strip_units() {
        assert_eq!(parse_dimension("120"), Some(120));
        assert_eq!(parse_dimension("120px"), Some(120));
        assert_eq!(parse_dimension(" 64 px "), Some(64));
        assert_eq!(parse_dimension("-5"), Some(-5));
    }

    #[test]
    fn oversized_dimensions_saturate() {
        assert_eq!(parse_dimension("99999999999999999999"), Some(i64::MAX));
        assert_eq!(parse_dimension("99999999999999999999px"), Some(i64::MAX));
        assert_eq!(parse_dimension("-99999999999999999999"), Some(i64::MIN));
    }

    #[test]
    fn malformed_dimensions_are_unknown() {
        assert_eq!(parse_dimension(""), None);
        assert_eq!(parse_dimension("auto"), None);
        assert_eq!(parse_dimension("50%"), None);
        assert_eq!(parse_dimension("12.5"), None);
    }

    #[test]
    fn signal_fields_are_lowercase() {
        let mut c = ImageCandidate::new("/A/Logo.PNG", &page()).unwrap();
        c.alt = Some("ACME".into());
        c.classes = vec!["Site-Logo".into(), "Big".into()];
        c.parent = Some(ParentInfo {
            tag: "a".into(),
            classes: vec!["Brand".into()],
            id: Some("Home".into()),
        });
        let fields = c.signal_fields();
        assert_eq!(fields[0], "/a/logo.png");
        assert_eq!(fields[1], "acme");
        assert_eq!(fields[2], "site-logo big");
        assert_eq!(fields[3], "");
        assert_eq!(fields[4], "brand");
        assert_eq!(fields[5], "home");
    }
}
