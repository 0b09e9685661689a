use crate::candidate::ImageCandidate;

// ── Keyword lists ────────────────────────────────────────────────────────────

const NEGATIVE_KEYWORDS: &[&str] = &[
    "product",
    "avatar",
    "thumbnail",
    "banner",
    "ad-",
    "slider",
    "carousel",
    "gallery",
    "icon-",
    "social",
];

const STRONG_KEYWORDS: &[&str] = &[
    "logo",
    "brand-logo",
    "site-logo",
    "company-logo",
    "header-logo",
    "main-logo",
    "navbar-logo",
];

const WEAK_KEYWORDS: &[&str] = &["brand", "company", "header-image", "nav-image"];

// ── Dimension limits ─────────────────────────────────────────────────────────

const MAX_WIDTH: i64 = 400;
const MAX_HEIGHT: i64 = 200;
const MIN_SIDE: i64 = 20;
const MAX_ASPECT: f64 = 4.0;
const MIN_ASPECT: f64 = 0.25;

/// Keyword configuration the classifier closes over.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    pub negative: Vec<String>,
    pub strong: Vec<String>,
    /// Defined alongside the others but not consulted by any rule. Kept as
    /// configuration so a later rule can gate on it explicitly.
    #[allow(dead_code)]
    pub weak: Vec<String>,
}

impl Default for KeywordSet {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            negative: owned(NEGATIVE_KEYWORDS),
            strong: owned(STRONG_KEYWORDS),
            weak: owned(WEAK_KEYWORDS),
        }
    }
}

/// Which rule decided a candidate, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    NegativeKeyword,
    ImplausibleSize,
    StrongKeyword,
    FirstInLandmark,
    NoSignal,
}

impl Verdict {
    pub fn is_logo(self) -> bool {
        matches!(self, Verdict::StrongKeyword | Verdict::FirstInLandmark)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogoClassifier {
    keywords: KeywordSet,
}

impl LogoClassifier {
    pub fn new(keywords: KeywordSet) -> Self {
        Self { keywords }
    }

    pub fn classify(&self, candidate: &ImageCandidate) -> bool {
        self.evaluate(candidate).is_logo()
    }

    /// Run the rules in order; the first one that fires decides.
    pub fn evaluate(&self, candidate: &ImageCandidate) -> Verdict {
        let fields = candidate.signal_fields();

        if any_keyword(&fields, &self.keywords.negative) {
            return Verdict::NegativeKeyword;
        }

        if let (Some(w), Some(h)) = (candidate.width, candidate.height) {
            if !plausible_size(w, h) {
                return Verdict::ImplausibleSize;
            }
        }

        if any_keyword(&fields, &self.keywords.strong) {
            return Verdict::StrongKeyword;
        }

        if candidate.landmark.as_ref().is_some_and(|l| l.first_image) {
            return Verdict::FirstInLandmark;
        }

        Verdict::NoSignal
    }
}

fn any_keyword(fields: &[String], keywords: &[String]) -> bool {
    keywords
        .iter()
        .any(|k| fields.iter().any(|f| f.contains(k.as_str())))
}

fn plausible_size(w: i64, h: i64) -> bool {
    if w > MAX_WIDTH || h > MAX_HEIGHT || w < MIN_SIDE || h < MIN_SIDE {
        return false;
    }
    let aspect = w as f64 / h as f64;
    (MIN_ASPECT..=MAX_ASPECT).contains(&aspect)
}
