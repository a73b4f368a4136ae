//! Core data types for scrape requests, rendered pages and responses.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::renderer::RenderError;

/// A content category that can be extracted from a rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Links,
    Paragraphs,
    Images,
    Headers,
    Emails,
}

impl Category {
    /// Every category, in response field order.
    pub const ALL: [Category; 5] = [
        Category::Links,
        Category::Paragraphs,
        Category::Images,
        Category::Headers,
        Category::Emails,
    ];

    fn bit(self) -> u8 {
        1 << self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Links => "links",
            Category::Paragraphs => "paragraphs",
            Category::Images => "images",
            Category::Headers => "headers",
            Category::Emails => "emails",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The effective category set of a request, after resolving the `all` shorthand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CategorySet(u8);

impl CategorySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Category::ALL.into_iter().collect()
    }

    pub fn insert(&mut self, category: Category) {
        self.0 |= category.bit();
    }

    pub fn with(mut self, category: Category) -> Self {
        self.insert(category);
        self
    }

    pub fn contains(&self, category: Category) -> bool {
        self.0 & category.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Categories in the set, in [`Category::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = Category> + '_ {
        Category::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

impl FromIterator<Category> for CategorySet {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        let mut set = CategorySet::empty();
        for category in iter {
            set.insert(category);
        }
        set
    }
}

/// Inbound scrape payload as it arrives on the wire.
///
/// Missing selectors default to `false`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapePayload {
    pub url: String,
    #[serde(default)]
    pub link: bool,
    #[serde(default)]
    pub paragraph: bool,
    #[serde(default)]
    pub image: bool,
    #[serde(default)]
    pub header: bool,
    #[serde(default)]
    pub email: bool,
    #[serde(default)]
    pub all: bool,
}

impl ScrapePayload {
    /// Resolve the selectors into the effective category set.
    ///
    /// This is the only place `all` is read.
    pub fn categories(&self) -> CategorySet {
        if self.all {
            return CategorySet::all();
        }

        let flags = [
            (self.link, Category::Links),
            (self.paragraph, Category::Paragraphs),
            (self.image, Category::Images),
            (self.header, Category::Headers),
            (self.email, Category::Emails),
        ];
        flags
            .into_iter()
            .filter_map(|(on, category)| on.then_some(category))
            .collect()
    }
}

/// A validated, normalized scrape request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub url: Url,
    pub categories: CategorySet,
}

impl ScrapeRequest {
    pub fn new(url: Url, categories: CategorySet) -> Self {
        Self { url, categories }
    }

    /// Validate the payload URL and resolve its selectors.
    ///
    /// The URL must be absolute and use the `http` or `https` scheme.
    pub fn from_payload(payload: &ScrapePayload) -> ScrapeResult<Self> {
        let raw = payload.url.trim();
        if raw.is_empty() {
            return Err(ScrapeError::InvalidRequest("url is required".to_string()));
        }

        let url = Url::parse(raw)
            .map_err(|e| ScrapeError::InvalidRequest(format!("invalid url '{raw}': {e}")))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ScrapeError::InvalidRequest(format!(
                    "unsupported url scheme '{other}', expected http or https"
                )))
            }
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ScrapeError::InvalidRequest(format!(
                "url '{raw}' has no host"
            )));
        }

        Ok(Self::new(url, payload.categories()))
    }
}

/// Title and serialized DOM of a page after rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub title: String,
    pub html: String,
}

/// Aggregate scrape result.
///
/// Requested categories are always `Some` (possibly empty); categories that
/// were not requested are `None` and serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeResponse {
    pub title: String,
    pub links: Option<Vec<String>>,
    pub paragraphs: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub headers: Option<Vec<String>>,
    pub emails: Option<Vec<String>>,
}

impl ScrapeResponse {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn field(&self, category: Category) -> Option<&Vec<String>> {
        match category {
            Category::Links => self.links.as_ref(),
            Category::Paragraphs => self.paragraphs.as_ref(),
            Category::Images => self.images.as_ref(),
            Category::Headers => self.headers.as_ref(),
            Category::Emails => self.emails.as_ref(),
        }
    }

    pub fn set(&mut self, category: Category, values: Vec<String>) {
        let slot = match category {
            Category::Links => &mut self.links,
            Category::Paragraphs => &mut self.paragraphs,
            Category::Images => &mut self.images,
            Category::Headers => &mut self.headers,
            Category::Emails => &mut self.emails,
        };
        *slot = Some(values);
    }

    /// Categories present in the response (requested, whether or not they matched).
    pub fn populated(&self) -> CategorySet {
        Category::ALL
            .into_iter()
            .filter(|c| self.field(*c).is_some())
            .collect()
    }
}

/// Errors returned by a scrape.
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ScrapeError {
    /// Whether the caller, rather than the page or browser, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ScrapeError::InvalidRequest(_))
    }
}

/// Convenience result type.
pub type ScrapeResult<T> = Result<T, ScrapeError>;
