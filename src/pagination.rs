use axum::http::{HeaderValue, header::HeaderMap};
use serde::{Deserialize, Serialize};

pub const CONTENT_RANGE: &str = "Content-Range";

/// One page of a filtered listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub last_page: u64,
}

impl<T> Page<T> {
    /// `per_page` and `current_page` are raised to 1 when given as 0.
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, per_page: u64, current_page: u64) -> Self {
        let per_page = per_page.max(1);
        Self {
            items,
            total,
            per_page,
            current_page: current_page.max(1),
            last_page: total.div_ceil(per_page).max(1),
        }
    }

    /// Number of rows skipped before `page` when pages hold `per_page` rows.
    #[must_use]
    pub fn offset(per_page: u64, page: u64) -> u64 {
        page.max(1).saturating_sub(1).saturating_mul(per_page.max(1))
    }

    /// 1-based position of the first item on this page.
    #[must_use]
    pub fn from(&self) -> Option<u64> {
        (!self.items.is_empty()).then(|| Self::offset(self.per_page, self.current_page) + 1)
    }

    /// 1-based position of the last item on this page.
    #[must_use]
    pub fn to(&self) -> Option<u64> {
        (!self.items.is_empty()).then(|| {
            Self::offset(self.per_page, self.current_page) + self.items.len() as u64
        })
    }

    #[must_use]
    pub fn has_next_page(&self) -> bool {
        self.current_page < self.last_page
    }

    #[must_use]
    pub fn has_previous_page(&self) -> bool {
        self.current_page > 1
    }

    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            per_page: self.per_page,
            current_page: self.current_page,
            last_page: self.last_page,
        }
    }

    /// The `Content-Range` header for this page, e.g. `products 0-9/42`.
    ///
    /// Bounds are 0-based and inclusive. An empty page renders as
    /// `products */42`.
    #[must_use]
    pub fn content_range(&self, resource_name: &str) -> HeaderMap {
        let offset = Self::offset(self.per_page, self.current_page);
        content_range_header(offset, self.items.len() as u64, self.total, resource_name)
    }
}

/// Strip characters that cannot appear in a header value.
fn sanitize_resource_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect()
}

#[must_use]
pub fn content_range_header(offset: u64, count: u64, total: u64, resource_name: &str) -> HeaderMap {
    let safe_name = sanitize_resource_name(resource_name);
    let range = if count == 0 {
        format!("{safe_name} */{total}")
    } else {
        format!("{safe_name} {offset}-{}/{total}", offset + count - 1)
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&range) {
        headers.insert(CONTENT_RANGE, value);
    } else {
        tracing::warn!(range, "unrepresentable Content-Range header");
    }
    headers
}
