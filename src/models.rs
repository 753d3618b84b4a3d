use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use std::fmt;

/// Query parameters handed to a [`QueryFilter`](crate::filter::QueryFilter).
///
/// Keys keep the order in which they arrived so that filter dispatch, and
/// therefore the order of `ORDER BY` clauses, is reproducible. A key that is
/// repeated keeps its first position and takes its last value, so a handler is
/// never invoked twice for one request.
///
/// # Examples
/// ```rust,ignore
/// GET /products?name=lamp&createdAt=2024-01-01,2024-01-31&sort=-name,createdAt&include=category
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterRequest {
    params: Vec<(String, String)>,
}

impl FilterRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw `application/x-www-form-urlencoded` query string.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        url::form_urlencoded::parse(query.as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect()
    }

    /// Set `key` to `value`, keeping the original position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.params.push((key, value)),
        }
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// Parse a numeric parameter such as `per_page` or `page`.
    #[must_use]
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|value| value.trim().parse().ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for FilterRequest
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut request = Self::new();
        for (key, value) in iter {
            request.insert(key, value);
        }
        request
    }
}

impl<'de> Deserialize<'de> for FilterRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RequestVisitor;

        impl<'de> Visitor<'de> for RequestVisitor {
            type Value = FilterRequest;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of query parameters")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut request = FilterRequest::new();
                while let Some((key, value)) = map.next_entry::<String, String>()? {
                    request.insert(key, value);
                }
                Ok(request)
            }
        }

        deserializer.deserialize_map(RequestVisitor)
    }
}
