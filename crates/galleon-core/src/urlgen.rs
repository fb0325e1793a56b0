//! Named-route URL generation, static asset URLs and public file URLs.
//!
//! Route patterns use axum's `{param}` syntax so the same table can be used to
//! mount handlers and to build links.

use std::collections::HashMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};

use crate::error::AppError;

/// Characters escaped inside a single path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Characters escaped in query keys and values
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub const MEDIA_HOME: &str = "user_pages.media_home";
pub const USER_COLLECTION: &str = "user_pages.user_collection";
pub const COLLECTION_MEDIA_HOME: &str = "user_pages.collection_media_home";

const CORE_ROUTES: &[(&str, &str)] = &[
    ("index", "/"),
    ("user_pages.user_home", "/u/{user}/"),
    (MEDIA_HOME, "/u/{user}/m/{media}/"),
    (USER_COLLECTION, "/u/{user}/collection/{collection}/"),
    (
        COLLECTION_MEDIA_HOME,
        "/u/{user}/m/{media}/in/{creator}/{collection}/",
    ),
];

/// Builds URLs for named routes.
#[derive(Debug, Clone, Default)]
pub struct UrlGenerator {
    base_url: String,
    routes: HashMap<String, String>,
}

impl UrlGenerator {
    /// Empty generator; `base_url` prefixes qualified URLs.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            routes: HashMap::new(),
        }
    }

    /// Generator preloaded with the user page routes.
    pub fn with_core_routes(base_url: impl Into<String>) -> Self {
        let mut generator = Self::new(base_url);
        for (endpoint, path) in CORE_ROUTES {
            generator.add_route(*endpoint, *path);
        }
        generator
    }

    pub fn add_route(&mut self, endpoint: impl Into<String>, path: impl Into<String>) {
        let endpoint = endpoint.into();
        let path = path.into();
        if let Some(previous) = self.routes.insert(endpoint.clone(), path.clone()) {
            if previous != path {
                tracing::warn!(endpoint = %endpoint, previous = %previous, path = %path, "Route overridden");
            }
        }
    }

    pub fn path_for(&self, endpoint: &str) -> Option<&str> {
        self.routes.get(endpoint).map(String::as_str)
    }

    /// Build the URL of `endpoint`.
    ///
    /// Params named in the route pattern fill its placeholders; the rest are
    /// appended as a query string in the given order.
    pub fn url_for(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        qualified: bool,
    ) -> Result<String, AppError> {
        let pattern = self
            .routes
            .get(endpoint)
            .ok_or_else(|| AppError::Internal(format!("No route registered for '{}'", endpoint)))?;

        let mut used = vec![false; params.len()];
        let mut path = String::with_capacity(pattern.len() + 16);
        let mut rest = pattern.as_str();

        while let Some(open) = rest.find('{') {
            path.push_str(&rest[..open]);
            let close = rest[open..]
                .find('}')
                .map(|c| open + c)
                .ok_or_else(|| AppError::Internal(format!("Malformed route '{}'", pattern)))?;
            let name = &rest[open + 1..close];
            let idx = params
                .iter()
                .position(|(key, _)| *key == name)
                .ok_or_else(|| {
                    AppError::Internal(format!(
                        "Missing parameter '{}' for route '{}'",
                        name, endpoint
                    ))
                })?;
            used[idx] = true;
            path.extend(utf8_percent_encode(params[idx].1, PATH_SEGMENT));
            rest = &rest[close + 1..];
        }
        path.push_str(rest);

        let query: Vec<String> = params
            .iter()
            .zip(used)
            .filter(|(_, used)| !used)
            .map(|((key, value), _)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(key, QUERY_COMPONENT),
                    utf8_percent_encode(value, QUERY_COMPONENT)
                )
            })
            .collect();
        if !query.is_empty() {
            path.push('?');
            path.push_str(&query.join("&"));
        }

        if qualified {
            Ok(format!("{}{}", self.base_url, path))
        } else {
            Ok(path)
        }
    }
}

/// Resolves static asset paths against the static base URL.
#[derive(Debug, Clone)]
pub struct StaticDirector {
    base_url: String,
}

impl StaticDirector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn url(&self, filepath: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            filepath.trim_start_matches('/')
        )
    }
}

/// Storage whose files are reachable over HTTP.
pub trait PublicStore: Send + Sync {
    /// URL of the file stored under the given path segments
    fn file_url(&self, filepath: &[String]) -> String;
}

/// Public store served from a fixed base URL.
#[derive(Debug, Clone)]
pub struct LocalPublicStore {
    base_url: String,
}

impl LocalPublicStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl PublicStore for LocalPublicStore {
    fn file_url(&self, filepath: &[String]) -> String {
        let segments: Vec<String> = filepath
            .iter()
            .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
            .collect();
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            segments.join("/")
        )
    }
}
