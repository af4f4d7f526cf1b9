//! Minimal blocking JSON client shared by the hosting service APIs.

use std::time::Duration;

use log::debug;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Page size requested from paginated endpoints.
pub const PER_PAGE: usize = 100;

const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct ApiClient {
    provider: String,
    base_url: String,
    agent: ureq::Agent,
    headers: Vec<(String, String)>,
}

impl ApiClient {
    pub fn new(provider: &str, base_url: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(TIMEOUT)
            .user_agent(&format!("codesync/{}", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            provider: provider.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
            headers: Vec::new(),
        }
    }

    /// Send `name: value` with every request.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path` and decode the body. `None` on 404.
    ///
    /// `scope` only labels errors.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        scope: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let url = self.url(path);
        debug!("GET {} {:?}", url, query);

        let mut request = self.agent.get(&url);
        for (name, value) in &self.headers {
            request = request.set(name, value);
        }
        for (name, value) in query {
            request = request.query(name, value);
        }

        match request.call() {
            Ok(response) => response
                .into_json::<T>()
                .map(Some)
                .map_err(|e| self.error(scope, format!("invalid response from {}: {}", url, e))),
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(self.error(scope, format!("{} {}: {}", code, url, body.trim())))
            }
            Err(e) => Err(self.error(scope, e.to_string())),
        }
    }

    /// GET every page of a list endpoint. A 404 is an error here.
    pub fn get_pages<T: DeserializeOwned>(
        &self,
        scope: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let per_page = PER_PAGE.to_string();
        let mut items = Vec::new();
        for page in 1.. {
            let page = page.to_string();
            let mut params: Vec<(&str, &str)> = query.to_vec();
            params.push(("per_page", per_page.as_str()));
            params.push(("page", page.as_str()));

            let batch: Vec<T> = self
                .get_json(scope, path, &params)?
                .ok_or_else(|| self.error(scope, format!("{} not found", self.url(path))))?;
            let last = is_last_page(batch.len());
            items.extend(batch);
            if last {
                break;
            }
        }
        Ok(items)
    }

    pub fn error(&self, scope: &str, message: String) -> Error {
        Error::Provider {
            provider: self.provider.clone(),
            scope: scope.to_string(),
            message,
        }
    }
}

/// A short page ends the listing.
fn is_last_page(len: usize) -> bool {
    len < PER_PAGE
}

/// Percent-encode a path segment such as `group/subgroup`.
pub fn encode_segment(raw: &str) -> String {
    let Ok(mut url) = url::Url::parse("http://segment.invalid/") else {
        return raw.to_string();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(raw);
    }
    url.path().trim_start_matches('/').to_string()
}
