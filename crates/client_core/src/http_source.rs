use std::{marker::PhantomData, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::ListResource,
    error::{ApiError, ErrorCode},
    protocol::{Page, PageQuery},
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::{ClientSettings, ConfigError},
    source::{DataSource, FetchError, Params},
};

const RESERVED_PARAMS: [&str; 2] = ["page", "page_size"];

/// [`DataSource`] that pages through one storefront API resource.
pub struct HttpDataSource<T> {
    http: Client,
    endpoint: Url,
    resource: ListResource,
    auth_token: Option<String>,
    _item: PhantomData<fn() -> T>,
}

impl<T> HttpDataSource<T> {
    pub fn new(settings: &ClientSettings, resource: ListResource) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Self::with_client(http, settings, resource)
    }

    pub fn with_client(
        http: Client,
        settings: &ClientSettings,
        resource: ListResource,
    ) -> Result<Self, ConfigError> {
        let endpoint = resource_url(&settings.api_base()?, resource)?;
        Ok(Self {
            http,
            endpoint,
            resource,
            auth_token: settings.auth_token.clone(),
            _item: PhantomData,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl<T> DataSource<T> for HttpDataSource<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch_page(
        &self,
        page_index: u32,
        page_size: u32,
        params: &Params,
    ) -> Result<Page<T>, FetchError> {
        let extra: Vec<(&str, &str)> = params
            .iter()
            .filter(|(key, _)| !RESERVED_PARAMS.contains(&key.as_str()))
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        let mut request = self
            .http
            .get(self.endpoint.clone())
            .query(&PageQuery {
                page: page_index,
                page_size,
            })
            .query(&extra);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        debug!(resource = %self.resource, page_index, page_size, "requesting page");
        let response = request
            .send()
            .await
            .map_err(|err| FetchError::network(err.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| FetchError::network(err.to_string()))?;

        if !status.is_success() {
            let err = rejection(status, &body);
            warn!(resource = %self.resource, status = status.as_u16(), error = %err, "page request rejected");
            return Err(err);
        }

        serde_json::from_slice(&body).map_err(|err| FetchError::decode(err.to_string()))
    }
}

fn resource_url(base: &Url, resource: ListResource) -> Result<Url, ConfigError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(resource.path())
        .map_err(|source| ConfigError::InvalidApiUrl {
            url: base.to_string(),
            source,
        })
}

fn rejection(status: StatusCode, body: &[u8]) -> FetchError {
    if let Ok(api_error) = serde_json::from_slice::<ApiError>(body) {
        return api_error.into();
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    let message = if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        text.to_string()
    };
    FetchError::server(ErrorCode::from_status(status.as_u16()), message)
}

#[cfg(test)]
#[path = "tests/http_source_tests.rs"]
mod tests;
