use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::Page,
};
use thiserror::Error;

/// Extra query parameters forwarded with every page request (filters, shop id, ...).
pub type Params = BTreeMap<String, String>;

/// Why a page fetch failed. Every variant is retryable by fetching the page again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server rejected request ({code:?}): {message}")]
    Server { code: ErrorCode, message: String },
    #[error("malformed page response: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn server(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Server {
            code,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}

impl From<ApiError> for FetchError {
    fn from(value: ApiError) -> Self {
        Self::Server {
            code: value.code,
            message: value.message,
        }
    }
}

/// Paged access to a remote list resource.
///
/// Implementations may be shared between controllers but must not cache pages
/// across them.
#[async_trait]
pub trait DataSource<T>: Send + Sync
where
    T: Send + 'static,
{
    async fn fetch_page(
        &self,
        page_index: u32,
        page_size: u32,
        params: &Params,
    ) -> Result<Page<T>, FetchError>;
}

#[async_trait]
impl<T, S> DataSource<T> for Arc<S>
where
    T: Send + 'static,
    S: DataSource<T> + ?Sized,
{
    async fn fetch_page(
        &self,
        page_index: u32,
        page_size: u32,
        params: &Params,
    ) -> Result<Page<T>, FetchError> {
        (**self).fetch_page(page_index, page_size, params).await
    }
}
