//! Client-side core of the storefront app: paged list loading over the storefront API.
//!
//! Screens hold a [`PaginatedListController`] per list (cart, orders, feedback,
//! notifications) and drive it with [`PaginatedListController::load_next`] as the
//! user scrolls. The controller talks to any [`DataSource`]; [`HttpDataSource`]
//! is the one backed by the remote API.

pub mod config;
pub mod controller;
pub mod http_source;
pub mod source;

pub use config::{load_settings, ClientSettings, ConfigError};
pub use controller::{
    ControllerError, ListPhase, ListState, LoadOutcome, PaginatedListController, SkipReason,
};
pub use http_source::HttpDataSource;
pub use shared::protocol::Page;
pub use source::{DataSource, FetchError, Params};
