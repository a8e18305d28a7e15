//! HTTP client implementation for the Noren adapter.
//!
//! This module provides the REST client for the Noren OMS, covering session login, the OAuth
//! token exchange, market data lookups, order entry and the account books.

pub mod client;
pub mod error;
pub mod models;
pub mod oauth;
pub mod query;

pub use client::NorenHttpClient;
pub use error::*;
pub use models::*;
pub use oauth::OAuthHandler;
pub use query::*;
