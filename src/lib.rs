//! Backoffice client — async HTTP client for the back-office REST API.
//!
//! All authenticated traffic flows through one dispatcher that attaches the
//! current bearer token and, when the backend answers 401, performs a single
//! coordinated token refresh: concurrent failures share one
//! `POST /auth/refresh` call, queued requests replay with the new token, and
//! a failed refresh rejects every waiter and clears the session.
//!
//! # Quick Start
//!
//! ```no_run
//! use backoffice_client::ApiClient;
//!
//! # async fn example() -> backoffice_client::error::Result<()> {
//! let client = ApiClient::new("https://backoffice.example.com/api")?;
//! client.login("admin@example.com", "secret").await?;
//! let customers: serde_json::Value = client.get("/customers").send().await?.json()?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod error;

pub use auth::{AccessToken, AuthError, TokenStore};
pub use client::{ApiClient, ApiRequest, ApiResponse, Method, RequestBuilder, StatusCode};
pub use error::{Error, Result};
