//! Minimart Client SDK.
//!
//! This crate provides a client library for services that meter API usage
//! against minimart accounts.
//!
//! # Example
//!
//! ```no_run
//! use minimart_client::MinimartClient;
//!
//! # async fn example() -> Result<(), minimart_client::ClientError> {
//! let client = MinimartClient::new(
//!     "http://minimart.storefront.svc:8080",
//!     "your-service-api-key",
//! );
//!
//! // Consume one metered request for a user.
//! let response = client
//!     .use_request("123456789", "mk_THEUSERSRAWAPIKEY0000000")
//!     .await?;
//!
//! println!("Remaining requests: {}", response.remaining_requests);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, MinimartClient};
pub use error::ClientError;
pub use types::*;
