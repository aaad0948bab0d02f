//! Minimart HTTP API Service.
//!
//! This crate provides the HTTP API for the minimart storefront economy,
//! including:
//!
//! - Account provisioning and wallet state
//! - Coin conversion, ad rewards, redeem codes, referrals
//! - Product, bot, and API plan purchases
//! - Metered API usage
//! - Back-office catalog and notification management
//!
//! # Authentication
//!
//! The service supports three authentication methods:
//!
//! 1. **Telegram init data** - For end-user requests from the Mini App,
//!    verified with the bot token (HMAC-SHA256)
//! 2. **Service API keys** - For service-to-service requests (metering)
//! 3. **Admin key** - For the back office

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers need async for routing consistency

pub mod auth;
pub mod config;
pub mod crypto;
pub mod delivery;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod verify;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
pub use verify::{HttpMembershipVerifier, MembershipVerifier};
