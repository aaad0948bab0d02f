//! Authentication middleware and extractors.
//!
//! This module provides extractors for:
//! - `TelegramUser` - End-user authentication via signed Telegram WebApp
//!   init data
//! - `ServiceAuth` - Service-to-service authentication via API key
//! - `AdminAuth` - Back-office authentication via admin key

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Deserialize;

use minimart_core::AccountId;

use crate::crypto::{constant_time_eq, hmac_sha256, hmac_sha256_hex};
use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the raw Telegram WebApp init data.
pub const INIT_DATA_HEADER: &str = "x-telegram-init-data";

/// An authenticated user extracted from verified init data.
#[derive(Debug, Clone)]
pub struct TelegramUser {
    /// The account id derived from the Telegram numeric id.
    pub account_id: AccountId,

    /// Telegram username, if set.
    pub username: Option<String>,

    /// First name from the Telegram profile.
    pub first_name: Option<String>,

    /// The start parameter carried into the session (referral code).
    pub start_param: Option<String>,
}

/// The `user` field of init data, as Telegram encodes it.
#[derive(Debug, Deserialize)]
struct InitDataUser {
    id: i64,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

/// Verify Telegram WebApp init data and extract the user.
///
/// Telegram's scheme: the secret key is `HMAC-SHA256("WebAppData", bot_token)`
/// and the `hash` field must equal the hex HMAC-SHA256 of the remaining
/// fields, sorted by key and joined as `key=value` lines.
///
/// # Errors
///
/// Returns `ApiError::Unauthorized` for any malformed, stale, or
/// badly-signed payload.
pub fn verify_init_data(
    raw: &str,
    bot_token: &str,
    now_unix: i64,
    max_age_seconds: i64,
) -> Result<TelegramUser, ApiError> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut provided_hash = None;

    for field in raw.split('&') {
        let Some((key, value)) = field.split_once('=') else {
            return Err(ApiError::Unauthorized);
        };
        let value = urlencoding::decode(value)
            .map_err(|_| ApiError::Unauthorized)?
            .into_owned();
        if key == "hash" {
            provided_hash = Some(value);
        } else {
            pairs.push((key.to_string(), value));
        }
    }

    let provided_hash = provided_hash.ok_or(ApiError::Unauthorized)?;

    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    let data_check_string = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n");

    let secret = hmac_sha256(b"WebAppData", bot_token.as_bytes());
    let expected = hmac_sha256_hex(&secret, data_check_string.as_bytes());
    if !constant_time_eq(&expected, &provided_hash) {
        return Err(ApiError::Unauthorized);
    }

    let field = |name: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    };

    if max_age_seconds > 0 {
        let auth_date: i64 = field("auth_date")
            .and_then(|v| v.parse().ok())
            .ok_or(ApiError::Unauthorized)?;
        if now_unix - auth_date > max_age_seconds {
            return Err(ApiError::Unauthorized);
        }
    }

    let user: InitDataUser = field("user")
        .and_then(|v| serde_json::from_str(v).ok())
        .ok_or(ApiError::Unauthorized)?;
    let account_id = AccountId::from_telegram(user.id).map_err(|_| ApiError::Unauthorized)?;

    Ok(TelegramUser {
        account_id,
        username: user.username,
        first_name: user.first_name,
        start_param: field("start_param").map(String::from),
    })
}

impl FromRequestParts<Arc<AppState>> for TelegramUser {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let raw = parts
                .headers
                .get(INIT_DATA_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Unauthorized)?;

            verify_init_data(
                raw,
                &state.config.bot_token,
                chrono::Utc::now().timestamp(),
                state.config.auth_max_age_seconds,
            )
        })
    }
}

/// Service authentication via API key.
///
/// Used for service-to-service requests (metering from the API gateway).
#[derive(Debug, Clone)]
pub struct ServiceAuth {
    /// The service name or identifier.
    pub service_name: String,
}

impl FromRequestParts<Arc<AppState>> for ServiceAuth {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let api_key = parts
                .headers
                .get("x-api-key")
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Unauthorized)?;

            let expected_key = state
                .config
                .service_api_key
                .as_ref()
                .ok_or(ApiError::Unauthorized)?;

            if !constant_time_eq(api_key, expected_key) {
                return Err(ApiError::Unauthorized);
            }

            let service_name = parts
                .headers
                .get("x-service-name")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();

            Ok(ServiceAuth { service_name })
        })
    }
}

/// Back-office authentication via admin key.
#[derive(Debug, Clone)]
pub struct AdminAuth;

impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let admin_key = parts
                .headers
                .get("x-admin-key")
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Unauthorized)?;

            let expected_key = state
                .config
                .admin_api_key
                .as_ref()
                .ok_or(ApiError::Unauthorized)?;

            if !constant_time_eq(admin_key, expected_key) {
                return Err(ApiError::Forbidden);
            }

            Ok(AdminAuth)
        })
    }
}
