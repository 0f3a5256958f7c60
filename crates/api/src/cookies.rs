//! Refresh and OAuth-state cookies
//!
//! The refresh token travels only in an HTTP-only cookie scoped to the
//! auth routes; the server-side record holds its fingerprint. The bearer
//! credential never touches a cookie or a URL.

use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::config::AppConfig;

/// Refresh credential cookie, scoped to `/api/auth`.
pub const REFRESH_COOKIE: &str = "strongbox_refresh";

/// Short-lived CSRF state for the OAuth redirect dance.
pub const OAUTH_STATE_COOKIE: &str = "strongbox_oauth_state";

const OAUTH_STATE_TTL_SECS: i64 = 600;

/// Builds the refresh cookie carrying a raw token.
pub fn refresh_cookie(config: &AppConfig, raw_token: String) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, raw_token))
        .path("/api/auth")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.production)
        .max_age(time::Duration::seconds(config.refresh_ttl_secs))
        .build()
}

/// An expired refresh cookie, for logout.
pub fn clear_refresh_cookie(config: &AppConfig) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, ""))
        .path("/api/auth")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.production)
        .max_age(time::Duration::ZERO)
        .build()
}

/// CSRF-state cookie set before redirecting to a provider.
pub fn oauth_state_cookie(config: &AppConfig, state: String) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, state))
        .path("/api/auth")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.production)
        .max_age(time::Duration::seconds(OAUTH_STATE_TTL_SECS))
        .build()
}

/// Clears the CSRF-state cookie after the callback.
pub fn clear_oauth_state_cookie(config: &AppConfig) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, ""))
        .path("/api/auth")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.production)
        .max_age(time::Duration::ZERO)
        .build()
}
