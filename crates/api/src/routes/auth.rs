//! Authentication routes

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum_extra::extract::cookie::CookieJar;
use http::{StatusCode, header};
use serde::Deserialize;
use serde_json::json;

use strongbox_crypto::OpaqueToken;
use strongbox_service::{RegisterInput, ServiceError};

use crate::cookies;
use crate::error::ApiError;
use crate::extract::{AppJson, ClientMeta, CurrentUser};
use crate::oauth::{self, Provider};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/revoke-all", post(revoke_all))
        .route("/auth/refresh", post(refresh))
        .route("/auth/me", get(me))
        .route("/auth/{provider}", get(oauth_start))
        .route("/auth/{provider}/callback", get(oauth_callback))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RegisterBody {
    email: String,
    password: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct LoginBody {
    email: String,
    password: String,
}

async fn register(
    State(state): State<AppState>,
    ClientMeta(client): ClientMeta,
    jar: CookieJar,
    AppJson(body): AppJson<RegisterBody>,
) -> Result<Response, ApiError> {
    let (user, tokens) = state
        .auth
        .register(
            RegisterInput {
                email: body.email,
                password: body.password,
                name: body.name,
            },
            &client,
        )
        .await?;

    let jar = jar.add(cookies::refresh_cookie(
        &state.config,
        tokens.refresh_token.reveal().to_string(),
    ));
    Ok((
        StatusCode::CREATED,
        jar,
        Json(json!({ "user": user, "accessToken": tokens.access_token })),
    )
        .into_response())
}

async fn login(
    State(state): State<AppState>,
    ClientMeta(client): ClientMeta,
    jar: CookieJar,
    AppJson(body): AppJson<LoginBody>,
) -> Result<Response, ApiError> {
    let (user, tokens) = state.auth.login(&body.email, &body.password, &client).await?;

    let jar = jar.add(cookies::refresh_cookie(
        &state.config,
        tokens.refresh_token.reveal().to_string(),
    ));
    Ok((
        jar,
        Json(json!({ "user": user, "accessToken": tokens.access_token })),
    )
        .into_response())
}

async fn logout(
    State(state): State<AppState>,
    _caller: CurrentUser,
    ClientMeta(client): ClientMeta,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    if let Some(cookie) = jar.get(cookies::REFRESH_COOKIE) {
        state.auth.logout(cookie.value(), &client).await?;
    }
    let jar = jar.add(cookies::clear_refresh_cookie(&state.config));
    Ok((jar, Json(json!({ "message": "Logged out" }))).into_response())
}

/// Kills every active session for the caller, this one included.
async fn revoke_all(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    ClientMeta(client): ClientMeta,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let revoked = state.auth.revoke_all(claims.account_id, &client).await?;
    let jar = jar.add(cookies::clear_refresh_cookie(&state.config));
    Ok((jar, Json(json!({ "revokedSessions": revoked }))).into_response())
}

async fn refresh(State(state): State<AppState>, jar: CookieJar) -> Result<Response, ApiError> {
    let cookie = jar
        .get(cookies::REFRESH_COOKIE)
        .ok_or(ApiError::Service(ServiceError::Unauthenticated {
            expired: false,
        }))?;
    let (user, access_token) = state.auth.refresh(cookie.value()).await?;
    Ok(Json(json!({ "user": user, "accessToken": access_token })).into_response())
}

async fn me(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<Response, ApiError> {
    let user = state.auth.me(claims.account_id).await?;
    Ok(Json(json!({ "user": user })).into_response())
}

fn provider_config<'a>(
    state: &'a AppState,
    provider: Provider,
) -> Result<&'a crate::config::OAuthClientConfig, ApiError> {
    let config = match provider {
        Provider::Google => state.config.google.as_ref(),
        Provider::Github => state.config.github.as_ref(),
    };
    config.ok_or(ApiError::Service(ServiceError::NotFound))
}

fn parse_provider(raw: &str) -> Result<Provider, ApiError> {
    raw.parse()
        .map_err(|()| ApiError::Service(ServiceError::NotFound))
}

async fn oauth_start(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let provider = parse_provider(&provider)?;
    let client = provider_config(&state, provider)?;

    let csrf_state = OpaqueToken::generate();
    let url = oauth::authorize_url(provider, client, csrf_state.reveal())?;
    let jar = jar.add(cookies::oauth_state_cookie(
        &state.config,
        csrf_state.reveal().to_string(),
    ));
    Ok((jar, found_redirect(&url)).into_response())
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: String,
    #[serde(default)]
    state: Option<String>,
}

async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    ClientMeta(client_info): ClientMeta,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let provider = parse_provider(&provider)?;
    let client = provider_config(&state, provider)?;

    // The state parameter must match the cookie set before the redirect.
    let expected = jar
        .get(cookies::OAUTH_STATE_COOKIE)
        .map(|c| c.value().to_string());
    if expected.is_none() || expected != query.state {
        return Err(ApiError::Service(ServiceError::Unauthenticated {
            expired: false,
        }));
    }

    let provider_token = oauth::exchange_code(&state.http, provider, client, &query.code).await?;
    let profile = oauth::fetch_profile(&state.http, provider, &provider_token).await?;
    let (_user, tokens) = state.auth.oauth_sign_in(profile, &client_info).await?;

    // Refresh cookie only; the bearer credential never rides a URL.
    let jar = jar
        .add(cookies::refresh_cookie(
            &state.config,
            tokens.refresh_token.reveal().to_string(),
        ))
        .add(cookies::clear_oauth_state_cookie(&state.config));
    let success_url = format!("{}/auth/success", state.config.frontend_url);
    Ok((jar, found_redirect(&success_url)).into_response())
}

/// Plain `302 Found`, matching what browser OAuth clients expect.
fn found_redirect(location: &str) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, location.to_string())],
    )
        .into_response()
}
