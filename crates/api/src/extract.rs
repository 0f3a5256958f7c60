//! Request extractors: caller identity, client metadata, validated JSON

use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, FromRequest, FromRequestParts, Request};
use axum::Json;
use http::header;
use http::request::Parts;
use serde::de::DeserializeOwned;

use strongbox_service::{BearerClaims, ClientInfo, FieldError, ServiceError};

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller, resolved from the `Authorization` header.
///
/// Any route taking this extractor is bearer-protected; rejection
/// distinguishes an expired credential from an invalid one so clients
/// know whether to refresh or re-authenticate.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub BearerClaims);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Service(ServiceError::Unauthenticated {
                expired: false,
            }))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Service(ServiceError::Unauthenticated {
                expired: false,
            }))?;
        let claims = state.tokens.verify(token)?;
        Ok(Self(claims))
    }
}

/// Client address and user agent, for rate limiting and audit records.
///
/// The address is the first `X-Forwarded-For` entry when present (the
/// reverse proxy is trusted), otherwise the socket peer.
#[derive(Debug, Clone)]
pub struct ClientMeta(pub ClientInfo);

impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let address = address_from_parts(parts);
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(Self(ClientInfo {
            address,
            user_agent,
        }))
    }
}

pub(crate) fn address_from_parts(parts: &Parts) -> Option<String> {
    if let Some(forwarded) = parts
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }
    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

/// JSON body extractor whose rejection speaks the API's validation
/// dialect instead of axum's default plain-text responses.
#[derive(Debug, Clone)]
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                let message = match &rejection {
                    JsonRejection::JsonDataError(e) => e.body_text(),
                    JsonRejection::JsonSyntaxError(_) => "malformed JSON".to_string(),
                    JsonRejection::MissingJsonContentType(_) => {
                        "expected application/json".to_string()
                    }
                    _ => "invalid request body".to_string(),
                };
                Err(ApiError::BadRequest(vec![FieldError::new("body", message)]))
            }
        }
    }
}
