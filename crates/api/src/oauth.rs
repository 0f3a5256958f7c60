//! OAuth provider integration (Google, GitHub)
//!
//! Plain authorization-code flow: build the provider's authorize URL with
//! a random CSRF state, exchange the callback code for a provider access
//! token, fetch the profile, and hand it to the auth service's
//! find-or-link. Provider calls go through a bounded-timeout HTTP client.

use serde::Deserialize;
use tracing::{debug, error};

use strongbox_store::OAuthProfile;

use crate::config::OAuthClientConfig;
use crate::error::ApiError;

/// Supported identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
    Github,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
        }
    }

    fn authorize_endpoint(self) -> &'static str {
        match self {
            Self::Google => "https://accounts.google.com/o/oauth2/v2/auth",
            Self::Github => "https://github.com/login/oauth/authorize",
        }
    }

    fn token_endpoint(self) -> &'static str {
        match self {
            Self::Google => "https://oauth2.googleapis.com/token",
            Self::Github => "https://github.com/login/oauth/access_token",
        }
    }

    fn scopes(self) -> &'static str {
        match self {
            Self::Google => "openid email profile",
            Self::Github => "read:user user:email",
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Self::Google),
            "github" => Ok(Self::Github),
            _ => Err(()),
        }
    }
}

/// Builds the provider redirect URL for the given CSRF state.
pub fn authorize_url(
    provider: Provider,
    client: &OAuthClientConfig,
    state: &str,
) -> Result<String, ApiError> {
    let mut url = url::Url::parse(provider.authorize_endpoint()).map_err(|e| {
        error!(provider = provider.as_str(), error = %e, "bad authorize endpoint");
        ApiError::Service(strongbox_service::ServiceError::internal(e.to_string()))
    })?;
    url.query_pairs_mut()
        .append_pair("client_id", &client.client_id)
        .append_pair("redirect_uri", &client.callback_url)
        .append_pair("response_type", "code")
        .append_pair("scope", provider.scopes())
        .append_pair("state", state);
    Ok(url.to_string())
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Exchanges the callback code for a provider access token.
pub async fn exchange_code(
    http: &reqwest::Client,
    provider: Provider,
    client: &OAuthClientConfig,
    code: &str,
) -> Result<String, ApiError> {
    let form = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", &client.callback_url),
        ("client_id", &client.client_id),
        ("client_secret", &client.client_secret),
    ];

    let response = http
        .post(provider.token_endpoint())
        .header(http::header::ACCEPT, "application/json")
        .form(&form)
        .send()
        .await
        .map_err(|e| provider_failure(provider, "token exchange", &e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(provider_failure(
            provider,
            "token exchange",
            &format!("HTTP {status}"),
        ));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| provider_failure(provider, "token response", &e.to_string()))?;
    debug!(provider = provider.as_str(), "token exchange completed");
    Ok(token.access_token)
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: u64,
    login: String,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

/// Fetches the signed-in user's profile from the provider.
pub async fn fetch_profile(
    http: &reqwest::Client,
    provider: Provider,
    access_token: &str,
) -> Result<OAuthProfile, ApiError> {
    match provider {
        Provider::Google => {
            let info: GoogleUserInfo = get_json(
                http,
                provider,
                "https://openidconnect.googleapis.com/v1/userinfo",
                access_token,
            )
            .await?;
            Ok(OAuthProfile {
                provider: provider.as_str().to_string(),
                provider_account_id: info.sub,
                email: info.email,
                display_name: info.name,
                access_token: Some(access_token.to_string()),
                refresh_token: None,
            })
        }
        Provider::Github => {
            let user: GithubUser =
                get_json(http, provider, "https://api.github.com/user", access_token).await?;
            let email = match user.email {
                Some(email) => Some(email),
                None => {
                    let emails: Vec<GithubEmail> = get_json(
                        http,
                        provider,
                        "https://api.github.com/user/emails",
                        access_token,
                    )
                    .await
                    .unwrap_or_default();
                    emails
                        .into_iter()
                        .find(|e| e.primary && e.verified)
                        .map(|e| e.email)
                }
            };
            Ok(OAuthProfile {
                provider: provider.as_str().to_string(),
                provider_account_id: user.id.to_string(),
                email,
                display_name: user.name.or(Some(user.login)),
                access_token: Some(access_token.to_string()),
                refresh_token: None,
            })
        }
    }
}

async fn get_json<T: serde::de::DeserializeOwned>(
    http: &reqwest::Client,
    provider: Provider,
    url: &str,
    access_token: &str,
) -> Result<T, ApiError> {
    let response = http
        .get(url)
        .bearer_auth(access_token)
        .header(http::header::USER_AGENT, "strongbox-server")
        .header(http::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| provider_failure(provider, "profile fetch", &e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(provider_failure(
            provider,
            "profile fetch",
            &format!("HTTP {status}"),
        ));
    }
    response
        .json()
        .await
        .map_err(|e| provider_failure(provider, "profile decode", &e.to_string()))
}

fn provider_failure(provider: Provider, stage: &str, detail: &str) -> ApiError {
    error!(provider = provider.as_str(), stage, detail, "oauth provider call failed");
    ApiError::Service(strongbox_service::ServiceError::internal(format!(
        "oauth {stage} failed"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_client_state_and_scopes() {
        let client = OAuthClientConfig {
            client_id: "cid".into(),
            client_secret: "secret".into(),
            callback_url: "https://app.test/api/auth/github/callback".into(),
        };
        let url = authorize_url(Provider::Github, &client, "csrf-state").unwrap();
        assert!(url.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(url.contains("client_id=cid"));
        assert!(url.contains("state=csrf-state"));
        assert!(url.contains("response_type=code"));
        // The client secret never appears in a redirect.
        assert!(!url.contains("secret"));
    }

    #[test]
    fn provider_parses_from_path_segment() {
        assert_eq!("google".parse::<Provider>(), Ok(Provider::Google));
        assert_eq!("github".parse::<Provider>(), Ok(Provider::Github));
        assert!("gitlab".parse::<Provider>().is_err());
    }
}
