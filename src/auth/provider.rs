//! Identity provider client.
//!
//! Talks to the Cognito user pool JSON API directly: `InitiateAuth` with the
//! `USER_PASSWORD_AUTH` flow to sign in and `GlobalSignOut` to revoke.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::fmt;

use crate::config::IdentityConfig;
use crate::error::AuthError;

/// Tokens handed out by the identity provider for one session.
#[derive(Clone)]
pub struct TokenSet {
    pub id_token: String,
    pub access_token: String,
}

// Tokens must never end up in logs
impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("id_token", &"<redacted>")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange credentials for a token set.
    async fn initiate_auth(&self, email: &str, password: &str) -> Result<TokenSet, AuthError>;

    /// Revoke every token issued for the session owning `access_token`.
    async fn global_sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}

/// Cognito user pool client.
pub struct CognitoProvider {
    endpoint: String,
    client_id: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    authentication_result: Option<AuthenticationResult>,
    challenge_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    access_token: String,
    id_token: String,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderErrorBody {
    #[serde(rename = "__type", default)]
    kind: Option<String>,
    #[serde(alias = "Message", default)]
    message: Option<String>,
}

impl CognitoProvider {
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            endpoint: config.endpoint_url(),
            client_id: config.client_id.clone(),
            client: reqwest::Client::new(),
        }
    }

    async fn call(&self, target: &str, body: serde_json::Value) -> Result<reqwest::Response, AuthError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/x-amz-json-1.1")
            .header(
                "X-Amz-Target",
                format!("AWSCognitoIdentityProviderService.{}", target),
            )
            .body(body.to_string())
            .send()
            .await
            .map_err(AuthError::Transport)?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let error: ProviderErrorBody = serde_json::from_str(&text).unwrap_or_default();
        // "com.amazonaws...#NotAuthorizedException" -> "NotAuthorizedException"
        let kind = error
            .kind
            .as_deref()
            .map(|k| k.rsplit('#').next().unwrap_or(k).to_string())
            .unwrap_or_else(|| status.to_string());

        Err(match kind.as_str() {
            "NotAuthorizedException" | "UserNotFoundException" => AuthError::InvalidCredentials,
            _ => AuthError::Provider {
                kind,
                message: error.message.unwrap_or_default(),
            },
        })
    }
}

#[async_trait]
impl IdentityProvider for CognitoProvider {
    async fn initiate_auth(&self, email: &str, password: &str) -> Result<TokenSet, AuthError> {
        let response = self
            .call(
                "InitiateAuth",
                json!({
                    "AuthFlow": "USER_PASSWORD_AUTH",
                    "ClientId": self.client_id,
                    "AuthParameters": {
                        "USERNAME": email,
                        "PASSWORD": password,
                    },
                }),
            )
            .await?;

        let body: InitiateAuthResponse = response.json().await.map_err(AuthError::Transport)?;

        match (body.authentication_result, body.challenge_name) {
            (Some(result), _) => Ok(TokenSet {
                id_token: result.id_token,
                access_token: result.access_token,
            }),
            (None, Some(challenge)) => Err(AuthError::ChallengeRequired(challenge)),
            (None, None) => Err(AuthError::Provider {
                kind: "EmptyResponse".to_string(),
                message: "InitiateAuth returned neither tokens nor a challenge".to_string(),
            }),
        }
    }

    async fn global_sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.call("GlobalSignOut", json!({ "AccessToken": access_token }))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::Value;

    async fn fake_cognito(headers: HeaderMap, body: String) -> (StatusCode, Json<Value>) {
        let target = headers
            .get("X-Amz-Target")
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body: Value = serde_json::from_str(&body).unwrap_or_default();

        match target.as_str() {
            "AWSCognitoIdentityProviderService.InitiateAuth" => {
                let password = body["AuthParameters"]["PASSWORD"].as_str().unwrap_or_default();
                match password {
                    "correct-horse" => (
                        StatusCode::OK,
                        Json(serde_json::json!({
                            "AuthenticationResult": {
                                "AccessToken": "access",
                                "IdToken": "id",
                                "RefreshToken": "refresh",
                                "ExpiresIn": 3600,
                                "TokenType": "Bearer"
                            }
                        })),
                    ),
                    "first-login" => (
                        StatusCode::OK,
                        Json(serde_json::json!({ "ChallengeName": "NEW_PASSWORD_REQUIRED", "Session": "s" })),
                    ),
                    _ => (
                        StatusCode::BAD_REQUEST,
                        Json(serde_json::json!({
                            "__type": "NotAuthorizedException",
                            "message": "Incorrect username or password."
                        })),
                    ),
                }
            }
            "AWSCognitoIdentityProviderService.GlobalSignOut" => {
                (StatusCode::OK, Json(serde_json::json!({})))
            }
            _ => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "__type": "com.amazonaws#UnknownOperationException" })),
            ),
        }
    }

    async fn provider() -> CognitoProvider {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, Router::new().route("/", post(fake_cognito)))
                .await
                .unwrap();
        });

        CognitoProvider::new(&IdentityConfig {
            endpoint: Some(format!("http://{}/", addr)),
            client_id: "client".to_string(),
            ..IdentityConfig::default()
        })
    }

    #[tokio::test]
    async fn test_initiate_auth_success() {
        let provider = provider().await;
        let tokens = provider
            .initiate_auth("admin@example.com", "correct-horse")
            .await
            .unwrap();
        assert_eq!(tokens.id_token, "id");
        assert_eq!(tokens.access_token, "access");
    }

    #[tokio::test]
    async fn test_initiate_auth_wrong_password() {
        let provider = provider().await;
        let err = provider
            .initiate_auth("admin@example.com", "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_initiate_auth_challenge() {
        let provider = provider().await;
        let err = provider
            .initiate_auth("admin@example.com", "first-login")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ChallengeRequired(ref c) if c == "NEW_PASSWORD_REQUIRED"));
    }

    #[tokio::test]
    async fn test_global_sign_out() {
        let provider = provider().await;
        tokio_test::assert_ok!(provider.global_sign_out("access").await);
    }

    #[test]
    fn test_token_set_debug_is_redacted() {
        let tokens = TokenSet {
            id_token: "secret-id".to_string(),
            access_token: "secret-access".to_string(),
        };
        let debug = format!("{:?}", tokens);
        assert!(!debug.contains("secret"));
    }
}
