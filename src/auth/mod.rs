//! Auth gateway: sign-in, sign-out and per-session identity.
//!
//! The console keeps the token set of each signed-in operator in memory,
//! keyed by an opaque session id carried in the auth cookie. Nothing about
//! the user is cached: every `current_user` call decodes the stored id token
//! again, so expiry and sign-out take effect on the very next call.

pub mod claims;
pub mod provider;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::IdentityConfig;
use crate::error::AuthError;
use crate::models::AuthUser;
use claims::{decode_claims, TokenClaims};

pub use provider::{CognitoProvider, IdentityProvider, TokenSet};

/// Credentials and role checks for the session a service acts on behalf of.
///
/// Services receive one of these at construction and consult it on every
/// call; implementations must not cache the answer across calls.
pub trait SessionAuthority: Send + Sync {
    /// The bearer credential for the next request.
    fn bearer_token(&self) -> Result<String, AuthError>;

    /// Succeeds only if the session currently holds the admin group.
    fn require_admin(&self) -> Result<AuthUser, AuthError>;
}

#[derive(Clone)]
struct StoredSession {
    tokens: TokenSet,
    signed_in_at: DateTime<Utc>,
}

struct GatewayInner {
    provider: Arc<dyn IdentityProvider>,
    sessions: DashMap<String, StoredSession>,
    groups_claim: String,
    admin_group: String,
    issuer: Option<String>,
}

/// Result of a successful sign-in
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub session_id: String,
    pub user: AuthUser,
}

#[derive(Clone)]
pub struct AuthGateway {
    inner: Arc<GatewayInner>,
}

impl AuthGateway {
    pub fn new(provider: Arc<dyn IdentityProvider>, config: &IdentityConfig) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                provider,
                sessions: DashMap::new(),
                groups_claim: config.groups_claim.clone(),
                admin_group: config.admin_group.clone(),
                issuer: config.issuer(),
            }),
        }
    }

    pub fn admin_group(&self) -> &str {
        &self.inner.admin_group
    }

    /// Exchange credentials for a new session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, AuthError> {
        let email = email.trim();
        let tokens = match self.inner.provider.initiate_auth(email, password).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(email = %email, error = %e, "Sign-in failed");
                return Err(e);
            }
        };

        let claims = self.claims(&tokens)?;
        let user = self.user_from_claims(&claims, email);

        let session_id = uuid::Uuid::new_v4().to_string();
        self.inner.sessions.insert(
            session_id.clone(),
            StoredSession {
                tokens,
                signed_in_at: Utc::now(),
            },
        );

        info!(
            email = %user.email,
            admin = user.in_group(&self.inner.admin_group),
            "Signed in"
        );

        Ok(SignedIn { session_id, user })
    }

    /// Drop the local session, then ask the provider to revoke its tokens.
    ///
    /// The local session is gone even when revocation fails.
    pub async fn sign_out(&self, session_id: &str) -> Result<(), AuthError> {
        let Some((_, stored)) = self.inner.sessions.remove(session_id) else {
            return Ok(());
        };

        debug!(
            signed_in_for = %(Utc::now() - stored.signed_in_at).num_seconds(),
            "Signing out"
        );

        if let Err(e) = self
            .inner
            .provider
            .global_sign_out(&stored.tokens.access_token)
            .await
        {
            warn!(error = %e, "Token revocation failed");
            return Err(e);
        }
        Ok(())
    }

    /// Handle for the session carried by a request (if any).
    pub fn session(&self, session_id: Option<String>) -> AuthSession {
        AuthSession {
            gateway: self.clone(),
            id: session_id,
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.inner.sessions.len()
    }

    pub fn is_active(&self, session_id: &str) -> bool {
        self.inner.sessions.contains_key(session_id)
    }

    /// Forget a session locally; the provider is not contacted.
    pub fn evict(&self, session_id: &str) {
        if self.inner.sessions.remove(session_id).is_some() {
            debug!("Session evicted");
        }
    }

    /// Remove every session whose id token has expired or no longer decodes,
    /// returning their ids.
    pub fn evict_expired(&self) -> Vec<String> {
        let now = Utc::now().timestamp();
        let stale: Vec<String> = self
            .inner
            .sessions
            .iter()
            .filter(|entry| {
                self.claims(&entry.tokens)
                    .map(|claims| claims.is_expired_at(now))
                    .unwrap_or(true)
            })
            .map(|entry| entry.key().clone())
            .collect();

        for id in &stale {
            self.inner.sessions.remove(id);
        }
        stale
    }

    fn claims(&self, tokens: &TokenSet) -> Result<TokenClaims, AuthError> {
        let claims = decode_claims(&tokens.id_token, &self.inner.groups_claim)?;
        if let Some(expected) = &self.inner.issuer {
            let actual = claims.iss.clone().unwrap_or_default();
            if &actual != expected {
                return Err(AuthError::WrongIssuer(actual));
            }
        }
        Ok(claims)
    }

    fn user_from_claims(&self, claims: &TokenClaims, fallback_email: &str) -> AuthUser {
        AuthUser {
            email: claims
                .email
                .clone()
                .unwrap_or_else(|| fallback_email.to_string()),
            groups: claims.groups.clone(),
        }
    }

    /// Tokens and claims of a live session; expired sessions are evicted.
    fn live(&self, session_id: &str) -> Result<(TokenSet, TokenClaims), AuthError> {
        let tokens = self
            .inner
            .sessions
            .get(session_id)
            .map(|entry| entry.tokens.clone())
            .ok_or(AuthError::NotSignedIn)?;

        let claims = match self.claims(&tokens) {
            Ok(claims) => claims,
            Err(e) => {
                self.inner.sessions.remove(session_id);
                return Err(e);
            }
        };

        if claims.is_expired_at(Utc::now().timestamp()) {
            self.inner.sessions.remove(session_id);
            debug!("Session token expired");
            return Err(AuthError::SessionExpired);
        }

        Ok((tokens, claims))
    }
}

/// The auth gateway bound to one request's session cookie.
#[derive(Clone)]
pub struct AuthSession {
    gateway: AuthGateway,
    id: Option<String>,
}

impl AuthSession {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The signed-in user, read from the stored session without prompting.
    pub fn current_user(&self) -> Result<AuthUser, AuthError> {
        let id = self.id.as_deref().ok_or(AuthError::NotSignedIn)?;
        let (_, claims) = self.gateway.live(id)?;
        Ok(self.gateway.user_from_claims(&claims, ""))
    }

    /// Fail-closed admin predicate for display purposes.
    pub fn is_admin(&self) -> bool {
        self.current_user()
            .map(|user| user.in_group(self.gateway.admin_group()))
            .unwrap_or(false)
    }
}

impl SessionAuthority for AuthSession {
    fn bearer_token(&self) -> Result<String, AuthError> {
        let id = self.id.as_deref().ok_or(AuthError::NotSignedIn)?;
        let (tokens, _) = self.gateway.live(id)?;
        Ok(tokens.id_token)
    }

    fn require_admin(&self) -> Result<AuthUser, AuthError> {
        let user = self.current_user()?;
        if user.in_group(self.gateway.admin_group()) {
            Ok(user)
        } else {
            Err(AuthError::AdminRequired)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use claims::tests::id_token;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FAR_FUTURE: i64 = 4_102_444_800;

    /// Identity provider double: password is the token to hand out.
    struct StaticProvider {
        sign_outs: AtomicUsize,
        fail_sign_out: bool,
    }

    impl StaticProvider {
        fn new() -> Self {
            Self {
                sign_outs: AtomicUsize::new(0),
                fail_sign_out: false,
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for StaticProvider {
        async fn initiate_auth(&self, _email: &str, password: &str) -> Result<TokenSet, AuthError> {
            if password == "wrong" {
                return Err(AuthError::InvalidCredentials);
            }
            Ok(TokenSet {
                id_token: password.to_string(),
                access_token: "access".to_string(),
            })
        }

        async fn global_sign_out(&self, _access_token: &str) -> Result<(), AuthError> {
            self.sign_outs.fetch_add(1, Ordering::SeqCst);
            if self.fail_sign_out {
                return Err(AuthError::Provider {
                    kind: "InternalErrorException".to_string(),
                    message: String::new(),
                });
            }
            Ok(())
        }
    }

    fn gateway_with(provider: StaticProvider) -> (AuthGateway, Arc<StaticProvider>) {
        let provider = Arc::new(provider);
        let gateway = AuthGateway::new(provider.clone(), &IdentityConfig::default());
        (gateway, provider)
    }

    #[tokio::test]
    async fn test_sign_in_decodes_groups() {
        let (gateway, _) = gateway_with(StaticProvider::new());
        let signed_in = gateway
            .sign_in("admin@example.com", &id_token("admin@example.com", &["Admin"], FAR_FUTURE))
            .await
            .unwrap();

        assert_eq!(signed_in.user.email, "admin@example.com");
        assert_eq!(signed_in.user.groups, vec!["Admin".to_string()]);

        let session = gateway.session(Some(signed_in.session_id));
        assert!(session.is_admin());
        assert!(session.require_admin().is_ok());
        assert!(session.bearer_token().is_ok());
    }

    #[tokio::test]
    async fn test_sign_in_failure_creates_no_session() {
        let (gateway, _) = gateway_with(StaticProvider::new());
        let err = gateway.sign_in("admin@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(gateway.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_non_admin_session() {
        let (gateway, _) = gateway_with(StaticProvider::new());
        let signed_in = gateway
            .sign_in("viewer@example.com", &id_token("viewer@example.com", &["Viewers"], FAR_FUTURE))
            .await
            .unwrap();

        let session = gateway.session(Some(signed_in.session_id));
        assert!(!session.is_admin());
        assert!(matches!(session.require_admin(), Err(AuthError::AdminRequired)));
        // reading stays open to any signed-in session
        assert!(session.bearer_token().is_ok());
    }

    #[tokio::test]
    async fn test_anonymous_session() {
        let (gateway, _) = gateway_with(StaticProvider::new());
        let session = gateway.session(None);
        assert!(matches!(session.current_user(), Err(AuthError::NotSignedIn)));
        assert!(!session.is_admin());

        let session = gateway.session(Some("unknown".to_string()));
        assert!(matches!(session.bearer_token(), Err(AuthError::NotSignedIn)));
    }

    #[tokio::test]
    async fn test_expired_token_ends_session() {
        let (gateway, _) = gateway_with(StaticProvider::new());
        let signed_in = gateway
            .sign_in("admin@example.com", &id_token("admin@example.com", &["Admin"], 1_000))
            .await
            .unwrap();

        let session = gateway.session(Some(signed_in.session_id));
        assert!(matches!(session.current_user(), Err(AuthError::SessionExpired)));
        assert_eq!(gateway.active_sessions(), 0);
        assert!(matches!(session.current_user(), Err(AuthError::NotSignedIn)));
    }

    #[tokio::test]
    async fn test_evict_expired_keeps_live_sessions() {
        let (gateway, provider) = gateway_with(StaticProvider::new());
        let live = gateway
            .sign_in("admin@example.com", &id_token("admin@example.com", &["Admin"], FAR_FUTURE))
            .await
            .unwrap();
        let stale = gateway
            .sign_in("admin@example.com", &id_token("admin@example.com", &["Admin"], 1_000))
            .await
            .unwrap();

        assert_eq!(gateway.evict_expired(), vec![stale.session_id.clone()]);
        assert!(gateway.is_active(&live.session_id));
        assert!(!gateway.is_active(&stale.session_id));
        assert!(gateway.evict_expired().is_empty());

        // local only, the provider is never asked to revoke
        gateway.evict(&live.session_id);
        assert_eq!(gateway.active_sessions(), 0);
        assert_eq!(provider.sign_outs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sign_out_removes_session() {
        let (gateway, provider) = gateway_with(StaticProvider::new());
        let signed_in = gateway
            .sign_in("admin@example.com", &id_token("admin@example.com", &["Admin"], FAR_FUTURE))
            .await
            .unwrap();

        tokio_test::assert_ok!(gateway.sign_out(&signed_in.session_id).await);
        assert_eq!(provider.sign_outs.load(Ordering::SeqCst), 1);

        let session = gateway.session(Some(signed_in.session_id.clone()));
        assert!(!session.is_admin());

        // signing out twice is a no-op
        tokio_test::assert_ok!(gateway.sign_out(&signed_in.session_id).await);
        assert_eq!(provider.sign_outs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sign_out_is_local_even_if_revocation_fails() {
        let (gateway, _) = gateway_with(StaticProvider {
            sign_outs: AtomicUsize::new(0),
            fail_sign_out: true,
        });
        let signed_in = gateway
            .sign_in("admin@example.com", &id_token("admin@example.com", &["Admin"], FAR_FUTURE))
            .await
            .unwrap();

        assert!(gateway.sign_out(&signed_in.session_id).await.is_err());
        assert_eq!(gateway.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_issuer_must_match_configured_pool() {
        let provider = Arc::new(StaticProvider::new());
        let config = IdentityConfig {
            user_pool_id: Some("us-east-1_other".to_string()),
            ..IdentityConfig::default()
        };
        let gateway = AuthGateway::new(provider, &config);

        let err = gateway
            .sign_in("admin@example.com", &id_token("admin@example.com", &["Admin"], FAR_FUTURE))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WrongIssuer(_)));
        assert_eq!(gateway.active_sessions(), 0);
    }
}
