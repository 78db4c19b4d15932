//! Reading identity claims out of session tokens.
//!
//! Signatures are not verified here: the gallery API verifies every bearer
//! token it receives. The console only needs the email, the group list and
//! the expiry to drive its UI and its fail-fast admin checks.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

use crate::error::AuthError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub email: Option<String>,
    pub groups: Vec<String>,
    pub exp: Option<i64>,
    pub iss: Option<String>,
}

impl TokenClaims {
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp.map(|exp| now >= exp).unwrap_or(false)
    }
}

/// Decode the payload of a JWT without checking its signature.
pub fn decode_claims(token: &str, groups_claim: &str) -> Result<TokenClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<Map<String, Value>>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(AuthError::MalformedToken)?;
    let claims = data.claims;

    let email = ["email", "cognito:username", "username"]
        .iter()
        .find_map(|key| claims.get(*key).and_then(Value::as_str))
        .map(str::to_string);

    let groups = match claims.get(groups_claim) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(single)) => vec![single.clone()],
        _ => Vec::new(),
    };

    Ok(TokenClaims {
        email,
        groups,
        exp: claims.get("exp").and_then(Value::as_i64),
        iss: claims.get("iss").and_then(Value::as_str).map(str::to_string),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    /// Sign a token the way the identity provider would, with a test key.
    pub(crate) fn token(claims: Value) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-signing-key"),
        )
        .unwrap()
    }

    pub(crate) fn id_token(email: &str, groups: &[&str], exp: i64) -> String {
        token(json!({
            "sub": "0b5e2f7a",
            "aud": "client",
            "email": email,
            "cognito:groups": groups,
            "exp": exp,
            "iss": "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_pool",
        }))
    }

    #[test]
    fn test_decode_groups_and_email() {
        let claims = decode_claims(
            &id_token("admin@example.com", &["Admin", "Editors"], 4_102_444_800),
            "cognito:groups",
        )
        .unwrap();

        assert_eq!(claims.email.as_deref(), Some("admin@example.com"));
        assert_eq!(claims.groups, vec!["Admin".to_string(), "Editors".to_string()]);
        assert_eq!(claims.exp, Some(4_102_444_800));
        assert!(!claims.is_expired_at(1_700_000_000));
        assert!(claims.is_expired_at(4_102_444_800));
    }

    #[test]
    fn test_missing_groups_claim_is_empty() {
        let claims = decode_claims(
            &token(json!({ "cognito:username": "viewer", "exp": 4_102_444_800i64 })),
            "cognito:groups",
        )
        .unwrap();
        assert!(claims.groups.is_empty());
        assert_eq!(claims.email.as_deref(), Some("viewer"));
    }

    #[test]
    fn test_custom_groups_claim_single_string() {
        let claims = decode_claims(&token(json!({ "roles": "Admin" })), "roles").unwrap();
        assert_eq!(claims.groups, vec!["Admin".to_string()]);
        assert!(claims.exp.is_none());
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let err = decode_claims("not-a-jwt", "cognito:groups").unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken(_)));
    }
}
