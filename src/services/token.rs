use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::entities::users;

/// Bearer-token claims. Validity is a pure function of signature and expiry;
/// no server-side session store is consulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub username: String,
    pub uid: i64,
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_days: i64,
}

impl TokenSigner {
    #[must_use]
    pub fn new(secret: &[u8], ttl_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_days,
        }
    }

    /// Sign a session token for the user. The admin claim is derived from
    /// the role column at issuance time.
    pub fn issue(&self, user: &users::Model) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            user_id: user.id,
            username: user.username.clone(),
            uid: user.uid,
            is_admin: user.is_admin(),
            iat: now.timestamp(),
            exp: (now + chrono::Duration::days(self.ttl_days)).timestamp(),
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::now_rfc3339;
    use crate::entities::users::Role;

    fn test_user(role: Role, uid: i64) -> users::Model {
        let now = now_rfc3339();
        users::Model {
            id: 7,
            username: "tester".to_string(),
            email: "tester@example.com".to_string(),
            password_hash: None,
            uid,
            role,
            is_verified: true,
            discord_id: None,
            discord_username: None,
            discord_avatar: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[test]
    fn roundtrip_preserves_claims() {
        let signer = TokenSigner::new(b"test-secret", 7);
        let token = signer.issue(&test_user(Role::User, 42)).unwrap();
        let claims = signer.verify(&token).unwrap();

        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.username, "tester");
        assert_eq!(claims.uid, 42);
        assert!(!claims.is_admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn admin_claim_is_derived_from_role() {
        let signer = TokenSigner::new(b"test-secret", 7);

        let token = signer.issue(&test_user(Role::Admin, 5)).unwrap();
        assert!(signer.verify(&token).unwrap().is_admin);

        let token = signer.issue(&test_user(Role::Owner, 1)).unwrap();
        assert!(signer.verify(&token).unwrap().is_admin);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let signer = TokenSigner::new(b"test-secret", 7);
        let token = signer.issue(&test_user(Role::User, 2)).unwrap();

        let other = TokenSigner::new(b"another-secret", 7);
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = TokenSigner::new(b"test-secret", 7);

        // Encode claims already past expiry (beyond the default 60s leeway).
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: 1,
            username: "tester".to_string(),
            uid: 2,
            is_admin: false,
            iat: now - 1000,
            exp: now - 500,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(signer.verify(&token).is_err());
    }
}
