use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::AuthError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// HS256 issuer and validator sharing one secret.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, lifetime_minutes: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256];
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime: Duration::minutes(lifetime_minutes),
        }
    }

    pub fn issue(&self, username: &str) -> Result<IssuedToken, AuthError> {
        self.issue_at(username, Utc::now())
    }

    fn issue_at(&self, username: &str, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let expires_at = now + self.lifetime;
        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| AuthError::Encoding(err.to_string()))?;

        Ok(IssuedToken {
            access_token,
            expires_at,
        })
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        if data.claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken("empty subject".into()));
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_validate_and_carry_subject() {
        let issuer = TokenIssuer::new("secret-a", 30);
        let token = issuer.issue("amy").unwrap();

        let claims = issuer.validate(&token.access_token).unwrap();
        assert_eq!(claims.sub, "amy");
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let token = TokenIssuer::new("secret-a", 30).issue("amy").unwrap();
        let other = TokenIssuer::new("secret-b", 30);

        assert!(matches!(
            other.validate(&token.access_token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let issuer = TokenIssuer::new("secret-a", 30);
        let token = issuer
            .issue_at("amy", Utc::now() - Duration::hours(2))
            .unwrap();

        assert!(matches!(
            issuer.validate(&token.access_token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn tokens_with_other_algorithms_are_rejected() {
        let issuer = TokenIssuer::new("secret-a", 30);
        let claims = Claims {
            sub: "amy".into(),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::minutes(5)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(b"secret-a"),
        )
        .unwrap();

        assert!(issuer.validate(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let issuer = TokenIssuer::new("secret-a", 30);
        assert!(issuer.validate("not.a.jwt").is_err());
    }
}
