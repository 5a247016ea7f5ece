use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::config::EnvironmentConfig;
use crate::models::auth::JwtClaims;
use crate::models::profile::Role;
use crate::utils::errors::{AppError, AppResult};

/// Configuración JWT
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub access_token_duration: Duration,
}

impl JwtConfig {
    pub fn from_environment(config: &EnvironmentConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            algorithm: Algorithm::HS256,
            access_token_duration: Duration::seconds(config.jwt_expiration as i64),
        }
    }
}

/// Token emitido junto con su expiración
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Servicio JWT
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_ref());
        let decoding_key = DecodingKey::from_secret(config.secret.as_ref());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn token_duration(&self) -> Duration {
        self.config.access_token_duration
    }

    /// Genera un token de acceso ligado a una sesión
    pub fn issue(&self, user_id: Uuid, role: Role, session_id: Uuid) -> AppResult<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + self.config.access_token_duration;

        let claims = JwtClaims {
            sub: user_id.to_string(),
            role: role.as_str().to_string(),
            sid: session_id.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::new(self.config.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AppError::Jwt(format!("Error generating access token: {}", e)))?;

        // El token sólo lleva segundos; la expiración reportada debe coincidir
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or(expires_at);

        Ok(IssuedToken { token, expires_at })
    }

    /// Valida y decodifica un token
    pub fn validate_token(&self, token: &str) -> AppResult<JwtClaims> {
        let validation = Validation::new(self.config.algorithm);

        decode::<JwtClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Jwt(format!("Invalid token: {}", e)))
    }
}
