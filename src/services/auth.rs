use std::future::{Ready, ready};
use std::sync::LazyLock;

use actix_web::{FromRequest, HttpRequest, dev::Payload, web::Data};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::config::Config;
use crate::database::models::{
    AuthResponse, ChangeEmailInput, ChangeEmailResponse, ChangePasswordInput, LoginInput, Profile,
    SignupInput, SignupResponse, TokenPurpose,
};
use crate::database::repositories::{EmailTokenRepository, ProfileRepository};
use crate::error::{AppError, AuthFailure, ConflictReason};
use crate::services::user_context::{UserContext, UserContextService};

const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles")
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // user id
    pub email: String,
    /// Session epoch the token was issued under
    pub epoch: i64,
    pub iat: usize,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Uuid {
        self.sub
    }
}

impl FromRequest for Claims {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        let Some(token) = token else {
            return ready(Err(AppError::Unauthorized(
                "Missing or invalid authorization header".to_string(),
            )));
        };

        let Some(config) = req.app_data::<Data<Config>>() else {
            return ready(Err(AppError::internal_server_error_message(
                "Configuration not available",
            )));
        };

        ready(decode_token(token, &config.jwt_secret))
    }
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        log::debug!("Rejected bearer token: {}", e);
        AppError::Unauthorized("Invalid token".to_string())
    })
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(AppError::validation("email", "must be a valid email address"))
    }
}

pub fn validate_password(field: &str, password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            field,
            format!("must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct AuthService {
    pool: SqlitePool,
    profile_repository: ProfileRepository,
    email_token_repository: EmailTokenRepository,
    contexts: UserContextService,
    config: Config,
}

impl AuthService {
    pub fn new(
        pool: SqlitePool,
        profile_repository: ProfileRepository,
        email_token_repository: EmailTokenRepository,
        contexts: UserContextService,
        config: Config,
    ) -> Self {
        Self {
            pool,
            profile_repository,
            email_token_repository,
            contexts,
            config,
        }
    }

    pub async fn signup(&self, input: SignupInput) -> Result<SignupResponse, AppError> {
        let email = normalize_email(&input.email);
        validate_email(&email)?;
        validate_password("password", &input.password)?;
        let full_name = input.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(AppError::validation("full_name", "is required"));
        }

        if self.profile_repository.email_exists(&email).await? {
            return Err(AppError::Conflict(ConflictReason::EmailTaken));
        }

        let password_hash = self.hash_password(&input.password)?;
        let mut profile = Profile::new(email, password_hash, full_name);
        if !self.config.require_email_confirmation {
            profile.email_confirmed_at = Some(profile.created_at);
        }
        let profile = self.profile_repository.create(&profile).await?;
        log::info!("Created profile {} for {}", profile.id, profile.email);

        if self.config.require_email_confirmation {
            let token = self
                .email_token_repository
                .create(profile.id, TokenPurpose::SignupConfirmation, None)
                .await?;
            log::info!(
                "Signup confirmation token for {}: {}",
                profile.email,
                token.token
            );

            return Ok(SignupResponse {
                session: None,
                confirmation_required: true,
                confirmation_token: self.expose_token(token.token),
            });
        }

        let token = self.generate_token(&profile)?;
        Ok(SignupResponse {
            session: Some(AuthResponse { token, profile }),
            confirmation_required: false,
            confirmation_token: None,
        })
    }

    pub async fn login(&self, input: LoginInput) -> Result<AuthResponse, AppError> {
        let email = normalize_email(&input.email);
        let profile = self
            .profile_repository
            .find_by_email(&email)
            .await?
            .ok_or(AppError::Auth(AuthFailure::InvalidCredentials))?;

        if !self.password_matches(&input.password, &profile.password_hash)? {
            return Err(AppError::Auth(AuthFailure::InvalidCredentials));
        }

        if self.config.require_email_confirmation && profile.email_confirmed_at.is_none() {
            return Err(AppError::Auth(AuthFailure::EmailNotConfirmed));
        }

        let token = self.generate_token(&profile)?;
        Ok(AuthResponse { token, profile })
    }

    /// Revokes every outstanding token of the caller
    pub async fn logout(&self, context: &UserContext) -> Result<(), AppError> {
        let epoch = self
            .profile_repository
            .bump_session_epoch(context.user_id())
            .await?;
        self.contexts.invalidate(context.user_id()).await;
        log::info!("Profile {} signed out (epoch {})", context.user_id(), epoch);
        Ok(())
    }

    pub async fn change_password(
        &self,
        context: &UserContext,
        input: ChangePasswordInput,
    ) -> Result<AuthResponse, AppError> {
        if !self.password_matches(&input.current_password, &context.profile.password_hash)? {
            return Err(AppError::Auth(AuthFailure::InvalidCredentials));
        }
        validate_password("new_password", &input.new_password)?;

        let password_hash = self.hash_password(&input.new_password)?;
        self.profile_repository
            .update_password_hash(context.user_id(), &password_hash)
            .await?;
        self.profile_repository
            .bump_session_epoch(context.user_id())
            .await?;
        self.contexts.invalidate(context.user_id()).await;

        let profile = self.reload(context.user_id()).await?;
        let token = self.generate_token(&profile)?;
        Ok(AuthResponse { token, profile })
    }

    /// Starts an email change; the address only switches once the token is confirmed
    pub async fn request_email_change(
        &self,
        context: &UserContext,
        input: ChangeEmailInput,
    ) -> Result<ChangeEmailResponse, AppError> {
        if !self.password_matches(&input.password, &context.profile.password_hash)? {
            return Err(AppError::Auth(AuthFailure::InvalidCredentials));
        }

        let new_email = normalize_email(&input.new_email);
        validate_email(&new_email)?;
        if self.profile_repository.email_exists(&new_email).await? {
            return Err(AppError::Conflict(ConflictReason::EmailTaken));
        }

        let token = self
            .email_token_repository
            .create(context.user_id(), TokenPurpose::EmailChange, Some(&new_email))
            .await?;
        log::info!(
            "Email change token for profile {} ({}): {}",
            context.user_id(),
            new_email,
            token.token
        );

        Ok(ChangeEmailResponse {
            pending_email: new_email,
            confirmation_token: self.expose_token(token.token),
        })
    }

    /// Applies a signup confirmation or email change token
    pub async fn confirm(&self, token: &str) -> Result<Profile, AppError> {
        let record = self
            .email_token_repository
            .find_by_token(token)
            .await?
            .ok_or_else(|| AppError::validation("token", "is not recognised"))?;

        if !record.is_usable(Utc::now()) {
            return Err(AppError::validation("token", "has expired or was already used"));
        }

        let mut tx = self.pool.begin().await?;
        if !self
            .email_token_repository
            .mark_used(&mut tx, record.id)
            .await?
        {
            return Err(AppError::Conflict(ConflictReason::StateChanged));
        }

        match (record.purpose, record.new_email.as_deref()) {
            (TokenPurpose::SignupConfirmation, _) => {
                self.profile_repository
                    .confirm_email(&mut tx, record.profile_id)
                    .await?;
            }
            (TokenPurpose::EmailChange, Some(new_email)) => {
                self.profile_repository
                    .change_email(&mut tx, record.profile_id, new_email)
                    .await?;
            }
            (TokenPurpose::EmailChange, None) => {
                return Err(AppError::internal_server_error_message(
                    "email change token without an address",
                ));
            }
        }
        tx.commit().await?;

        let purged = self.email_token_repository.delete_expired().await?;
        if purged > 0 {
            log::debug!("Purged {} expired email tokens", purged);
        }

        self.contexts.invalidate(record.profile_id).await;
        log::info!(
            "Applied {} token for profile {}",
            record.purpose,
            record.profile_id
        );
        self.reload(record.profile_id).await
    }

    pub fn generate_token(&self, profile: &Profile) -> Result<String, AppError> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(Duration::days(self.config.jwt_expiration_days))
            .ok_or_else(|| AppError::internal_server_error_message("invalid token expiry"))?;

        let claims = Claims {
            sub: profile.id,
            email: profile.email.clone(),
            epoch: profile.session_epoch,
            iat: now.timestamp() as usize,
            exp: expiration.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_ref()),
        )
        .map_err(|e| AppError::internal_server_error_message(e.to_string()))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        decode_token(token, &self.config.jwt_secret)
    }

    async fn reload(&self, id: Uuid) -> Result<Profile, AppError> {
        self.profile_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile not found"))
    }

    fn hash_password(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.config.bcrypt_cost)
            .map_err(|e| AppError::internal_server_error_message(e.to_string()))
    }

    fn password_matches(&self, password: &str, password_hash: &str) -> Result<bool, AppError> {
        verify(password, password_hash)
            .map_err(|e| AppError::internal_server_error_message(e.to_string()))
    }

    fn expose_token(&self, token: String) -> Option<String> {
        if self.config.is_production() {
            None
        } else {
            Some(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_pattern_accepts_plain_addresses() {
        assert!(validate_email("a.person@example.com").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("two@@example.com").is_err());
    }

    #[test]
    fn short_passwords_name_the_field() {
        let err = validate_password("new_password", "short").unwrap_err();
        assert_eq!(err.detail().field.as_deref(), Some("new_password"));
        assert!(validate_password("password", "long enough").is_ok());
    }

    #[test]
    fn emails_are_compared_case_insensitively() {
        assert_eq!(normalize_email("  Someone@Example.COM "), "someone@example.com");
    }

    #[test]
    fn tampered_tokens_are_unauthorized() {
        let err = decode_token("not.a.jwt", "secret").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Unauthorized);
    }
}
