//! Authentication manager implementation.

use super::{
    errors::{AuthError, AuthResult},
    models::{AccessTokenClaims, LoginRequest, NewUser, RegisterRequest, User, UserId},
};
use crate::db::{RepositoryError, TournamentRepository};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::sync::Arc;

/// Authentication manager
#[derive(Clone)]
pub struct AuthManager {
    repo: Arc<dyn TournamentRepository>,
    pepper: String,
    jwt_secret: String,
    access_token_duration: Duration,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `repo` - Repository holding user records
    /// * `pepper` - Server-side pepper for password hashing
    /// * `jwt_secret` - Secret key for JWT signing
    pub fn new(repo: Arc<dyn TournamentRepository>, pepper: String, jwt_secret: String) -> Self {
        Self {
            repo,
            pepper,
            jwt_secret,
            access_token_duration: Duration::hours(12), // one playing session
        }
    }

    /// Override the access token lifetime
    pub fn with_access_token_duration(mut self, duration: Duration) -> Self {
        self.access_token_duration = duration;
        self
    }

    /// Register a new player account
    ///
    /// # Errors
    ///
    /// * `AuthError::EmailTaken` - Email already exists
    /// * `AuthError::InvalidEmail` - Email format invalid
    /// * `AuthError::MissingName` - Name is blank
    /// * `AuthError::WeakPassword` - Password too weak
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<User> {
        let email = normalize_email(&request.email)?;
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingName);
        }
        self.validate_password(&request.password)?;

        if self.repo.find_user_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hash_password(&request.password)?;
        let user = self
            .insert_user(NewUser {
                email,
                name: name.to_string(),
                password_hash,
                is_staff: false,
            })
            .await?;

        log::info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Find a user by email, creating one with `default_password` if absent
    ///
    /// Used for staff-entered registrations of walk-in players.
    pub async fn ensure_user(
        &self,
        email: &str,
        name: &str,
        default_password: &str,
    ) -> AuthResult<User> {
        let email = normalize_email(email)?;
        if let Some(user) = self.repo.find_user_by_email(&email).await? {
            return Ok(user);
        }

        let password_hash = self.hash_password(default_password)?;
        match self
            .insert_user(NewUser {
                email: email.clone(),
                name: name.trim().to_string(),
                password_hash,
                is_staff: false,
            })
            .await
        {
            Ok(user) => {
                log::info!("Created walk-in user {}", user.id);
                Ok(user)
            }
            // Lost a race with another request creating the same email
            Err(AuthError::EmailTaken) => self
                .repo
                .find_user_by_email(&email)
                .await?
                .ok_or(AuthError::UserNotFound),
            Err(e) => Err(e),
        }
    }

    /// Create the staff account if it does not exist yet
    pub async fn ensure_staff_account(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> AuthResult<User> {
        let email = normalize_email(email)?;
        if let Some(user) = self.repo.find_user_by_email(&email).await? {
            if !user.is_staff {
                log::warn!("Account {} exists but is not a staff account", user.id);
            }
            return Ok(user);
        }

        self.validate_password(password)?;
        let password_hash = self.hash_password(password)?;
        let user = self
            .insert_user(NewUser {
                email,
                name: name.trim().to_string(),
                password_hash,
                is_staff: true,
            })
            .await?;

        log::info!("Created staff account {}", user.id);
        Ok(user)
    }

    /// Login a user
    ///
    /// # Returns
    ///
    /// * `AuthResult<(User, String)>` - User and signed access token
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidCredentials` - Unknown email or wrong password
    pub async fn login(&self, request: LoginRequest) -> AuthResult<(User, String)> {
        let email = normalize_email(&request.email).map_err(|_| AuthError::InvalidCredentials)?;
        let user = self
            .repo
            .find_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        self.verify_password(&request.password, &user.password_hash)?;

        let token = self.generate_access_token(&user)?;
        Ok((user, token))
    }

    /// Verify an access token
    ///
    /// # Arguments
    ///
    /// * `token` - JWT access token
    ///
    /// # Returns
    ///
    /// * `AuthResult<AccessTokenClaims>` - Decoded claims or error
    pub fn verify_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        let token_data = decode::<AccessTokenClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }

    /// Re-check a user's password before a destructive action
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidCredentials` - Unknown user or wrong password
    pub async fn verify_user_password(&self, user_id: UserId, password: &str) -> AuthResult<User> {
        let user = self
            .repo
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        self.verify_password(password, &user.password_hash)?;
        Ok(user)
    }

    async fn insert_user(&self, new_user: NewUser) -> AuthResult<User> {
        match self.repo.insert_user(&new_user).await {
            Ok(user) => Ok(user),
            Err(RepositoryError::Conflict(_)) => Err(AuthError::EmailTaken),
            Err(e) => Err(e.into()),
        }
    }

    /// Hash password with Argon2id + pepper
    fn hash_password(&self, password: &str) -> AuthResult<String> {
        let peppered = format!("{}{}", password, self.pepper);
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        Ok(argon2
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?
            .to_string())
    }

    /// Verify password against hash
    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<()> {
        let peppered = format!("{}{}", password, self.pepper);
        let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
        let argon2 = Argon2::default();

        argon2
            .verify_password(peppered.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)
    }

    /// Generate JWT access token
    fn generate_access_token(&self, user: &User) -> AuthResult<String> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: user.id,
            email: user.email.clone(),
            is_staff: user.is_staff,
            exp: (now + self.access_token_duration).timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Validate password strength
    fn validate_password(&self, password: &str) -> AuthResult<()> {
        if password.len() < 8 {
            return Err(AuthError::WeakPassword(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        // Check for at least one number, one uppercase, one lowercase
        let has_digit = password.chars().any(|c| c.is_ascii_digit());
        let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
        let has_lowercase = password.chars().any(|c| c.is_ascii_lowercase());

        if !has_digit || !has_uppercase || !has_lowercase {
            return Err(AuthError::WeakPassword(
                "Password must contain at least one number, one uppercase and one lowercase letter"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

/// Trim and lowercase an email, rejecting obviously malformed ones
pub fn normalize_email(email: &str) -> AuthResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AuthError::InvalidEmail(email)),
    }
}
