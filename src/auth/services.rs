use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::auth::{
    dto::{LoginRequest, PublicUser, RegisterRequest},
    password::{hash_password_blocking, verify_dummy_blocking, verify_password_blocking},
    repo::{UserRepo, USER_CONFLICT},
    repo_types::{NewUser, User},
};
use crate::error::AppError;

pub const MAX_USERNAME_LEN: usize = 32;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 128;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Normalizes the request in place and checks field rules.
pub fn validate_registration(req: &mut RegisterRequest) -> Result<(), AppError> {
    req.username = req.username.trim().to_string();
    req.email = req.email.trim().to_lowercase();

    if req.username.is_empty() {
        return Err(AppError::Validation("username is required".into()));
    }
    if req.username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::Validation(format!(
            "username must be at most {MAX_USERNAME_LEN} characters"
        )));
    }
    if req.email.is_empty() {
        return Err(AppError::Validation("email is required".into()));
    }
    if !is_valid_email(&req.email) {
        return Err(AppError::Validation("email is invalid".into()));
    }
    if req.password.is_empty() {
        return Err(AppError::Validation("password is required".into()));
    }
    let len = req.password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at most {MAX_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_login(req: &mut LoginRequest) -> Result<(), AppError> {
    req.username = req.username.trim().to_string();
    if req.username.is_empty() {
        return Err(AppError::Validation("username is required".into()));
    }
    if req.password.is_empty() {
        return Err(AppError::Validation("password is required".into()));
    }
    Ok(())
}

/// Creates a user and returns its public projection.
pub async fn register_user(
    users: &dyn UserRepo,
    mut req: RegisterRequest,
) -> Result<PublicUser, AppError> {
    validate_registration(&mut req)?;

    if users
        .find_by_username_or_email(&req.username, &req.email)
        .await?
        .is_some()
    {
        warn!(username = %req.username, "username or email already registered");
        return Err(AppError::Conflict(USER_CONFLICT.into()));
    }

    let password_hash = hash_password_blocking(req.password).await?;

    let user = users
        .create(NewUser {
            username: req.username,
            email: req.email,
            password_hash,
        })
        .await?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(PublicUser::from(&user))
}

/// Checks credentials; every failure the client may see is the same [`AppError::Unauthorized`].
pub async fn authenticate(users: &dyn UserRepo, mut req: LoginRequest) -> Result<User, AppError> {
    validate_login(&mut req)?;

    let Some(user) = users.find_by_username(&req.username).await? else {
        verify_dummy_blocking(req.password).await;
        warn!(username = %req.username, "login unknown username");
        return Err(AppError::Unauthorized);
    };

    if !verify_password_blocking(req.password, user.password_hash.clone()).await? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::Unauthorized);
    }

    info!(user_id = user.id, "user logged in");
    Ok(user)
}
