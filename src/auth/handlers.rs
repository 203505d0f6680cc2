use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::auth::password;
use crate::auth::service::TokenPair;
use crate::auth::validate::{validate_registration, RegistrationData};
use crate::db::{Identity, NewAccount, Role};
use crate::error::{AppError, DatabaseError};
use crate::AppState;

const USER_ACTIVATION_TEMPLATE: &str = "user-activation-mail";
const SELLER_ACTIVATION_TEMPLATE: &str = "seller-activation-mail";
const FORGOT_PASSWORD_TEMPLATE: &str = "forgot-password-user-mail";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone_number: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub otp: String,
    pub phone_number: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyForgotPasswordRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub new_password: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::Buyer => "User",
        Role::Seller => "Seller",
    }
}

fn auth_cookie(name: &'static str, value: String, max_age: CookieDuration) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .finish()
}

fn session_cookies(
    role: Role,
    tokens: &TokenPair,
    state: &AppState,
) -> (Cookie<'static>, Cookie<'static>) {
    (
        auth_cookie(
            role.access_cookie(),
            tokens.access_token.clone(),
            CookieDuration::minutes(state.config.auth.access_token_minutes),
        ),
        auth_cookie(
            role.refresh_cookie(),
            tokens.refresh_token.clone(),
            CookieDuration::days(state.config.auth.refresh_token_days),
        ),
    )
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Restrictions are checked before the request is tracked, and the OTP only
/// goes out once both gates pass.
async fn start_registration(
    state: &AppState,
    role: Role,
    req: &RegisterRequest,
    template: &str,
) -> Result<HttpResponse, AppError> {
    validate_registration(
        &RegistrationData {
            name: &req.name,
            email: &req.email,
            password: &req.password,
            phone_number: req.phone_number.as_deref(),
            country: req.country.as_deref(),
        },
        role,
    )?;

    let email = normalize_email(&req.email);
    if state.accounts.find_by_email(role, &email).await?.is_some() {
        return Err(AppError::Validation(format!(
            "{} already exists with this email",
            role_label(role)
        )));
    }

    state.otp.check_restrictions(&email).await?;
    state.otp.track_request(&email).await?;
    state.otp.send_otp(req.name.trim(), &email, template).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "OTP sent to email. Please verify your account"
    })))
}

async fn complete_verification(
    state: &AppState,
    role: Role,
    req: &VerifyRequest,
) -> Result<HttpResponse, AppError> {
    validate_registration(
        &RegistrationData {
            name: &req.name,
            email: &req.email,
            password: &req.password,
            phone_number: req.phone_number.as_deref(),
            country: req.country.as_deref(),
        },
        role,
    )?;
    if req.otp.trim().is_empty() {
        return Err(AppError::Validation("OTP is required".to_string()));
    }

    let email = normalize_email(&req.email);
    if state.accounts.find_by_email(role, &email).await?.is_some() {
        return Err(AppError::Validation(format!(
            "{} already exists with this email",
            role_label(role)
        )));
    }

    state.otp.verify_otp(&email, &req.otp).await?;

    let password_hash = password::hash_password(&req.password)?;
    let account = state
        .accounts
        .create(NewAccount {
            role,
            name: req.name.trim().to_string(),
            email,
            password_hash,
            phone_number: req.phone_number.as_deref().map(|p| p.trim().to_string()),
            country: req.country.as_deref().map(|c| c.trim().to_string()),
        })
        .await
        .map_err(|err| match err {
            // A concurrent verification can still win the unique index.
            DatabaseError::Duplicate => AppError::Validation(format!(
                "{} already exists with this email",
                role_label(role)
            )),
            other => AppError::Database(other),
        })?;

    info!("Created {} account for {}", role, account.email);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "user": account
    })))
}

async fn login_for_role(
    state: &AppState,
    role: Role,
    req: &LoginRequest,
) -> Result<HttpResponse, AppError> {
    if req.email.trim().is_empty() || req.password.trim().is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let email = normalize_email(&req.email);
    let (account, tokens) = state.auth.login(role, &email, &req.password).await?;
    let (access_cookie, refresh_cookie) = session_cookies(role, &tokens, state);

    info!("Login successful for {} {}", role, account.email);
    Ok(HttpResponse::Ok()
        .cookie(access_cookie)
        .cookie(refresh_cookie)
        .json(json!({
            "message": "Login successful",
            "user": account,
            "access_token": tokens.access_token
        })))
}

/// Both role cookies may be present at once; the endpoint's own role is
/// tried first so dual sessions resolve to the expected account.
async fn current_account(
    req: &HttpRequest,
    state: &AppState,
    preferred: Role,
) -> Result<Identity, AppError> {
    let fallback = match preferred {
        Role::Buyer => Role::Seller,
        Role::Seller => Role::Buyer,
    };

    let token = req
        .cookie(preferred.access_cookie())
        .or_else(|| req.cookie(fallback.access_cookie()))
        .map(|c| c.value().to_string())
        .or_else(|| bearer_token(req))
        .ok_or_else(|| AppError::Unauthorized("No access token provided".to_string()))?;

    state.auth.authenticate(&token).await
}

pub async fn user_registration(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Registration request for {}", req.email);
    start_registration(&state, Role::Buyer, &req, USER_ACTIVATION_TEMPLATE)
        .await
        .map_err(|e| {
            error!("Registration failed for {}: {}", req.email, e);
            e
        })
}

pub async fn verify_user(
    req: web::Json<VerifyRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Verification request for {}", req.email);
    complete_verification(&state, Role::Buyer, &req).await
}

pub async fn login_user(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    login_for_role(&state, Role::Buyer, &req).await
}

pub async fn seller_registration(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Seller registration request for {}", req.email);
    start_registration(&state, Role::Seller, &req, SELLER_ACTIVATION_TEMPLATE)
        .await
        .map_err(|e| {
            error!("Seller registration failed for {}: {}", req.email, e);
            e
        })
}

pub async fn verify_seller(
    req: web::Json<VerifyRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Seller verification request for {}", req.email);
    complete_verification(&state, Role::Seller, &req).await
}

pub async fn login_seller(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    login_for_role(&state, Role::Seller, &req).await
}

/// Accepts the refresh token from either role's cookie or a bearer header;
/// the token itself says which partition it belongs to.
pub async fn refresh_token(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = req
        .cookie(Role::Buyer.refresh_cookie())
        .or_else(|| req.cookie(Role::Seller.refresh_cookie()))
        .map(|c| c.value().to_string())
        .or_else(|| bearer_token(&req))
        .ok_or_else(|| AppError::Unauthorized("No refresh token provided".to_string()))?;

    let (account, access_token) = state.auth.refresh(&token).await?;

    let cookie = auth_cookie(
        account.role.access_cookie(),
        access_token.clone(),
        CookieDuration::minutes(state.config.auth.access_token_minutes),
    );

    Ok(HttpResponse::Ok().cookie(cookie).json(json!({
        "success": true,
        "access_token": access_token
    })))
}

pub async fn logged_in_user(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let account = current_account(&req, &state, Role::Buyer).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "user": account })))
}

pub async fn logged_in_seller(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let account = current_account(&req, &state, Role::Seller).await?;
    if account.role != Role::Seller {
        return Err(AppError::Forbidden("Seller access only".to_string()));
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true, "seller": account })))
}

pub async fn forgot_password(
    req: web::Json<ForgotPasswordRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let email = normalize_email(&req.email);
    if email.is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }

    let account = state
        .accounts
        .find_by_email(Role::Buyer, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    state.otp.check_restrictions(&email).await?;
    state.otp.track_request(&email).await?;
    state
        .otp
        .send_otp(&account.name, &email, FORGOT_PASSWORD_TEMPLATE)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "OTP sent to email. Please verify to reset your password"
    })))
}

pub async fn verify_forgot_password(
    req: web::Json<VerifyForgotPasswordRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.otp.trim().is_empty() {
        return Err(AppError::Validation("Email and OTP are required".to_string()));
    }

    state.otp.verify_otp(&email, &req.otp).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "OTP verified. You can now reset your password"
    })))
}

pub async fn reset_password(
    req: web::Json<ResetPasswordRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.new_password.trim().is_empty() {
        return Err(AppError::Validation(
            "Email and new password are required".to_string(),
        ));
    }

    let account = state
        .accounts
        .find_by_email(Role::Buyer, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if password::verify_password(&req.new_password, &account.password_hash)? {
        return Err(AppError::Validation(
            "New password cannot be the same as the old password".to_string(),
        ));
    }

    let password_hash = password::hash_password(&req.new_password)?;
    state
        .accounts
        .update_password(Role::Buyer, &email, &password_hash)
        .await?;

    info!("Password reset for {}", email);
    Ok(HttpResponse::Ok().json(json!({ "message": "Password reset successfully" })))
}
