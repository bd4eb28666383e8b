use actix_web::{web, HttpResponse};

use crate::api::caller_id;
use crate::config::AppConfig;
use crate::database::MongoDB;
use crate::models::user::{LoginRequest, SignupRequest, TokenResponse, UserResponse};
use crate::services::{auth_service, Claims};
use crate::utils::error::AppError;

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "Auth",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Account created", body = TokenResponse),
        (status = 400, description = "Missing field or user already exists")
    )
)]
pub async fn signup(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    request: web::Json<SignupRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /auth/signup - email: {}", request.email);

    let token = auth_service::signup(&db, &config.jwt, &request)
        .await
        .map_err(|e| {
            log::warn!("❌ Signup failed: {} - {}", request.email, e);
            e
        })?;

    Ok(HttpResponse::Ok().json(token))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Invalid credentials")
    )
)]
pub async fn login(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    let token = auth_service::login(&db, &config.jwt, &request)
        .await
        .map_err(|e| {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            e
        })?;

    log::info!("✅ Login successful: {}", request.email);
    Ok(HttpResponse::Ok().json(token))
}

#[utoipa::path(
    get,
    path = "/api/auth",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_current_user(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("👤 GET /auth - user: {}", claims.id);

    let user = auth_service::current_user(&db, &caller_id(&claims)?).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    delete,
    path = "/api/auth",
    tag = "Auth",
    responses(
        (status = 200, description = "Account and owned data removed"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_account(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("🗑️  DELETE /auth - user: {}", claims.id);

    auth_service::delete_account(&db, &caller_id(&claims)?).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "msg": "User account deleted" })))
}
