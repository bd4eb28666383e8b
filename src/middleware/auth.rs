use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

use crate::config::AppConfig;
use crate::services::auth_service;
use crate::utils::error::AppError;

pub const TOKEN_HEADER: &str = "x-auth-token";

/// Token from `x-auth-token`, falling back to `Authorization: Bearer`.
fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Verifies the JWT and stores its `Claims` in the request extensions,
/// where handlers pick them up through `web::ReqData<Claims>`.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = match token_from_headers(req.headers()) {
            Some(token) => token,
            None => {
                log::warn!("🔒 {} {} - no token", req.method(), req.path());
                return Box::pin(async move {
                    Err(AppError::Unauthorized("No token, authorization denied".to_string()).into())
                });
            }
        };

        let config = match req.app_data::<web::Data<AppConfig>>() {
            Some(config) => config.clone(),
            None => {
                return Box::pin(async move {
                    Err(AppError::Internal("AppConfig is not registered".to_string()).into())
                });
            }
        };

        match auth_service::verify_token(&token, &config.jwt) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res)
                })
            }
            Err(e) => {
                log::warn!("🔒 {} {} - {}", req.method(), req.path(), e);
                Box::pin(async move { Err(e.into()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::models::user::User;
    use crate::services::auth_service::{issue_token, Claims};
    use actix_web::{body::to_bytes, http::StatusCode, test, App, HttpResponse};
    use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};

    async fn whoami(claims: web::ReqData<Claims>) -> HttpResponse {
        HttpResponse::Ok().body(claims.username.clone())
    }

    fn token() -> String {
        let user = User {
            id: Some(ObjectId::new()),
            username: "ines".to_string(),
            email: "ines@example.com".to_string(),
            password: String::new(),
            date: BsonDateTime::now(),
        };
        issue_token(&user, &test_config().jwt).unwrap()
    }

    macro_rules! app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(test_config()))
                    .service(web::resource("/me").wrap(AuthMiddleware).to(whoami)),
            )
            .await
        };
    }

    async fn rejection(err: Error) -> (StatusCode, serde_json::Value) {
        let response = err.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn accepts_x_auth_token() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header((TOKEN_HEADER, token()))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "ines");
    }

    #[actix_web::test]
    async fn accepts_bearer_token() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header((AUTHORIZATION, format!("Bearer {}", token())))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn missing_token_is_denied() {
        let app = app!();
        let req = test::TestRequest::get().uri("/me").to_request();
        let err = test::try_call_service(&app, req).await.err().unwrap();

        let (status, body) = rejection(err).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["msg"], "No token, authorization denied");
    }

    #[actix_web::test]
    async fn garbage_token_is_not_valid() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header((TOKEN_HEADER, "not.a.jwt"))
            .to_request();
        let err = test::try_call_service(&app, req).await.err().unwrap();

        let (status, body) = rejection(err).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["msg"], "Token is not valid");
    }

    #[::core::prelude::v1::test]
    fn x_auth_token_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            actix_web::http::header::HeaderValue::from_static("Bearer second"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("second"));

        headers.insert(
            actix_web::http::header::HeaderName::from_static(TOKEN_HEADER),
            actix_web::http::header::HeaderValue::from_static("first"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("first"));
    }
}
