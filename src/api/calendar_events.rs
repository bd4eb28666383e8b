use actix_web::{web, HttpResponse};

use crate::api::caller_id;
use crate::database::MongoDB;
use crate::models::calendar_event::{CalendarEventResponse, CreateEventRequest, UpdateEventRequest};
use crate::services::{calendar_event_service, Claims};
use crate::utils::error::AppError;

#[utoipa::path(
    get,
    path = "/api/calendarEvents",
    tag = "Calendar",
    responses(
        (status = 200, description = "Caller's events by start time", body = [CalendarEventResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn list(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("📅 GET /calendarEvents - user: {}", claims.id);

    let events = calendar_event_service::list(&db, &caller_id(&claims)?).await?;
    Ok(HttpResponse::Ok().json(events))
}

#[utoipa::path(
    post,
    path = "/api/calendarEvents",
    tag = "Calendar",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = CalendarEventResponse),
        (status = 400, description = "Missing title or end before start")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    request: web::Json<CreateEventRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📅 POST /calendarEvents - user: {}, title: {}", claims.id, request.title);

    let event = calendar_event_service::create(&db, &caller_id(&claims)?, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(event))
}

#[utoipa::path(
    put,
    path = "/api/calendarEvents/{id}",
    tag = "Calendar",
    params(("id" = String, Path, description = "Event id")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Updated event", body = CalendarEventResponse),
        (status = 401, description = "User not authorized"),
        (status = 404, description = "Event not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<UpdateEventRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("✏️  PUT /calendarEvents/{} - user: {}", path, claims.id);

    let event = calendar_event_service::update(&db, &caller_id(&claims)?, &path, &request).await?;
    Ok(HttpResponse::Ok().json(event))
}

#[utoipa::path(
    delete,
    path = "/api/calendarEvents/{id}",
    tag = "Calendar",
    params(("id" = String, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event removed"),
        (status = 401, description = "User not authorized"),
        (status = 404, description = "Event not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    log::info!("🗑️  DELETE /calendarEvents/{} - user: {}", path, claims.id);

    calendar_event_service::delete(&db, &caller_id(&claims)?, &path).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "msg": "Event removed" })))
}
