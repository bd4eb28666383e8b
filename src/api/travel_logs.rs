use actix_web::{web, HttpResponse};

use crate::api::caller_id;
use crate::database::MongoDB;
use crate::models::travel_log::{
    AddLogMemberRequest, CreateTravelLogRequest, PublicFeedQuery, ReactionAction,
    ReactionResponse, TravelLogResponse, UpdateTravelLogRequest,
};
use crate::services::{travel_log_service, Claims};
use crate::utils::error::AppError;

#[utoipa::path(
    get,
    path = "/api/travelLogs/public",
    tag = "Travel Logs",
    params(PublicFeedQuery),
    responses(
        (status = 200, description = "Public travel logs, newest first", body = [TravelLogResponse])
    )
)]
pub async fn get_public(
    db: web::Data<MongoDB>,
    query: web::Query<PublicFeedQuery>,
) -> Result<HttpResponse, AppError> {
    log::info!(
        "🌍 GET /travelLogs/public - limit: {}, offset: {}",
        query.limit(),
        query.offset()
    );

    let logs = travel_log_service::public_feed(&db, &query).await?;
    Ok(HttpResponse::Ok().json(logs))
}

#[utoipa::path(
    get,
    path = "/api/travelLogs",
    tag = "Travel Logs",
    responses(
        (status = 200, description = "Caller's travel logs, newest first", body = [TravelLogResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_own(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("📔 GET /travelLogs - user: {}", claims.id);

    let logs = travel_log_service::list_own(&db, &caller_id(&claims)?).await?;
    Ok(HttpResponse::Ok().json(logs))
}

#[utoipa::path(
    get,
    path = "/api/travelLogs/shared",
    tag = "Travel Logs",
    responses(
        (status = 200, description = "Logs the caller was added to", body = [TravelLogResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_shared(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("🤝 GET /travelLogs/shared - user: {}", claims.id);

    let logs = travel_log_service::list_shared(&db, &caller_id(&claims)?).await?;
    Ok(HttpResponse::Ok().json(logs))
}

#[utoipa::path(
    get,
    path = "/api/travelLogs/{id}",
    tag = "Travel Logs",
    params(("id" = String, Path, description = "Travel log id")),
    responses(
        (status = 200, description = "Travel log", body = TravelLogResponse),
        (status = 401, description = "Private log of another user"),
        (status = 404, description = "Travel log not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_by_id(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    log::info!("📔 GET /travelLogs/{} - user: {}", path, claims.id);

    let log = travel_log_service::get(&db, &caller_id(&claims)?, &path).await?;
    Ok(HttpResponse::Ok().json(log))
}

#[utoipa::path(
    post,
    path = "/api/travelLogs",
    tag = "Travel Logs",
    request_body = CreateTravelLogRequest,
    responses(
        (status = 201, description = "Travel log created", body = TravelLogResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not a member of the given group trip")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    request: web::Json<CreateTravelLogRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /travelLogs - user: {}, title: {}", claims.id, request.title);

    let log = travel_log_service::create(&db, &caller_id(&claims)?, request.into_inner()).await?;
    log::info!("✅ Travel log created: {}", log.id);
    Ok(HttpResponse::Created().json(log))
}

#[utoipa::path(
    put,
    path = "/api/travelLogs/{id}",
    tag = "Travel Logs",
    params(("id" = String, Path, description = "Travel log id")),
    request_body = UpdateTravelLogRequest,
    responses(
        (status = 200, description = "Updated travel log", body = TravelLogResponse),
        (status = 401, description = "User not authorized"),
        (status = 404, description = "Travel log not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<UpdateTravelLogRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("✏️  PUT /travelLogs/{} - user: {}", path, claims.id);

    let log = travel_log_service::update(&db, &caller_id(&claims)?, &path, &request).await?;
    Ok(HttpResponse::Ok().json(log))
}

#[utoipa::path(
    delete,
    path = "/api/travelLogs/{id}",
    tag = "Travel Logs",
    params(("id" = String, Path, description = "Travel log id")),
    responses(
        (status = 200, description = "Travel log removed"),
        (status = 401, description = "User not authorized"),
        (status = 404, description = "Travel log not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    log::info!("🗑️  DELETE /travelLogs/{} - user: {}", path, claims.id);

    travel_log_service::delete(&db, &caller_id(&claims)?, &path).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "msg": "Travel log removed" })))
}

async fn react(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    action: ReactionAction,
) -> Result<HttpResponse, AppError> {
    log::info!("❤️  PUT /travelLogs/{}/{} - user: {}", action.label(), path, claims.id);

    let list = travel_log_service::react(&db, &caller_id(&claims)?, &path, action).await?;
    Ok(HttpResponse::Ok().json(list))
}

#[utoipa::path(
    put,
    path = "/api/travelLogs/like/{id}",
    tag = "Travel Logs",
    params(("id" = String, Path, description = "Travel log id")),
    responses(
        (status = 200, description = "Likes after the change", body = [ReactionResponse]),
        (status = 400, description = "Travel log already liked"),
        (status = 404, description = "Travel log not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn like(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    react(db, claims, path, ReactionAction::Like).await
}

#[utoipa::path(
    put,
    path = "/api/travelLogs/unlike/{id}",
    tag = "Travel Logs",
    params(("id" = String, Path, description = "Travel log id")),
    responses(
        (status = 200, description = "Likes after the change", body = [ReactionResponse]),
        (status = 400, description = "Travel log has not yet been liked"),
        (status = 404, description = "Travel log not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn unlike(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    react(db, claims, path, ReactionAction::Unlike).await
}

#[utoipa::path(
    put,
    path = "/api/travelLogs/bookmark/{id}",
    tag = "Travel Logs",
    params(("id" = String, Path, description = "Travel log id")),
    responses(
        (status = 200, description = "Bookmarks after the change", body = [ReactionResponse]),
        (status = 400, description = "Travel log already bookmarked"),
        (status = 404, description = "Travel log not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn bookmark(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    react(db, claims, path, ReactionAction::Bookmark).await
}

#[utoipa::path(
    put,
    path = "/api/travelLogs/unbookmark/{id}",
    tag = "Travel Logs",
    params(("id" = String, Path, description = "Travel log id")),
    responses(
        (status = 200, description = "Bookmarks after the change", body = [ReactionResponse]),
        (status = 400, description = "Travel log has not yet been bookmarked"),
        (status = 404, description = "Travel log not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn unbookmark(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    react(db, claims, path, ReactionAction::Unbookmark).await
}

#[utoipa::path(
    post,
    path = "/api/travelLogs/add-member",
    tag = "Travel Logs",
    request_body = AddLogMemberRequest,
    responses(
        (status = 200, description = "Member added", body = TravelLogResponse),
        (status = 400, description = "Already a member, or adding yourself"),
        (status = 401, description = "User not authorized"),
        (status = 404, description = "Travel log or user not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_member(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    request: web::Json<AddLogMemberRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!(
        "👥 POST /travelLogs/add-member - log: {}, member: {}",
        request.travel_log_id,
        request.member_email
    );

    let log = travel_log_service::add_member(&db, &caller_id(&claims)?, &request).await?;
    Ok(HttpResponse::Ok().json(log))
}
