use actix_web::{web, HttpResponse};

use crate::api::caller_id;
use crate::database::MongoDB;
use crate::models::group_trip::{
    AddTripMembersRequest, CreateGroupTripRequest, ItineraryItemRequest, TripDocumentRequest,
    TripExpenseRequest, TripExpenseSummary, UpdateGroupTripRequest,
};
use crate::services::{group_trip_service, Claims};
use crate::utils::error::AppError;

#[utoipa::path(
    post,
    path = "/api/groupTrips",
    tag = "Group Trips",
    request_body = CreateGroupTripRequest,
    responses(
        (status = 200, description = "Group trip created with populated members"),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "An invited user does not exist")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    request: web::Json<CreateGroupTripRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!(
        "🧳 POST /groupTrips - user: {}, name: {}, invited: {}",
        claims.id,
        request.name,
        request.members.len()
    );

    let trip = group_trip_service::create(&db, &caller_id(&claims)?, request.into_inner()).await?;
    log::info!("✅ Group trip created: {}", trip.id);
    Ok(HttpResponse::Ok().json(trip))
}

#[utoipa::path(
    get,
    path = "/api/groupTrips",
    tag = "Group Trips",
    responses(
        (status = 200, description = "Trips the caller belongs to, newest first")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("🧳 GET /groupTrips - user: {}", claims.id);

    let trips = group_trip_service::list(&db, &caller_id(&claims)?).await?;
    Ok(HttpResponse::Ok().json(trips))
}

#[utoipa::path(
    get,
    path = "/api/groupTrips/{id}",
    tag = "Group Trips",
    params(("id" = String, Path, description = "Group trip id")),
    responses(
        (status = 200, description = "Trip with members, shared expenses and shared travel logs populated"),
        (status = 401, description = "User not authorized"),
        (status = 404, description = "Group trip not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_by_id(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    log::info!("🧳 GET /groupTrips/{} - user: {}", path, claims.id);

    let trip = group_trip_service::get(&db, &caller_id(&claims)?, &path).await?;
    Ok(HttpResponse::Ok().json(trip))
}

#[utoipa::path(
    put,
    path = "/api/groupTrips/{id}",
    tag = "Group Trips",
    params(("id" = String, Path, description = "Group trip id")),
    request_body = UpdateGroupTripRequest,
    responses(
        (status = 200, description = "Updated trip"),
        (status = 401, description = "Only the creator can edit the trip"),
        (status = 404, description = "Group trip not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<UpdateGroupTripRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("✏️  PUT /groupTrips/{} - user: {}", path, claims.id);

    let trip = group_trip_service::update(&db, &caller_id(&claims)?, &path, &request).await?;
    Ok(HttpResponse::Ok().json(trip))
}

#[utoipa::path(
    delete,
    path = "/api/groupTrips/{id}",
    tag = "Group Trips",
    params(("id" = String, Path, description = "Group trip id")),
    responses(
        (status = 200, description = "Group trip removed"),
        (status = 401, description = "Only the creator can delete the trip"),
        (status = 404, description = "Group trip not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    log::info!("🗑️  DELETE /groupTrips/{} - user: {}", path, claims.id);

    group_trip_service::delete(&db, &caller_id(&claims)?, &path).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "msg": "Group trip removed" })))
}

#[utoipa::path(
    put,
    path = "/api/groupTrips/{id}/members",
    tag = "Group Trips",
    params(("id" = String, Path, description = "Group trip id")),
    request_body = AddTripMembersRequest,
    responses(
        (status = 200, description = "Trip with the new members"),
        (status = 401, description = "User not authorized"),
        (status = 404, description = "Group trip or user not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_members(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<AddTripMembersRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!(
        "👥 PUT /groupTrips/{}/members - user: {}, adding: {}",
        path,
        claims.id,
        request.new_members.len()
    );

    let trip = group_trip_service::add_members(&db, &caller_id(&claims)?, &path, &request).await?;
    Ok(HttpResponse::Ok().json(trip))
}

#[utoipa::path(
    delete,
    path = "/api/groupTrips/{id}/members/{member_id}",
    tag = "Group Trips",
    params(
        ("id" = String, Path, description = "Group trip id"),
        ("member_id" = String, Path, description = "User id of the member to remove")
    ),
    responses(
        (status = 200, description = "Trip without the member"),
        (status = 400, description = "The creator cannot be removed"),
        (status = 401, description = "Only the creator or the member themselves"),
        (status = 404, description = "Group trip or member not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_member(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (trip_id, member_id) = path.into_inner();
    log::info!(
        "👋 DELETE /groupTrips/{}/members/{} - user: {}",
        trip_id,
        member_id,
        claims.id
    );

    let trip =
        group_trip_service::remove_member(&db, &caller_id(&claims)?, &trip_id, &member_id).await?;
    Ok(HttpResponse::Ok().json(trip))
}

#[utoipa::path(
    post,
    path = "/api/groupTrips/{id}/itinerary",
    tag = "Group Trips",
    params(("id" = String, Path, description = "Group trip id")),
    request_body = ItineraryItemRequest,
    responses(
        (status = 200, description = "Trip with the new itinerary item"),
        (status = 401, description = "User not authorized"),
        (status = 404, description = "Group trip not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_itinerary_item(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<ItineraryItemRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🗓️  POST /groupTrips/{}/itinerary - user: {}", path, claims.id);

    let trip = group_trip_service::add_itinerary_item(
        &db,
        &caller_id(&claims)?,
        &path,
        request.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(trip))
}

#[utoipa::path(
    post,
    path = "/api/groupTrips/{id}/expenses",
    tag = "Group Trips",
    params(("id" = String, Path, description = "Group trip id")),
    request_body = TripExpenseRequest,
    responses(
        (status = 200, description = "Trip with the new expense"),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "User not authorized"),
        (status = 404, description = "Group trip not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_expense(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<TripExpenseRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!(
        "💸 POST /groupTrips/{}/expenses - user: {}, amount: {}",
        path,
        claims.id,
        request.amount
    );

    let trip =
        group_trip_service::add_expense(&db, &caller_id(&claims)?, &path, request.into_inner())
            .await?;
    Ok(HttpResponse::Ok().json(trip))
}

#[utoipa::path(
    get,
    path = "/api/groupTrips/{id}/expenses/summary",
    tag = "Group Trips",
    params(("id" = String, Path, description = "Group trip id")),
    responses(
        (status = 200, description = "Equal split of the trip's expenses", body = TripExpenseSummary),
        (status = 401, description = "User not authorized"),
        (status = 404, description = "Group trip not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn expense_summary(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    log::info!("📊 GET /groupTrips/{}/expenses/summary - user: {}", path, claims.id);

    let summary = group_trip_service::expense_summary(&db, &caller_id(&claims)?, &path).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[utoipa::path(
    post,
    path = "/api/groupTrips/{id}/documents",
    tag = "Group Trips",
    params(("id" = String, Path, description = "Group trip id")),
    request_body = TripDocumentRequest,
    responses(
        (status = 200, description = "Trip with the new document reference"),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "User not authorized"),
        (status = 404, description = "Group trip not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_document(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<TripDocumentRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!(
        "📎 POST /groupTrips/{}/documents - user: {}, name: {}",
        path,
        claims.id,
        request.name
    );

    let trip =
        group_trip_service::add_document(&db, &caller_id(&claims)?, &path, request.into_inner())
            .await?;
    Ok(HttpResponse::Ok().json(trip))
}

#[utoipa::path(
    delete,
    path = "/api/groupTrips/{id}/documents/{doc_id}",
    tag = "Group Trips",
    params(
        ("id" = String, Path, description = "Group trip id"),
        ("doc_id" = String, Path, description = "Document id")
    ),
    responses(
        (status = 200, description = "Trip without the document"),
        (status = 401, description = "Only the uploader or the creator"),
        (status = 404, description = "Group trip or document not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_document(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (trip_id, doc_id) = path.into_inner();
    log::info!(
        "🗑️  DELETE /groupTrips/{}/documents/{} - user: {}",
        trip_id,
        doc_id,
        claims.id
    );

    let trip =
        group_trip_service::remove_document(&db, &caller_id(&claims)?, &trip_id, &doc_id).await?;
    Ok(HttpResponse::Ok().json(trip))
}
