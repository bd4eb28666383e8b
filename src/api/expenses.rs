use actix_web::{web, HttpResponse};

use crate::api::caller_id;
use crate::database::MongoDB;
use crate::models::expense::{
    CreateExpenseRequest, ExpenseResponse, ExpenseSummary, UpdateExpenseRequest,
};
use crate::services::{expense_service, Claims};
use crate::utils::error::AppError;

#[utoipa::path(
    post,
    path = "/api/expenses",
    tag = "Expenses",
    request_body = CreateExpenseRequest,
    responses(
        (status = 200, description = "Expense created", body = ExpenseResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not a member of the given group trip")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    request: web::Json<CreateExpenseRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!(
        "💸 POST /expenses - user: {}, amount: {}",
        claims.id,
        request.amount
    );

    let expense = expense_service::create(&db, &caller_id(&claims)?, request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(expense))
}

#[utoipa::path(
    get,
    path = "/api/expenses",
    tag = "Expenses",
    responses(
        (status = 200, description = "Caller's expenses, newest first", body = [ExpenseResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn list(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("💸 GET /expenses - user: {}", claims.id);

    let expenses = expense_service::list(&db, &caller_id(&claims)?).await?;
    Ok(HttpResponse::Ok().json(expenses))
}

#[utoipa::path(
    get,
    path = "/api/expenses/summary",
    tag = "Expenses",
    responses(
        (status = 200, description = "Totals per category", body = ExpenseSummary)
    ),
    security(("bearer_auth" = []))
)]
pub async fn summary(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("📊 GET /expenses/summary - user: {}", claims.id);

    let summary = expense_service::summary(&db, &caller_id(&claims)?).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[utoipa::path(
    get,
    path = "/api/expenses/{id}",
    tag = "Expenses",
    params(("id" = String, Path, description = "Expense id")),
    responses(
        (status = 200, description = "Expense", body = ExpenseResponse),
        (status = 401, description = "User not authorized"),
        (status = 404, description = "Expense not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_by_id(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    log::info!("💸 GET /expenses/{} - user: {}", path, claims.id);

    let expense = expense_service::get(&db, &caller_id(&claims)?, &path).await?;
    Ok(HttpResponse::Ok().json(expense))
}

#[utoipa::path(
    put,
    path = "/api/expenses/{id}",
    tag = "Expenses",
    params(("id" = String, Path, description = "Expense id")),
    request_body = UpdateExpenseRequest,
    responses(
        (status = 200, description = "Updated expense", body = ExpenseResponse),
        (status = 401, description = "User not authorized"),
        (status = 404, description = "Expense not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<UpdateExpenseRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("✏️  PUT /expenses/{} - user: {}", path, claims.id);

    let expense = expense_service::update(&db, &caller_id(&claims)?, &path, &request).await?;
    Ok(HttpResponse::Ok().json(expense))
}

#[utoipa::path(
    delete,
    path = "/api/expenses/{id}",
    tag = "Expenses",
    params(("id" = String, Path, description = "Expense id")),
    responses(
        (status = 200, description = "Expense removed"),
        (status = 401, description = "User not authorized"),
        (status = 404, description = "Expense not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    log::info!("🗑️  DELETE /expenses/{} - user: {}", path, claims.id);

    expense_service::delete(&db, &caller_id(&claims)?, &path).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "msg": "Expense removed" })))
}
