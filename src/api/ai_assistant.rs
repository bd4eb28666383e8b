use actix_web::{web, HttpResponse};

use crate::services::ai_assistant_service::{self, AssistantRequest, AssistantResponse, TextGenerator};
use crate::services::Claims;
use crate::utils::error::AppError;

#[utoipa::path(
    post,
    path = "/api/ai-assistant",
    tag = "AI Assistant",
    request_body(
        content = Object,
        description = "`type` is one of itinerary, packing-list or budget-estimate; the remaining fields (destination, interests, duration/days, season) fill the prompt"
    ),
    responses(
        (status = 200, description = "Generated text", body = AssistantResponse),
        (status = 400, description = "Invalid AI assistant type or missing field"),
        (status = 500, description = "Error generating AI response")
    ),
    security(("bearer_auth" = []))
)]
pub async fn generate(
    generator: web::Data<dyn TextGenerator>,
    claims: web::ReqData<Claims>,
    request: web::Json<AssistantRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!(
        "🤖 POST /ai-assistant - user: {}, type: {}",
        claims.id,
        request.kind.as_deref().unwrap_or("-")
    );

    let response = ai_assistant_service::suggest(generator.get_ref(), &request).await?;
    Ok(HttpResponse::Ok().json(response))
}
