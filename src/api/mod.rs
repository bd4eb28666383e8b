pub mod ai_assistant;
pub mod auth;
pub mod calendar_events;
pub mod expenses;
pub mod group_trips;
pub mod health;
pub mod metrics;
pub mod swagger;
pub mod travel_logs;

use actix_web::web;
use mongodb::bson::oid::ObjectId;

use crate::services::Claims;
use crate::utils::error::{AppError, AppResult};

/// JSON body limits and error shape shared by every route.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(1024 * 1024)
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

/// The authenticated user's id, as carried by the token.
pub(crate) fn caller_id(claims: &Claims) -> AppResult<ObjectId> {
    claims.user_object_id()
}
