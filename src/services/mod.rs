pub mod ai_assistant_service;
pub mod auth_service;
pub mod calendar_event_service;
pub mod expense_service;
pub mod group_trip_service;
pub mod travel_log_service;
pub mod user_service;

pub use ai_assistant_service::{GeminiClient, TextGenerator};
pub use auth_service::Claims;
