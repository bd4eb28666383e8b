use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Travel Diary API",
        version = "1.0.0",
        description = "REST backend for the travel diary app.\n\n**Authentication:** send the JWT from signup/login in the `x-auth-token` header (an `Authorization: Bearer` header is also accepted). Only the public feed, health and metrics are open.\n\n**Features:**\n- Travel logs with likes, bookmarks and co-authors\n- Personal expenses with category totals\n- Group trips with itinerary, shared expenses and documents\n- Calendar events\n- AI travel assistant"
    ),
    paths(
        // Auth
        crate::api::auth::signup,
        crate::api::auth::login,
        crate::api::auth::get_current_user,
        crate::api::auth::delete_account,

        // Travel logs
        crate::api::travel_logs::get_public,
        crate::api::travel_logs::get_own,
        crate::api::travel_logs::get_shared,
        crate::api::travel_logs::get_by_id,
        crate::api::travel_logs::create,
        crate::api::travel_logs::update,
        crate::api::travel_logs::delete,
        crate::api::travel_logs::like,
        crate::api::travel_logs::unlike,
        crate::api::travel_logs::bookmark,
        crate::api::travel_logs::unbookmark,
        crate::api::travel_logs::add_member,

        // Expenses
        crate::api::expenses::create,
        crate::api::expenses::list,
        crate::api::expenses::summary,
        crate::api::expenses::get_by_id,
        crate::api::expenses::update,
        crate::api::expenses::delete,

        // Group trips
        crate::api::group_trips::create,
        crate::api::group_trips::list,
        crate::api::group_trips::get_by_id,
        crate::api::group_trips::update,
        crate::api::group_trips::delete,
        crate::api::group_trips::add_members,
        crate::api::group_trips::remove_member,
        crate::api::group_trips::add_itinerary_item,
        crate::api::group_trips::add_expense,
        crate::api::group_trips::expense_summary,
        crate::api::group_trips::add_document,
        crate::api::group_trips::remove_document,

        // Calendar
        crate::api::calendar_events::list,
        crate::api::calendar_events::create,
        crate::api::calendar_events::update,
        crate::api::calendar_events::delete,

        // AI assistant
        crate::api::ai_assistant::generate,

        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,
    ),
    components(
        schemas(
            // Auth
            crate::models::user::SignupRequest,
            crate::models::user::LoginRequest,
            crate::models::user::TokenResponse,
            crate::models::user::UserResponse,
            crate::models::user::UserSummary,

            // Travel logs
            crate::models::travel_log::TravelStatus,
            crate::models::travel_log::CreateTravelLogRequest,
            crate::models::travel_log::UpdateTravelLogRequest,
            crate::models::travel_log::AddLogMemberRequest,
            crate::models::travel_log::ReactionResponse,
            crate::models::travel_log::TravelLogResponse,

            // Expenses
            crate::models::expense::CreateExpenseRequest,
            crate::models::expense::UpdateExpenseRequest,
            crate::models::expense::LinkedTravelLog,
            crate::models::expense::ExpenseResponse,
            crate::models::expense::CategoryTotal,
            crate::models::expense::ExpenseSummary,

            // Group trips
            crate::models::group_trip::CreateGroupTripRequest,
            crate::models::group_trip::UpdateGroupTripRequest,
            crate::models::group_trip::AddTripMembersRequest,
            crate::models::group_trip::ItineraryItemRequest,
            crate::models::group_trip::TripExpenseRequest,
            crate::models::group_trip::TripDocumentRequest,
            crate::models::group_trip::MemberBalance,
            crate::models::group_trip::TripExpenseSummary,

            // Calendar
            crate::models::calendar_event::CreateEventRequest,
            crate::models::calendar_event::UpdateEventRequest,
            crate::models::calendar_event::CalendarEventResponse,

            // AI assistant
            crate::services::ai_assistant_service::AssistantResponse,

            // Health & Metrics
            crate::api::health::HealthResponse,
            crate::api::metrics::MetricsResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Signup, login, current user and account deletion."),
        (name = "Travel Logs", description = "Diary entries: public feed, own and shared logs, likes, bookmarks and co-authors."),
        (name = "Expenses", description = "Personal expenses, optionally linked to a travel log or group trip."),
        (name = "Group Trips", description = "Shared trips: members, itinerary, shared expenses with equal split, and document references."),
        (name = "Calendar", description = "Personal calendar events."),
        (name = "AI Assistant", description = "Itinerary, packing list and budget suggestions from the configured language model."),
        (name = "Health", description = "Health check and Prometheus metrics."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT returned by /api/auth/signup or /api/auth/login"))
                        .build()
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_resource() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        for path in [
            "/api/auth/signup",
            "/api/auth",
            "/api/travelLogs/public",
            "/api/travelLogs/{id}",
            "/api/expenses/summary",
            "/api/groupTrips/{id}/members/{member_id}",
            "/api/groupTrips/{id}/expenses/summary",
            "/api/calendarEvents/{id}",
            "/api/ai-assistant",
            "/health",
            "/metrics",
        ] {
            assert!(paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn registers_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
