mod api;
mod config;
mod database;
mod middleware;
mod models;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{
    dev::Service,
    http::header::{self, HeaderName},
    middleware::Logger,
    web, App, HttpServer,
};
use dotenv::dotenv;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::services::{GeminiClient, TextGenerator};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = config::AppConfig::from_env().expect("Invalid configuration");

    log::info!("🚀 Starting Travel Diary Service...");
    api::metrics::mark_started();

    let db = database::MongoDB::new(&config.database_url)
        .await
        .expect("Failed to connect to MongoDB");
    log::info!("✅ MongoDB connected successfully");

    if config.gemini.api_key.is_none() {
        log::warn!("⚠️  GEMINI_API_KEY not set, /api/ai-assistant will report errors");
    }

    let db_data = web::Data::new(db);
    let config_data = web::Data::new(config.clone());
    let generator: web::Data<dyn TextGenerator> =
        web::Data::from(Arc::new(GeminiClient::new(config.gemini.clone())) as Arc<dyn TextGenerator>);

    let (host, port) = (config.host.clone(), config.port);
    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", host, port);

    HttpServer::new(move || {
        let cors = config
            .client_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::ACCEPT,
                HeaderName::from_static(middleware::auth::TOKEN_HEADER),
            ])
            .expose_headers(vec![header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(db_data.clone())
            .app_data(config_data.clone())
            .app_data(generator.clone())
            .app_data(api::json_config())
            .wrap_fn(|req, srv| {
                api::metrics::increment_request_count();
                let fut = srv.call(req);
                async move {
                    match fut.await {
                        Ok(res) => {
                            api::metrics::record_status(res.status().as_u16());
                            Ok(res)
                        }
                        Err(err) => {
                            api::metrics::record_status(
                                err.as_response_error().status_code().as_u16(),
                            );
                            Err(err)
                        }
                    }
                }
            })
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
            .route("/health", web::get().to(api::health::health_check))
            .route("/metrics", web::get().to(api::metrics::get_metrics))
            .service(
                web::scope("/api/auth")
                    .route("/signup", web::post().to(api::auth::signup))
                    .route("/login", web::post().to(api::auth::login))
                    .service(
                        web::resource("")
                            .wrap(middleware::AuthMiddleware)
                            .route(web::get().to(api::auth::get_current_user))
                            .route(web::delete().to(api::auth::delete_account)),
                    ),
            )
            // Public feed, registered ahead of the authenticated scope
            .route("/api/travelLogs/public", web::get().to(api::travel_logs::get_public))
            .service(
                web::scope("/api/travelLogs")
                    .wrap(middleware::AuthMiddleware)
                    .route("", web::get().to(api::travel_logs::get_own))
                    .route("", web::post().to(api::travel_logs::create))
                    .route("/shared", web::get().to(api::travel_logs::get_shared))
                    .route("/add-member", web::post().to(api::travel_logs::add_member))
                    .route("/like/{id}", web::put().to(api::travel_logs::like))
                    .route("/unlike/{id}", web::put().to(api::travel_logs::unlike))
                    .route("/bookmark/{id}", web::put().to(api::travel_logs::bookmark))
                    .route("/unbookmark/{id}", web::put().to(api::travel_logs::unbookmark))
                    .route("/{id}", web::get().to(api::travel_logs::get_by_id))
                    .route("/{id}", web::put().to(api::travel_logs::update))
                    .route("/{id}", web::delete().to(api::travel_logs::delete)),
            )
            .service(
                web::scope("/api/expenses")
                    .wrap(middleware::AuthMiddleware)
                    .route("", web::post().to(api::expenses::create))
                    .route("", web::get().to(api::expenses::list))
                    .route("/summary", web::get().to(api::expenses::summary))
                    .route("/{id}", web::get().to(api::expenses::get_by_id))
                    .route("/{id}", web::put().to(api::expenses::update))
                    .route("/{id}", web::delete().to(api::expenses::delete)),
            )
            .service(
                web::scope("/api/groupTrips")
                    .wrap(middleware::AuthMiddleware)
                    .route("", web::post().to(api::group_trips::create))
                    .route("", web::get().to(api::group_trips::list))
                    .route("/{id}", web::get().to(api::group_trips::get_by_id))
                    .route("/{id}", web::put().to(api::group_trips::update))
                    .route("/{id}", web::delete().to(api::group_trips::delete))
                    .route("/{id}/members", web::put().to(api::group_trips::add_members))
                    .route(
                        "/{id}/members/{member_id}",
                        web::delete().to(api::group_trips::remove_member),
                    )
                    .route("/{id}/itinerary", web::post().to(api::group_trips::add_itinerary_item))
                    .route("/{id}/expenses", web::post().to(api::group_trips::add_expense))
                    .route(
                        "/{id}/expenses/summary",
                        web::get().to(api::group_trips::expense_summary),
                    )
                    .route("/{id}/documents", web::post().to(api::group_trips::add_document))
                    .route(
                        "/{id}/documents/{doc_id}",
                        web::delete().to(api::group_trips::remove_document),
                    ),
            )
            .service(
                web::scope("/api/calendarEvents")
                    .wrap(middleware::AuthMiddleware)
                    .route("", web::get().to(api::calendar_events::list))
                    .route("", web::post().to(api::calendar_events::create))
                    .route("/{id}", web::put().to(api::calendar_events::update))
                    .route("/{id}", web::delete().to(api::calendar_events::delete)),
            )
            .service(
                web::resource("/api/ai-assistant")
                    .wrap(middleware::AuthMiddleware)
                    .route(web::post().to(api::ai_assistant::generate)),
            )
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
