use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use std::error::Error;

use crate::models::{calendar_event, expense, group_trip, travel_log, user};

const DEFAULT_DATABASE: &str = "travel_diary";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));
        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        // Database name comes from the URI path, e.g. mongodb://host/travel_diary
        let db_name = client_options
            .default_database
            .clone()
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let client = Client::with_options(client_options)?;
        let db = client.database(&db_name);

        // Test connection
        db.run_command(doc! { "ping": 1 }).await?;
        log::info!("📦 Using database: {}", db_name);

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes the route handlers query by.
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        log::info!("🔧 Creating database indexes...");

        let unique = || IndexOptions::builder().unique(true).build();

        let indexes: Vec<(&str, Document, Option<IndexOptions>)> = vec![
            (user::COLLECTION, doc! { "email": 1 }, Some(unique())),
            (user::COLLECTION, doc! { "username": 1 }, Some(unique())),
            (travel_log::COLLECTION, doc! { "userId": 1, "date": -1 }, None),
            (travel_log::COLLECTION, doc! { "isPublic": 1, "date": -1 }, None),
            (travel_log::COLLECTION, doc! { "status": 1, "date": -1 }, None),
            (travel_log::COLLECTION, doc! { "members": 1 }, None),
            (expense::COLLECTION, doc! { "user": 1, "date": -1 }, None),
            (group_trip::COLLECTION, doc! { "members": 1, "createdAt": -1 }, None),
            (calendar_event::COLLECTION, doc! { "userId": 1, "start": 1 }, None),
        ];

        for (collection, keys, options) in indexes {
            let label = format!("{}({:?})", collection, keys.keys().collect::<Vec<_>>());
            let model = IndexModel::builder().keys(keys).options(options).build();

            match self.collection::<Document>(collection).create_index(model).await {
                Ok(_) => log::info!("   ✅ Index created: {}", label),
                Err(e) => log::debug!("   ℹ️  Index {} not created: {}", label, e),
            }
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub async fn health_check(&self) -> bool {
        self.db.run_command(doc! { "ping": 1 }).await.is_ok()
    }
}

#[cfg(test)]
pub(crate) async fn test_database() -> MongoDB {
    dotenv::dotenv().ok();
    let uri = std::env::var("TEST_MONGO_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017/travel_diary_test".to_string());
    MongoDB::new(&uri).await.expect("TEST_MONGO_URI must point at a running MongoDB")
}
