use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, oid::ObjectId, Bson, DateTime as BsonDateTime, Document};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtSettings;
use crate::database::MongoDB;
use crate::models::{
    calendar_event::{self, CalendarEvent},
    expense::{self, Expense},
    group_trip::{self, GroupTrip},
    travel_log::{self, TravelLog},
    user::{self, LoginRequest, SignupRequest, TokenResponse, User, UserResponse},
};
use crate::utils::{
    error::{AppError, AppResult},
    validation::require_text,
};

const MIN_PASSWORD_LEN: usize = 6;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub id: String, // user _id (hex)
    pub username: String,
    pub email: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
}

impl Claims {
    pub fn user_object_id(&self) -> AppResult<ObjectId> {
        ObjectId::parse_str(&self.id).map_err(|_| invalid_token())
    }
}

fn invalid_token() -> AppError {
    AppError::Unauthorized("Token is not valid".to_string())
}

pub fn issue_token(user: &User, settings: &JwtSettings) -> AppResult<String> {
    let id = user
        .id
        .ok_or_else(|| AppError::Internal("Cannot issue a token for an unsaved user".to_string()))?;
    let now = Utc::now();

    let claims = Claims {
        id: id.to_hex(),
        username: user.username.clone(),
        email: user.email.clone(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(settings.expires_hours)).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(settings.secret.as_bytes()),
    )?)
}

/// Any decoding failure, expiry included, is reported as an invalid token.
pub fn verify_token(token: &str, settings: &JwtSettings) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        log::debug!("🔑 Token rejected: {}", e);
        invalid_token()
    })
}

async fn hash_password(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash(password, DEFAULT_COST))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

async fn password_matches(password: String, stored: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify(password, &stored))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

fn normalize_email(email: &str) -> AppResult<String> {
    let email = require_text("email", email)?.to_lowercase();
    if !email.contains('@') {
        return Err(AppError::bad_request("Please include a valid email"));
    }
    Ok(email)
}

// User registration
pub async fn signup(
    db: &MongoDB,
    settings: &JwtSettings,
    request: &SignupRequest,
) -> AppResult<TokenResponse> {
    let username = require_text("username", &request.username)?;
    let email = normalize_email(&request.email)?;
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let users = db.collection::<User>(user::COLLECTION);

    let existing = users
        .find_one(doc! { "$or": [ { "email": &email }, { "username": &username } ] })
        .await?;
    if let Some(existing) = existing {
        let msg = if existing.email == email {
            "User already exists"
        } else {
            "Username is already taken"
        };
        return Err(AppError::bad_request(msg));
    }

    let mut new_user = User {
        id: None,
        username,
        email,
        password: hash_password(request.password.clone()).await?,
        date: BsonDateTime::now(),
    };

    let result = users.insert_one(&new_user).await?;
    new_user.id = result.inserted_id.as_object_id();

    log::info!("✅ User registered: {}", new_user.email);

    Ok(TokenResponse {
        token: issue_token(&new_user, settings)?,
    })
}

// User login
pub async fn login(
    db: &MongoDB,
    settings: &JwtSettings,
    request: &LoginRequest,
) -> AppResult<TokenResponse> {
    let invalid = || AppError::bad_request("Invalid credentials");
    let email = request.email.trim().to_lowercase();

    let user = db
        .collection::<User>(user::COLLECTION)
        .find_one(doc! { "email": &email })
        .await?
        .ok_or_else(invalid)?;

    if !password_matches(request.password.clone(), user.password.clone()).await? {
        return Err(invalid());
    }

    Ok(TokenResponse {
        token: issue_token(&user, settings)?,
    })
}

pub async fn current_user(db: &MongoDB, user_id: &ObjectId) -> AppResult<UserResponse> {
    db.collection::<User>(user::COLLECTION)
        .find_one(doc! { "_id": user_id })
        .await?
        .map(UserResponse::from)
        .ok_or_else(|| AppError::not_found("User not found"))
}

async fn ids_of<T: Send + Sync>(
    collection: &mongodb::Collection<T>,
    filter: Document,
) -> AppResult<Vec<ObjectId>> {
    Ok(collection
        .distinct("_id", filter)
        .await?
        .iter()
        .filter_map(Bson::as_object_id)
        .collect())
}

/// Removes the account together with everything the user owns. Trips the user
/// created go away; membership in other trips is dropped. References other
/// users' records hold to the removed logs, expenses and trips are cleared.
pub async fn delete_account(db: &MongoDB, user_id: &ObjectId) -> AppResult<()> {
    let users = db.collection::<User>(user::COLLECTION);
    if users.find_one(doc! { "_id": user_id }).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let logs = db.collection::<TravelLog>(travel_log::COLLECTION);
    let expenses = db.collection::<Expense>(expense::COLLECTION);
    let events = db.collection::<CalendarEvent>(calendar_event::COLLECTION);
    let trips = db.collection::<GroupTrip>(group_trip::COLLECTION);

    let log_ids = ids_of(&logs, doc! { "userId": user_id }).await?;
    let expense_ids = ids_of(&expenses, doc! { "user": user_id }).await?;
    let trip_ids = ids_of(&trips, doc! { "creator": user_id }).await?;

    let removed_logs = logs.delete_many(doc! { "_id": { "$in": &log_ids[..] } }).await?;
    let removed_expenses = expenses
        .delete_many(doc! { "_id": { "$in": &expense_ids[..] } })
        .await?;
    let removed_events = events.delete_many(doc! { "userId": user_id }).await?;
    let removed_trips = trips.delete_many(doc! { "_id": { "$in": &trip_ids[..] } }).await?;

    trips
        .update_many(
            doc! {
                "$or": [
                    { "members": user_id },
                    { "sharedTravelLogs": { "$in": &log_ids[..] } },
                    { "sharedExpenses": { "$in": &expense_ids[..] } },
                ]
            },
            doc! {
                "$pull": {
                    "members": user_id,
                    "sharedTravelLogs": { "$in": &log_ids[..] },
                    "sharedExpenses": { "$in": &expense_ids[..] },
                }
            },
        )
        .await?;
    logs.update_many(
        doc! {},
        doc! {
            "$pull": {
                "members": user_id,
                "likes": { "user": user_id },
                "bookmarks": { "user": user_id },
            }
        },
    )
    .await?;
    if !trip_ids.is_empty() {
        logs.update_many(
            doc! { "groupTrip": { "$in": &trip_ids[..] } },
            doc! { "$unset": { "groupTrip": "" } },
        )
        .await?;
        expenses
            .update_many(
                doc! { "groupTrip": { "$in": &trip_ids[..] } },
                doc! { "$set": { "groupTrip": null } },
            )
            .await?;
    }

    users.delete_one(doc! { "_id": user_id }).await?;

    log::info!(
        "🗑️  Account {} deleted ({} logs, {} expenses, {} events, {} trips)",
        user_id,
        removed_logs.deleted_count,
        removed_expenses.deleted_count,
        removed_events.deleted_count,
        removed_trips.deleted_count
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    fn saved_user() -> User {
        User {
            id: Some(ObjectId::new()),
            username: "marta".to_string(),
            email: "marta@example.com".to_string(),
            password: "hash".to_string(),
            date: BsonDateTime::now(),
        }
    }

    #[test]
    fn issued_tokens_verify_and_carry_the_user() {
        let settings = test_config().jwt;
        let user = saved_user();

        let token = issue_token(&user, &settings).unwrap();
        let claims = verify_token(&token, &settings).unwrap();

        assert_eq!(claims.user_object_id().unwrap(), user.id.unwrap());
        assert_eq!(claims.username, "marta");
        assert_eq!(claims.email, "marta@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let settings = test_config().jwt;
        let other = JwtSettings {
            secret: "someone-else".to_string(),
            expires_hours: 1,
        };
        let token = issue_token(&saved_user(), &other).unwrap();

        match verify_token(&token, &settings) {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "Token is not valid"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let settings = test_config().jwt;
        let expired = JwtSettings {
            secret: settings.secret.clone(),
            expires_hours: -2,
        };
        let token = issue_token(&saved_user(), &expired).unwrap();
        assert!(verify_token(&token, &settings).is_err());
    }

    #[test]
    fn each_token_gets_its_own_id() {
        let settings = test_config().jwt;
        let user = saved_user();
        let a = verify_token(&issue_token(&user, &settings).unwrap(), &settings).unwrap();
        let b = verify_token(&issue_token(&user, &settings).unwrap(), &settings).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn unsaved_users_cannot_get_tokens() {
        let mut user = saved_user();
        user.id = None;
        assert!(issue_token(&user, &test_config().jwt).is_err());
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email(" Ana@Example.COM ").unwrap(), "ana@example.com");
        assert!(normalize_email("not-an-email").is_err());
    }

    #[tokio::test]
    async fn password_hashes_verify() {
        let hashed = hash_password("hunter22".to_string()).await.unwrap();
        assert!(password_matches("hunter22".to_string(), hashed.clone()).await.unwrap());
        assert!(!password_matches("hunter23".to_string(), hashed).await.unwrap());
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn deleted_account_is_gone() {
        let db = crate::database::test_database().await;
        let settings = test_config().jwt;
        let suffix = Uuid::new_v4().simple().to_string();

        let token = signup(
            &db,
            &settings,
            &SignupRequest {
                username: format!("user{}", &suffix[..8]),
                email: format!("{}@example.com", &suffix[..8]),
                password: "secret123".to_string(),
            },
        )
        .await
        .unwrap()
        .token;
        let id = verify_token(&token, &settings).unwrap().user_object_id().unwrap();

        delete_account(&db, &id).await.unwrap();
        assert!(matches!(current_user(&db, &id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn deleted_account_leaves_no_dangling_references() {
        use crate::models::{
            expense::CreateExpenseRequest, group_trip::CreateGroupTripRequest,
            travel_log::CreateTravelLogRequest,
        };
        use crate::services::{expense_service, group_trip_service, travel_log_service};

        let db = crate::database::test_database().await;
        let settings = test_config().jwt;
        let suffix = Uuid::new_v4().simple().to_string();
        let token = signup(
            &db,
            &settings,
            &SignupRequest {
                username: format!("gone{}", &suffix[..8]),
                email: format!("gone{}@example.com", &suffix[..8]),
                password: "secret123".to_string(),
            },
        )
        .await
        .unwrap()
        .token;
        let leaving = verify_token(&token, &settings).unwrap().user_object_id().unwrap();
        let staying = ObjectId::new();
        let trips = db.collection::<GroupTrip>(group_trip::COLLECTION);

        let trip_request = |name: &str| CreateGroupTripRequest {
            name: name.to_string(),
            description: None,
            start_date: None,
            end_date: None,
            members: vec![],
        };
        let log_request = |title: &str, trip: &str| CreateTravelLogRequest {
            title: title.to_string(),
            destination: "Lisbon".to_string(),
            description: None,
            status: None,
            is_public: None,
            latitude: None,
            longitude: None,
            group_trip: Some(trip.to_string()),
        };

        // A trip that survives, holding the leaving user's log and expense.
        let kept = group_trip_service::create(&db, &staying, trip_request("Kept")).await.unwrap();
        let kept_id = ObjectId::parse_str(&kept.id).unwrap();
        trips
            .update_one(doc! { "_id": kept_id }, doc! { "$addToSet": { "members": leaving } })
            .await
            .unwrap();
        travel_log_service::create(&db, &leaving, log_request("Alfama", &kept.id))
            .await
            .unwrap();
        expense_service::create(
            &db,
            &leaving,
            CreateExpenseRequest {
                description: "Tram".to_string(),
                amount: 3.0,
                category: "Transport".to_string(),
                date: None,
                travel_log: None,
                group_trip: Some(kept.id.clone()),
            },
        )
        .await
        .unwrap();

        // A trip that goes away, referenced by the staying user's log.
        let doomed = group_trip_service::create(&db, &leaving, trip_request("Doomed")).await.unwrap();
        trips
            .update_one(
                doc! { "_id": ObjectId::parse_str(&doomed.id).unwrap() },
                doc! { "$addToSet": { "members": staying } },
            )
            .await
            .unwrap();
        let orphan = travel_log_service::create(&db, &staying, log_request("Belem", &doomed.id))
            .await
            .unwrap();

        delete_account(&db, &leaving).await.unwrap();

        let kept = trips.find_one(doc! { "_id": kept_id }).await.unwrap().unwrap();
        assert_eq!(kept.members, vec![staying]);
        assert!(kept.shared_travel_logs.is_empty());
        assert!(kept.shared_expenses.is_empty());

        let orphan = travel_log_service::load(&db, &orphan.id).await.unwrap();
        assert_eq!(orphan.group_trip, None);

        trips.delete_one(doc! { "_id": kept_id }).await.unwrap();
        travel_log_service::delete(&db, &staying, &orphan.id.unwrap().to_hex())
            .await
            .unwrap();
    }
}
