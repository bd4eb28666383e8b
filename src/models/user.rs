use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use crate::utils::time::to_chrono;

pub const COLLECTION: &str = "users";

/// Account document in the "users" collection.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub email: String,
    /// bcrypt hash
    pub password: String,
    pub date: BsonDateTime,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// Current-user payload, never carries the password hash.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub date: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            username: user.username,
            email: user.email,
            date: to_chrono(user.date),
        }
    }
}

/// Populated user reference. Public listings leave the email out.
#[derive(Debug, Serialize, Clone, PartialEq, utoipa::ToSchema)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserSummary {
    pub fn from_user(user: &User) -> Self {
        UserSummary {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            username: user.username.clone(),
            email: Some(user.email.clone()),
        }
    }

    pub fn without_email(mut self) -> Self {
        self.email = None;
        self
    }
}

/// Either a bare id or the referenced record, mirroring what a populated
/// document reference looks like on the wire.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Populated<T> {
    Id(String),
    Record(T),
}

impl<T> Populated<T> {
    pub fn record(&self) -> Option<&T> {
        match self {
            Populated::Record(record) => Some(record),
            Populated::Id(_) => None,
        }
    }
}
