use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use std::collections::HashMap;

use crate::database::MongoDB;
use crate::models::user::{self, User, UserSummary};
use crate::utils::error::{AppError, AppResult};

pub async fn find_by_email(db: &MongoDB, email: &str) -> AppResult<Option<User>> {
    let email = email.trim().to_lowercase();
    Ok(db
        .collection::<User>(user::COLLECTION)
        .find_one(doc! { "email": email })
        .await?)
}

/// Looks a user up by username or email.
pub async fn find_by_identifier(db: &MongoDB, identifier: &str) -> AppResult<Option<User>> {
    let identifier = identifier.trim();
    Ok(db
        .collection::<User>(user::COLLECTION)
        .find_one(doc! {
            "$or": [
                { "username": identifier },
                { "email": identifier.to_lowercase() },
            ]
        })
        .await?)
}

/// Resolves every identifier or fails with 404 on the first unknown one.
pub async fn resolve_identifiers(db: &MongoDB, identifiers: &[String]) -> AppResult<Vec<ObjectId>> {
    let mut ids = Vec::with_capacity(identifiers.len());
    for identifier in identifiers.iter().filter(|i| !i.trim().is_empty()) {
        let found = find_by_identifier(db, identifier)
            .await?
            .and_then(|u| u.id)
            .ok_or_else(|| AppError::not_found(format!("User {} not found", identifier.trim())))?;
        ids.push(found);
    }
    Ok(ids)
}

/// Summaries keyed by hex id, for populating references in responses.
pub async fn summaries(db: &MongoDB, ids: &[ObjectId]) -> AppResult<HashMap<String, UserSummary>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users: Vec<User> = db
        .collection::<User>(user::COLLECTION)
        .find(doc! { "_id": { "$in": ids } })
        .await?
        .try_collect()
        .await?;

    Ok(users
        .iter()
        .map(UserSummary::from_user)
        .map(|summary| (summary.id.clone(), summary))
        .collect())
}
