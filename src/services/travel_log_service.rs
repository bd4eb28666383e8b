use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Document};

use crate::database::MongoDB;
use crate::models::{
    group_trip::{self, GroupTrip},
    travel_log::{
        self, reaction_list, AddLogMemberRequest, CreateTravelLogRequest, PublicFeedQuery,
        ReactionAction, ReactionResponse, TravelLog, TravelLogResponse, UpdateTravelLogRequest,
    },
};
use crate::services::user_service;
use crate::utils::{
    error::{AppError, AppResult},
    ids::{parse_link, parse_path_id},
};

fn collection(db: &MongoDB) -> mongodb::Collection<TravelLog> {
    db.collection::<TravelLog>(travel_log::COLLECTION)
}

async fn find_many(db: &MongoDB, filter: Document) -> AppResult<Vec<TravelLog>> {
    Ok(collection(db)
        .find(filter)
        .sort(doc! { "date": -1 })
        .await?
        .try_collect()
        .await?)
}

async fn find(db: &MongoDB, id: &ObjectId) -> AppResult<TravelLog> {
    collection(db)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::not_found("Travel log not found"))
}

/// Loads a log by its raw path id; malformed ids count as missing.
pub async fn load(db: &MongoDB, raw_id: &str) -> AppResult<TravelLog> {
    let id = parse_path_id(raw_id, "Travel log")?;
    find(db, &id).await
}

/// Attaches `{_id, username}` of each log's author.
async fn with_authors(db: &MongoDB, logs: Vec<TravelLog>) -> AppResult<Vec<TravelLogResponse>> {
    let mut owners: Vec<ObjectId> = logs.iter().map(|l| l.user_id).collect();
    owners.sort();
    owners.dedup();
    let authors = user_service::summaries(db, &owners).await?;

    Ok(logs
        .into_iter()
        .map(|log| {
            let author = authors
                .get(&log.user_id.to_hex())
                .cloned()
                .map(|a| a.without_email());
            TravelLogResponse::from(log).with_author(author)
        })
        .collect())
}

pub async fn public_feed(db: &MongoDB, query: &PublicFeedQuery) -> AppResult<Vec<TravelLogResponse>> {
    let mut filter = doc! {
        "$or": [ { "isPublic": true }, { "status": "public" } ]
    };
    if let Some(status) = query.status {
        filter.insert("status", to_bson(&status)?);
    }

    let logs: Vec<TravelLog> = collection(db)
        .find(filter)
        .sort(doc! { "date": -1 })
        .skip(query.offset())
        .limit(query.limit())
        .await?
        .try_collect()
        .await?;

    with_authors(db, logs).await
}

pub async fn list_own(db: &MongoDB, user: &ObjectId) -> AppResult<Vec<TravelLogResponse>> {
    let logs = find_many(db, doc! { "userId": user }).await?;
    Ok(logs.into_iter().map(TravelLogResponse::from).collect())
}

pub async fn list_shared(db: &MongoDB, user: &ObjectId) -> AppResult<Vec<TravelLogResponse>> {
    let logs = find_many(db, doc! { "members": user }).await?;
    with_authors(db, logs).await
}

pub async fn get(db: &MongoDB, user: &ObjectId, raw_id: &str) -> AppResult<TravelLogResponse> {
    let log = load(db, raw_id).await?;
    log.ensure_viewer(user)?;

    let mut responses = with_authors(db, vec![log]).await?;
    responses
        .pop()
        .ok_or_else(|| AppError::Internal("Travel log vanished while populating".to_string()))
}

/// Loads the trip a new record wants to join and checks the caller belongs to it.
pub async fn member_trip(db: &MongoDB, user: &ObjectId, trip_id: &ObjectId) -> AppResult<GroupTrip> {
    let trip = db
        .collection::<GroupTrip>(group_trip::COLLECTION)
        .find_one(doc! { "_id": trip_id })
        .await?
        .ok_or_else(|| AppError::not_found("Group trip not found"))?;
    trip.ensure_member(user)?;
    Ok(trip)
}

pub async fn create(
    db: &MongoDB,
    user: &ObjectId,
    request: CreateTravelLogRequest,
) -> AppResult<TravelLogResponse> {
    let trip_id = parse_link(request.group_trip.as_deref(), "groupTrip")?;
    if let Some(trip_id) = &trip_id {
        member_trip(db, user, trip_id).await?;
    }

    let mut log = request.into_log(*user, trip_id)?;
    let result = collection(db).insert_one(&log).await?;
    log.id = result.inserted_id.as_object_id();

    if let (Some(trip_id), Some(log_id)) = (trip_id, log.id) {
        db.collection::<GroupTrip>(group_trip::COLLECTION)
            .update_one(
                doc! { "_id": trip_id },
                doc! { "$addToSet": { "sharedTravelLogs": log_id } },
            )
            .await?;
    }

    Ok(TravelLogResponse::from(log))
}

pub async fn update(
    db: &MongoDB,
    user: &ObjectId,
    raw_id: &str,
    request: &UpdateTravelLogRequest,
) -> AppResult<TravelLogResponse> {
    let mut log = load(db, raw_id).await?;
    log.ensure_owner(user)?;
    request.apply_to(&mut log)?;

    // Cleared optionals are stored as null.
    let changes = doc! {
        "$set": {
            "title": &log.title,
            "destination": &log.destination,
            "description": log.description.clone(),
            "status": to_bson(&log.status)?,
            "isPublic": log.is_public,
            "latitude": log.latitude,
            "longitude": log.longitude,
        }
    };

    collection(db)
        .update_one(doc! { "_id": log.id }, changes)
        .await?;

    Ok(TravelLogResponse::from(log))
}

pub async fn delete(db: &MongoDB, user: &ObjectId, raw_id: &str) -> AppResult<()> {
    let log = load(db, raw_id).await?;
    log.ensure_owner(user)?;

    collection(db).delete_one(doc! { "_id": log.id }).await?;
    db.collection::<GroupTrip>(group_trip::COLLECTION)
        .update_many(
            doc! { "sharedTravelLogs": log.id },
            doc! { "$pull": { "sharedTravelLogs": log.id } },
        )
        .await?;

    Ok(())
}

/// Filter and update applying one reaction change in place. The filter only
/// matches while the change is still valid for `user`.
fn reaction_change(log_id: &ObjectId, user: &ObjectId, action: ReactionAction) -> (Document, Document) {
    let field = action.field();
    let user_key = format!("{}.user", field);
    if action.adds() {
        (
            doc! { "_id": log_id, user_key: { "$ne": user } },
            doc! { "$push": { field: { "$each": [ { "user": user } ], "$position": 0 } } },
        )
    } else {
        (
            doc! { "_id": log_id, user_key: user },
            doc! { "$pull": { field: { "user": user } } },
        )
    }
}

/// Likes and bookmarks are open to anyone who can see the log.
pub async fn react(
    db: &MongoDB,
    user: &ObjectId,
    raw_id: &str,
    action: ReactionAction,
) -> AppResult<Vec<ReactionResponse>> {
    let log_id = parse_path_id(raw_id, "Travel log")?;
    let mut log = find(db, &log_id).await?;
    log.ensure_viewer(user)?;
    log.react(*user, action)?;

    let (filter, change) = reaction_change(&log_id, user, action);
    let result = collection(db).update_one(filter, change).await?;
    let stored = find(db, &log_id).await?;
    if result.matched_count == 0 {
        return Err(AppError::bad_request(action.conflict_msg()));
    }

    Ok(reaction_list(stored.reactions(action)))
}

pub async fn add_member(
    db: &MongoDB,
    user: &ObjectId,
    request: &AddLogMemberRequest,
) -> AppResult<TravelLogResponse> {
    let log_id = parse_path_id(&request.travel_log_id, "Travel log")?;
    let mut log = find(db, &log_id).await?;
    log.ensure_owner(user)?;

    let member = user_service::find_by_email(db, &request.member_email)
        .await?
        .and_then(|u| u.id)
        .ok_or_else(|| AppError::not_found("User with that email not found"))?;
    log.add_member(member)?;

    let result = collection(db)
        .update_one(
            doc! { "_id": log_id },
            doc! { "$addToSet": { "members": member } },
        )
        .await?;
    let stored = find(db, &log_id).await?;
    if result.modified_count == 0 {
        return Err(AppError::bad_request("User is already a member of this travel log"));
    }

    Ok(TravelLogResponse::from(stored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_database;

    fn request(title: &str) -> CreateTravelLogRequest {
        CreateTravelLogRequest {
            title: title.to_string(),
            destination: "Porto".to_string(),
            description: None,
            status: None,
            is_public: None,
            latitude: None,
            longitude: None,
            group_trip: None,
        }
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn deleted_log_returns_not_found() {
        let db = test_database().await;
        let owner = ObjectId::new();

        let created = create(&db, &owner, request("Ribeira")).await.unwrap();
        delete(&db, &owner, &created.id).await.unwrap();

        assert!(matches!(get(&db, &owner, &created.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(delete(&db, &owner, &created.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn strangers_cannot_touch_private_logs() {
        let db = test_database().await;
        let owner = ObjectId::new();
        let stranger = ObjectId::new();

        let created = create(&db, &owner, request("Secret cove")).await.unwrap();

        assert!(matches!(get(&db, &stranger, &created.id).await, Err(AppError::Unauthorized(_))));
        assert!(matches!(
            update(&db, &stranger, &created.id, &UpdateTravelLogRequest::default()).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            react(&db, &stranger, &created.id, ReactionAction::Like).await,
            Err(AppError::Unauthorized(_))
        ));

        delete(&db, &owner, &created.id).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn likes_persist_once_per_user() {
        let db = test_database().await;
        let owner = ObjectId::new();

        let created = create(&db, &owner, request("Douro")).await.unwrap();
        let likes = react(&db, &owner, &created.id, ReactionAction::Like).await.unwrap();
        assert_eq!(likes.len(), 1);
        assert!(react(&db, &owner, &created.id, ReactionAction::Like).await.is_err());

        let stored = load(&db, &created.id).await.unwrap();
        assert_eq!(stored.likes.len(), 1);

        delete(&db, &owner, &created.id).await.unwrap();
    }

    #[test]
    fn reaction_changes_only_match_while_valid() {
        let log = ObjectId::new();
        let user = ObjectId::new();

        let (filter, change) = reaction_change(&log, &user, ReactionAction::Like);
        assert_eq!(filter, doc! { "_id": log, "likes.user": { "$ne": user } });
        assert_eq!(
            change,
            doc! { "$push": { "likes": { "$each": [ { "user": user } ], "$position": 0 } } }
        );

        let (filter, change) = reaction_change(&log, &user, ReactionAction::Unbookmark);
        assert_eq!(filter, doc! { "_id": log, "bookmarks.user": user });
        assert_eq!(change, doc! { "$pull": { "bookmarks": { "user": user } } });
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn concurrent_likes_are_all_kept() {
        let db = test_database().await;
        let owner = ObjectId::new();
        let mut public = request("Sintra");
        public.is_public = Some(true);
        let created = create(&db, &owner, public).await.unwrap();

        let fans: Vec<ObjectId> = (0..8).map(|_| ObjectId::new()).collect();
        let results = futures::future::join_all(
            fans.iter()
                .map(|fan| react(&db, fan, &created.id, ReactionAction::Like)),
        )
        .await;
        assert!(results.iter().all(|r| r.is_ok()));

        let stored = load(&db, &created.id).await.unwrap();
        assert_eq!(stored.likes.len(), fans.len());

        delete(&db, &owner, &created.id).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn racing_duplicate_like_is_rejected() {
        let db = test_database().await;
        let owner = ObjectId::new();
        let created = create(&db, &owner, request("Evora")).await.unwrap();

        let (first, second) = futures::join!(
            react(&db, &owner, &created.id, ReactionAction::Like),
            react(&db, &owner, &created.id, ReactionAction::Like),
        );
        assert_eq!([&first, &second].iter().filter(|r| r.is_ok()).count(), 1);

        let stored = load(&db, &created.id).await.unwrap();
        assert_eq!(stored.likes.len(), 1);

        delete(&db, &owner, &created.id).await.unwrap();
    }
}
