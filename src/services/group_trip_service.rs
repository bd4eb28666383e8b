use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Document};

use crate::database::MongoDB;
use crate::models::{
    expense::{self, Expense, ExpenseResponse},
    group_trip::{
        self, validate_dates, AddTripMembersRequest, CreateGroupTripRequest, GroupTrip,
        GroupTripResponse, ItineraryItemRequest, TripDocumentRequest, TripExpenseRequest,
        TripExpenseSummary, UpdateGroupTripRequest,
    },
    travel_log::{self, TravelLog, TravelLogResponse},
};
use crate::services::{expense_service, user_service};
use crate::utils::{
    error::{AppError, AppResult},
    ids::parse_path_id,
    time::to_bson as to_bson_date,
    validation::{require_text, trim_optional},
};

fn collection(db: &MongoDB) -> mongodb::Collection<GroupTrip> {
    db.collection::<GroupTrip>(group_trip::COLLECTION)
}

async fn find(db: &MongoDB, id: &ObjectId) -> AppResult<GroupTrip> {
    collection(db)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::not_found("Group trip not found"))
}

pub async fn load(db: &MongoDB, raw_id: &str) -> AppResult<GroupTrip> {
    let id = parse_path_id(raw_id, "Group trip")?;
    find(db, &id).await
}

/// Runs `update` against the trip only while `actor` is still a member, then
/// returns the stored trip.
async fn update_as_member(
    db: &MongoDB,
    id: &ObjectId,
    actor: &ObjectId,
    update: Document,
) -> AppResult<GroupTrip> {
    let result = collection(db)
        .update_one(doc! { "_id": id, "members": actor }, update)
        .await?;
    let trip = find(db, id).await?;
    if result.matched_count == 0 {
        return Err(AppError::not_authorized());
    }
    Ok(trip)
}

/// Replaces creator and member ids with `{_id, username, email}`.
async fn with_users(db: &MongoDB, trip: GroupTrip) -> AppResult<GroupTripResponse> {
    let mut ids = trip.members.clone();
    ids.push(trip.creator);
    ids.sort();
    ids.dedup();
    let users = user_service::summaries(db, &ids).await?;
    Ok(GroupTripResponse::from(trip).with_users(&users))
}

/// Everything `with_users` does plus the shared expenses and travel logs.
async fn fully_populated(db: &MongoDB, trip: GroupTrip) -> AppResult<GroupTripResponse> {
    let expenses: Vec<Expense> = if trip.shared_expenses.is_empty() {
        Vec::new()
    } else {
        db.collection::<Expense>(expense::COLLECTION)
            .find(doc! { "_id": { "$in": &trip.shared_expenses[..] } })
            .await?
            .try_collect()
            .await?
    };
    let logs: Vec<TravelLog> = if trip.shared_travel_logs.is_empty() {
        Vec::new()
    } else {
        db.collection::<TravelLog>(travel_log::COLLECTION)
            .find(doc! { "_id": { "$in": &trip.shared_travel_logs[..] } })
            .await?
            .try_collect()
            .await?
    };

    let titles = expense_service::travel_log_titles(db, &expenses).await?;
    let expenses = expenses
        .into_iter()
        .map(|e| ExpenseResponse::from(e).with_travel_log_titles(&titles))
        .collect();
    let logs = logs.into_iter().map(TravelLogResponse::from).collect();

    Ok(with_users(db, trip).await?.with_shared(expenses, logs))
}

pub async fn create(
    db: &MongoDB,
    user: &ObjectId,
    request: CreateGroupTripRequest,
) -> AppResult<GroupTripResponse> {
    let name = require_text("name", &request.name)?;
    let start = request.start_date.map(to_bson_date);
    let end = request.end_date.map(to_bson_date);
    validate_dates(start, end)?;

    let invited = user_service::resolve_identifiers(db, &request.members).await?;
    let mut trip = GroupTrip::new(
        name,
        trim_optional(request.description.as_deref()),
        *user,
        start,
        end,
        invited,
    );

    let result = collection(db).insert_one(&trip).await?;
    trip.id = result.inserted_id.as_object_id();

    with_users(db, trip).await
}

pub async fn list(db: &MongoDB, user: &ObjectId) -> AppResult<Vec<GroupTripResponse>> {
    let trips: Vec<GroupTrip> = collection(db)
        .find(doc! { "members": user })
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;

    let mut ids: Vec<ObjectId> = trips
        .iter()
        .flat_map(|t| t.members.iter().copied().chain(std::iter::once(t.creator)))
        .collect();
    ids.sort();
    ids.dedup();
    let users = user_service::summaries(db, &ids).await?;

    Ok(trips
        .into_iter()
        .map(|trip| GroupTripResponse::from(trip).with_users(&users))
        .collect())
}

pub async fn get(db: &MongoDB, user: &ObjectId, raw_id: &str) -> AppResult<GroupTripResponse> {
    let trip = load(db, raw_id).await?;
    trip.ensure_member(user)?;
    fully_populated(db, trip).await
}

pub async fn update(
    db: &MongoDB,
    user: &ObjectId,
    raw_id: &str,
    request: &UpdateGroupTripRequest,
) -> AppResult<GroupTripResponse> {
    let mut trip = load(db, raw_id).await?;
    trip.ensure_creator(user)?;
    request.apply_to(&mut trip)?;

    collection(db)
        .update_one(
            doc! { "_id": trip.id },
            doc! {
                "$set": {
                    "name": &trip.name,
                    "description": trip.description.clone(),
                    "startDate": trip.start_date,
                    "endDate": trip.end_date,
                }
            },
        )
        .await?;

    with_users(db, trip).await
}

/// Deletes the trip and unlinks the expenses and travel logs that pointed at it.
pub async fn delete(db: &MongoDB, user: &ObjectId, raw_id: &str) -> AppResult<()> {
    let trip = load(db, raw_id).await?;
    trip.ensure_creator(user)?;

    collection(db).delete_one(doc! { "_id": trip.id }).await?;
    db.collection::<Expense>(expense::COLLECTION)
        .update_many(doc! { "groupTrip": trip.id }, doc! { "$set": { "groupTrip": null } })
        .await?;
    db.collection::<TravelLog>(travel_log::COLLECTION)
        .update_many(doc! { "groupTrip": trip.id }, doc! { "$unset": { "groupTrip": "" } })
        .await?;

    Ok(())
}

pub async fn add_members(
    db: &MongoDB,
    user: &ObjectId,
    raw_id: &str,
    request: &AddTripMembersRequest,
) -> AppResult<GroupTripResponse> {
    let id = parse_path_id(raw_id, "Group trip")?;
    let mut trip = find(db, &id).await?;
    trip.ensure_member(user)?;

    let resolved = user_service::resolve_identifiers(db, &request.new_members).await?;
    let added = trip.add_members(resolved);
    if !added.is_empty() {
        trip = update_as_member(
            db,
            &id,
            user,
            doc! { "$addToSet": { "members": { "$each": &added[..] } } },
        )
        .await?;
    }
    log::info!("👥 {} member(s) added to trip {}", added.len(), raw_id);

    with_users(db, trip).await
}

pub async fn remove_member(
    db: &MongoDB,
    user: &ObjectId,
    raw_id: &str,
    raw_member_id: &str,
) -> AppResult<GroupTripResponse> {
    let id = parse_path_id(raw_id, "Group trip")?;
    let mut trip = find(db, &id).await?;
    let member = parse_path_id(raw_member_id, "Member")?;
    trip.remove_member(user, &member)?;

    let result = collection(db)
        .update_one(
            doc! { "_id": id, "members": member },
            doc! { "$pull": { "members": member } },
        )
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::not_found("Member not found in this trip"));
    }

    with_users(db, find(db, &id).await?).await
}

pub async fn add_itinerary_item(
    db: &MongoDB,
    user: &ObjectId,
    raw_id: &str,
    request: ItineraryItemRequest,
) -> AppResult<GroupTripResponse> {
    let id = parse_path_id(raw_id, "Group trip")?;
    let item = find(db, &id).await?.add_itinerary_item(user, request)?;

    // $sort keeps the stored itinerary in date order.
    let trip = update_as_member(
        db,
        &id,
        user,
        doc! {
            "$push": {
                "itinerary": { "$each": [to_bson(&item)?], "$sort": { "date": 1 } }
            }
        },
    )
    .await?;

    with_users(db, trip).await
}

pub async fn add_expense(
    db: &MongoDB,
    user: &ObjectId,
    raw_id: &str,
    request: TripExpenseRequest,
) -> AppResult<GroupTripResponse> {
    let id = parse_path_id(raw_id, "Group trip")?;
    let expense = find(db, &id).await?.add_expense(user, request)?;

    let trip = update_as_member(
        db,
        &id,
        user,
        doc! { "$push": { "expenses": to_bson(&expense)? } },
    )
    .await?;

    with_users(db, trip).await
}

pub async fn expense_summary(
    db: &MongoDB,
    user: &ObjectId,
    raw_id: &str,
) -> AppResult<TripExpenseSummary> {
    let trip = load(db, raw_id).await?;
    trip.ensure_member(user)?;
    Ok(trip.expense_summary())
}

pub async fn add_document(
    db: &MongoDB,
    user: &ObjectId,
    raw_id: &str,
    request: TripDocumentRequest,
) -> AppResult<GroupTripResponse> {
    let id = parse_path_id(raw_id, "Group trip")?;
    let document = find(db, &id).await?.add_document(user, request)?;

    let trip = update_as_member(
        db,
        &id,
        user,
        doc! { "$push": { "documents": to_bson(&document)? } },
    )
    .await?;

    with_users(db, trip).await
}

pub async fn remove_document(
    db: &MongoDB,
    user: &ObjectId,
    raw_id: &str,
    raw_doc_id: &str,
) -> AppResult<GroupTripResponse> {
    let id = parse_path_id(raw_id, "Group trip")?;
    let mut trip = find(db, &id).await?;
    let document = parse_path_id(raw_doc_id, "Document")?;
    trip.remove_document(user, &document)?;

    let result = collection(db)
        .update_one(
            doc! { "_id": id, "documents._id": document },
            doc! { "$pull": { "documents": { "_id": document } } },
        )
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::not_found("Document not found"));
    }

    with_users(db, find(db, &id).await?).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_database;

    fn trip_request(name: &str) -> CreateGroupTripRequest {
        CreateGroupTripRequest {
            name: name.to_string(),
            description: None,
            start_date: None,
            end_date: None,
            members: vec![],
        }
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn deleted_trip_returns_not_found() {
        let db = test_database().await;
        let creator = ObjectId::new();

        let created = create(&db, &creator, trip_request("Iceland")).await.unwrap();
        delete(&db, &creator, &created.id).await.unwrap();

        assert!(matches!(get(&db, &creator, &created.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn outsiders_cannot_read_or_delete() {
        let db = test_database().await;
        let creator = ObjectId::new();
        let outsider = ObjectId::new();

        let created = create(&db, &creator, trip_request("Patagonia")).await.unwrap();

        assert!(matches!(get(&db, &outsider, &created.id).await, Err(AppError::Unauthorized(_))));
        assert!(matches!(
            delete(&db, &outsider, &created.id).await,
            Err(AppError::Unauthorized(_))
        ));

        delete(&db, &creator, &created.id).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn unknown_invitees_are_not_found() {
        let db = test_database().await;
        let mut request = trip_request("Ghost trip");
        request.members = vec!["nobody-by-this-name".to_string()];

        match create(&db, &ObjectId::new(), request).await {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "User nobody-by-this-name not found"),
            other => panic!("unexpected: {:?}", other.map(|t| t.id)),
        }
    }

    fn expense(description: &str, amount: f64) -> TripExpenseRequest {
        TripExpenseRequest {
            description: description.to_string(),
            amount,
            category: None,
            date: None,
        }
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn concurrent_trip_expenses_are_all_kept() {
        let db = test_database().await;
        let creator = ObjectId::new();
        let created = create(&db, &creator, trip_request("Azores")).await.unwrap();

        let results = futures::future::join_all(
            (1..=6).map(|n| add_expense(&db, &creator, &created.id, expense("Dinner", n as f64))),
        )
        .await;
        assert!(results.iter().all(|r| r.is_ok()));

        let stored = load(&db, &created.id).await.unwrap();
        assert_eq!(stored.expenses.len(), 6);
        assert_eq!(stored.expense_summary().total, 21.0);

        delete(&db, &creator, &created.id).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn leaving_does_not_undo_a_concurrent_document() {
        let db = test_database().await;
        let creator = ObjectId::new();
        let friend = ObjectId::new();
        let created = create(&db, &creator, trip_request("Madeira")).await.unwrap();
        collection(&db)
            .update_one(
                doc! { "_id": parse_path_id(&created.id, "Group trip").unwrap() },
                doc! { "$addToSet": { "members": friend } },
            )
            .await
            .unwrap();

        let friend_hex = friend.to_hex();
        let (left, added) = futures::join!(
            remove_member(&db, &friend, &created.id, &friend_hex),
            add_document(
                &db,
                &creator,
                &created.id,
                TripDocumentRequest {
                    name: "Ferry".to_string(),
                    url: "https://files.example/ferry.pdf".to_string(),
                    file_type: None,
                },
            ),
        );
        left.unwrap();
        added.unwrap();

        let stored = load(&db, &created.id).await.unwrap();
        assert_eq!(stored.members, vec![creator]);
        assert_eq!(stored.documents.len(), 1);

        delete(&db, &creator, &created.id).await.unwrap();
    }
}
