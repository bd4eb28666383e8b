use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use std::collections::HashMap;

use crate::database::MongoDB;
use crate::models::{
    expense::{
        self, summarize, CreateExpenseRequest, Expense, ExpenseResponse, ExpenseSummary,
        UpdateExpenseRequest,
    },
    group_trip::{self, GroupTrip},
    travel_log::{self, TravelLog},
};
use crate::services::travel_log_service::member_trip;
use crate::utils::{
    error::{AppError, AppResult},
    ids::parse_path_id,
};

fn collection(db: &MongoDB) -> mongodb::Collection<Expense> {
    db.collection::<Expense>(expense::COLLECTION)
}

pub async fn load(db: &MongoDB, raw_id: &str) -> AppResult<Expense> {
    let id = parse_path_id(raw_id, "Expense")?;
    collection(db)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::not_found("Expense not found"))
}

async fn owned(db: &MongoDB, user: &ObjectId) -> AppResult<Vec<Expense>> {
    Ok(collection(db)
        .find(doc! { "user": user })
        .sort(doc! { "date": -1 })
        .await?
        .try_collect()
        .await?)
}

/// Titles of the travel logs the given expenses point at.
pub async fn travel_log_titles(
    db: &MongoDB,
    expenses: &[Expense],
) -> AppResult<HashMap<ObjectId, String>> {
    let mut ids: Vec<ObjectId> = expenses.iter().filter_map(|e| e.travel_log).collect();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let logs: Vec<TravelLog> = db
        .collection::<TravelLog>(travel_log::COLLECTION)
        .find(doc! { "_id": { "$in": &ids[..] } })
        .await?
        .try_collect()
        .await?;

    Ok(logs
        .into_iter()
        .filter_map(|log| log.id.map(|id| (id, log.title)))
        .collect())
}

fn trips(db: &MongoDB) -> mongodb::Collection<GroupTrip> {
    db.collection::<GroupTrip>(group_trip::COLLECTION)
}

pub async fn create(
    db: &MongoDB,
    user: &ObjectId,
    request: CreateExpenseRequest,
) -> AppResult<ExpenseResponse> {
    let mut expense = request.into_expense(*user)?;
    if let Some(trip_id) = &expense.group_trip {
        member_trip(db, user, trip_id).await?;
    }

    let result = collection(db).insert_one(&expense).await?;
    expense.id = result.inserted_id.as_object_id();

    if let (Some(trip_id), Some(expense_id)) = (expense.group_trip, expense.id) {
        trips(db)
            .update_one(
                doc! { "_id": trip_id },
                doc! { "$addToSet": { "sharedExpenses": expense_id } },
            )
            .await?;
    }

    Ok(ExpenseResponse::from(expense))
}

pub async fn list(db: &MongoDB, user: &ObjectId) -> AppResult<Vec<ExpenseResponse>> {
    let expenses = owned(db, user).await?;
    let titles = travel_log_titles(db, &expenses).await?;

    Ok(expenses
        .into_iter()
        .map(|e| ExpenseResponse::from(e).with_travel_log_titles(&titles))
        .collect())
}

pub async fn summary(db: &MongoDB, user: &ObjectId) -> AppResult<ExpenseSummary> {
    Ok(summarize(&owned(db, user).await?))
}

pub async fn get(db: &MongoDB, user: &ObjectId, raw_id: &str) -> AppResult<ExpenseResponse> {
    let expense = load(db, raw_id).await?;
    expense.ensure_owner(user)?;

    let titles = travel_log_titles(db, std::slice::from_ref(&expense)).await?;
    Ok(ExpenseResponse::from(expense).with_travel_log_titles(&titles))
}

/// Moving an expense between trips keeps both trips' `sharedExpenses` in sync.
pub async fn update(
    db: &MongoDB,
    user: &ObjectId,
    raw_id: &str,
    request: &UpdateExpenseRequest,
) -> AppResult<ExpenseResponse> {
    let mut expense = load(db, raw_id).await?;
    expense.ensure_owner(user)?;

    let previous_trip = expense.group_trip;
    request.apply_to(&mut expense)?;

    let trip_changed = previous_trip != expense.group_trip;
    if trip_changed {
        if let Some(trip_id) = &expense.group_trip {
            member_trip(db, user, trip_id).await?;
        }
    }

    collection(db)
        .update_one(
            doc! { "_id": expense.id },
            doc! {
                "$set": {
                    "description": &expense.description,
                    "amount": expense.amount,
                    "category": &expense.category,
                    "date": expense.date,
                    "travelLog": expense.travel_log,
                    "groupTrip": expense.group_trip,
                    "updatedAt": expense.updated_at,
                }
            },
        )
        .await?;

    if trip_changed {
        if let Some(old_trip) = previous_trip {
            trips(db)
                .update_one(
                    doc! { "_id": old_trip },
                    doc! { "$pull": { "sharedExpenses": expense.id } },
                )
                .await?;
        }
        if let Some(new_trip) = expense.group_trip {
            trips(db)
                .update_one(
                    doc! { "_id": new_trip },
                    doc! { "$addToSet": { "sharedExpenses": expense.id } },
                )
                .await?;
        }
    }

    let titles = travel_log_titles(db, std::slice::from_ref(&expense)).await?;
    Ok(ExpenseResponse::from(expense).with_travel_log_titles(&titles))
}

pub async fn delete(db: &MongoDB, user: &ObjectId, raw_id: &str) -> AppResult<()> {
    let expense = load(db, raw_id).await?;
    expense.ensure_owner(user)?;

    collection(db).delete_one(doc! { "_id": expense.id }).await?;
    trips(db)
        .update_many(
            doc! { "sharedExpenses": expense.id },
            doc! { "$pull": { "sharedExpenses": expense.id } },
        )
        .await?;

    Ok(())
}
