use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::utils::{
    error::{AppError, AppResult},
    form,
    ids::parse_link,
    time::{to_bson, to_chrono},
    validation::{require_amount, require_text},
};

pub const COLLECTION: &str = "expenses";

/// Expense document in the "expenses" collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub date: BsonDateTime,
    pub user: ObjectId,
    #[serde(default)]
    pub group_trip: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_log: Option<ObjectId>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl Expense {
    pub fn ensure_owner(&self, user: &ObjectId) -> AppResult<()> {
        if &self.user == user {
            Ok(())
        } else {
            Err(AppError::not_authorized())
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseRequest {
    pub description: String,
    #[serde(deserialize_with = "form::number")]
    pub amount: f64,
    pub category: String,
    #[serde(default, deserialize_with = "form::optional_datetime")]
    pub date: Option<DateTime<Utc>>,
    pub travel_log: Option<String>,
    pub group_trip: Option<String>,
}

impl CreateExpenseRequest {
    pub fn into_expense(self, owner: ObjectId) -> AppResult<Expense> {
        let now = BsonDateTime::now();
        Ok(Expense {
            id: None,
            description: require_text("description", &self.description)?,
            amount: require_amount(self.amount)?,
            category: require_text("category", &self.category)?,
            date: self.date.map(to_bson).unwrap_or(now),
            user: owner,
            group_trip: parse_link(self.group_trip.as_deref(), "groupTrip")?,
            travel_log: parse_link(self.travel_log.as_deref(), "travelLog")?,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update. For `travelLog` and `groupTrip` an absent field keeps the
/// current link and an empty string clears it.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExpenseRequest {
    pub description: Option<String>,
    #[serde(default, deserialize_with = "form::optional_number")]
    pub amount: Option<f64>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "form::optional_datetime")]
    pub date: Option<DateTime<Utc>>,
    pub travel_log: Option<String>,
    pub group_trip: Option<String>,
}

impl UpdateExpenseRequest {
    pub fn apply_to(&self, expense: &mut Expense) -> AppResult<()> {
        if let Some(description) = &self.description {
            expense.description = require_text("description", description)?;
        }
        if let Some(amount) = self.amount {
            expense.amount = require_amount(amount)?;
        }
        if let Some(category) = &self.category {
            expense.category = require_text("category", category)?;
        }
        if let Some(date) = self.date {
            expense.date = to_bson(date);
        }
        if self.travel_log.is_some() {
            expense.travel_log = parse_link(self.travel_log.as_deref(), "travelLog")?;
        }
        if self.group_trip.is_some() {
            expense.group_trip = parse_link(self.group_trip.as_deref(), "groupTrip")?;
        }
        expense.updated_at = BsonDateTime::now();
        Ok(())
    }
}

#[derive(Debug, Serialize, Clone, utoipa::ToSchema)]
pub struct LinkedTravelLog {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Serialize, Clone, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub date: DateTime<Utc>,
    pub user: String,
    pub travel_log: Option<LinkedTravelLog>,
    pub group_trip: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExpenseResponse {
    /// Fills in the linked travel log's title when it is known.
    pub fn with_travel_log_titles(mut self, titles: &HashMap<ObjectId, String>) -> Self {
        if let Some(link) = self.travel_log.as_mut() {
            if let Ok(id) = ObjectId::parse_str(&link.id) {
                link.title = titles.get(&id).cloned();
            }
        }
        self
    }
}

impl From<Expense> for ExpenseResponse {
    fn from(expense: Expense) -> Self {
        ExpenseResponse {
            id: expense.id.map(|id| id.to_hex()).unwrap_or_default(),
            description: expense.description,
            amount: expense.amount,
            category: expense.category,
            date: to_chrono(expense.date),
            user: expense.user.to_hex(),
            travel_log: expense.travel_log.map(|id| LinkedTravelLog {
                id: id.to_hex(),
                title: None,
            }),
            group_trip: expense.group_trip.map(|id| id.to_hex()),
            created_at: to_chrono(expense.created_at),
            updated_at: to_chrono(expense.updated_at),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, utoipa::ToSchema)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    pub count: usize,
}

#[derive(Debug, Serialize, Clone, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSummary {
    pub total: f64,
    pub count: usize,
    pub by_category: Vec<CategoryTotal>,
}

/// Totals per category, largest first; ties break on the category name.
pub fn summarize(expenses: &[Expense]) -> ExpenseSummary {
    let mut by_category: HashMap<&str, CategoryTotal> = HashMap::new();

    for expense in expenses {
        let entry = by_category
            .entry(expense.category.as_str())
            .or_insert_with(|| CategoryTotal {
                category: expense.category.clone(),
                total: 0.0,
                count: 0,
            });
        entry.total += expense.amount;
        entry.count += 1;
    }

    let mut by_category: Vec<CategoryTotal> = by_category.into_values().collect();
    by_category.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });

    ExpenseSummary {
        total: expenses.iter().map(|e| e.amount).sum(),
        count: expenses.len(),
        by_category,
    }
}
