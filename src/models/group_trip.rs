use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::expense::ExpenseResponse;
use crate::models::travel_log::TravelLogResponse;
use crate::models::user::{Populated, UserSummary};
use crate::utils::{
    error::{AppError, AppResult},
    form,
    ids::hex_ids,
    time::{to_bson, to_chrono},
    validation::{require_amount, require_text, trim_optional},
};

pub const COLLECTION: &str = "grouptrips";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItineraryItem {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub date: BsonDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripExpense {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub description: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub added_by: ObjectId,
    pub date: BsonDateTime,
}

/// Reference to a document stored elsewhere (the trip only keeps its URL).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    pub uploaded_by: ObjectId,
    pub upload_date: BsonDateTime,
}

/// Group trip document in the "grouptrips" collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupTrip {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub creator: ObjectId,
    pub members: Vec<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<BsonDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<BsonDateTime>,
    #[serde(default)]
    pub itinerary: Vec<ItineraryItem>,
    #[serde(default)]
    pub expenses: Vec<TripExpense>,
    #[serde(default)]
    pub shared_expenses: Vec<ObjectId>,
    #[serde(default)]
    pub shared_travel_logs: Vec<ObjectId>,
    #[serde(default)]
    pub documents: Vec<TripDocument>,
    pub created_at: BsonDateTime,
}

impl GroupTrip {
    /// The creator is always the first member; duplicate invitees collapse.
    pub fn new(
        name: String,
        description: Option<String>,
        creator: ObjectId,
        start_date: Option<BsonDateTime>,
        end_date: Option<BsonDateTime>,
        invited: Vec<ObjectId>,
    ) -> Self {
        let mut trip = GroupTrip {
            id: None,
            name,
            description,
            creator,
            members: vec![creator],
            start_date,
            end_date,
            itinerary: Vec::new(),
            expenses: Vec::new(),
            shared_expenses: Vec::new(),
            shared_travel_logs: Vec::new(),
            documents: Vec::new(),
            created_at: BsonDateTime::now(),
        };
        trip.add_members(invited);
        trip
    }

    pub fn is_member(&self, user: &ObjectId) -> bool {
        self.members.contains(user)
    }

    pub fn ensure_member(&self, user: &ObjectId) -> AppResult<()> {
        if self.is_member(user) {
            Ok(())
        } else {
            Err(AppError::not_authorized())
        }
    }

    pub fn ensure_creator(&self, user: &ObjectId) -> AppResult<()> {
        if &self.creator == user {
            Ok(())
        } else {
            Err(AppError::not_authorized())
        }
    }

    /// Adds users that are not members yet and returns the newcomers.
    pub fn add_members<I>(&mut self, users: I) -> Vec<ObjectId>
    where
        I: IntoIterator<Item = ObjectId>,
    {
        let mut added = Vec::new();
        for user in users {
            if !self.members.contains(&user) {
                self.members.push(user);
                added.push(user);
            }
        }
        added
    }

    /// The creator may remove anyone but themselves; other members may only leave.
    pub fn remove_member(&mut self, actor: &ObjectId, member: &ObjectId) -> AppResult<()> {
        if &self.creator != actor && actor != member {
            return Err(AppError::not_authorized());
        }
        if &self.creator == member {
            return Err(AppError::bad_request("The creator cannot be removed from the trip"));
        }
        if !self.is_member(member) {
            return Err(AppError::not_found("Member not found in this trip"));
        }
        self.members.retain(|m| m != member);
        Ok(())
    }

    pub fn add_itinerary_item(
        &mut self,
        actor: &ObjectId,
        request: ItineraryItemRequest,
    ) -> AppResult<ItineraryItem> {
        self.ensure_member(actor)?;
        let item = ItineraryItem {
            id: ObjectId::new(),
            name: require_text("name", &request.name)?,
            date: to_bson(request.date),
            location: trim_optional(request.location.as_deref()),
            description: trim_optional(request.description.as_deref()),
        };
        self.itinerary.push(item.clone());
        self.itinerary.sort_by_key(|item| item.date);
        Ok(item)
    }

    pub fn add_expense(&mut self, actor: &ObjectId, request: TripExpenseRequest) -> AppResult<TripExpense> {
        self.ensure_member(actor)?;
        let expense = TripExpense {
            id: ObjectId::new(),
            description: require_text("description", &request.description)?,
            amount: require_amount(request.amount)?,
            category: trim_optional(request.category.as_deref()),
            added_by: *actor,
            date: request.date.map(to_bson).unwrap_or_else(BsonDateTime::now),
        };
        self.expenses.push(expense.clone());
        Ok(expense)
    }

    pub fn add_document(&mut self, actor: &ObjectId, request: TripDocumentRequest) -> AppResult<TripDocument> {
        self.ensure_member(actor)?;
        let url = require_text("url", &request.url)?;
        if !(url.starts_with("http://") || url.starts_with("https://") || url.starts_with('/')) {
            return Err(AppError::bad_request("Document url must be an http(s) URL or an absolute path"));
        }
        let document = TripDocument {
            id: ObjectId::new(),
            name: require_text("name", &request.name)?,
            url,
            file_type: trim_optional(request.file_type.as_deref()),
            uploaded_by: *actor,
            upload_date: BsonDateTime::now(),
        };
        self.documents.push(document.clone());
        Ok(document)
    }

    /// Documents can be removed by whoever added them or by the creator.
    pub fn remove_document(&mut self, actor: &ObjectId, document: &ObjectId) -> AppResult<()> {
        self.ensure_member(actor)?;
        let found = self
            .documents
            .iter()
            .find(|d| &d.id == document)
            .ok_or_else(|| AppError::not_found("Document not found"))?;
        if &found.uploaded_by != actor && &self.creator != actor {
            return Err(AppError::not_authorized());
        }
        self.documents.retain(|d| &d.id != document);
        Ok(())
    }

    /// Equal split of the trip's expenses among current members. Payers who
    /// have since left keep a positive balance for what they paid.
    pub fn expense_summary(&self) -> TripExpenseSummary {
        let total: f64 = self.expenses.iter().map(|e| e.amount).sum();
        let share = if self.members.is_empty() {
            0.0
        } else {
            total / self.members.len() as f64
        };

        let mut paid: HashMap<ObjectId, f64> = HashMap::new();
        for expense in &self.expenses {
            *paid.entry(expense.added_by).or_insert(0.0) += expense.amount;
        }

        let mut balances: Vec<MemberBalance> = self
            .members
            .iter()
            .map(|member| {
                let amount = paid.remove(member).unwrap_or(0.0);
                MemberBalance {
                    user: member.to_hex(),
                    paid: amount,
                    balance: amount - share,
                }
            })
            .collect();

        let mut former: Vec<MemberBalance> = paid
            .into_iter()
            .map(|(user, amount)| MemberBalance {
                user: user.to_hex(),
                paid: amount,
                balance: amount,
            })
            .collect();
        former.sort_by(|a, b| a.user.cmp(&b.user));
        balances.extend(former);

        TripExpenseSummary {
            total,
            per_member_share: share,
            balances,
        }
    }
}

pub fn validate_dates(start: Option<BsonDateTime>, end: Option<BsonDateTime>) -> AppResult<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(AppError::bad_request("End date cannot be before start date"));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupTripRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "form::optional_datetime")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "form::optional_datetime")]
    pub end_date: Option<DateTime<Utc>>,
    /// Usernames or emails of the people to invite.
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupTripRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "form::optional_datetime")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "form::optional_datetime")]
    pub end_date: Option<DateTime<Utc>>,
}

impl UpdateGroupTripRequest {
    pub fn apply_to(&self, trip: &mut GroupTrip) -> AppResult<()> {
        if let Some(name) = &self.name {
            trip.name = require_text("name", name)?;
        }
        if let Some(description) = &self.description {
            trip.description = trim_optional(Some(description));
        }
        if let Some(start) = self.start_date {
            trip.start_date = Some(to_bson(start));
        }
        if let Some(end) = self.end_date {
            trip.end_date = Some(to_bson(end));
        }
        validate_dates(trip.start_date, trip.end_date)
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddTripMembersRequest {
    pub new_members: Vec<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ItineraryItemRequest {
    pub name: String,
    #[serde(deserialize_with = "form::datetime")]
    pub date: DateTime<Utc>,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct TripExpenseRequest {
    pub description: String,
    #[serde(deserialize_with = "form::number")]
    pub amount: f64,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "form::optional_datetime")]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TripDocumentRequest {
    pub name: String,
    pub url: String,
    pub file_type: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq, utoipa::ToSchema)]
pub struct MemberBalance {
    pub user: String,
    pub paid: f64,
    pub balance: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TripExpenseSummary {
    pub total: f64,
    pub per_member_share: f64,
    pub balances: Vec<MemberBalance>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ItineraryItemResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub date: DateTime<Utc>,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TripExpenseResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub category: Option<String>,
    pub added_by: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TripDocumentResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub url: String,
    pub file_type: Option<String>,
    pub uploaded_by: String,
    pub upload_date: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GroupTripResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub creator: Populated<UserSummary>,
    pub members: Vec<Populated<UserSummary>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub itinerary: Vec<ItineraryItemResponse>,
    pub expenses: Vec<TripExpenseResponse>,
    pub shared_expenses: Vec<Populated<ExpenseResponse>>,
    pub shared_travel_logs: Vec<Populated<TravelLogResponse>>,
    pub documents: Vec<TripDocumentResponse>,
    pub created_at: DateTime<Utc>,
}

impl GroupTripResponse {
    /// Replaces creator/member ids with user summaries where known.
    pub fn with_users(mut self, users: &HashMap<String, UserSummary>) -> Self {
        let populate = |entry: Populated<UserSummary>| match entry {
            Populated::Id(id) => users
                .get(&id)
                .cloned()
                .map(Populated::Record)
                .unwrap_or(Populated::Id(id)),
            record => record,
        };
        self.creator = populate(self.creator);
        self.members = self.members.into_iter().map(populate).collect();
        self
    }

    pub fn with_shared(
        mut self,
        expenses: Vec<ExpenseResponse>,
        travel_logs: Vec<TravelLogResponse>,
    ) -> Self {
        let mut expenses: HashMap<String, ExpenseResponse> =
            expenses.into_iter().map(|e| (e.id.clone(), e)).collect();
        let mut travel_logs: HashMap<String, TravelLogResponse> =
            travel_logs.into_iter().map(|l| (l.id.clone(), l)).collect();

        self.shared_expenses = self
            .shared_expenses
            .into_iter()
            .map(|entry| match entry {
                Populated::Id(id) => expenses
                    .remove(&id)
                    .map(Populated::Record)
                    .unwrap_or(Populated::Id(id)),
                record => record,
            })
            .collect();
        self.shared_travel_logs = self
            .shared_travel_logs
            .into_iter()
            .map(|entry| match entry {
                Populated::Id(id) => travel_logs
                    .remove(&id)
                    .map(Populated::Record)
                    .unwrap_or(Populated::Id(id)),
                record => record,
            })
            .collect();
        self
    }
}

impl From<GroupTrip> for GroupTripResponse {
    fn from(trip: GroupTrip) -> Self {
        GroupTripResponse {
            id: trip.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: trip.name,
            description: trip.description,
            creator: Populated::Id(trip.creator.to_hex()),
            members: hex_ids(&trip.members).into_iter().map(Populated::Id).collect(),
            start_date: trip.start_date.map(to_chrono),
            end_date: trip.end_date.map(to_chrono),
            itinerary: trip
                .itinerary
                .into_iter()
                .map(|item| ItineraryItemResponse {
                    id: item.id.to_hex(),
                    name: item.name,
                    date: to_chrono(item.date),
                    location: item.location,
                    description: item.description,
                })
                .collect(),
            expenses: trip
                .expenses
                .into_iter()
                .map(|expense| TripExpenseResponse {
                    id: expense.id.to_hex(),
                    description: expense.description,
                    amount: expense.amount,
                    category: expense.category,
                    added_by: expense.added_by.to_hex(),
                    date: to_chrono(expense.date),
                })
                .collect(),
            shared_expenses: hex_ids(&trip.shared_expenses)
                .into_iter()
                .map(Populated::Id)
                .collect(),
            shared_travel_logs: hex_ids(&trip.shared_travel_logs)
                .into_iter()
                .map(Populated::Id)
                .collect(),
            documents: trip
                .documents
                .into_iter()
                .map(|doc| TripDocumentResponse {
                    id: doc.id.to_hex(),
                    name: doc.name,
                    url: doc.url,
                    file_type: doc.file_type,
                    uploaded_by: doc.uploaded_by.to_hex(),
                    upload_date: to_chrono(doc.upload_date),
                })
                .collect(),
            created_at: to_chrono(trip.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip_with(creator: ObjectId, invited: Vec<ObjectId>) -> GroupTrip {
        GroupTrip::new("Alps".into(), None, creator, None, None, invited)
    }

    fn expense_request(amount: f64) -> TripExpenseRequest {
        TripExpenseRequest {
            description: "Groceries".into(),
            amount,
            category: None,
            date: None,
        }
    }

    #[test]
    fn creator_is_always_a_member_and_duplicates_collapse() {
        let creator = ObjectId::new();
        let friend = ObjectId::new();
        let trip = trip_with(creator, vec![friend, creator, friend]);
        assert_eq!(trip.members, vec![creator, friend]);
    }

    #[test]
    fn adding_existing_members_is_a_no_op() {
        let creator = ObjectId::new();
        let friend = ObjectId::new();
        let mut trip = trip_with(creator, vec![friend]);
        let newcomer = ObjectId::new();

        assert_eq!(trip.add_members(vec![friend, newcomer]), vec![newcomer]);
        assert_eq!(trip.members.len(), 3);
    }

    #[test]
    fn only_creator_or_self_may_remove_a_member() {
        let creator = ObjectId::new();
        let a = ObjectId::new();
        let b = ObjectId::new();
        let mut trip = trip_with(creator, vec![a, b]);

        assert!(matches!(trip.remove_member(&a, &b), Err(AppError::Unauthorized(_))));
        trip.remove_member(&a, &a).unwrap();
        trip.remove_member(&creator, &b).unwrap();
        assert_eq!(trip.members, vec![creator]);
    }

    #[test]
    fn creator_cannot_be_removed() {
        let creator = ObjectId::new();
        let mut trip = trip_with(creator, vec![]);
        assert!(matches!(
            trip.remove_member(&creator, &creator),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn removing_a_non_member_is_not_found() {
        let creator = ObjectId::new();
        let mut trip = trip_with(creator, vec![]);
        assert!(matches!(
            trip.remove_member(&creator, &ObjectId::new()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn non_members_cannot_extend_the_trip() {
        let mut trip = trip_with(ObjectId::new(), vec![]);
        let outsider = ObjectId::new();

        assert!(matches!(
            trip.add_expense(&outsider, expense_request(5.0)),
            Err(AppError::Unauthorized(_))
        ));
        assert!(trip.expenses.is_empty());
    }

    #[test]
    fn itinerary_stays_in_date_order() {
        let creator = ObjectId::new();
        let mut trip = trip_with(creator, vec![]);
        let later = Utc::now() + chrono::Duration::days(2);
        let sooner = Utc::now() + chrono::Duration::days(1);

        for (name, date) in [("Glacier", later), ("Lake", sooner)] {
            trip.add_itinerary_item(
                &creator,
                ItineraryItemRequest {
                    name: name.into(),
                    date,
                    location: None,
                    description: None,
                },
            )
            .unwrap();
        }

        assert_eq!(trip.itinerary[0].name, "Lake");
        assert_eq!(trip.itinerary[1].name, "Glacier");
    }

    #[test]
    fn documents_need_a_usable_url_and_proper_remover() {
        let creator = ObjectId::new();
        let uploader = ObjectId::new();
        let other = ObjectId::new();
        let mut trip = trip_with(creator, vec![uploader, other]);

        let bad = trip.add_document(
            &uploader,
            TripDocumentRequest {
                name: "Tickets".into(),
                url: "javascript:alert(1)".into(),
                file_type: None,
            },
        );
        assert!(bad.is_err());

        trip.add_document(
            &uploader,
            TripDocumentRequest {
                name: "Tickets".into(),
                url: "https://files.example/tickets.pdf".into(),
                file_type: Some("pdf".into()),
            },
        )
        .unwrap();
        let doc_id = trip.documents[0].id;

        assert!(matches!(
            trip.remove_document(&other, &doc_id),
            Err(AppError::Unauthorized(_))
        ));
        trip.remove_document(&creator, &doc_id).unwrap();
        assert!(trip.documents.is_empty());
        assert!(matches!(
            trip.remove_document(&creator, &doc_id),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn expenses_split_equally_among_members() {
        let creator = ObjectId::new();
        let a = ObjectId::new();
        let b = ObjectId::new();
        let mut trip = trip_with(creator, vec![a, b]);

        trip.add_expense(&creator, expense_request(60.0)).unwrap();
        trip.add_expense(&a, expense_request(30.0)).unwrap();

        let summary = trip.expense_summary();
        assert_eq!(summary.total, 90.0);
        assert_eq!(summary.per_member_share, 30.0);
        assert_eq!(summary.balances[0].balance, 30.0);
        assert_eq!(summary.balances[1].balance, 0.0);
        assert_eq!(summary.balances[2].balance, -30.0);
    }

    #[test]
    fn former_members_keep_what_they_paid() {
        let creator = ObjectId::new();
        let leaver = ObjectId::new();
        let mut trip = trip_with(creator, vec![leaver]);
        trip.add_expense(&leaver, expense_request(20.0)).unwrap();
        trip.remove_member(&leaver, &leaver).unwrap();

        let summary = trip.expense_summary();
        assert_eq!(summary.per_member_share, 20.0);
        assert_eq!(summary.balances.len(), 2);
        assert_eq!(summary.balances[0].balance, -20.0);
        assert_eq!(summary.balances[1].user, leaver.to_hex());
        assert_eq!(summary.balances[1].balance, 20.0);
    }

    #[test]
    fn end_before_start_is_rejected() {
        let mut trip = trip_with(ObjectId::new(), vec![]);
        let update = UpdateGroupTripRequest {
            start_date: Some(Utc::now()),
            end_date: Some(Utc::now() - chrono::Duration::days(3)),
            ..Default::default()
        };
        assert!(update.apply_to(&mut trip).is_err());
    }

    #[test]
    fn response_populates_known_users() {
        let creator = ObjectId::new();
        let friend = ObjectId::new();
        let trip = trip_with(creator, vec![friend]);

        let users = HashMap::from([(
            creator.to_hex(),
            UserSummary {
                id: creator.to_hex(),
                username: "ana".into(),
                email: Some("ana@example.com".into()),
            },
        )]);
        let response = GroupTripResponse::from(trip).with_users(&users);

        assert_eq!(response.creator.record().map(|u| u.username.as_str()), Some("ana"));
        assert_eq!(response.members[1], Populated::Id(friend.to_hex()));
    }

    #[test]
    fn accepts_form_shaped_trip_bodies() {
        use chrono::TimeZone;

        let place: ItineraryItemRequest = serde_json::from_str(
            r#"{ "name": "Louvre", "date": "2024-06-10", "location": "", "description": "" }"#,
        )
        .unwrap();
        assert_eq!(place.date, Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap());

        let expense: TripExpenseRequest = serde_json::from_str(
            r#"{ "description": "Metro passes", "amount": "42.80", "category": "" }"#,
        )
        .unwrap();
        assert_eq!(expense.amount, 42.8);

        let trip: CreateGroupTripRequest = serde_json::from_str(
            r#"{ "name": "Paris", "startDate": "2024-06-09", "endDate": "", "members": [] }"#,
        )
        .unwrap();
        assert!(trip.start_date.is_some());
        assert!(trip.end_date.is_none());
    }
}
