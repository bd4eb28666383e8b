use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use crate::utils::{
    error::{AppError, AppResult},
    form,
    time::{to_bson, to_chrono},
    validation::{require_text, trim_optional},
};

pub const COLLECTION: &str = "calendarevents";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub start: BsonDateTime,
    pub end: BsonDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub user_id: ObjectId,
    pub date: BsonDateTime,
}

impl CalendarEvent {
    pub fn ensure_owner(&self, user: &ObjectId) -> AppResult<()> {
        if &self.user_id == user {
            Ok(())
        } else {
            Err(AppError::not_authorized())
        }
    }
}

fn validate_range(start: BsonDateTime, end: BsonDateTime) -> AppResult<()> {
    if end < start {
        return Err(AppError::bad_request("End date cannot be before start date"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(deserialize_with = "form::datetime")]
    pub start: DateTime<Utc>,
    #[serde(deserialize_with = "form::datetime")]
    pub end: DateTime<Utc>,
    pub description: Option<String>,
    pub location: Option<String>,
}

impl CreateEventRequest {
    pub fn into_event(self, owner: ObjectId) -> AppResult<CalendarEvent> {
        let start = to_bson(self.start);
        let end = to_bson(self.end);
        validate_range(start, end)?;

        Ok(CalendarEvent {
            id: None,
            title: require_text("title", &self.title)?,
            start,
            end,
            description: trim_optional(self.description.as_deref()),
            location: trim_optional(self.location.as_deref()),
            user_id: owner,
            date: BsonDateTime::now(),
        })
    }
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "form::optional_datetime")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "form::optional_datetime")]
    pub end: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub location: Option<String>,
}

impl UpdateEventRequest {
    /// The range is checked against the merged result, so moving only one
    /// end of an event is still validated.
    pub fn apply_to(&self, event: &mut CalendarEvent) -> AppResult<()> {
        if let Some(title) = &self.title {
            event.title = require_text("title", title)?;
        }
        if let Some(start) = self.start {
            event.start = to_bson(start);
        }
        if let Some(end) = self.end {
            event.end = to_bson(end);
        }
        if let Some(description) = &self.description {
            event.description = trim_optional(Some(description));
        }
        if let Some(location) = &self.location {
            event.location = trim_optional(Some(location));
        }
        validate_range(event.start, event.end)
    }
}

#[derive(Debug, Serialize, Clone, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEventResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub user_id: String,
    pub date: DateTime<Utc>,
}

impl From<CalendarEvent> for CalendarEventResponse {
    fn from(event: CalendarEvent) -> Self {
        CalendarEventResponse {
            id: event.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: event.title,
            start: to_chrono(event.start),
            end: to_chrono(event.end),
            description: event.description,
            location: event.location,
            user_id: event.user_id.to_hex(),
            date: to_chrono(event.date),
        }
    }
}
