use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use crate::models::user::UserSummary;
use crate::utils::{
    error::{AppError, AppResult},
    form,
    ids::hex_ids,
    time::to_chrono,
    validation::{require_text, trim_optional},
};

pub const COLLECTION: &str = "travellogs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TravelStatus {
    Public,
    #[default]
    Private,
    Visited,
    Wishlist,
    Dream,
    Ongoing,
}

/// One user's like or bookmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub user: ObjectId,
}

/// Travel log document in the "travellogs" collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelLog {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TravelStatus,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    pub user_id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_trip: Option<ObjectId>,
    #[serde(default)]
    pub members: Vec<ObjectId>,
    #[serde(default)]
    pub likes: Vec<Reaction>,
    #[serde(default)]
    pub bookmarks: Vec<Reaction>,
    pub date: BsonDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionAction {
    Like,
    Unlike,
    Bookmark,
    Unbookmark,
}

impl ReactionAction {
    pub fn label(&self) -> &'static str {
        match self {
            ReactionAction::Like => "like",
            ReactionAction::Unlike => "unlike",
            ReactionAction::Bookmark => "bookmark",
            ReactionAction::Unbookmark => "unbookmark",
        }
    }

    /// Array field the reaction lives in.
    pub fn field(&self) -> &'static str {
        match self {
            ReactionAction::Like | ReactionAction::Unlike => "likes",
            ReactionAction::Bookmark | ReactionAction::Unbookmark => "bookmarks",
        }
    }

    pub fn adds(&self) -> bool {
        matches!(self, ReactionAction::Like | ReactionAction::Bookmark)
    }

    /// Error when the caller already has (or lacks) the reaction.
    pub fn conflict_msg(&self) -> &'static str {
        match self {
            ReactionAction::Like => "Travel log already liked",
            ReactionAction::Unlike => "Travel log has not yet been liked",
            ReactionAction::Bookmark => "Travel log already bookmarked",
            ReactionAction::Unbookmark => "Travel log has not yet been bookmarked",
        }
    }
}

impl TravelLog {
    pub fn is_owned_by(&self, user: &ObjectId) -> bool {
        &self.user_id == user
    }

    pub fn is_listed_publicly(&self) -> bool {
        self.is_public || self.status == TravelStatus::Public
    }

    pub fn can_view(&self, user: &ObjectId) -> bool {
        self.is_listed_publicly() || self.is_owned_by(user) || self.members.contains(user)
    }

    pub fn ensure_owner(&self, user: &ObjectId) -> AppResult<()> {
        if self.is_owned_by(user) {
            Ok(())
        } else {
            Err(AppError::not_authorized())
        }
    }

    pub fn ensure_viewer(&self, user: &ObjectId) -> AppResult<()> {
        if self.can_view(user) {
            Ok(())
        } else {
            Err(AppError::not_authorized())
        }
    }

    pub fn reactions(&self, action: ReactionAction) -> &[Reaction] {
        match action {
            ReactionAction::Like | ReactionAction::Unlike => &self.likes,
            ReactionAction::Bookmark | ReactionAction::Unbookmark => &self.bookmarks,
        }
    }

    /// Applies a like/bookmark change for `user` and returns the resulting list.
    pub fn react(&mut self, user: ObjectId, action: ReactionAction) -> AppResult<&[Reaction]> {
        let list = match action {
            ReactionAction::Like | ReactionAction::Unlike => &mut self.likes,
            ReactionAction::Bookmark | ReactionAction::Unbookmark => &mut self.bookmarks,
        };
        let present = list.iter().any(|r| r.user == user);
        if present == action.adds() {
            return Err(AppError::bad_request(action.conflict_msg()));
        }
        if action.adds() {
            // Newest reactions first.
            list.insert(0, Reaction { user });
        } else {
            list.retain(|r| r.user != user);
        }
        Ok(list)
    }

    pub fn add_member(&mut self, member: ObjectId) -> AppResult<()> {
        if self.is_owned_by(&member) {
            return Err(AppError::bad_request("You already own this travel log"));
        }
        if self.members.contains(&member) {
            return Err(AppError::bad_request("User is already a member of this travel log"));
        }
        self.members.push(member);
        Ok(())
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTravelLogRequest {
    pub title: String,
    pub destination: String,
    pub description: Option<String>,
    pub status: Option<TravelStatus>,
    pub is_public: Option<bool>,
    #[serde(default, deserialize_with = "form::optional_number")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "form::optional_number")]
    pub longitude: Option<f64>,
    pub group_trip: Option<String>,
}

impl CreateTravelLogRequest {
    /// Builds the document for `owner`; the group trip link is resolved by the caller.
    pub fn into_log(self, owner: ObjectId, group_trip: Option<ObjectId>) -> AppResult<TravelLog> {
        validate_coordinates(self.latitude, self.longitude)?;

        Ok(TravelLog {
            id: None,
            title: require_text("title", &self.title)?,
            destination: require_text("destination", &self.destination)?,
            description: trim_optional(self.description.as_deref()),
            status: self.status.unwrap_or_default(),
            is_public: self.is_public.unwrap_or(false),
            latitude: self.latitude,
            longitude: self.longitude,
            user_id: owner,
            group_trip,
            members: Vec::new(),
            likes: Vec::new(),
            bookmarks: Vec::new(),
            date: BsonDateTime::now(),
        })
    }
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTravelLogRequest {
    pub title: Option<String>,
    pub destination: Option<String>,
    pub description: Option<String>,
    pub status: Option<TravelStatus>,
    pub is_public: Option<bool>,
    #[serde(default, deserialize_with = "form::optional_number")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "form::optional_number")]
    pub longitude: Option<f64>,
}

impl UpdateTravelLogRequest {
    /// Absent fields are left untouched.
    pub fn apply_to(&self, log: &mut TravelLog) -> AppResult<()> {
        if let Some(title) = &self.title {
            log.title = require_text("title", title)?;
        }
        if let Some(destination) = &self.destination {
            log.destination = require_text("destination", destination)?;
        }
        if let Some(description) = &self.description {
            log.description = trim_optional(Some(description));
        }
        if let Some(status) = self.status {
            log.status = status;
        }
        if let Some(is_public) = self.is_public {
            log.is_public = is_public;
        }
        if self.latitude.is_some() {
            log.latitude = self.latitude;
        }
        if self.longitude.is_some() {
            log.longitude = self.longitude;
        }
        validate_coordinates(log.latitude, log.longitude)
    }
}

fn validate_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> AppResult<()> {
    if let Some(lat) = latitude {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(AppError::bad_request("Latitude must be between -90 and 90"));
        }
    }
    if let Some(lng) = longitude {
        if !(-180.0..=180.0).contains(&lng) {
            return Err(AppError::bad_request("Longitude must be between -180 and 180"));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddLogMemberRequest {
    pub travel_log_id: String,
    pub member_email: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PublicFeedQuery {
    pub status: Option<TravelStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PublicFeedQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 200)
    }

    pub fn offset(&self) -> u64 {
        self.offset.unwrap_or(0).max(0) as u64
    }
}

#[derive(Debug, Serialize, Clone, utoipa::ToSchema)]
pub struct ReactionResponse {
    pub user: String,
}

pub fn reaction_list(reactions: &[Reaction]) -> Vec<ReactionResponse> {
    reactions
        .iter()
        .map(|r| ReactionResponse { user: r.user.to_hex() })
        .collect()
}

#[derive(Debug, Serialize, Clone, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TravelLogResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub destination: String,
    pub description: Option<String>,
    pub status: TravelStatus,
    pub is_public: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub user_id: String,
    pub group_trip: Option<String>,
    pub members: Vec<String>,
    pub likes: Vec<ReactionResponse>,
    pub bookmarks: Vec<ReactionResponse>,
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<UserSummary>,
}

impl TravelLogResponse {
    pub fn with_author(mut self, author: Option<UserSummary>) -> Self {
        self.author = author;
        self
    }
}

impl From<TravelLog> for TravelLogResponse {
    fn from(log: TravelLog) -> Self {
        TravelLogResponse {
            id: log.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: log.title,
            destination: log.destination,
            description: log.description,
            status: log.status,
            is_public: log.is_public,
            latitude: log.latitude,
            longitude: log.longitude,
            user_id: log.user_id.to_hex(),
            group_trip: log.group_trip.map(|id| id.to_hex()),
            members: hex_ids(&log.members),
            likes: reaction_list(&log.likes),
            bookmarks: reaction_list(&log.bookmarks),
            date: to_chrono(log.date),
            author: None,
        }
    }
}
