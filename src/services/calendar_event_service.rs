use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};

use crate::database::MongoDB;
use crate::models::calendar_event::{
    self, CalendarEvent, CalendarEventResponse, CreateEventRequest, UpdateEventRequest,
};
use crate::utils::{
    error::{AppError, AppResult},
    ids::parse_path_id,
};

fn collection(db: &MongoDB) -> mongodb::Collection<CalendarEvent> {
    db.collection::<CalendarEvent>(calendar_event::COLLECTION)
}

async fn load(db: &MongoDB, raw_id: &str) -> AppResult<CalendarEvent> {
    let id = parse_path_id(raw_id, "Event")?;
    collection(db)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::not_found("Event not found"))
}

pub async fn list(db: &MongoDB, user: &ObjectId) -> AppResult<Vec<CalendarEventResponse>> {
    let events: Vec<CalendarEvent> = collection(db)
        .find(doc! { "userId": user })
        .sort(doc! { "start": 1 })
        .await?
        .try_collect()
        .await?;
    Ok(events.into_iter().map(CalendarEventResponse::from).collect())
}

pub async fn create(
    db: &MongoDB,
    user: &ObjectId,
    request: CreateEventRequest,
) -> AppResult<CalendarEventResponse> {
    let mut event = request.into_event(*user)?;
    let result = collection(db).insert_one(&event).await?;
    event.id = result.inserted_id.as_object_id();
    Ok(CalendarEventResponse::from(event))
}

pub async fn update(
    db: &MongoDB,
    user: &ObjectId,
    raw_id: &str,
    request: &UpdateEventRequest,
) -> AppResult<CalendarEventResponse> {
    let mut event = load(db, raw_id).await?;
    event.ensure_owner(user)?;
    request.apply_to(&mut event)?;

    collection(db)
        .update_one(
            doc! { "_id": event.id },
            doc! {
                "$set": {
                    "title": &event.title,
                    "start": event.start,
                    "end": event.end,
                    "description": event.description.clone(),
                    "location": event.location.clone(),
                }
            },
        )
        .await?;

    Ok(CalendarEventResponse::from(event))
}

pub async fn delete(db: &MongoDB, user: &ObjectId, raw_id: &str) -> AppResult<()> {
    let event = load(db, raw_id).await?;
    event.ensure_owner(user)?;
    collection(db).delete_one(doc! { "_id": event.id }).await?;
    Ok(())
}
