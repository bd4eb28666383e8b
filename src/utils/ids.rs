use mongodb::bson::oid::ObjectId;

use super::error::{AppError, AppResult};

/// Path ids that are not valid ObjectIds are reported as missing documents.
pub fn parse_path_id(raw: &str, what: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(raw.trim()).map_err(|_| AppError::NotFound(format!("{} not found", what)))
}

/// Optional reference fields from request bodies. Empty strings mean "no link".
pub fn parse_link(raw: Option<&str>, field: &str) -> AppResult<Option<ObjectId>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => ObjectId::parse_str(value)
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("Invalid {} id", field))),
    }
}

pub fn hex_ids(ids: &[ObjectId]) -> Vec<String> {
    ids.iter().copied().map(ObjectId::to_hex).collect()
}
