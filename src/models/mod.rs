pub mod calendar_event;
pub mod expense;
pub mod group_trip;
pub mod travel_log;
pub mod user;
