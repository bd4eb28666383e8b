// Utility functions
pub mod error;
pub mod form;
pub mod ids;
pub mod time;
pub mod validation;

pub use error::*;
