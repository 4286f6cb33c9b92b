pub mod check_in_handlers;
pub mod ops_handlers;
pub mod registration_handlers;

pub use check_in_handlers::*;
pub use ops_handlers::*;
pub use registration_handlers::*;

use checkin_domain::Decision;

use crate::error::HttpError;

/// Engine rejections become HTTP errors at the edge.
pub(crate) fn settle<T>(decision: Decision<T>) -> Result<T, HttpError> {
    decision.map_err(HttpError::from)
}
