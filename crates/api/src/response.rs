//! Shared response envelope types for API handlers.
//!
//! Deployment resources use a `{ "data": ... }` envelope. The pass-through
//! job routes (`/deploy`, `/jobs`) return flat bodies instead, since their
//! shapes mirror Rundeck's.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// # Example
///
/// ```ignore
/// Ok(Json(DataResponse { data: snapshot }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
