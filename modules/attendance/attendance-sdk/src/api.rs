//! Attendance backend API traits.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::ApiError;
use crate::models::{AttendanceRecord, AttendanceStats, NewPerson, Person};

/// People directory exposed by the backend.
///
/// The backend has no server-side filtering, so `search` and `get_by_id`
/// are answered from a fresh `list` call.
#[async_trait]
pub trait PeopleApi: Send + Sync {
    /// Fetch every person known to the backend.
    ///
    /// # Errors
    /// * `INVALID_RESPONSE` - payload is not a JSON array
    /// * `INVALID_PERSON_DATA` - an element lacks its id, surname or name
    /// * `NETWORK_ERROR` / `HTTP_ERROR` / `UNKNOWN_ERROR` - transport and decoding failures
    async fn list(&self) -> Result<Vec<Person>, ApiError>;

    /// Case-insensitive substring search over name, surname, family name,
    /// cellphone and address. A blank query returns the full list.
    async fn search(&self, query: &str) -> Result<Vec<Person>, ApiError>;

    /// First person with the given id, or `None` when absent.
    async fn get_by_id(&self, id: &str) -> Result<Option<Person>, ApiError>;

    /// Create a person.
    ///
    /// The backend reply is not guaranteed to be JSON. An empty body or a
    /// plain-text acknowledgement resolves to the submitted person.
    async fn create(&self, person: &NewPerson) -> Result<Person, ApiError>;
}

/// Attendance records, keyed by calendar date.
#[async_trait]
pub trait AttendanceApi: Send + Sync {
    /// Records for every person on `date`.
    ///
    /// # Errors
    /// * `INVALID_RESPONSE` - payload is not a JSON array
    async fn get_by_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, ApiError>;

    /// Submit a batch of records.
    ///
    /// Returns `true` for an empty or non-JSON reply with a 2xx status,
    /// otherwise the reply's `success` flag.
    async fn post_batch(&self, records: &[AttendanceRecord]) -> Result<bool, ApiError>;

    /// Mark a single person present or absent. The reply must be JSON.
    async fn mark_one(
        &self,
        person_id: &str,
        date: NaiveDate,
        is_present: bool,
    ) -> Result<bool, ApiError>;

    /// Present/absent counts for `date`. Unmarked records count as absent.
    async fn get_stats(&self, date: NaiveDate) -> Result<AttendanceStats, ApiError>;
}
