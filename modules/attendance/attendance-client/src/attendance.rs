use async_trait::async_trait;
use attendance_sdk::{ApiError, AttendanceApi, AttendanceRecord, AttendanceStats};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::transport::ApiTransport;

/// [`AttendanceApi`] over the `?param=attendance` / `?param=post_attendance`
/// endpoints and the body-dispatched `mark_attendance` command.
#[derive(Clone)]
pub struct AttendanceClient {
    transport: ApiTransport,
}

#[derive(Serialize)]
struct MarkAttendance<'a> {
    param: &'static str,
    person_id: &'a str,
    date: NaiveDate,
    is_present: bool,
}

impl AttendanceClient {
    #[must_use]
    pub fn new(transport: ApiTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl AttendanceApi for AttendanceClient {
    #[instrument(skip(self))]
    async fn get_by_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, ApiError> {
        let date = date.to_string();
        let url = self.transport.endpoint("attendance", &[("date", date.as_str())]);
        let Value::Array(items) = self.transport.get_json(&url).await? else {
            return Err(ApiError::invalid_response(
                "Invalid response format: Expected an array of attendance records",
            ));
        };

        let records = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value::<AttendanceRecord>(item).map_err(|e| {
                    ApiError::invalid_response(format!(
                        "Invalid attendance record at index {index}: {e}"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = records.len(), "fetched attendance records");
        Ok(records)
    }

    #[instrument(skip_all, fields(count = records.len()))]
    async fn post_batch(&self, records: &[AttendanceRecord]) -> Result<bool, ApiError> {
        let url = self.transport.endpoint("post_attendance", &[]);
        let reply = self.transport.post_for_text(&url, records).await?;

        let text = reply.body.trim();
        if text.is_empty() {
            debug!(status = %reply.status, "empty reply to attendance batch, treating as success");
            return Ok(true);
        }

        match serde_json::from_str::<Value>(text) {
            Ok(value) => Ok(value
                .get("success")
                .and_then(Value::as_bool)
                .unwrap_or(true)),
            Err(_) => {
                warn!(status = %reply.status, reply = %text, "non-JSON reply to attendance batch, treating as success");
                Ok(true)
            }
        }
    }

    #[instrument(skip(self))]
    async fn mark_one(
        &self,
        person_id: &str,
        date: NaiveDate,
        is_present: bool,
    ) -> Result<bool, ApiError> {
        let command = MarkAttendance {
            param: "mark_attendance",
            person_id,
            date,
            is_present,
        };
        let reply = self
            .transport
            .post_json(self.transport.base_url(), &command)
            .await?;
        Ok(reply.get("success") == Some(&Value::Bool(true)))
    }

    async fn get_stats(&self, date: NaiveDate) -> Result<AttendanceStats, ApiError> {
        let records = self.get_by_date(date).await?;
        Ok(AttendanceStats::from_records(&records))
    }
}
