use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::bookings::repo::BookingRecord;
use crate::error::AppError;
use crate::validation::{optional_reference, reference, require_text, Validate};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Active,
    Completed,
    Cancelled,
    Ended,
}

impl BookingStatus {
    /// Cancelled and ended bookings are no longer active.
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Ended)
    }
}

fn require_period(start: OffsetDateTime, end: OffsetDateTime) -> Result<(), AppError> {
    if end < start {
        Err(AppError::Validation("endDate must not precede startDate".into()))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateBookingRequest {
    #[serde(deserialize_with = "reference")]
    pub user_id: String,
    #[serde(deserialize_with = "reference")]
    pub car_id: String,
    #[serde(default, deserialize_with = "optional_reference", skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,
    #[serde(default)]
    pub status: BookingStatus,
}

impl Validate for CreateBookingRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_text("userId", &self.user_id)?;
        require_text("carId", &self.car_id)?;
        if let Some(group_id) = &self.group_id {
            require_text("groupId", group_id)?;
        }
        require_period(self.start_date, self.end_date)
    }
}

/// Partial update. `active` is not writable here; it follows `status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateBookingRequest {
    #[serde(default, deserialize_with = "optional_reference", skip_serializing_if = "Option::is_none")]
    pub car_id: Option<String>,
    #[serde(default, deserialize_with = "optional_reference", skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BookingStatus>,
}

impl Validate for UpdateBookingRequest {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(car_id) = &self.car_id {
            require_text("carId", car_id)?;
        }
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => require_period(start, end),
            _ => Ok(()),
        }
    }
}

/// Payload of both `cancel_booking` and `end_booking`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CloseBookingRequest {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Validate for CloseBookingRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_text("id", &self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: Uuid,
    pub user_id: String,
    pub car_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,
    pub status: BookingStatus,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<OffsetDateTime>,
}

impl From<BookingRecord> for BookingResponse {
    fn from(b: BookingRecord) -> Self {
        Self {
            id: b.id,
            user_id: b.user_id,
            car_id: b.car_id,
            group_id: b.group_id,
            start_date: b.start_date,
            end_date: b.end_date,
            status: b.status,
            active: b.active,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_defaults_to_pending() {
        let req: CreateBookingRequest = serde_json::from_value(json!({
            "userId": 1,
            "carId": "1",
            "startDate": "2025-03-01T10:00:00Z",
            "endDate": "2025-03-05T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(req.status, BookingStatus::Pending);
        assert_eq!(req.user_id, "1");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn end_before_start_is_rejected() {
        let req: CreateBookingRequest = serde_json::from_value(json!({
            "userId": "u",
            "carId": "c",
            "startDate": "2025-03-05T10:00:00Z",
            "endDate": "2025-03-01T10:00:00Z",
            "status": "CONFIRMED"
        }))
        .unwrap();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn unknown_status_does_not_decode() {
        let err = serde_json::from_value::<UpdateBookingRequest>(json!({"status": "LOST"}));
        assert!(err.is_err());
        let err = serde_json::from_value::<UpdateBookingRequest>(json!({"active": true}));
        assert!(err.is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(BookingStatus::Ended.is_terminal());
        assert!(!BookingStatus::Completed.is_terminal());
        assert!(!BookingStatus::Pending.is_terminal());
    }
}
