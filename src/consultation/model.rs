use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::core::{ApiError, ApiResult};

/// Lifecycle state of a consultation. Wire values are lowercase.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsultationStatus {
    Pending,
    Scheduled,
    Completed,
    Cancelled,
}

impl ConsultationStatus {
    pub const ALL: [ConsultationStatus; 4] = [
        ConsultationStatus::Pending,
        ConsultationStatus::Scheduled,
        ConsultationStatus::Completed,
        ConsultationStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::Pending => "pending",
            ConsultationStatus::Scheduled => "scheduled",
            ConsultationStatus::Completed => "completed",
            ConsultationStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConsultationStatus::Completed | ConsultationStatus::Cancelled
        )
    }
}

impl fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An ISO-8601 timestamp that is checked on the way in and echoed verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScheduledDate(String);

impl ScheduledDate {
    pub fn parse(raw: impl Into<String>) -> ApiResult<Self> {
        let raw = raw.into();
        DateTime::parse_from_rfc3339(raw.trim()).map_err(|e| {
            ApiError::validation(format!("scheduledDate is not a valid timestamp: {e}"))
        })?;
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl TryFrom<String> for ScheduledDate {
    type Error = ApiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ScheduledDate> for String {
    fn from(value: ScheduledDate) -> Self {
        value.0
    }
}

impl fmt::Display for ScheduledDate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque document reference attached to a consultation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsultationDocument {
    pub id: String,
    pub name: String,
    pub uri: String,
    pub r#type: String,
    pub size: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    pub id: String,
    pub client_id: String,
    pub client_name: String,
    pub client_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_phone: Option<String>,
    pub case_details: String,
    #[serde(default)]
    pub documents: Vec<ConsultationDocument>,
    pub status: ConsultationStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<ScheduledDate>,
}

/// Input of `consultations.create`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewConsultation {
    #[validate(custom(function = "not_blank"))]
    pub client_id: String,
    #[validate(custom(function = "not_blank"))]
    pub client_name: String,
    #[validate(email)]
    pub client_email: String,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub case_details: String,
    pub documents: Vec<ConsultationDocument>,
}

/// Input of `consultations.list`. Both fields combine with AND semantics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilter {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub status: Option<ConsultationStatus>,
}

impl ListFilter {
    /// Requested client id; a blank one means no client filter.
    pub fn client(&self) -> Option<&str> {
        self.client_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    pub fn matches(&self, record: &Consultation) -> bool {
        self.client()
            .map_or(true, |id| record.client_id == id)
            && self.status.map_or(true, |s| record.status == s)
    }
}

/// Input of `consultations.updateStatus`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub id: String,
    pub status: ConsultationStatus,
    #[serde(default)]
    pub scheduled_date: Option<ScheduledDate>,
}

/// Per-status counters over the whole store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationStats {
    pub total: usize,
    pub pending: usize,
    pub scheduled: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl ConsultationStats {
    pub(crate) fn record(&mut self, status: ConsultationStatus) {
        self.total += 1;
        match status {
            ConsultationStatus::Pending => self.pending += 1,
            ConsultationStatus::Scheduled => self.scheduled += 1,
            ConsultationStatus::Completed => self.completed += 1,
            ConsultationStatus::Cancelled => self.cancelled += 1,
        }
    }
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("required"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_wire_values() {
        for status in ConsultationStatus::ALL {
            let encoded = serde_json::to_value(status).unwrap();
            assert_eq!(encoded, json!(status.as_str()));
        }
        assert!(serde_json::from_value::<ConsultationStatus>(json!("archived")).is_err());
    }

    #[test]
    fn test_scheduled_date_is_verbatim() {
        let date = ScheduledDate::parse("2024-12-25T14:30:00.000Z").unwrap();
        assert_eq!(date.as_str(), "2024-12-25T14:30:00.000Z");
        assert_eq!(
            serde_json::to_value(&date).unwrap(),
            json!("2024-12-25T14:30:00.000Z")
        );
    }

    #[test]
    fn test_scheduled_date_rejects_garbage() {
        assert!(ScheduledDate::parse("next tuesday").is_err());
        assert!(serde_json::from_value::<ScheduledDate>(json!("2024-13-01")).is_err());
    }

    #[test]
    fn test_new_consultation_validation() {
        let input: NewConsultation = serde_json::from_value(json!({
            "clientId": "c1",
            "clientName": "Jane",
            "clientEmail": "not-an-email",
            "caseDetails": "   ",
            "documents": []
        }))
        .unwrap();
        let err = ApiError::from(input.validate().unwrap_err());
        assert_eq!(
            err,
            ApiError::Validation("invalid or missing field(s): caseDetails, clientEmail".into())
        );
    }

    #[test]
    fn test_new_consultation_requires_documents_key() {
        let result = serde_json::from_value::<NewConsultation>(json!({
            "clientId": "c1",
            "clientName": "Jane",
            "clientEmail": "jane@x.com",
            "caseDetails": "tooth pain"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_client_filter_is_ignored() {
        let filter = ListFilter {
            client_id: Some("  ".into()),
            status: None,
        };
        assert_eq!(filter.client(), None);
    }

    #[test]
    fn test_consultation_serializes_camel_case() {
        let record = Consultation {
            id: "a".into(),
            client_id: "c1".into(),
            client_name: "Jane".into(),
            client_email: "jane@x.com".into(),
            client_phone: None,
            case_details: "tooth pain".into(),
            documents: vec![ConsultationDocument {
                id: "d1".into(),
                name: "xray.png".into(),
                uri: "file:///xray.png".into(),
                r#type: "image/png".into(),
                size: 2048,
            }],
            status: ConsultationStatus::Pending,
            created_at: DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            scheduled_date: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["clientId"], "c1");
        assert_eq!(value["createdAt"], "2024-01-01T00:00:00Z");
        assert_eq!(value["documents"][0]["type"], "image/png");
        assert!(value.get("clientPhone").is_none());
        assert!(value.get("scheduledDate").is_none());
    }
}
