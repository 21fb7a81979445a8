use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::{
    lifecycle,
    model::{Consultation, NewConsultation},
};
use crate::core::ApiResult;

/// Validates `input` and builds the pending record it describes.
///
/// Duplicate case content is allowed; only field shape is checked.
pub fn build(input: NewConsultation) -> ApiResult<Consultation> {
    input.validate()?;

    let NewConsultation {
        client_id,
        client_name,
        client_email,
        client_phone,
        case_details,
        documents,
    } = input;

    Ok(Consultation {
        id: new_id(),
        client_id,
        client_name,
        client_email,
        client_phone: client_phone.filter(|p| !p.trim().is_empty()),
        case_details,
        documents,
        status: lifecycle::INITIAL_STATUS,
        created_at: Utc::now(),
        scheduled_date: None,
    })
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{consultation::model::ConsultationStatus, core::ApiError};

    fn input() -> NewConsultation {
        NewConsultation {
            client_id: "c1".into(),
            client_name: "Jane".into(),
            client_email: "jane@x.com".into(),
            client_phone: Some("555-0123".into()),
            case_details: "tooth pain".into(),
            documents: vec![],
        }
    }

    #[test]
    fn test_build_pending_record() {
        let before = Utc::now();
        let record = build(input()).unwrap();
        let after = Utc::now();

        assert_eq!(record.status, ConsultationStatus::Pending);
        assert!(!record.id.is_empty());
        assert!(record.created_at >= before && record.created_at <= after);
        assert_eq!(record.client_phone.as_deref(), Some("555-0123"));
        assert!(record.scheduled_date.is_none());
    }

    #[test]
    fn test_ids_do_not_collide() {
        let ids: HashSet<String> = (0..1000).map(|_| build(input()).unwrap().id).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_missing_fields_rejected() {
        let mut bad = input();
        bad.client_id = String::new();
        assert!(matches!(build(bad), Err(ApiError::Validation(_))));

        let mut bad = input();
        bad.client_email = "jane.x.com".into();
        assert!(matches!(build(bad), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_blank_phone_dropped() {
        let mut with_blank = input();
        with_blank.client_phone = Some("  ".into());
        assert!(build(with_blank).unwrap().client_phone.is_none());
    }
}
