//! Consultation records and their lifecycle.
//!
//! [`ConsultationService`] is the single entry point used by the RPC boundary:
//! creation, listing and status updates all go through it, and it owns the
//! [`RecordStore`] that holds every record.

pub mod creation;
pub mod lifecycle;
pub mod model;
pub mod query;
pub mod store;

pub use model::{
    Consultation, ConsultationDocument, ConsultationStats, ConsultationStatus, ListFilter,
    NewConsultation, ScheduledDate, StatusUpdate,
};
pub use store::RecordStore;

use crate::core::ApiResult;

#[derive(Default)]
pub struct ConsultationService {
    store: RecordStore,
}

impl ConsultationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, input: NewConsultation) -> ApiResult<Consultation> {
        let record = creation::build(input)?;
        self.store.append(record.clone())?;
        log::info!(
            "Created consultation {} for client {}",
            record.id,
            record.client_id
        );
        log::debug!("Total consultations: {}", self.store.len());
        Ok(record)
    }

    pub fn list(&self, filter: &ListFilter) -> Vec<Consultation> {
        let records = query::list(&self.store, filter);
        log::debug!("Listing consultations: {} (filter: {filter:?})", records.len());
        records
    }

    pub fn update_status(&self, update: StatusUpdate) -> ApiResult<Consultation> {
        let StatusUpdate {
            id,
            status,
            scheduled_date,
        } = update;
        let record = self
            .store
            .update(&id, |record| lifecycle::apply(record, status, scheduled_date))?;
        log::info!("Updated consultation {} to {}", record.id, record.status);
        Ok(record)
    }

    pub fn stats(&self) -> ConsultationStats {
        query::stats(&self.store)
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc, thread};

    use super::*;
    use crate::core::ApiError;

    fn init_log() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn jane() -> NewConsultation {
        NewConsultation {
            client_id: "c1".into(),
            client_name: "Jane".into(),
            client_email: "jane@x.com".into(),
            client_phone: None,
            case_details: "tooth pain".into(),
            documents: vec![],
        }
    }

    fn update(id: &str, status: ConsultationStatus, date: Option<&str>) -> StatusUpdate {
        StatusUpdate {
            id: id.to_string(),
            status,
            scheduled_date: date.map(|d| ScheduledDate::parse(d).unwrap()),
        }
    }

    #[test]
    fn test_full_lifecycle_scenario() {
        init_log();
        let service = ConsultationService::new();

        let created = service.create(jane()).unwrap();
        assert_eq!(created.status, ConsultationStatus::Pending);
        assert!(!created.id.is_empty());

        let scheduled = service
            .update_status(update(
                &created.id,
                ConsultationStatus::Scheduled,
                Some("2024-12-25T14:30:00Z"),
            ))
            .unwrap();
        assert_eq!(scheduled.status, ConsultationStatus::Scheduled);
        assert_eq!(
            scheduled.scheduled_date.as_ref().unwrap().as_str(),
            "2024-12-25T14:30:00Z"
        );

        let listed = service.list(&ListFilter::default());
        assert_eq!(listed, vec![scheduled.clone()]);

        let completed = service
            .update_status(update(&created.id, ConsultationStatus::Completed, None))
            .unwrap();
        assert_eq!(completed.status, ConsultationStatus::Completed);
        assert_eq!(completed.scheduled_date, scheduled.scheduled_date);
        assert_eq!(completed.created_at, created.created_at);
    }

    #[test]
    fn test_created_record_round_trips_through_list() {
        init_log();
        let service = ConsultationService::new();
        let created = service.create(jane()).unwrap();
        let listed = service.list(&ListFilter {
            client_id: Some("c1".into()),
            status: None,
        });
        assert_eq!(listed, vec![created]);
    }

    #[test]
    fn test_update_unknown_id_leaves_store_unchanged() {
        init_log();
        let service = ConsultationService::new();
        let created = service.create(jane()).unwrap();

        let err = service
            .update_status(update("missing", ConsultationStatus::Cancelled, None))
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(service.store().all(), vec![created]);
    }

    #[test]
    fn test_illegal_transition_leaves_store_unchanged() {
        init_log();
        let service = ConsultationService::new();
        let created = service.create(jane()).unwrap();

        let err = service
            .update_status(update(&created.id, ConsultationStatus::Completed, None))
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidTransition(_)));
        assert_eq!(
            service.store().find_by_id(&created.id).unwrap().status,
            ConsultationStatus::Pending
        );
    }

    #[test]
    fn test_concurrent_creates_are_all_kept() {
        init_log();
        let service = Arc::new(ConsultationService::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                thread::spawn(move || {
                    (0..50)
                        .map(|_| service.create(jane()).unwrap().id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: HashSet<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(ids.len(), 400);
        assert_eq!(service.stats().pending, 400);
    }
}
