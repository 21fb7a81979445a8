use super::{
    model::{Consultation, ConsultationStats, ListFilter},
    store::RecordStore,
};

/// Lists the records matching `filter`, newest `created_at` first.
///
/// Records created in the same instant come back newest insertion first.
pub fn list(store: &RecordStore, filter: &ListFilter) -> Vec<Consultation> {
    let mut matched: Vec<Consultation> = store.with_records(|records| {
        records
            .iter()
            .rev()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    });
    // stable sort keeps the reversed insertion order for ties
    matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    matched
}

pub fn stats(store: &RecordStore) -> ConsultationStats {
    store.with_records(|records| {
        records.iter().fold(ConsultationStats::default(), |mut acc, r| {
            acc.record(r.status);
            acc
        })
    })
}
