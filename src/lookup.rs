//! Resolves identifiers into records
//!
//! Format checks run before the store is consulted, so a badly shaped id is
//! reported as [`RequestError::MalformedIdentifier`] and never as
//! [`RequestError::NotFound`].
use crate::error::RequestError;
use crate::projection::{ProjectionMode, RequestView, project};
use crate::request::RequestRecord;
use crate::store::DocumentStore;
use crate::types::{Idir, RequestId};

pub struct LookupResolver<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> LookupResolver<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    pub fn by_id(&self, raw: &str) -> Result<RequestRecord, RequestError> {
        let id = RequestId::parse(raw)?;
        self.store
            .find_one(&id)?
            .ok_or_else(|| RequestError::NotFound(format!("id `{id}`")))
    }

    /// All requests filed under `raw`, newest first. An empty result is an error.
    pub fn by_idir(&self, raw: &str) -> Result<Vec<RequestRecord>, RequestError> {
        let idir = Idir::parse(raw)?;
        let mut records = self.store.find_by_idir(&idir)?;
        if records.is_empty() {
            return Err(RequestError::NotFound(format!("idir `{idir}`")));
        }
        newest_first(&mut records);
        Ok(records)
    }

    /// Every stored request, newest first, projected with `mode`.
    pub fn all(&self, mode: ProjectionMode) -> Result<Vec<RequestView>, RequestError> {
        let mut records = self.store.find_all()?;
        newest_first(&mut records);
        Ok(records.iter().map(|record| project(record, mode)).collect())
    }
}

/// Order by submission date, descending. Ids are time ordered, so they break ties.
pub fn newest_first(records: &mut [RequestRecord]) {
    records.sort_by(|a, b| {
        b.submission_date
            .cmp(&a.submission_date)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::tests::sample_record;
    use crate::store::SledStore;
    use crate::types::TimeStamp;
    use std::sync::Arc;

    fn seeded_store(records: &[RequestRecord]) -> SledStore {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let store = SledStore::new(Arc::new(db)).unwrap();
        for record in records {
            store.insert(record).unwrap();
        }
        store
    }

    fn submitted_on(day: u32) -> RequestRecord {
        let mut record = sample_record();
        record.submission_date = TimeStamp::new_with(2023, 5, day, 12, 0, 0).unwrap();
        record
    }

    #[test]
    fn short_id_is_malformed_not_missing() {
        let store = seeded_store(&[]);
        let err = LookupResolver::new(&store).by_id("111").unwrap_err();

        assert!(matches!(err, RequestError::MalformedIdentifier(_)));
    }

    #[test]
    fn well_formed_unknown_id_is_not_found() {
        let store = seeded_store(&[sample_record()]);
        let unknown = RequestId::generate();
        let err = LookupResolver::new(&store).by_id(unknown.as_str()).unwrap_err();

        assert!(matches!(err, RequestError::NotFound(_)));
    }

    #[test]
    fn by_id_accepts_upper_case_hex() {
        let record = sample_record();
        let store = seeded_store(std::slice::from_ref(&record));
        let shouted = record.id.as_str().to_ascii_uppercase();

        assert_eq!(LookupResolver::new(&store).by_id(&shouted).unwrap(), record);
    }

    #[test]
    fn idir_results_are_newest_first() {
        let older = submitted_on(1);
        let newer = submitted_on(20);
        let store = seeded_store(&[older.clone(), newer.clone()]);

        let found = LookupResolver::new(&store)
            .by_idir(older.idir.as_str())
            .unwrap();

        assert_eq!(found, vec![newer, older]);
    }

    #[test]
    fn unknown_idir_is_not_found() {
        let store = seeded_store(&[sample_record()]);
        let err = LookupResolver::new(&store).by_idir("1111111111").unwrap_err();

        assert!(matches!(err, RequestError::NotFound(_)));
    }

    #[test]
    fn blank_idir_is_rejected_before_lookup() {
        let store = seeded_store(&[]);
        let err = LookupResolver::new(&store).by_idir("  ").unwrap_err();

        assert!(matches!(err, RequestError::Validation { field: "idir", .. }));
    }

    #[test]
    fn list_all_is_newest_first_and_projected() {
        let older = submitted_on(2);
        let newer = submitted_on(9);
        let store = seeded_store(&[older.clone(), newer.clone()]);

        let views = LookupResolver::new(&store)
            .all(ProjectionMode::Minimal)
            .unwrap();

        let ids: Vec<_> = views.iter().map(RequestView::id).collect();
        assert_eq!(ids, vec![&newer.id, &older.id]);
        assert!(matches!(views[0], RequestView::Minimal(_)));
    }
}
