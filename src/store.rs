//! Document store contract and its sled-backed implementation
use crate::config::StoreConfig;
use crate::error::RequestError;
use crate::lifecycle::StateChange;
use crate::request::RequestRecord;
use crate::types::{Idir, RequestId};
use std::sync::Arc;

const REQUESTS_TREE: &str = "requests";

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("record `{0}` not found")]
    NotFound(RequestId),
    #[error("record `{0}` already exists")]
    Duplicate(RequestId),
    #[error("record `{0}` was modified concurrently")]
    Conflict(RequestId),
    #[error("{0}")]
    Unavailable(String),
    #[error("record under key `{key}` could not be decoded: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("record could not be encoded: {0}")]
    Encode(String),
}

/// Everything the service needs from persistence. Each call is atomic on
/// its own; there are no cross-record transactions.
pub trait DocumentStore: Send + Sync {
    fn find_all(&self) -> Result<Vec<RequestRecord>, StoreError>;
    fn find_by_idir(&self, idir: &Idir) -> Result<Vec<RequestRecord>, StoreError>;
    fn find_one(&self, id: &RequestId) -> Result<Option<RequestRecord>, StoreError>;
    fn insert(&self, record: &RequestRecord) -> Result<RequestId, StoreError>;
    /// Commit `change` only if the record is still in `change.expected`.
    fn update_state(
        &self,
        id: &RequestId,
        change: &StateChange,
    ) -> Result<RequestRecord, StoreError>;
    /// Cheap reachability check; returns the number of stored records.
    fn ping(&self) -> Result<usize, StoreError>;
}

pub struct SledStore {
    instance: Arc<sled::Db>,
    requests: sled::Tree,
}

impl SledStore {
    pub fn new(instance: Arc<sled::Db>) -> Result<Self, StoreError> {
        let requests = instance.open_tree(REQUESTS_TREE)?;
        Ok(Self {
            instance,
            requests,
        })
    }

    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let db = sled::Config::new()
            .path(&config.path)
            .temporary(config.temporary)
            .open()?;
        Self::new(Arc::new(db))
    }

    /// Write buffered updates to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.instance.flush()?;
        Ok(())
    }

    fn decode(key: &[u8], bytes: &[u8]) -> Result<RequestRecord, StoreError> {
        minicbor::decode(bytes).map_err(|err| StoreError::Corrupt {
            key: String::from_utf8_lossy(key).into_owned(),
            reason: err.to_string(),
        })
    }

    fn encode(record: &RequestRecord) -> Result<Vec<u8>, StoreError> {
        minicbor::to_vec(record).map_err(|err| StoreError::Encode(err.to_string()))
    }

    fn scan(
        &self,
        keep: impl Fn(&RequestRecord) -> bool,
    ) -> Result<Vec<RequestRecord>, StoreError> {
        let mut records = vec![];
        for entry in self.requests.iter() {
            let (key, value) = entry?;
            let record = Self::decode(&key, &value)?;
            if keep(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }
}

impl DocumentStore for SledStore {
    fn find_all(&self) -> Result<Vec<RequestRecord>, StoreError> {
        self.scan(|_| true)
    }

    fn find_by_idir(&self, idir: &Idir) -> Result<Vec<RequestRecord>, StoreError> {
        self.scan(|record| record.idir == *idir)
    }

    fn find_one(&self, id: &RequestId) -> Result<Option<RequestRecord>, StoreError> {
        let key = id.as_str().as_bytes();
        match self.requests.get(key)? {
            Some(bytes) => Ok(Some(Self::decode(key, &bytes)?)),
            None => Ok(None),
        }
    }

    fn insert(&self, record: &RequestRecord) -> Result<RequestId, StoreError> {
        let key = record.id.as_str().as_bytes();
        let encoded = Self::encode(record)?;

        // never overwrite an existing id
        self.requests
            .compare_and_swap(key, None::<&[u8]>, Some(encoded))?
            .map_err(|_| StoreError::Duplicate(record.id.clone()))?;

        Ok(record.id.clone())
    }

    fn update_state(
        &self,
        id: &RequestId,
        change: &StateChange,
    ) -> Result<RequestRecord, StoreError> {
        let key = id.as_str().as_bytes();
        let current = self
            .requests
            .get(key)?
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let record = Self::decode(key, &current)?;
        if record.state != change.expected {
            return Err(StoreError::Conflict(id.clone()));
        }

        let updated = change.apply_to(record);
        let encoded = Self::encode(&updated)?;

        // swap against the exact bytes read above; any interleaved write loses us the race
        self.requests
            .compare_and_swap(key, Some(&current), Some(encoded))?
            .map_err(|_| StoreError::Conflict(id.clone()))?;

        Ok(updated)
    }

    fn ping(&self) -> Result<usize, StoreError> {
        self.requests.first()?;
        Ok(self.requests.len())
    }
}

impl From<sled::Error> for StoreError {
    fn from(value: sled::Error) -> Self {
        StoreError::Unavailable(value.to_string())
    }
}

impl From<StoreError> for RequestError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => RequestError::NotFound(format!("id `{id}`")),
            StoreError::Conflict(id) => RequestError::Conflict(id.to_string()),
            StoreError::Duplicate(id) => {
                RequestError::Conflict(format!("{id} (identifier already taken)"))
            }
            StoreError::Encode(reason) => RequestError::validation("record", reason),
            other => RequestError::StoreUnavailable(other.to_string()),
        }
    }
}
