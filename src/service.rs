//! Service layer API for reimbursement request operations
use super::access::{AccessPolicy, Caller, Operation, RoleClaimPolicy};
use super::config::ServiceConfig;
use super::error::RequestError;
use super::lifecycle::{StateUpdate, TransitionPlan, plan_transition};
use super::lookup::LookupResolver;
use super::projection::{ProjectionMode, RequestView};
use super::request::{NewRequest, RequestRecord};
use super::store::{DocumentStore, SledStore};
use super::types::{RequestId, TimeStamp};
use std::sync::Arc;
use tracing::{info, warn};

pub struct RequestService {
    store: Arc<dyn DocumentStore>,
    policy: Arc<dyn AccessPolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub store_records: usize,
    pub checked_at: TimeStamp,
}

impl RequestService {
    pub fn new(store: Arc<dyn DocumentStore>, policy: Arc<dyn AccessPolicy>) -> Self {
        Self { store, policy }
    }

    /// Open the sled store and the role-claim gate described by `config`.
    pub fn open(config: &ServiceConfig) -> Result<Self, RequestError> {
        let store = SledStore::open(&config.store)?;
        info!(
            event_name = "spr.store.opened",
            path = %config.store.path.display(),
            temporary = config.store.temporary,
            "request store opened"
        );
        Ok(Self::new(
            Arc::new(store),
            Arc::new(RoleClaimPolicy::new(&config.access)),
        ))
    }

    fn gate(&self, caller: &Caller, operation: Operation) -> Result<(), RequestError> {
        self.policy.authorize(caller, operation).inspect_err(|_| {
            warn!(
                event_name = "spr.access.denied",
                subject = caller.subject(),
                operation = operation.as_str(),
                "operation refused"
            );
        })
    }

    fn resolver(&self) -> LookupResolver<'_> {
        LookupResolver::new(self.store.as_ref())
    }

    /// List every request, newest first. `minimal` is the client's query flag;
    /// the policy decides whether a full listing is actually granted.
    pub fn list_requests(
        &self,
        caller: &Caller,
        minimal: Option<bool>,
    ) -> Result<Vec<RequestView>, RequestError> {
        self.gate(caller, Operation::List)?;

        let requested = ProjectionMode::from_minimal_flag(minimal);
        let mode = self.policy.list_mode(caller, requested);
        self.resolver().all(mode)
    }

    pub fn get_request(&self, caller: &Caller, id: &str) -> Result<RequestRecord, RequestError> {
        self.gate(caller, Operation::GetById)?;
        self.resolver().by_id(id)
    }

    pub fn get_requests_by_idir(
        &self,
        caller: &Caller,
        idir: &str,
    ) -> Result<Vec<RequestRecord>, RequestError> {
        self.gate(caller, Operation::GetByIdir)?;
        self.resolver().by_idir(idir)
    }

    /// Validate and store a new request. It always starts SUBMITTED with the
    /// submission date taken from the server clock.
    pub fn create_request(
        &self,
        caller: &Caller,
        draft: NewRequest,
    ) -> Result<RequestRecord, RequestError> {
        self.gate(caller, Operation::Create)?;

        let record = draft.validate_and_finalise(RequestId::generate(), TimeStamp::now())?;
        self.store.insert(&record)?;

        info!(
            event_name = "spr.request.created",
            request_id = %record.id,
            subject = caller.subject(),
            late_entry = record.late_entry,
            "reimbursement request submitted"
        );
        Ok(record)
    }

    /// Move a request to `update.state`. Reviewer only.
    pub fn update_state(
        &self,
        caller: &Caller,
        id: &str,
        update: StateUpdate,
    ) -> Result<RequestRecord, RequestError> {
        self.gate(caller, Operation::UpdateState)?;

        update.validate()?;
        let record = self.resolver().by_id(id)?;
        let id = record.id.clone();

        let change = match plan_transition(&record, &update, TimeStamp::now()) {
            Ok(TransitionPlan::Unchanged) => return Ok(record),
            Ok(TransitionPlan::Apply(change)) => change,
            Err(err) => {
                warn!(
                    event_name = "spr.request.transition_rejected",
                    request_id = %id,
                    from_state = %record.state,
                    to_state = %update.state,
                    "state change rejected"
                );
                return Err(err);
            }
        };

        let updated = self.store.update_state(&id, &change).map_err(|err| {
            warn!(
                event_name = "spr.request.update_failed",
                request_id = %id,
                error = %err,
                "state change not committed"
            );
            RequestError::from(err)
        })?;

        info!(
            event_name = "spr.request.state_changed",
            request_id = %id,
            subject = caller.subject(),
            from_state = %change.expected,
            to_state = %change.state,
            "request state changed"
        );
        Ok(updated)
    }

    pub fn health(&self) -> Result<HealthStatus, RequestError> {
        let store_records = self.store.ping()?;
        Ok(HealthStatus {
            store_records,
            checked_at: TimeStamp::now(),
        })
    }
}
