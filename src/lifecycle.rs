//! Approval states and the reachability table every state change goes through
use crate::error::RequestError;
use crate::request::{Attachment, RequestRecord};
use crate::types::TimeStamp;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    minicbor::Encode,
    minicbor::Decode,
)]
#[serde(rename_all = "UPPERCASE", try_from = "StateTag")]
pub enum RequestState {
    #[default]
    #[n(0)]
    Submitted,
    #[n(1)]
    InProgress,
    #[n(2)]
    Denied,
    #[n(3)]
    Approved,
}

// Wire form of a state: the upper-case tag, any-case tag or legacy integer code.
#[derive(Deserialize)]
#[serde(untagged)]
enum StateTag {
    Code(u8),
    Tag(String),
}

/// Reviewer input for a state change. Approval documents may ride along
/// with a move into a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    pub state: RequestState,
    #[serde(default)]
    pub attach_approval: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionPlan {
    // target equals the current state, nothing to write
    Unchanged,
    Apply(StateChange),
}

/// A checked state change, ready for the store to commit. `expected` is the
/// state it was planned against; the commit fails if that no longer holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub expected: RequestState,
    pub state: RequestState,
    pub approval_date: TimeStamp,
    pub attach_approval: Vec<Attachment>,
}

impl RequestState {
    pub const ALL: [RequestState; 4] = [
        RequestState::Submitted,
        RequestState::InProgress,
        RequestState::Denied,
        RequestState::Approved,
    ];

    /// States a request may move to next, excluding itself
    pub fn successors(self) -> &'static [RequestState] {
        match self {
            RequestState::Submitted => &[
                RequestState::InProgress,
                RequestState::Denied,
                RequestState::Approved,
            ],
            RequestState::InProgress => &[RequestState::Denied, RequestState::Approved],
            RequestState::Denied | RequestState::Approved => &[],
        }
    }
    pub fn can_transition_to(self, target: RequestState) -> bool {
        self == target || self.successors().contains(&target)
    }
    pub fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }
    /// Integer code used by the legacy form front-end
    pub fn code(self) -> u8 {
        match self {
            RequestState::Submitted => 0,
            RequestState::InProgress => 1,
            RequestState::Denied => 2,
            RequestState::Approved => 3,
        }
    }
    pub fn as_str(self) -> &'static str {
        match self {
            RequestState::Submitted => "SUBMITTED",
            RequestState::InProgress => "INPROGRESS",
            RequestState::Denied => "DENIED",
            RequestState::Approved => "APPROVED",
        }
    }
}

impl TryFrom<u8> for RequestState {
    type Error = RequestError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        RequestState::ALL
            .into_iter()
            .find(|state| state.code() == code)
            .ok_or_else(|| RequestError::validation("state", format!("unknown state code {code}")))
    }
}

impl TryFrom<StateTag> for RequestState {
    type Error = RequestError;

    fn try_from(tag: StateTag) -> Result<Self, Self::Error> {
        match tag {
            StateTag::Code(code) => RequestState::try_from(code),
            StateTag::Tag(tag) => tag.parse(),
        }
    }
}

impl std::str::FromStr for RequestState {
    type Err = RequestError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let tag = raw.trim();
        if let Ok(code) = tag.parse::<u8>() {
            return RequestState::try_from(code);
        }
        RequestState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(tag))
            .ok_or_else(|| RequestError::validation("state", format!("unknown state `{tag}`")))
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateUpdate {
    pub fn to(state: RequestState) -> Self {
        Self {
            state,
            attach_approval: vec![],
        }
    }
    pub fn with_approval(mut self, attachment: Attachment) -> Self {
        self.attach_approval.push(attachment);
        self
    }
    /// Checks that need no stored record; run before the store is touched.
    pub fn validate(&self) -> Result<(), RequestError> {
        if !self.attach_approval.is_empty() && !self.state.is_terminal() {
            return Err(RequestError::validation(
                "attachApproval",
                "approval documents can only accompany a move to DENIED or APPROVED",
            ));
        }
        for attachment in &self.attach_approval {
            attachment.validate("attachApproval")?;
        }
        Ok(())
    }
}

/// Decide what a state change does to `record` without touching it.
pub fn plan_transition(
    record: &RequestRecord,
    update: &StateUpdate,
    now: TimeStamp,
) -> Result<TransitionPlan, RequestError> {
    let from = record.state;
    let to = update.state;

    if !from.can_transition_to(to) {
        return Err(RequestError::InvalidTransition { from, to });
    }
    if from == to {
        if !update.attach_approval.is_empty() {
            return Err(RequestError::validation(
                "attachApproval",
                format!("request is already {to}; nothing to attach to"),
            ));
        }
        return Ok(TransitionPlan::Unchanged);
    }

    // stamped once, on the way out of SUBMITTED
    let approval_date = record.approval_date.unwrap_or(now);

    Ok(TransitionPlan::Apply(StateChange {
        expected: from,
        state: to,
        approval_date,
        attach_approval: update.attach_approval.clone(),
    }))
}

impl StateChange {
    /// Build the record the store swaps in.
    pub fn apply_to(&self, mut record: RequestRecord) -> RequestRecord {
        record.state = self.state;
        if record.approval_date.is_none() {
            record.approval_date = Some(self.approval_date);
        }
        record
            .attach_approval
            .extend(self.attach_approval.iter().cloned());
        record
    }
}

impl TransitionPlan {
    pub fn apply_to(&self, record: RequestRecord) -> RequestRecord {
        match self {
            TransitionPlan::Unchanged => record,
            TransitionPlan::Apply(change) => change.apply_to(record),
        }
    }
}
