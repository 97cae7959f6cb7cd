//! Full and minimal views of a request record
use crate::lifecycle::RequestState;
use crate::request::{Attachment, RequestRecord};
use crate::types::{Cost, RequestId, TimeStamp};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionMode {
    Full,
    #[default]
    Minimal,
}

/// What a list view shows to a broad audience. Nothing in here identifies
/// the employee or ties the claim to payroll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MinimalRequest {
    pub id: RequestId,
    pub items_purchased: Vec<String>,
    pub total_cost: Cost,
    pub purchase_date: TimeStamp,
    pub submission_date: TimeStamp,
    pub approval_date: Option<TimeStamp>,
    pub supplier_name: String,
    pub state: RequestState,
    pub late_entry: bool,
    pub attach_receipts: Vec<AttachmentSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentSummary {
    pub original_name: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RequestView {
    Full(RequestRecord),
    Minimal(MinimalRequest),
}

impl ProjectionMode {
    /// `minimal` query flag as sent by clients; absent means minimal.
    pub fn from_minimal_flag(minimal: Option<bool>) -> Self {
        match minimal {
            Some(false) => ProjectionMode::Full,
            _ => ProjectionMode::Minimal,
        }
    }
}

impl From<&Attachment> for AttachmentSummary {
    fn from(value: &Attachment) -> Self {
        Self {
            original_name: value.original_name.clone(),
            size: value.size,
        }
    }
}

impl From<&RequestRecord> for MinimalRequest {
    fn from(record: &RequestRecord) -> Self {
        Self {
            id: record.id.clone(),
            items_purchased: record.items_purchased.clone(),
            total_cost: record.total_cost,
            purchase_date: record.purchase_date,
            submission_date: record.submission_date,
            approval_date: record.approval_date,
            supplier_name: record.supplier_name.clone(),
            state: record.state,
            late_entry: record.late_entry,
            attach_receipts: record
                .attach_receipts
                .iter()
                .map(AttachmentSummary::from)
                .collect(),
        }
    }
}

pub fn project(record: &RequestRecord, mode: ProjectionMode) -> RequestView {
    match mode {
        ProjectionMode::Full => RequestView::Full(record.clone()),
        ProjectionMode::Minimal => RequestView::Minimal(record.into()),
    }
}

impl RequestView {
    pub fn id(&self) -> &RequestId {
        match self {
            RequestView::Full(record) => &record.id,
            RequestView::Minimal(minimal) => &minimal.id,
        }
    }
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
