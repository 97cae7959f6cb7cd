//! Reimbursement request record and the draft it is created from
use crate::error::RequestError;
use crate::lifecycle::RequestState;
use crate::types::{Cost, Idir, RequestId, TimeStamp};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Directory account identifiers issued to staff are fixed width.
pub const IDIR_LEN: usize = 32;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static email pattern"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9 ().\-]+$").expect("static phone pattern"));

/// Reference to a file held by the object storage service. The bytes never
/// pass through this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, minicbor::Encode, minicbor::Decode)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[n(0)]
    pub storage: String,
    #[n(1)]
    pub url: String,
    #[n(2)]
    pub size: u64,
    #[n(3)]
    #[serde(default)]
    pub data: AttachmentData,
    #[n(4)]
    pub original_name: String,
}

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, minicbor::Encode, minicbor::Decode,
)]
pub struct AttachmentData {
    #[n(0)]
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, minicbor::Encode, minicbor::Decode)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    #[n(0)]
    pub id: RequestId,
    #[n(1)]
    pub idir: Idir,
    #[n(2)]
    pub employee_id: u64,
    #[n(3)]
    pub first_name: String,
    #[n(4)]
    pub last_name: String,
    #[n(5)]
    pub items_purchased: Vec<String>,
    #[n(6)]
    pub total_cost: Cost,
    #[n(7)]
    pub purchase_date: TimeStamp,
    #[n(8)]
    pub submission_date: TimeStamp, // set on insert, never client supplied
    #[n(9)]
    pub attach_receipts: Vec<Attachment>,
    #[n(10)]
    pub attach_approval: Vec<Attachment>,
    #[n(11)]
    pub approval_date: Option<TimeStamp>,
    #[n(12)]
    pub supplier_name: String,
    #[n(13)]
    pub supplier_phone_number: String,
    #[n(14)]
    pub supplier_email: String,
    #[n(15)]
    pub additional_comments: Option<String>,
    #[n(16)]
    pub state: RequestState,
    #[n(17)]
    #[serde(default)]
    pub late_entry: bool,
}

/// Submitter input. Every field is optional so that a missing one can be
/// reported by name; server-owned fields (`id`, `state`, dates set by the
/// workflow, approval documents) have no slot here and are ignored if sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewRequest {
    pub idir: Option<String>,
    pub employee_id: Option<u64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub items_purchased: Vec<String>,
    pub total_cost: Option<Cost>,
    pub purchase_date: Option<TimeStamp>,
    pub attach_receipts: Vec<Attachment>,
    pub supplier_name: Option<String>,
    pub supplier_phone_number: Option<String>,
    pub supplier_email: Option<String>,
    pub additional_comments: Option<String>,
    pub late_entry: bool,
}

impl Attachment {
    pub fn new(storage: &str, url: &str, size: u64, data_id: &str, original_name: &str) -> Self {
        Self {
            storage: storage.to_owned(),
            url: url.to_owned(),
            size,
            data: AttachmentData {
                id: data_id.to_owned(),
            },
            original_name: original_name.to_owned(),
        }
    }
    pub(crate) fn validate(&self, field: &'static str) -> Result<(), RequestError> {
        if self.storage.trim().is_empty() {
            return Err(RequestError::validation(field, "attachment storage is empty"));
        }
        if self.url.trim().is_empty() {
            return Err(RequestError::validation(field, "attachment url is empty"));
        }
        if self.original_name.trim().is_empty() {
            return Err(RequestError::validation(field, "attachment name is empty"));
        }
        Ok(())
    }
}

impl NewRequest {
    pub fn new() -> Self {
        Self::default()
    }
    /// Parse a form submission body. Accepts the bare field map or the
    /// `{"data": {...}}` envelope the form service posts.
    pub fn from_submission_json(body: &serde_json::Value) -> Result<Self, RequestError> {
        let fields = body.get("data").unwrap_or(body);
        serde_json::from_value(fields.clone())
            .map_err(|err| RequestError::validation("body", err.to_string()))
    }
    pub fn set_idir(mut self, idir: &str) -> Self {
        self.idir = Some(idir.to_owned());
        self
    }
    pub fn set_employee_id(mut self, employee_id: u64) -> Self {
        self.employee_id = Some(employee_id);
        self
    }
    pub fn set_name(mut self, first: &str, last: &str) -> Self {
        self.first_name = Some(first.to_owned());
        self.last_name = Some(last.to_owned());
        self
    }
    pub fn add_item(mut self, item: &str) -> Self {
        self.items_purchased.push(item.to_owned());
        self
    }
    pub fn set_total_cost(mut self, cost: Cost) -> Self {
        self.total_cost = Some(cost);
        self
    }
    pub fn set_purchase_date(mut self, date: TimeStamp) -> Self {
        self.purchase_date = Some(date);
        self
    }
    pub fn add_receipt(mut self, receipt: Attachment) -> Self {
        self.attach_receipts.push(receipt);
        self
    }
    pub fn set_supplier(mut self, name: &str, phone: &str, email: &str) -> Self {
        self.supplier_name = Some(name.to_owned());
        self.supplier_phone_number = Some(phone.to_owned());
        self.supplier_email = Some(email.to_owned());
        self
    }
    pub fn set_additional_comments(mut self, comments: &str) -> Self {
        self.additional_comments = Some(comments.to_owned());
        self
    }
    pub fn set_late_entry(mut self, late: bool) -> Self {
        self.late_entry = late;
        self
    }

    /// Checks every field and builds the record that will be inserted. The
    /// first failure is returned; nothing is built on error.
    pub fn validate_and_finalise(
        self,
        id: RequestId,
        submitted_at: TimeStamp,
    ) -> Result<RequestRecord, RequestError> {
        let idir = required(self.idir, "idir")?;
        if idir.len() != IDIR_LEN || !idir.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(RequestError::validation(
                "idir",
                format!("must be {IDIR_LEN} alphanumeric characters"),
            ));
        }
        let idir = Idir::parse(&idir)?;

        let employee_id = self
            .employee_id
            .ok_or_else(|| RequestError::validation("employeeId", "is required"))?;
        if employee_id == 0 {
            return Err(RequestError::validation("employeeId", "must be positive"));
        }

        let first_name = required(self.first_name, "firstName")?;
        let last_name = required(self.last_name, "lastName")?;

        if self.items_purchased.is_empty() {
            return Err(RequestError::validation(
                "itemsPurchased",
                "at least one item is required",
            ));
        }
        if self.items_purchased.iter().any(|item| item.trim().is_empty()) {
            return Err(RequestError::validation(
                "itemsPurchased",
                "items must not be blank",
            ));
        }

        let total_cost = self
            .total_cost
            .ok_or_else(|| RequestError::validation("totalCost", "is required"))?;
        if total_cost.is_negative() {
            return Err(RequestError::validation("totalCost", "must not be negative"));
        }

        let purchase_date = self
            .purchase_date
            .ok_or_else(|| RequestError::validation("purchaseDate", "is required"))?;
        if !purchase_date.is_storable() {
            return Err(RequestError::validation(
                "purchaseDate",
                "must fall between the years 1677 and 2262",
            ));
        }

        for receipt in &self.attach_receipts {
            receipt.validate("attachReceipts")?;
        }

        let supplier_name = required(self.supplier_name, "supplierName")?;
        let supplier_phone_number = required(self.supplier_phone_number, "supplierPhoneNumber")?;
        let digits = supplier_phone_number
            .chars()
            .filter(char::is_ascii_digit)
            .count();
        if !PHONE.is_match(&supplier_phone_number) || !(7..=15).contains(&digits) {
            return Err(RequestError::validation(
                "supplierPhoneNumber",
                format!("`{supplier_phone_number}` is not a phone number"),
            ));
        }
        let supplier_email = required(self.supplier_email, "supplierEmail")?;
        if !EMAIL.is_match(&supplier_email) {
            return Err(RequestError::validation(
                "supplierEmail",
                format!("`{supplier_email}` is not an email address"),
            ));
        }

        let additional_comments = self
            .additional_comments
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty());

        Ok(RequestRecord {
            id,
            idir,
            employee_id,
            first_name,
            last_name,
            items_purchased: self.items_purchased,
            total_cost,
            purchase_date,
            submission_date: submitted_at,
            attach_receipts: self.attach_receipts,
            attach_approval: vec![],
            approval_date: None,
            supplier_name,
            supplier_phone_number,
            supplier_email,
            additional_comments,
            state: RequestState::Submitted,
            late_entry: self.late_entry,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, RequestError> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RequestError::validation(field, "is required"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal::Decimal;

    pub(crate) const IDIR: &str = "W0A0A0A0A0A0A0A0A0A0A0A0A0A0A0A1";

    pub(crate) fn sample_attachment() -> Attachment {
        Attachment::new("chefs", "some/link", 9001, "fe0000", "file.pdf")
    }

    pub(crate) fn sample_draft() -> NewRequest {
        NewRequest::new()
            .set_idir(IDIR)
            .set_employee_id(999_999)
            .set_name("John", "Smith")
            .add_item("Dogs")
            .set_total_cost(Cost::new(Decimal::new(4546, 2)))
            .set_purchase_date(TimeStamp::new_with(2023, 4, 5, 7, 0, 0).unwrap())
            .add_receipt(sample_attachment())
            .set_supplier("Jimmy's Dogs", "(324) 324-2342", "jimmys@yahoo.com")
            .set_additional_comments("Great purchase!")
    }

    pub(crate) fn sample_record() -> RequestRecord {
        sample_draft()
            .validate_and_finalise(RequestId::generate(), TimeStamp::now())
            .unwrap()
    }

    fn field_of(err: RequestError) -> &'static str {
        match err {
            RequestError::Validation { field, .. } => field,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn finalised_record_starts_submitted_without_approval() {
        let record = sample_record();

        assert_eq!(record.state, RequestState::Submitted);
        assert!(record.approval_date.is_none());
        assert!(record.attach_approval.is_empty());
    }

    #[test]
    fn rejects_negative_cost() {
        let draft = sample_draft().set_total_cost(Cost::new(Decimal::new(-1, 0)));
        let err = draft
            .validate_and_finalise(RequestId::generate(), TimeStamp::now())
            .unwrap_err();

        assert_eq!(field_of(err), "totalCost");
    }

    #[test]
    fn accepts_zero_cost() {
        let draft = sample_draft().set_total_cost(Cost::new(Decimal::ZERO));
        assert!(
            draft
                .validate_and_finalise(RequestId::generate(), TimeStamp::now())
                .is_ok()
        );
    }

    #[test]
    fn rejects_empty_item_list() {
        let mut draft = sample_draft();
        draft.items_purchased.clear();
        let err = draft
            .validate_and_finalise(RequestId::generate(), TimeStamp::now())
            .unwrap_err();

        assert_eq!(field_of(err), "itemsPurchased");
    }

    #[test]
    fn rejects_malformed_supplier_contact() {
        let bad_email = sample_draft().set_supplier("Shop", "250 555 0100", "not-an-email");
        let err = bad_email
            .validate_and_finalise(RequestId::generate(), TimeStamp::now())
            .unwrap_err();
        assert_eq!(field_of(err), "supplierEmail");

        let bad_phone = sample_draft().set_supplier("Shop", "call me", "shop@example.com");
        let err = bad_phone
            .validate_and_finalise(RequestId::generate(), TimeStamp::now())
            .unwrap_err();
        assert_eq!(field_of(err), "supplierPhoneNumber");
    }

    #[test]
    fn names_the_missing_field() {
        let mut draft = sample_draft();
        draft.last_name = None;
        let err = draft
            .validate_and_finalise(RequestId::generate(), TimeStamp::now())
            .unwrap_err();

        assert_eq!(field_of(err), "lastName");
    }

    #[test]
    fn rejects_short_idir_on_create() {
        let draft = sample_draft().set_idir("1111111111");
        let err = draft
            .validate_and_finalise(RequestId::generate(), TimeStamp::now())
            .unwrap_err();

        assert_eq!(field_of(err), "idir");
    }

    #[test]
    fn submission_envelope_ignores_server_owned_fields() {
        let body = serde_json::json!({
            "data": {
                "lateEntry": false,
                "idir": IDIR,
                "firstName": "John",
                "lastName": "Smith",
                "employeeId": 999999,
                "itemsPurchased": ["Dogs"],
                "totalCost": 45.46,
                "purchaseDate": "2023-04-05T00:00:00-07:00",
                "approvalDate": "2023-04-13T00:00:00-07:00",
                "attachApproval": [{
                    "storage": "chefs", "url": "some/link", "size": 9001,
                    "data": {"id": "fe0000"}, "originalName": "file.pdf"
                }],
                "state": "APPROVED",
                "supplierName": "Jimmy's Dogs",
                "supplierPhoneNumber": "(324) 324-2342",
                "supplierEmail": "jimmys@yahoo.com",
                "submit": true
            }
        });

        let record = NewRequest::from_submission_json(&body)
            .unwrap()
            .validate_and_finalise(RequestId::generate(), TimeStamp::now())
            .unwrap();

        assert_eq!(record.employee_id, 999_999);
        assert_eq!(record.state, RequestState::Submitted);
        assert!(record.approval_date.is_none());
        assert!(record.attach_approval.is_empty());
        assert_eq!(record.total_cost.amount(), Decimal::new(4546, 2));
    }

    #[test]
    fn contact_patterns_compile_and_match() {
        assert!(EMAIL.is_match("jimmys@yahoo.com"));
        assert!(!EMAIL.is_match("jimmys at yahoo"));
        assert!(PHONE.is_match("+1 (324) 324-2342"));
        assert!(!PHONE.is_match("call me"));
    }

    #[test]
    fn rejects_purchase_date_outside_storable_range() {
        let body = serde_json::json!({
            "data": {
                "idir": IDIR,
                "firstName": "John",
                "lastName": "Smith",
                "employeeId": 999999,
                "itemsPurchased": ["Dogs"],
                "totalCost": 45.46,
                "purchaseDate": "1600-04-05T00:00:00-07:00",
                "supplierName": "Jimmy's Dogs",
                "supplierPhoneNumber": "(324) 324-2342",
                "supplierEmail": "jimmys@yahoo.com"
            }
        });

        let err = NewRequest::from_submission_json(&body)
            .unwrap()
            .validate_and_finalise(RequestId::generate(), TimeStamp::now())
            .unwrap_err();

        assert_eq!(err.status_code(), 400);
        assert_eq!(field_of(err), "purchaseDate");
    }

    #[test]
    fn record_cbor_roundtrip() {
        let record = sample_record();

        let encoded = minicbor::to_vec(&record).unwrap();
        let decoded: RequestRecord = minicbor::decode(&encoded).unwrap();

        assert_eq!(record, decoded);
    }
}
