//! Walk one reimbursement request through submission and review against a
//! throwaway sled database.
//!
//!     cargo run --example walkthrough
//!
//! `SPR_*` environment variables override the defaults (see `config.rs`).

use rust_decimal::Decimal;
use spr_requests::{
    access::{Caller, Principal, Role},
    config::ServiceConfig,
    lifecycle::{RequestState, StateUpdate},
    logging::init_logging,
    request::{Attachment, NewRequest},
    service::RequestService,
    types::{Cost, TimeStamp},
};

fn main() -> anyhow::Result<()> {
    let mut config = ServiceConfig::load(None)?;
    config.store.temporary = true;
    init_logging(&config.logging);

    let service = RequestService::open(&config)?;

    let submitter = Caller::Authenticated(Principal::new("john.smith@idir", Role::Submitter));
    let reviewer = Caller::Authenticated(Principal::new("finance.lead@idir", Role::Reviewer));

    let purchase_date = TimeStamp::new_with(2023, 4, 5, 7, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("invalid purchase date"))?;

    let draft = NewRequest::new()
        .set_idir("W0A0A0A0A0A0A0A0A0A0A0A0A0A0A0A1")
        .set_employee_id(999_999)
        .set_name("John", "Smith")
        .add_item("Dogs")
        .set_total_cost(Cost::new(Decimal::new(4546, 2)))
        .set_purchase_date(purchase_date)
        .add_receipt(Attachment::new("chefs", "some/link", 9001, "fe0000", "file.pdf"))
        .set_supplier("Jimmy's Dogs", "(324) 324-2342", "jimmys@yahoo.com")
        .set_additional_comments("Great purchase!");

    let created = service.create_request(&submitter, draft)?;
    println!("submitted {} as {}", created.id, created.state);

    for view in service.list_requests(&submitter, Some(true))? {
        println!("{}", serde_json::to_string_pretty(&view)?);
    }

    let approved = service.update_state(
        &reviewer,
        created.id.as_str(),
        StateUpdate::to(RequestState::Approved),
    )?;
    println!(
        "{} is now {} (approval date {:?})",
        approved.id,
        approved.state,
        approved.approval_date.map(|date| date.to_datetime_utc())
    );

    if let Err(err) = service.update_state(
        &submitter,
        created.id.as_str(),
        StateUpdate::to(RequestState::Denied),
    ) {
        println!("submitter update refused: {err} ({})", err.status_code());
    }

    Ok(())
}
