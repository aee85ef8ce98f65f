pub mod ledger;
pub mod service_account;
pub mod sheets_ledger;
