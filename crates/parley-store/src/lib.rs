pub mod error;
pub mod ledger;

pub use error::StoreError;
pub use ledger::BanLedger;
