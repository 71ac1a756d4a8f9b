pub mod directory;
pub mod ledger;
