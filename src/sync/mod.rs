pub mod cache;
pub mod filter;
pub mod ledger;
pub mod notifications;
pub mod source;
