pub mod analytics;
pub mod credit;
pub mod ledger;
pub mod scheduler;
