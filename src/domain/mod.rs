pub mod account;
pub mod analytics;
pub mod card;
pub mod credit;
pub mod entry;
pub mod ports;
