pub mod config;
pub mod contract;
pub mod error;
pub mod invoke;
pub mod key;
pub mod ledger;
pub mod order;
pub mod processline;
pub mod product;
pub mod query;
pub mod store;
pub mod transition;
pub mod utils;
