// Library for tests to access modules

pub mod aggregator;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod query;
pub mod report;
pub mod routes;
pub mod store;
pub mod worker;
