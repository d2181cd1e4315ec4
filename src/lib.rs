pub mod config;
pub mod conflict;
pub mod context;
pub mod deps;
pub mod error;
pub mod generator;
pub mod index;
pub mod layer;
pub mod ledger;
pub mod logging;
pub mod merge;
pub mod naming;
pub mod planner;
pub mod relations;
pub mod render;
pub mod schema;
pub mod types;
pub mod writer;
