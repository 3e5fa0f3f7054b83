pub mod config;
pub mod contracts;
pub mod discovery;
pub mod indexer;
pub mod operators;
pub mod report;
pub mod rpc;
pub mod transactor;
