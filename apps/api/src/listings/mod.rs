pub mod handlers;
pub mod query;
pub mod repo;
