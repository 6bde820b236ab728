pub mod db;
pub mod error;
pub mod operations;
pub mod schema;
pub mod store;
