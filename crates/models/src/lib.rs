pub mod errors;
pub mod db;
pub mod client;
pub mod schema;
