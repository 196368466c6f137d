//! Service layer for the client catalog.
//! - `client::repository` is the storage collaborator (find/exists/save/delete).
//! - `client::service` is the business layer the HTTP resource delegates to.
//! - Entity and schema definitions live in the `models` crate.

pub mod errors;
pub mod client;
#[cfg(test)]
pub mod test_support;
