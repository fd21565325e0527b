pub mod identity;
pub mod profile_store;
pub mod record_store;
