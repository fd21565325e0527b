pub mod admin_bootstrap;
pub mod profile_deleted;
pub mod sweep;
