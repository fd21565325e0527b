//! Shared cart-operations domain primitives.
//!
//! This crate owns the sweep and bootstrap decision logic and the
//! record/profile contracts. It intentionally excludes AWS SDK and Lambda
//! runtime concerns; those live in `crates/cart_ops_lambda`.

pub mod admin;
pub mod contract;
pub mod sweep;
