//! AWS-oriented adapters and handlers for the cart-operations functions.
//!
//! This crate owns runtime integration details (Lambda handlers, store and
//! identity adapters) on top of the pure decision logic in `cart_ops_core`.
//! AWS client implementations of the adapter traits live in the bin targets.

pub mod adapters;
pub mod handlers;
