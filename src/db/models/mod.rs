//! Database models split into domain-specific modules.
//!
//! This module re-exports all types so callers can use `crate::db::*`.

pub mod cart;
pub mod common;
pub mod order;
pub mod product;
pub mod user;

pub use cart::*;
pub use common::*;
pub use order::*;
pub use product::*;
pub use user::*;
