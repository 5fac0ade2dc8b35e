//! Request and query shapes that exist only on the HTTP surface.
//!
//! Record types themselves come from `cadvault_types` and are serialised
//! as-is.

pub mod admin;
pub mod v1;
