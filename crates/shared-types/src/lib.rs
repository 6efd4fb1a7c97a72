//! # Shared Types Crate
//!
//! This crate contains the shop data model shared by every part of the
//! material status synchronization core.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: The wire shape of projects and materials is
//!   defined once, here, in the backend's camelCase JSON form.
//! - **Normalizing Parsers**: Status strings that fall outside the material
//!   cycle collapse to `pending` instead of failing deserialization.
//! - **No Behaviour**: Transition rules, snapshots and reconciliation live in
//!   the sync subsystem; these are plain data carriers.

pub mod entities;
pub mod status;
mod wire;

pub use entities::*;
pub use status::*;
