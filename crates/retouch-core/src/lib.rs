//! Core types for the retouch platform.
//!
//! This crate provides the foundational types used throughout retouch:
//!
//! - **Identifiers**: `UserId`, `ProjectId`, `VersionId`, `JobId`, `EntryId`
//! - **Credits**: `CreditEntry`, `EntryKind`
//! - **Projects**: `Project`, `ImageVersion` (the edit lineage chain)
//! - **Jobs**: `EditJob`, `JobState`, `EditParams`
//! - **Orders**: `PaymentOrder`, `OrderStatus`, `PaymentType`
//!
//! # Credit Unit
//!
//! **1 credit authorizes exactly one AI edit job.**
//!
//! Balances are stored as `i64` whole credits and may never go negative.
//! Payment orders map money (integer cents) to whole credits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod credit;
pub mod ids;
pub mod job;
pub mod order;
pub mod project;

pub use credit::{CreditBalance, CreditEntry, EntryKind, EDIT_COST_CREDITS};
pub use ids::{EntryId, IdError, JobId, ProjectId, UserId, VersionId};
pub use job::{EditJob, EditParams, JobState};
pub use order::{MoneyError, OrderStatus, PaymentOrder, PaymentType};
pub use project::{ImageVersion, Project};
