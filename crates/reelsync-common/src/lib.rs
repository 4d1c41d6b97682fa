//! Reelsync-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across reelsync:
//!
//! - **Typed IDs**: Type-safe wrappers around the remote server's numeric keys
//! - **Core Types**: Enums for item kinds and sync categorization
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use reelsync_common::{ItemId, ItemKind, Error, Result};
//!
//! // Wrap a server-assigned rating key
//! let item_id = ItemId::new(42);
//!
//! // Work with item kinds
//! let kind = ItemKind::Movie;
//! assert!(kind.may_have_collections());
//!
//! // Use common error types
//! fn example() -> Result<()> {
//!     Err(Error::not_found("item"))
//! }
//! ```

pub mod error;
pub mod ids;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
