//! Schemaforge-Common: Shared types and error handling.
//!
//! This crate provides functionality used across schemaforge:
//!
//! - **Version identifiers**: The ordered token naming each migration unit
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use schemaforge_common::{Error, Result, Version};
//!
//! let first = Version::parse("20190101000000").unwrap();
//! let second = Version::parse("20190502053908").unwrap();
//! assert!(first < second);
//!
//! fn example() -> Result<()> {
//!     Err(Error::database("no such table: resource"))
//! }
//! assert!(example().is_err());
//! ```

pub mod error;
pub mod version;

pub use error::{Error, Result};
pub use version::Version;
