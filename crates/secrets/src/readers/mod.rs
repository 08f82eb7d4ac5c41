//! Secret reader implementations
//!
//! This module provides readers that require no external services:
//!
//! - [`MemoryReader`] - Versioned secrets held in memory
//!
//! Additional backends are available via separate crates:
//!
//! - `vault` - HashiCorp Vault KV v1/v2 (symvault-vault crate)

mod memory;

pub use memory::{MemoryReader, ReadCall};
