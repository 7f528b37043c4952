//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (EntryStore, FileSystem)
//! but are themselves concrete structs, not traits.

mod thread;

pub use thread::{RankedThread, ThreadService};
