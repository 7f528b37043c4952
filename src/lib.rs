//! threadrank: ranked discussion trees.
//!
//! Entries of a thread are materialized from ancestor/descendant pairs into
//! a left-child/right-sibling tree, scored with a decayed subtree sum over an
//! age-gravity denominator, and arranged so that every sibling chain reads
//! highest score first.
//!
//! Layers, innermost first:
//! - [`domain`]: tree, scoring, arrangement, materialization (no I/O)
//! - [`application`]: snapshot queries and the thread service
//! - [`infrastructure`]: stores and dependency wiring
//! - [`cli`]: argument parsing, dispatch and rendering

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
