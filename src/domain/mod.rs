//! Domain layer: the ranked discussion-tree engine
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod arrange;
pub mod builder;
pub mod entities;
pub mod error;
pub mod scoring;

pub use arena::{ChainIter, DiscussionTree, TreeIterator, TreeNode};
pub use arrange::ArrangeReport;
pub use builder::TreeBuilder;
pub use entities::*;
pub use error::{DomainError, DomainResult, RelationFault};
pub use scoring::{Ranker, ScoringParams};
