//! Core state: the content catalog and per-client cycling
//!
//! - ContentStore: compiled-in jokes and proverbs
//! - CycleTable: per-client randomized draw-without-replacement

pub mod content;
pub mod cycle;

pub use content::{Category, ContentItem, ContentStore, ITEMS_PER_CATEGORY};
pub use cycle::{CycleError, CycleState, CycleTable, Draw, SeededShuffler, Shuffler, ThreadRngShuffler};
