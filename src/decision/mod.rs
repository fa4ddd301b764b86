//! Decision tree compilation.
//!
//! Rules are first preprocessed into range sets. The tree builder then
//! recursively splits the rule set on aspect thresholds until every node is
//! small enough, and compiles each leaf's rules into [`Classifier`]s that only
//! check what the leaf's bounds do not already guarantee.

mod bounds;
mod classifier;
mod preprocessed;
mod threshold;
mod tree;

pub use bounds::Bounds;
pub use classifier::{ClassificationResult, Classifier, Matcher};
pub use preprocessed::PreprocessedRule;
pub use threshold::Threshold;
pub use tree::{Tree, TreeInfo, TreeOptions, DEFAULT_MAX_DEPTH, DEFAULT_MAX_LEAF_SIZE};
