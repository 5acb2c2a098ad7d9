//! User-defined alert rules: schema, compilation, caching, evaluation.
//!
//! A persisted [`schema::Rule`] is compiled once into a
//! [`compile::CompiledRule`] carrying fast-path hints and pre-built
//! regexes. The [`cache::RuleCache`] keeps the compiled set coherent
//! across processes through a version-stamped shared store, and the
//! [`evaluator::RuleEvaluator`] matches the set against aircraft
//! snapshots every tick.

pub mod cache;
pub mod compile;
pub mod error;
pub mod evaluator;
pub mod schema;
pub mod source;

pub use cache::{CacheStatus, CallerScope, MemorySharedStore, RuleCache, SharedRuleStore};
pub use compile::{CompiledRule, FastPathHints};
pub use error::{Result, RuleError};
pub use evaluator::RuleEvaluator;
pub use schema::Rule;
pub use source::{MemoryRuleSource, RuleSource, RuleWatcher, YamlDirSource};
