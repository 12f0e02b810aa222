//! Tabrule Engine - Rule Evaluation over Tab Snapshots
//!
//! Evaluation is synchronous over a snapshot: tabs are indexed once per
//! batch, every (rule, tab) pair is evaluated against the indices, and
//! matches become typed action intents for an external executor.
//!
//! ```text
//! TabRecord[] ──► Indexer ──► Indices (arena + key → positions)
//!                                 │
//! Rule ──► matching_tabs ◄────────┤  resolve(path) → FieldValue
//!              │                  │
//!              └──► plan_intents ─┴──► ActionIntent[] ──► ActionExecutor
//! ```
//!
//! Category lookups that need I/O run in an async pre-pass
//! (`materialize_categories`) before indexing.

pub mod batch;
pub mod evaluator;
pub mod index;
pub mod intent;
pub mod resolve;

pub use batch::{materialize_categories, BatchOutcome, CategoryResolver, RuleEngine, RuleMatch};
pub use evaluator::{evaluate, matching_tabs, rule_matches, try_evaluate, EvalError};
pub use index::{find_duplicates, IndexKey, Indexer, Indices};
pub use intent::{dispatch_intents, plan_intents, ActionExecutor, ActionIntent, ExecutionReport};
pub use resolve::{parse_count_path, resolve, EvalContext, FieldValue};
