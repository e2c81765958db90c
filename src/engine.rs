//! Rule-tree compilation and classification engine.
//!
//! This module is the *internal entry point* for the classifier. The public
//! surface lives in `api.rs`; everything here is the pipeline behind it.
//!
//! ## How the parts work together
//!
//! Initialization happens once per rule text, classification once per deck:
//!
//! ```text
//! rule text ── tree::parse_rule_tree ── Vec<RuleNode>        (tree.rs)
//!                                          │
//!                                          v
//!                          compile::compile_tree             (compile.rs)
//!                            - expr::parse_expression        (expr.rs)
//!                            - lower to typed predicate IR
//!                            - record per-node AttrMask
//!                            - aggregate failures
//!                                          │
//!                                          v
//!                                    CompiledTree
//!                                          │
//! deck record ── DeckContext ──────────────┼── walk::walk    (walk.rs, eval.rs)
//!                                          │    - pruned depth-first pass
//!                                          │    - matches bucketed by level
//!                                          v
//!                                   walk::select ── deepest unique match
//! ```
//!
//! ## Responsibilities by module
//!
//! - `tree.rs`: indentation-encoded rule text → node arena with linkage;
//!   structural validation.
//! - `expr.rs`: condition-expression syntax (lexer + recursive descent).
//! - `compile.rs`: whole-tree compilation unit; typed predicate IR; the
//!   aggregated [`CompileError`] report.
//! - `eval.rs`: `DeckContext`, the per-call read-only view predicates
//!   evaluate against.
//! - `walk.rs`: pruned walk, per-level match buckets, deepest-unique
//!   selection.
//!
//! ## Debugging
//!
//! Set `DECKTYPE_DEBUG_RULES=1` to print evaluation and selection traces.

#[path = "engine/compile.rs"]
mod compile;
#[path = "engine/eval.rs"]
mod eval;
#[path = "engine/expr.rs"]
mod expr;
#[path = "engine/tree.rs"]
mod tree;
#[path = "engine/walk.rs"]
mod walk;

pub use compile::{AttrMask, CompileError, NodeDiagnostic};
pub use tree::StructuralError;

pub(crate) use compile::{CompiledTree, compile_tree};
pub(crate) use eval::DeckContext;
pub(crate) use tree::parse_rule_tree;
pub(crate) use walk::{ancestor_path, select, walk};
