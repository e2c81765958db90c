use crate::engine::{self, AttrMask, CompileError, CompiledTree, DeckContext, StructuralError};
use crate::{DeckAttributes, NodeId};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Rule text failed to parse or compile. The rule text is bad, not the deck.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// The classification a deck resolved to: the deepest uniquely matched
/// deck-type node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Name of the matched node.
    pub name: String,
    /// Level of the matched node; direct children of the root are level 1.
    pub level: usize,
    /// Names of the matched node's ancestors, outermost first, root excluded.
    /// Structural (`$`) ancestors are included for diagnostic display.
    pub path: Vec<String>,
}

/// One node of the compiled tree, for introspection and reports.
#[derive(Debug, Clone)]
pub struct NodeSummary {
    pub name: String,
    pub level: usize,
    pub structural: bool,
    /// The node's condition source text.
    pub expression: String,
    /// Deck attributes the condition reads.
    pub attrs: AttrMask,
}

/// One evaluated node in a verbose classification trace, in visit order.
/// Nodes inside pruned subtrees never appear.
#[derive(Debug, Clone)]
pub struct NodeTrace {
    pub name: String,
    pub level: usize,
    pub matched: bool,
    pub structural: bool,
    pub attrs: AttrMask,
}

/// Additional details returned by [`Classifier::classify_verbose`].
///
/// This is meant for debugging and rule authoring; the plain
/// [`Classifier::classify`] path collects none of it.
#[derive(Debug, Clone)]
pub struct ClassifyDetails {
    /// Total elapsed time.
    pub total: Duration,
    /// Time spent walking the tree (predicate evaluation).
    pub walk: Duration,
    /// Number of predicates evaluated.
    pub evaluated: usize,
    /// Number of subtrees pruned by a false condition.
    pub pruned: usize,
    /// Recorded match count per level; index = level, the root is level 0.
    pub level_counts: Vec<usize>,
    /// Per-node evaluation trace.
    pub traces: Vec<NodeTrace>,
}

/// A compiled rule tree, ready to classify decks.
///
/// Construction parses and compiles the whole tree; a `Classifier` therefore
/// always holds one predicate per node and classification cannot hit an
/// unresolved rule. The tree is immutable after construction, so one
/// `Classifier` may be shared freely across threads.
#[derive(Debug)]
pub struct Classifier {
    tree: CompiledTree,
}

impl Classifier {
    /// Parse and compile `rule_text` into a classifier.
    ///
    /// Fails with a [`StructuralError`] on malformed tree text and with an
    /// aggregated [`CompileError`] when any node's condition does not
    /// compile; no partially compiled classifier is ever returned.
    pub fn new(rule_text: &str) -> Result<Self, InitError> {
        let nodes = engine::parse_rule_tree(rule_text)?;
        let tree = engine::compile_tree(nodes)?;
        Ok(Classifier { tree })
    }

    /// Classify one deck: the deepest uniquely matched deck type, or `None`
    /// when every level's match count is zero or ambiguous.
    ///
    /// # Example
    /// ```
    /// use decktype::{Classifier, DeckAttributes, card_set};
    ///
    /// let classifier = Classifier::new("Aggro|Words.Contains(\"Aggro\")").unwrap();
    /// let deck = DeckAttributes { words: card_set! { "Aggro" }, ..DeckAttributes::default() };
    /// assert_eq!(classifier.classify(&deck).unwrap().name, "Aggro");
    /// ```
    pub fn classify(&self, attrs: &DeckAttributes) -> Option<Classification> {
        let ctx = DeckContext::new(attrs);
        let outcome = engine::walk(&self.tree, &ctx, false);
        engine::select(&outcome.matches).map(|id| self.classification(id))
    }

    /// Classify one deck and return the full evaluation trace alongside.
    pub fn classify_verbose(&self, attrs: &DeckAttributes) -> (Option<Classification>, ClassifyDetails) {
        let total_start = Instant::now();
        let ctx = DeckContext::new(attrs);

        let walk_start = Instant::now();
        let outcome = engine::walk(&self.tree, &ctx, true);
        let walk = walk_start.elapsed();

        let classification = engine::select(&outcome.matches).map(|id| self.classification(id));

        let traces = outcome
            .traces
            .iter()
            .map(|&(id, matched)| {
                let node = &self.tree.nodes[id];
                NodeTrace {
                    name: node.name.clone(),
                    level: node.level,
                    matched,
                    structural: node.is_structural(),
                    attrs: self.tree.exprs[id].attrs,
                }
            })
            .collect();

        let details = ClassifyDetails {
            total: total_start.elapsed(),
            walk,
            evaluated: outcome.evaluated,
            pruned: outcome.pruned,
            level_counts: outcome.matches.iter().map(Vec::len).collect(),
            traces,
        };
        (classification, details)
    }

    /// Number of rule nodes, the implicit root included.
    pub fn node_count(&self) -> usize {
        self.tree.nodes.len()
    }

    /// Every node of the compiled tree in file order, root first.
    pub fn node_summaries(&self) -> Vec<NodeSummary> {
        self.tree
            .nodes
            .iter()
            .zip(&self.tree.exprs)
            .map(|(node, compiled)| NodeSummary {
                name: node.name.clone(),
                level: node.level,
                structural: node.is_structural(),
                expression: node.expression.clone(),
                attrs: compiled.attrs,
            })
            .collect()
    }

    fn classification(&self, id: NodeId) -> Classification {
        let node = &self.tree.nodes[id];
        Classification {
            name: node.name.clone(),
            level: node.level,
            path: engine::ancestor_path(&self.tree, id),
        }
    }
}

// --- Process-wide classifier --------------------------------------------------

static ACTIVE: Lazy<RwLock<Option<Arc<Classifier>>>> = Lazy::new(|| RwLock::new(None));

/// Compile `rule_text` and publish it as the process-wide classifier.
///
/// Publication is atomic with respect to [`classify_deck`]: in-flight calls
/// finish against the tree they started with, later calls see the new one.
/// On error the previously published classifier (if any) stays active.
pub fn initialize(rule_text: &str) -> Result<(), InitError> {
    let classifier = Arc::new(Classifier::new(rule_text)?);
    *ACTIVE.write() = Some(classifier);
    Ok(())
}

/// Classify one deck against the process-wide classifier.
///
/// Returns `None` when [`initialize`] has not succeeded yet — an
/// unclassifiable deck and an uninitialized classifier are both "no
/// classification", never an error.
pub fn classify_deck(attrs: &DeckAttributes) -> Option<Classification> {
    let classifier = ACTIVE.read().as_ref().cloned()?;
    classifier.classify(attrs)
}
