//! Tree walk and deepest-unique selection.
//!
//! One classification call is a single depth-first pass over the compiled
//! tree:
//!
//! ```text
//! root (always true)
//!   │ evaluate node predicate against the DeckContext
//!   ├─ false ──▶ prune: the whole subtree is skipped
//!   └─ true  ──▶ record a match at the node's level (unless root/structural),
//!                then recurse into children in file order
//! ```
//!
//! Matches are bucketed by level. Selection scans the buckets and keeps the
//! *deepest* level holding exactly one match; levels with zero or several
//! matches are skipped, and an ambiguous level never blocks a deeper unique
//! one. No unique level means no classification.
//!
//! Setting `DECKTYPE_DEBUG_RULES=1` prints per-node evaluation and selection
//! traces to stderr.

use crate::engine::compile::CompiledTree;
use crate::engine::eval::DeckContext;
use crate::{NodeId, ROOT};

/// What one walk produced. Trace entries are collected only when asked for;
/// the plain classification path allocates match buckets and nothing else.
#[derive(Debug, Default)]
pub(crate) struct WalkOutcome {
    /// Matched non-structural nodes, bucketed by level. Index = level.
    pub matches: Vec<Vec<NodeId>>,
    /// `(node, matched)` per evaluated node, in visit order (verbose only).
    pub traces: Vec<(NodeId, bool)>,
    /// Number of predicates evaluated.
    pub evaluated: usize,
    /// Number of subtrees pruned by a false predicate.
    pub pruned: usize,
}

/// Evaluate the tree against one deck context.
pub(crate) fn walk(tree: &CompiledTree, ctx: &DeckContext<'_>, collect_traces: bool) -> WalkOutcome {
    let mut outcome = WalkOutcome::default();
    let debug = std::env::var_os("DECKTYPE_DEBUG_RULES").is_some();
    visit(tree, ctx, ROOT, &mut outcome, collect_traces, debug);
    outcome
}

fn visit(
    tree: &CompiledTree,
    ctx: &DeckContext<'_>,
    id: NodeId,
    outcome: &mut WalkOutcome,
    collect_traces: bool,
    debug: bool,
) {
    let node = &tree.nodes[id];
    let matched = ctx.eval(&tree.exprs[id].pred);
    outcome.evaluated += 1;
    if collect_traces {
        outcome.traces.push((id, matched));
    }
    if debug {
        eprintln!("[walk:eval] name=\"{}\" level={} matched={}", node.name, node.level, matched);
    }

    if !matched {
        outcome.pruned += 1;
        return;
    }

    if id != ROOT && !node.is_structural() {
        if node.level >= outcome.matches.len() {
            outcome.matches.resize_with(node.level + 1, Vec::new);
        }
        outcome.matches[node.level].push(id);
    }

    for &child in &node.children {
        visit(tree, ctx, child, outcome, collect_traces, debug);
    }
}

/// Pick the deepest level holding exactly one match.
pub(crate) fn select(matches: &[Vec<NodeId>]) -> Option<NodeId> {
    let selected = matches.iter().rfind(|level| level.len() == 1).map(|level| level[0]);
    if std::env::var_os("DECKTYPE_DEBUG_RULES").is_some() {
        let counts: Vec<usize> = matches.iter().map(Vec::len).collect();
        eprintln!("[walk:select] level_counts={counts:?} selected={selected:?}");
    }
    selected
}

/// Names of `id`'s ancestors, outermost first, root excluded.
pub(crate) fn ancestor_path(tree: &CompiledTree, id: NodeId) -> Vec<String> {
    let mut path = Vec::new();
    let mut current = tree.nodes[id].parent;
    while let Some(ancestor) = current {
        if ancestor != ROOT {
            path.push(tree.nodes[ancestor].name.clone());
        }
        current = tree.nodes[ancestor].parent;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeckAttributes;
    use crate::card_set;
    use crate::engine::compile::compile_tree;
    use crate::engine::tree::parse_rule_tree;

    fn compiled(text: &str) -> CompiledTree {
        compile_tree(parse_rule_tree(text).expect("tree parses")).expect("tree compiles")
    }

    fn names_at(tree: &CompiledTree, outcome: &WalkOutcome, level: usize) -> Vec<String> {
        outcome.matches.get(level).map_or_else(Vec::new, |ids| {
            ids.iter().map(|&id| tree.nodes[id].name.clone()).collect()
        })
    }

    #[test]
    fn false_parent_hides_true_descendants() {
        // B's own condition holds for the deck, but its parent A does not.
        let tree = compiled("A|Colors.Contains(\"Shadow\")\n|B|Cards.Contains(\"Torch\")");
        let deck = DeckAttributes { cards: card_set! { "Torch" }, ..DeckAttributes::default() };
        let ctx = DeckContext::new(&deck);

        let outcome = walk(&tree, &ctx, false);
        assert!(outcome.matches.iter().all(Vec::is_empty), "pruned subtree must contribute no matches");
        assert_eq!(outcome.evaluated, 2, "only the root and A are evaluated");
        assert_eq!(outcome.pruned, 1);
    }

    #[test]
    fn structural_nodes_gate_but_never_match() {
        let tree = compiled("$Fire|Colors.Contains(\"Fire\")\n|Rakano|Colors.Contains(\"Justice\")");
        let deck = DeckAttributes { colors: card_set! { "Fire", "Justice" }, ..DeckAttributes::default() };
        let ctx = DeckContext::new(&deck);

        let outcome = walk(&tree, &ctx, false);
        assert_eq!(names_at(&tree, &outcome, 1), Vec::<String>::new(), "structural node must not be recorded");
        assert_eq!(names_at(&tree, &outcome, 2), ["Rakano"]);
        assert_eq!(select(&outcome.matches), Some(2));
    }

    #[test]
    fn root_is_never_a_result() {
        let tree = compiled("A|false");
        let deck = DeckAttributes::default();
        let outcome = walk(&tree, &DeckContext::new(&deck), false);
        assert!(select(&outcome.matches).is_none(), "a deck matching nothing below the root has no classification");
    }

    #[test]
    fn ambiguous_level_yields_nothing() {
        let tree = compiled("A|Cards.Contains(\"X\")\nB|Cards.Contains(\"X\")");
        let deck = DeckAttributes { cards: card_set! { "X" }, ..DeckAttributes::default() };
        let outcome = walk(&tree, &DeckContext::new(&deck), false);
        assert_eq!(names_at(&tree, &outcome, 1), ["A", "B"]);
        assert!(select(&outcome.matches).is_none());
    }

    #[test]
    fn deepest_unique_level_wins_across_ambiguous_gaps() {
        // Level 1 unique, level 2 ambiguous, level 3 unique: level 3 wins.
        let text = "A|true\n|B1|true\n||C|true\n|B2|true";
        let tree = compiled(text);
        let deck = DeckAttributes::default();
        let outcome = walk(&tree, &DeckContext::new(&deck), false);

        assert_eq!(names_at(&tree, &outcome, 1), ["A"]);
        assert_eq!(names_at(&tree, &outcome, 2), ["B1", "B2"]);
        assert_eq!(names_at(&tree, &outcome, 3), ["C"]);

        let selected = select(&outcome.matches).expect("level 3 is unique");
        assert_eq!(tree.nodes[selected].name, "C");
    }

    #[test]
    fn shallower_unique_level_wins_when_deeper_is_ambiguous() {
        let text = "A|true\n|B1|true\n|B2|true";
        let tree = compiled(text);
        let deck = DeckAttributes::default();
        let outcome = walk(&tree, &DeckContext::new(&deck), false);

        let selected = select(&outcome.matches).expect("level 1 is unique");
        assert_eq!(tree.nodes[selected].name, "A");
    }

    #[test]
    fn traces_cover_every_evaluated_node() {
        let tree = compiled("A|true\n|B|false\nC|true");
        let deck = DeckAttributes::default();
        let outcome = walk(&tree, &DeckContext::new(&deck), true);

        let trace: Vec<(String, bool)> =
            outcome.traces.iter().map(|&(id, matched)| (tree.nodes[id].name.clone(), matched)).collect();
        assert_eq!(
            trace,
            [
                ("All Games".to_string(), true),
                ("A".to_string(), true),
                ("B".to_string(), false),
                ("C".to_string(), true),
            ]
        );
        assert_eq!(outcome.evaluated, 4);
        assert_eq!(outcome.pruned, 1);
    }

    #[test]
    fn ancestor_path_excludes_root_and_self() {
        let tree = compiled("A|true\n|$Mid|true\n||Leaf|true");
        let leaf = tree.nodes.iter().position(|n| n.name == "Leaf").expect("leaf exists");
        assert_eq!(ancestor_path(&tree, leaf), ["A", "$Mid"]);
        let top = tree.nodes.iter().position(|n| n.name == "A").expect("A exists");
        assert_eq!(ancestor_path(&tree, top), Vec::<String>::new());
    }
}
