//! Rule-tree text parsing.
//!
//! The rule text encodes the deck-type hierarchy one rule per line:
//!
//! ```text
//! Eternal|GameType == "Eternal"
//! |$Fire|Colors.Contains("Fire")
//! ||Rakano|Colors.Contains("Justice")
//! ```
//!
//! A line's leading run of `|` characters is its depth; the remainder splits
//! on the first `|` into the deck-type name and its condition text. The parser
//! inserts an implicit root (`All Games`, condition `true`) at index 0 and
//! links every parsed line under the rightmost node one level up, maintained
//! as a stack of "rightmost node seen at each depth".
//!
//! Depth may grow by at most one per line. Any malformed line (depth jump,
//! missing separator, empty field) aborts the whole load with a
//! [`StructuralError`] quoting the offending line — a half-parsed tree is
//! never returned.

use crate::{NodeId, ROOT, RuleNode};
use thiserror::Error;

/// Character whose leading run encodes a line's depth, and which separates the
/// name field from the expression field.
pub(crate) const MARKER: char = '|';

/// Name of the implicit root node. Its condition is the literal `true`.
pub(crate) const ROOT_NAME: &str = "All Games";

/// Malformed rule-tree text. Fatal to initialization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("invalid tree structure at line {line}: \"{text}\" descends more than one level at once")]
    DepthJump { line: usize, text: String },

    #[error("invalid rule at line {line}: \"{text}\" needs a name and an expression separated by '|'")]
    MissingSeparator { line: usize, text: String },

    #[error("invalid rule at line {line}: \"{text}\" has an empty expression")]
    EmptyExpression { line: usize, text: String },
}

/// Parse rule text into the node arena, root first, in file order.
///
/// The returned nodes carry name, expression text, source line, level and
/// parent/child linkage; predicates are attached later by compilation.
pub(crate) fn parse_rule_tree(text: &str) -> Result<Vec<RuleNode>, StructuralError> {
    let mut nodes = vec![RuleNode {
        name: ROOT_NAME.to_string(),
        expression: "true".to_string(),
        line: 0,
        level: 0,
        parent: None,
        children: Vec::new(),
    }];

    // Stack of the rightmost node seen at each depth so far; the top is the
    // parent for the current depth.
    let mut parents: Vec<NodeId> = Vec::new();
    let mut current_depth: isize = -1;
    let mut last: NodeId = ROOT;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let depth = line.chars().take_while(|&c| c == MARKER).count();

        if depth as isize > current_depth + 1 {
            return Err(StructuralError::DepthJump { line: line_no, text: line.to_string() });
        }

        // The depth scan consumed every leading marker, so `name` can never be
        // empty; the expression after the separator can.
        let rest = &line[depth..];
        let Some((name, expression)) = rest.split_once(MARKER) else {
            return Err(StructuralError::MissingSeparator { line: line_no, text: line.to_string() });
        };
        if expression.is_empty() {
            return Err(StructuralError::EmptyExpression { line: line_no, text: line.to_string() });
        }

        if depth as isize == current_depth + 1 {
            parents.push(last);
            current_depth += 1;
        }
        while (depth as isize) < current_depth {
            parents.pop();
            current_depth -= 1;
        }

        // Non-empty: the depth checks above guarantee the first accepted line
        // has depth 0 and pushed the root.
        let parent = *parents.last().unwrap();

        let id = nodes.len();
        nodes.push(RuleNode {
            name: name.to_string(),
            expression: expression.to_string(),
            line: line_no,
            level: depth + 1,
            parent: Some(parent),
            children: Vec::new(),
        });
        nodes[parent].children.push(id);
        last = id;
    }

    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_tree_with_levels_and_parents() {
        let text = "\
Eternal|GameType == \"Eternal\"
|$Fire|Colors.Contains(\"Fire\")
||Rakano|Colors.Contains(\"Justice\")
|Shadow|Colors.Contains(\"Shadow\")
Gwent|GameType == \"Gwent\"";

        let nodes = parse_rule_tree(text).expect("tree should parse");

        let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["All Games", "Eternal", "$Fire", "Rakano", "Shadow", "Gwent"]);

        let levels: Vec<usize> = nodes.iter().map(|n| n.level).collect();
        assert_eq!(levels, [0, 1, 2, 3, 2, 1]);

        let parents: Vec<Option<NodeId>> = nodes.iter().map(|n| n.parent).collect();
        assert_eq!(parents, [None, Some(0), Some(1), Some(2), Some(1), Some(0)]);

        // Child order preserves file order.
        assert_eq!(nodes[0].children, [1, 5]);
        assert_eq!(nodes[1].children, [2, 4]);
        assert!(nodes[2].is_structural());
        assert!(!nodes[3].is_structural());
    }

    #[test]
    fn levels_always_increase_by_one_from_parent() {
        let text = "A|true\n|B|true\n||C|true\n|D|true\n||E|true";
        let nodes = parse_rule_tree(text).expect("tree should parse");
        for node in nodes.iter().skip(1) {
            let parent = node.parent.expect("non-root nodes have a parent");
            assert_eq!(node.level, nodes[parent].level + 1, "node {} breaks level monotonicity", node.name);
        }
    }

    #[test]
    fn rejects_depth_jump() {
        let text = "A|true\n|||B|true";
        let err = parse_rule_tree(text).expect_err("depth jump must be rejected");
        assert_eq!(err, StructuralError::DepthJump { line: 2, text: "|||B|true".to_string() });
    }

    #[test]
    fn rejects_first_line_with_depth() {
        let err = parse_rule_tree("|A|true").expect_err("indented first line must be rejected");
        assert!(matches!(err, StructuralError::DepthJump { line: 1, .. }));
    }

    #[test]
    fn rejects_missing_separator() {
        let err = parse_rule_tree("A|true\n|Justtext").expect_err("line without separator must be rejected");
        assert_eq!(err, StructuralError::MissingSeparator { line: 2, text: "|Justtext".to_string() });
    }

    #[test]
    fn rejects_empty_expression() {
        let err = parse_rule_tree("A|").expect_err("empty expression must be rejected");
        assert_eq!(err, StructuralError::EmptyExpression { line: 1, text: "A|".to_string() });
    }

    #[test]
    fn empty_text_yields_root_only() {
        let nodes = parse_rule_tree("").expect("empty text is a valid (trivial) tree");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[ROOT].name, ROOT_NAME);
        assert_eq!(nodes[ROOT].expression, "true");
    }
}
