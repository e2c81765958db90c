//! Expression compilation and per-node metadata.
//!
//! This is the *static* side of the classifier: everything derived from the
//! rule tree before the first deck is ever classified.
//!
//! The whole tree compiles as one unit. Each node's condition text is parsed
//! (`expr.rs`), then lowered here into a typed predicate IR that the evaluator
//! walks. Lowering performs name resolution and type checking, so a predicate
//! that compiles can never fail at evaluation time — the classifier's walk is
//! total. One bad expression does not stop the pass: every failure is
//! collected into a single [`CompileError`] report carrying the node name,
//! rule-text line and column per offending expression, and no tree with an
//! unresolved predicate is ever produced.
//!
//! Lowering also records an [`AttrMask`] per node: which of the deck's
//! attributes (game type, colors, cards, words) the condition reads. The mask
//! plays no part in matching; it feeds the verbose report and lets tests pin
//! down what a compiled condition actually touches.
//!
//! ## Invariants
//!
//! - `CompiledTree::nodes` and `CompiledTree::exprs` are index-aligned; slot
//!   `i` of one describes slot `i` of the other.

use crate::RuleNode;
use crate::engine::expr::{self, Ast, AstKind, CmpOp, ExprError};
use thiserror::Error;

bitflags::bitflags! {
    /// Deck attributes referenced by a compiled condition.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AttrMask: u8 {
        const GAME_TYPE = 1 << 0;
        const COLORS    = 1 << 1;
        const CARDS     = 1 << 2;
        const WORDS     = 1 << 3;
    }
}

/// One failed node expression inside a [`CompileError`] report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{node} (line {line}, col {col}): {message}")]
pub struct NodeDiagnostic {
    /// Name of the rule node whose expression failed.
    pub node: String,
    /// 1-based line of the node in the rule text.
    pub line: usize,
    /// 1-based column within the expression text.
    pub col: usize,
    pub message: String,
}

/// One or more node expressions failed to compile. Fatal to initialization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render_report(.diagnostics))]
pub struct CompileError {
    pub diagnostics: Vec<NodeDiagnostic>,
}

fn render_report(diagnostics: &[NodeDiagnostic]) -> String {
    let mut out = format!("{} deck-type expression(s) failed to compile:", diagnostics.len());
    for diagnostic in diagnostics {
        out.push_str("\n  ");
        out.push_str(&diagnostic.to_string());
    }
    out
}

// --- Predicate IR -------------------------------------------------------------

/// One of the three counted-multiset attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SetAttr {
    Colors,
    Cards,
    Words,
}

/// String-valued operand: a literal, the deck's game type, or `null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StrExpr {
    Lit(String),
    GameType,
    Null,
}

/// Integer-valued operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum IntExpr {
    Lit(i64),
    /// Occurrence count of one item, `Cards["Torch"]`. 0 when absent.
    Count { set: SetAttr, item: String },
    /// Number of distinct items, `Cards.Count`.
    Len(SetAttr),
}

/// Typed, total predicate. Evaluation cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Pred {
    Const(bool),
    Not(Box<Pred>),
    And(Box<Pred>, Box<Pred>),
    Or(Box<Pred>, Box<Pred>),
    /// `==`/`!=` over strings. An absent game type equals only `null`.
    StrEq { negated: bool, lhs: StrExpr, rhs: StrExpr },
    BoolEq { negated: bool, lhs: Box<Pred>, rhs: Box<Pred> },
    IntCmp { op: CmpOp, lhs: IntExpr, rhs: IntExpr },
    Contains { set: SetAttr, items: Vec<String> },
    ContainsAny { set: SetAttr, min: usize, items: Vec<String> },
}

/// A node's compiled condition: the predicate plus the attributes it reads.
#[derive(Debug, Clone)]
pub(crate) struct CompiledExpr {
    pub pred: Pred,
    pub attrs: AttrMask,
}

/// The fully compiled rule tree: the node arena plus one [`CompiledExpr`] per
/// node, index-aligned. Only constructible through [`compile_tree`], so every
/// node of an existing `CompiledTree` carries a predicate.
#[derive(Debug, Clone)]
pub(crate) struct CompiledTree {
    pub nodes: Vec<RuleNode>,
    pub exprs: Vec<CompiledExpr>,
}

/// Compile every node's expression; aggregate all failures into one report.
pub(crate) fn compile_tree(nodes: Vec<RuleNode>) -> Result<CompiledTree, CompileError> {
    let mut exprs = Vec::with_capacity(nodes.len());
    let mut diagnostics = Vec::new();

    for node in &nodes {
        match compile_expression(&node.expression) {
            Ok(compiled) => exprs.push(compiled),
            Err(err) => diagnostics.push(NodeDiagnostic {
                node: node.name.clone(),
                line: node.line,
                col: err.col,
                message: err.msg,
            }),
        }
    }

    if diagnostics.is_empty() { Ok(CompiledTree { nodes, exprs }) } else { Err(CompileError { diagnostics }) }
}

/// Compile a single condition expression.
pub(crate) fn compile_expression(src: &str) -> Result<CompiledExpr, ExprError> {
    let ast = expr::parse_expression(src)?;
    let mut attrs = AttrMask::empty();
    match lower(&ast, &mut attrs)? {
        Typed::Bool(pred) => Ok(CompiledExpr { pred, attrs }),
        other => Err(ExprError::new(ast.col, format!("condition must be a boolean, not {}", ty_name(&other)))),
    }
}

// --- Lowering -----------------------------------------------------------------

enum Typed {
    Bool(Pred),
    Int(IntExpr),
    Str(StrExpr),
    Set(SetAttr),
    Null,
}

fn ty_name(typed: &Typed) -> &'static str {
    match typed {
        Typed::Bool(_) => "a boolean",
        Typed::Int(_) => "an integer",
        Typed::Str(_) => "a string",
        Typed::Set(_) => "an attribute set",
        Typed::Null => "null",
    }
}

fn lower(ast: &Ast, attrs: &mut AttrMask) -> Result<Typed, ExprError> {
    match &ast.kind {
        AstKind::Bool(value) => Ok(Typed::Bool(Pred::Const(*value))),
        AstKind::Int(value) => Ok(Typed::Int(IntExpr::Lit(*value))),
        AstKind::Str(value) => Ok(Typed::Str(StrExpr::Lit(value.clone()))),
        AstKind::Null => Ok(Typed::Null),

        AstKind::Ident(name) => match name.as_str() {
            "GameType" => {
                *attrs |= AttrMask::GAME_TYPE;
                Ok(Typed::Str(StrExpr::GameType))
            }
            "Colors" => {
                *attrs |= AttrMask::COLORS;
                Ok(Typed::Set(SetAttr::Colors))
            }
            "Cards" => {
                *attrs |= AttrMask::CARDS;
                Ok(Typed::Set(SetAttr::Cards))
            }
            "Words" => {
                *attrs |= AttrMask::WORDS;
                Ok(Typed::Set(SetAttr::Words))
            }
            _ => Err(ExprError::new(ast.col, format!("unknown identifier `{name}`"))),
        },

        AstKind::Not(operand) => match lower(operand, attrs)? {
            Typed::Bool(pred) => Ok(Typed::Bool(Pred::Not(Box::new(pred)))),
            other => Err(ExprError::new(operand.col, format!("`!` needs a boolean operand, not {}", ty_name(&other)))),
        },

        AstKind::And(left, right) => {
            let (lhs, rhs) = lower_bool_pair(left, right, attrs, "&&")?;
            Ok(Typed::Bool(Pred::And(Box::new(lhs), Box::new(rhs))))
        }
        AstKind::Or(left, right) => {
            let (lhs, rhs) = lower_bool_pair(left, right, attrs, "||")?;
            Ok(Typed::Bool(Pred::Or(Box::new(lhs), Box::new(rhs))))
        }

        AstKind::Cmp(op, left, right) => lower_cmp(ast, *op, left, right, attrs),

        AstKind::Member { object, name } => {
            let set = lower_set(object, attrs)?;
            match name.as_str() {
                "Count" => Ok(Typed::Int(IntExpr::Len(set))),
                _ => Err(ExprError::new(ast.col, format!("unknown member `{name}` (expected Count)"))),
            }
        }

        AstKind::Call { object, method, args } => {
            let set = lower_set(object, attrs)?;
            match method.as_str() {
                "Contains" => {
                    let items = args.iter().map(str_literal).collect::<Result<Vec<_>, _>>()?;
                    Ok(Typed::Bool(Pred::Contains { set, items }))
                }
                "ContainsAny" => {
                    // The overload with a leading integer literal sets the
                    // minimum number of items that must be present.
                    let (min, rest) = match args.first().map(|arg| &arg.kind) {
                        Some(AstKind::Int(min)) => (*min as usize, &args[1..]),
                        _ => (1, &args[..]),
                    };
                    let items = rest.iter().map(str_literal).collect::<Result<Vec<_>, _>>()?;
                    Ok(Typed::Bool(Pred::ContainsAny { set, min, items }))
                }
                _ => Err(ExprError::new(ast.col, format!("unknown method `{method}` (expected Contains or ContainsAny)"))),
            }
        }

        AstKind::Index { object, index } => {
            let set = lower_set(object, attrs)?;
            let item = str_literal(index)?;
            Ok(Typed::Int(IntExpr::Count { set, item }))
        }
    }
}

fn lower_bool_pair(left: &Ast, right: &Ast, attrs: &mut AttrMask, op: &str) -> Result<(Pred, Pred), ExprError> {
    let lhs = match lower(left, attrs)? {
        Typed::Bool(pred) => pred,
        other => return Err(ExprError::new(left.col, format!("`{op}` needs boolean operands, not {}", ty_name(&other)))),
    };
    let rhs = match lower(right, attrs)? {
        Typed::Bool(pred) => pred,
        other => return Err(ExprError::new(right.col, format!("`{op}` needs boolean operands, not {}", ty_name(&other)))),
    };
    Ok((lhs, rhs))
}

fn lower_cmp(ast: &Ast, op: CmpOp, left: &Ast, right: &Ast, attrs: &mut AttrMask) -> Result<Typed, ExprError> {
    let lhs = lower(left, attrs)?;
    let rhs = lower(right, attrs)?;
    let equality = matches!(op, CmpOp::Eq | CmpOp::Ne);

    match (lhs, rhs) {
        (Typed::Int(lhs), Typed::Int(rhs)) => Ok(Typed::Bool(Pred::IntCmp { op, lhs, rhs })),
        (Typed::Bool(lhs), Typed::Bool(rhs)) if equality => Ok(Typed::Bool(Pred::BoolEq {
            negated: op == CmpOp::Ne,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })),
        (lhs @ (Typed::Str(_) | Typed::Null), rhs @ (Typed::Str(_) | Typed::Null)) => {
            if !equality {
                return Err(ExprError::new(ast.col, "strings support only `==` and `!=`"));
            }
            Ok(Typed::Bool(Pred::StrEq { negated: op == CmpOp::Ne, lhs: as_str_expr(lhs), rhs: as_str_expr(rhs) }))
        }
        (lhs, rhs) => {
            Err(ExprError::new(ast.col, format!("cannot compare {} with {}", ty_name(&lhs), ty_name(&rhs))))
        }
    }
}

fn as_str_expr(typed: Typed) -> StrExpr {
    match typed {
        Typed::Str(expr) => expr,
        Typed::Null => StrExpr::Null,
        // lower_cmp only calls this for the two variants above.
        _ => unreachable!("as_str_expr on a non-string operand"),
    }
}

fn lower_set(object: &Ast, attrs: &mut AttrMask) -> Result<SetAttr, ExprError> {
    match lower(object, attrs)? {
        Typed::Set(set) => Ok(set),
        other => {
            Err(ExprError::new(object.col, format!("only Colors, Cards and Words have members, not {}", ty_name(&other))))
        }
    }
}

fn str_literal(arg: &Ast) -> Result<String, ExprError> {
    match &arg.kind {
        AstKind::Str(value) => Ok(value.clone()),
        _ => Err(ExprError::new(arg.col, "expected a string literal")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tree::parse_rule_tree;

    #[test]
    fn records_attribute_mask() {
        let cases: Vec<(&str, AttrMask)> = vec![
            ("true", AttrMask::empty()),
            ("GameType == \"Eternal\"", AttrMask::GAME_TYPE),
            ("Colors.Contains(\"Fire\")", AttrMask::COLORS),
            ("Cards[\"Torch\"] > 2 && Words.Count == 0", AttrMask::CARDS | AttrMask::WORDS),
            ("GameType != null || Colors.ContainsAny(\"Fire\")", AttrMask::GAME_TYPE | AttrMask::COLORS),
        ];
        for (src, expected) in cases {
            let compiled = compile_expression(src).unwrap_or_else(|err| panic!("'{src}' failed: {err}"));
            assert_eq!(compiled.attrs, expected, "wrong mask for '{src}'");
        }
    }

    #[test]
    fn contains_any_minimum_overload() {
        let compiled = compile_expression("Colors.ContainsAny(2, \"Fire\", \"Time\")").expect("compiles");
        assert_eq!(
            compiled.pred,
            Pred::ContainsAny { set: SetAttr::Colors, min: 2, items: vec!["Fire".into(), "Time".into()] }
        );

        let compiled = compile_expression("Colors.ContainsAny(\"Fire\", \"Time\")").expect("compiles");
        assert_eq!(
            compiled.pred,
            Pred::ContainsAny { set: SetAttr::Colors, min: 1, items: vec!["Fire".into(), "Time".into()] }
        );
    }

    #[test]
    fn unknown_identifier_is_reported_with_position() {
        let err = compile_expression("Decks.Contains(\"X\")").expect_err("must fail");
        assert_eq!(err.col, 1);
        assert!(err.msg.contains("unknown identifier `Decks`"), "unexpected message: {}", err.msg);
    }

    #[test]
    fn unknown_method_is_reported_with_position() {
        let err = compile_expression("Cards.Has(\"X\")").expect_err("must fail");
        assert_eq!(err.col, 7);
        assert!(err.msg.contains("unknown method `Has`"), "unexpected message: {}", err.msg);
    }

    #[test]
    fn non_literal_items_are_rejected() {
        let err = compile_expression("Cards.Contains(GameType)").expect_err("must fail");
        assert!(err.msg.contains("string literal"), "unexpected message: {}", err.msg);
    }

    #[test]
    fn type_mismatches_are_rejected() {
        let cases = [
            "GameType > 1",
            "1 && true",
            "Cards.Count == \"four\"",
            "GameType < \"a\"",
            "Colors == Cards",
            "!GameType",
        ];
        for src in cases {
            assert!(compile_expression(src).is_err(), "'{src}' should not compile");
        }
    }

    #[test]
    fn non_boolean_condition_is_rejected() {
        let err = compile_expression("Cards.Count").expect_err("must fail");
        assert!(err.msg.contains("must be a boolean"), "unexpected message: {}", err.msg);
    }

    #[test]
    fn compile_tree_attaches_one_predicate_per_node() {
        let nodes = parse_rule_tree("A|GameType == \"Eternal\"\n|B|Colors.Contains(\"Fire\")").expect("parses");
        let tree = compile_tree(nodes).expect("compiles");
        assert_eq!(tree.nodes.len(), tree.exprs.len());
        assert_eq!(tree.exprs[0].pred, Pred::Const(true), "root predicate is the constant true");
    }

    #[test]
    fn compile_tree_aggregates_every_failure() {
        let text = "A|true\n|B|Decks.Contains(\"X\")\n|C|true\n|D|Cards.Count";
        let nodes = parse_rule_tree(text).expect("parses");
        let err = compile_tree(nodes).expect_err("two bad expressions must fail");

        assert_eq!(err.diagnostics.len(), 2);
        assert_eq!(err.diagnostics[0].node, "B");
        assert_eq!(err.diagnostics[0].line, 2);
        assert_eq!(err.diagnostics[1].node, "D");
        assert_eq!(err.diagnostics[1].line, 4);

        let report = err.to_string();
        assert!(report.contains("2 deck-type expression(s)"), "unexpected report: {report}");
        assert!(report.contains("B (line 2"), "unexpected report: {report}");
        assert!(report.contains("D (line 4"), "unexpected report: {report}");
    }
}
