//! Predicate evaluation against one deck.
//!
//! A [`DeckContext`] is the per-call view of a [`DeckAttributes`] record: it
//! borrows the record for the duration of one classification call and is
//! threaded by reference into every predicate evaluation. The context is
//! immutable for the life of the walk, so the "populate once per call,
//! evaluate the whole tree against it" contract holds without any locking —
//! concurrent classification calls simply carry their own contexts.
//!
//! Predicates are typed and total (see `compile.rs`); evaluation returns a
//! plain `bool` and cannot fail.

use crate::engine::compile::{IntExpr, Pred, SetAttr, StrExpr};
use crate::engine::expr::CmpOp;
use crate::{CardSet, DeckAttributes};

/// Read-only evaluation view of one deck's attributes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DeckContext<'a> {
    attrs: &'a DeckAttributes,
}

impl<'a> DeckContext<'a> {
    pub fn new(attrs: &'a DeckAttributes) -> Self {
        DeckContext { attrs }
    }

    fn set(&self, set: SetAttr) -> &CardSet {
        match set {
            SetAttr::Colors => &self.attrs.colors,
            SetAttr::Cards => &self.attrs.cards,
            SetAttr::Words => &self.attrs.words,
        }
    }

    /// String operands resolve to `None` for `null` and for an absent game
    /// type, which makes `GameType == "X"` false and `GameType != "X"` true
    /// on decks whose game type is not asserted.
    fn resolve_str<'b>(&'b self, expr: &'b StrExpr) -> Option<&'b str> {
        match expr {
            StrExpr::Lit(value) => Some(value.as_str()),
            StrExpr::GameType => self.attrs.game_type.as_deref(),
            StrExpr::Null => None,
        }
    }

    fn int(&self, expr: &IntExpr) -> i64 {
        match expr {
            IntExpr::Lit(value) => *value,
            IntExpr::Count { set, item } => self.set(*set).count(item) as i64,
            IntExpr::Len(set) => self.set(*set).len() as i64,
        }
    }

    pub fn eval(&self, pred: &Pred) -> bool {
        match pred {
            Pred::Const(value) => *value,
            Pred::Not(inner) => !self.eval(inner),
            Pred::And(lhs, rhs) => self.eval(lhs) && self.eval(rhs),
            Pred::Or(lhs, rhs) => self.eval(lhs) || self.eval(rhs),
            Pred::StrEq { negated, lhs, rhs } => {
                let equal = match (self.resolve_str(lhs), self.resolve_str(rhs)) {
                    (Some(lhs), Some(rhs)) => lhs == rhs,
                    (None, None) => true,
                    _ => false,
                };
                equal != *negated
            }
            Pred::BoolEq { negated, lhs, rhs } => (self.eval(lhs) == self.eval(rhs)) != *negated,
            Pred::IntCmp { op, lhs, rhs } => cmp_ints(*op, self.int(lhs), self.int(rhs)),
            Pred::Contains { set, items } => self.set(*set).contains_all(items.iter().map(String::as_str)),
            Pred::ContainsAny { set, min, items } => {
                self.set(*set).contains_any(*min, items.iter().map(String::as_str))
            }
        }
    }
}

fn cmp_ints(op: CmpOp, lhs: i64, rhs: i64) -> bool {
    match op {
        CmpOp::Eq => lhs == rhs,
        CmpOp::Ne => lhs != rhs,
        CmpOp::Lt => lhs < rhs,
        CmpOp::Le => lhs <= rhs,
        CmpOp::Gt => lhs > rhs,
        CmpOp::Ge => lhs >= rhs,
    }
}
