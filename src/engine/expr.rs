//! Condition-expression syntax.
//!
//! Rule conditions are written in the same embedded expression language the
//! rule files have always used: boolean connectives, comparisons, and method
//! calls against the deck attributes, e.g.
//!
//! ```text
//! GameType == "Eternal" && Colors.ContainsAny(2, "Fire", "Justice") && !Cards.Contains("Harsh Rule")
//! ```
//!
//! This module is the *syntax* half of compilation: a lexer (token scanning is
//! regex-seeded through the `regex!` macro) and a recursive-descent parser
//! producing an untyped [`Ast`]. Every AST node carries the 1-based column of
//! its source position so the back half of compilation (`compile.rs`) can
//! report name-resolution and type errors precisely.
//!
//! Precedence, loosest to tightest: `||`, `&&`, comparison (single, no
//! chaining), `!`, postfix (`.member`, `.method(...)`, `[index]`).

use thiserror::Error;

/// A syntax, name-resolution, or type error in one condition expression.
///
/// `col` is the 1-based column within the expression text; the rule-text line
/// is attached later, when errors are aggregated per node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{msg} at column {col}")]
pub struct ExprError {
    pub col: usize,
    pub msg: String,
}

impl ExprError {
    pub(crate) fn new(col: usize, msg: impl Into<String>) -> Self {
        ExprError { col, msg: msg.into() }
    }
}

// --- Tokens -------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tok {
    Ident(String),
    Str(String),
    Int(i64),
    AndAnd,
    OrOr,
    Bang,
    EqEq,
    NotEq,
    Le,
    Ge,
    Lt,
    Gt,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Comma,
}

/// Token plus the 1-based column where it starts.
type Spanned = (Tok, usize);

fn lex(src: &str) -> Result<Vec<Spanned>, ExprError> {
    let mut out: Vec<Spanned> = Vec::new();
    let mut pos = 0;

    while pos < src.len() {
        let rest = &src[pos..];
        let col = pos + 1;

        if let Some(m) = regex!(r"\A[ \t]+").find(rest) {
            pos += m.end();
            continue;
        }

        if let Some(m) = regex!(r#"\A"(?:[^"\\]|\\.)*""#).find(rest) {
            out.push((Tok::Str(unescape(m.as_str())), col));
            pos += m.end();
            continue;
        }
        if rest.starts_with('"') {
            return Err(ExprError::new(col, "unterminated string literal"));
        }

        if let Some(m) = regex!(r"\A[0-9]+").find(rest) {
            let value =
                m.as_str().parse::<i64>().map_err(|_| ExprError::new(col, "integer literal out of range"))?;
            out.push((Tok::Int(value), col));
            pos += m.end();
            continue;
        }

        if let Some(m) = regex!(r"\A[A-Za-z_][A-Za-z0-9_]*").find(rest) {
            out.push((Tok::Ident(m.as_str().to_string()), col));
            pos += m.end();
            continue;
        }

        let two = [("&&", Tok::AndAnd), ("||", Tok::OrOr), ("==", Tok::EqEq), ("!=", Tok::NotEq),
            ("<=", Tok::Le), (">=", Tok::Ge)];
        if let Some((text, tok)) = two.iter().find(|(text, _)| rest.starts_with(text)) {
            out.push((tok.clone(), col));
            pos += text.len();
            continue;
        }

        let one = [('!', Tok::Bang), ('<', Tok::Lt), ('>', Tok::Gt), ('(', Tok::LParen), (')', Tok::RParen),
            ('[', Tok::LBracket), (']', Tok::RBracket), ('.', Tok::Dot), (',', Tok::Comma)];
        let ch = rest.chars().next().unwrap();
        if let Some((_, tok)) = one.iter().find(|(c, _)| *c == ch) {
            out.push((tok.clone(), col));
            pos += ch.len_utf8();
            continue;
        }

        return Err(ExprError::new(col, format!("unexpected character {ch:?}")));
    }

    Ok(out)
}

/// Strip the surrounding quotes and process `\"` / `\\` escapes. Any other
/// escaped character is kept as-is.
fn unescape(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

// --- AST ----------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Untyped expression node; `col` is its 1-based source column.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Ast {
    pub kind: AstKind,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AstKind {
    Bool(bool),
    Int(i64),
    Str(String),
    Null,
    Ident(String),
    /// Property access, e.g. `Cards.Count`.
    Member { object: Box<Ast>, name: String },
    /// Method call, e.g. `Colors.ContainsAny(2, "Fire", "Time")`.
    Call { object: Box<Ast>, method: String, args: Vec<Ast> },
    /// Indexing, e.g. `Cards["Torch"]`.
    Index { object: Box<Ast>, index: Box<Ast> },
    Not(Box<Ast>),
    And(Box<Ast>, Box<Ast>),
    Or(Box<Ast>, Box<Ast>),
    Cmp(CmpOp, Box<Ast>, Box<Ast>),
}

impl Ast {
    fn new(kind: AstKind, col: usize) -> Self {
        Ast { kind, col }
    }
}

/// Parse one condition expression into an [`Ast`].
pub(crate) fn parse_expression(src: &str) -> Result<Ast, ExprError> {
    let toks = lex(src)?;
    let mut parser = Parser { toks: &toks, pos: 0, eof_col: src.len() + 1 };
    let ast = parser.or_expr()?;
    match parser.peek() {
        None => Ok(ast),
        Some((tok, col)) => Err(ExprError::new(*col, format!("unexpected {}", describe(tok)))),
    }
}

struct Parser<'a> {
    toks: &'a [Spanned],
    pos: usize,
    eof_col: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Spanned> {
        self.toks.get(self.pos)
    }

    fn bump(&mut self) -> Option<&Spanned> {
        let tok = self.toks.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Tok) -> bool {
        if matches!(self.peek(), Some((tok, _)) if tok == expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Tok, what: &str) -> Result<usize, ExprError> {
        match self.bump() {
            Some((tok, col)) if tok == expected => Ok(*col),
            Some((tok, col)) => Err(ExprError::new(*col, format!("expected {what}, found {}", describe(tok)))),
            None => Err(ExprError::new(self.eof_col, format!("expected {what}, found end of expression"))),
        }
    }

    fn or_expr(&mut self) -> Result<Ast, ExprError> {
        let mut left = self.and_expr()?;
        while self.eat(&Tok::OrOr) {
            let right = self.and_expr()?;
            let col = left.col;
            left = Ast::new(AstKind::Or(Box::new(left), Box::new(right)), col);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Ast, ExprError> {
        let mut left = self.cmp_expr()?;
        while self.eat(&Tok::AndAnd) {
            let right = self.cmp_expr()?;
            let col = left.col;
            left = Ast::new(AstKind::And(Box::new(left), Box::new(right)), col);
        }
        Ok(left)
    }

    /// A single, non-chaining comparison: `a < b < c` is a syntax error.
    fn cmp_expr(&mut self) -> Result<Ast, ExprError> {
        let left = self.unary_expr()?;
        let op = match self.peek() {
            Some((Tok::EqEq, _)) => CmpOp::Eq,
            Some((Tok::NotEq, _)) => CmpOp::Ne,
            Some((Tok::Lt, _)) => CmpOp::Lt,
            Some((Tok::Le, _)) => CmpOp::Le,
            Some((Tok::Gt, _)) => CmpOp::Gt,
            Some((Tok::Ge, _)) => CmpOp::Ge,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.unary_expr()?;
        let col = left.col;
        Ok(Ast::new(AstKind::Cmp(op, Box::new(left), Box::new(right)), col))
    }

    fn unary_expr(&mut self) -> Result<Ast, ExprError> {
        if let Some((Tok::Bang, col)) = self.peek() {
            let col = *col;
            self.pos += 1;
            let operand = self.unary_expr()?;
            return Ok(Ast::new(AstKind::Not(Box::new(operand)), col));
        }
        self.postfix_expr()
    }

    fn postfix_expr(&mut self) -> Result<Ast, ExprError> {
        let mut expr = self.primary_expr()?;
        loop {
            if self.eat(&Tok::Dot) {
                let (name, name_col) = match self.bump() {
                    Some((Tok::Ident(name), col)) => (name.clone(), *col),
                    Some((tok, col)) => {
                        return Err(ExprError::new(*col, format!("expected member name, found {}", describe(tok))));
                    }
                    None => return Err(ExprError::new(self.eof_col, "expected member name after '.'")),
                };
                if self.eat(&Tok::LParen) {
                    let mut args = Vec::new();
                    if !self.eat(&Tok::RParen) {
                        loop {
                            args.push(self.or_expr()?);
                            if !self.eat(&Tok::Comma) {
                                break;
                            }
                        }
                        self.expect(&Tok::RParen, "')'")?;
                    }
                    expr = Ast::new(AstKind::Call { object: Box::new(expr), method: name, args }, name_col);
                } else {
                    expr = Ast::new(AstKind::Member { object: Box::new(expr), name }, name_col);
                }
            } else if let Some((Tok::LBracket, col)) = self.peek() {
                let col = *col;
                self.pos += 1;
                let index = self.or_expr()?;
                self.expect(&Tok::RBracket, "']'")?;
                expr = Ast::new(AstKind::Index { object: Box::new(expr), index: Box::new(index) }, col);
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary_expr(&mut self) -> Result<Ast, ExprError> {
        match self.bump() {
            Some((Tok::Int(value), col)) => Ok(Ast::new(AstKind::Int(*value), *col)),
            Some((Tok::Str(value), col)) => Ok(Ast::new(AstKind::Str(value.clone()), *col)),
            Some((Tok::Ident(name), col)) => {
                let kind = match name.as_str() {
                    "true" => AstKind::Bool(true),
                    "false" => AstKind::Bool(false),
                    "null" => AstKind::Null,
                    _ => AstKind::Ident(name.clone()),
                };
                Ok(Ast::new(kind, *col))
            }
            Some((Tok::LParen, _)) => {
                let inner = self.or_expr()?;
                self.expect(&Tok::RParen, "')'")?;
                Ok(inner)
            }
            Some((tok, col)) => Err(ExprError::new(*col, format!("expected expression, found {}", describe(tok)))),
            None => Err(ExprError::new(self.eof_col, "expected expression, found end of expression")),
        }
    }
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Ident(name) => format!("identifier `{name}`"),
        Tok::Str(_) => "string literal".to_string(),
        Tok::Int(value) => format!("integer `{value}`"),
        Tok::AndAnd => "`&&`".to_string(),
        Tok::OrOr => "`||`".to_string(),
        Tok::Bang => "`!`".to_string(),
        Tok::EqEq => "`==`".to_string(),
        Tok::NotEq => "`!=`".to_string(),
        Tok::Le => "`<=`".to_string(),
        Tok::Ge => "`>=`".to_string(),
        Tok::Lt => "`<`".to_string(),
        Tok::Gt => "`>`".to_string(),
        Tok::LParen => "`(`".to_string(),
        Tok::RParen => "`)`".to_string(),
        Tok::LBracket => "`[`".to_string(),
        Tok::RBracket => "`]`".to_string(),
        Tok::Dot => "`.`".to_string(),
        Tok::Comma => "`,`".to_string(),
    }
}
