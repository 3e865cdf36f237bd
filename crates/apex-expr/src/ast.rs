// apex-expr/src/ast.rs
// ============================================================================
// Module: Abstract Syntax Tree
// Description: The parsed representation of an expression.
// Purpose: A typed tree the evaluator walks; replaces reflection/SpEL-style
//          dynamic dispatch with a closed node set (§9 redesign note).
// Dependencies: bigdecimal, chrono, smallvec
// ============================================================================

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use chrono::NaiveTime;
use smallvec::SmallVec;

use apex_core::Value;

/// Binary operators over two evaluated operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// A parsed expression node. `Box`/`SmallVec` children keep the tree owned
/// (no cyclic graphs, no back-pointers, per §9).
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    /// Literal `null`.
    Null,
    /// Literal boolean.
    Bool(bool),
    /// Literal signed integer.
    Int(i64),
    /// Literal decimal (kept as text until compiled to `BigDecimal`).
    Decimal(BigDecimal),
    /// Literal string.
    Str(String),
    /// Literal ISO date, produced by the `date(...)` constructor function
    /// at parse time is not supported; dates are produced by
    /// `parseDate`/`today` at evaluation time. Reserved for future literal
    /// syntax; unused by the current grammar.
    #[allow(dead_code, reason = "reserved for a future date-literal syntax")]
    Date(NaiveDate),
    /// Reserved, see `Ast::Date`.
    #[allow(dead_code, reason = "reserved for a future time-literal syntax")]
    Time(NaiveTime),
    /// `#name` — resolves against `EvaluationContext` variables only.
    Variable(String),
    /// `#this` — the current element inside a collection operator.
    This,
    /// A bare identifier at the root of an expression — resolves against
    /// the root record only.
    RootField(String),
    /// `target.field` or `target?.field`.
    Member { target: Box<Ast>, field: String, safe: bool },
    /// `target[index]` or `target?.[index]`.
    Index { target: Box<Ast>, index: Box<Ast>, safe: bool },
    /// `!operand`.
    Not(Box<Ast>),
    /// unary `-operand`.
    Neg(Box<Ast>),
    /// A binary operator application.
    Binary { op: BinaryOp, left: Box<Ast>, right: Box<Ast> },
    /// `cond ? then : else`.
    Ternary { cond: Box<Ast>, then_branch: Box<Ast>, else_branch: Box<Ast> },
    /// `left ?: right`.
    Elvis { left: Box<Ast>, right: Box<Ast> },
    /// `target instanceof T(TypeName)`.
    InstanceOf { target: Box<Ast>, type_name: String },
    /// `name(args...)` against the whitelisted function registry.
    Call { name: String, args: SmallVec<[Ast; 4]> },
    /// `target.name(args...)` or `target?.name(args...)` — sugar for
    /// calling the whitelisted function `name` with `target` prepended to
    /// `args`, e.g. `list.size()` ≡ `size(list)`.
    MethodCall { target: Box<Ast>, name: String, args: SmallVec<[Ast; 4]>, safe: bool },
    /// `target.![expr]` — projection.
    Project { target: Box<Ast>, body: Box<Ast> },
    /// `target.?[pred]` — selection.
    Select { target: Box<Ast>, body: Box<Ast> },
    /// `target.^[pred]` — first match.
    First { target: Box<Ast>, body: Box<Ast> },
    /// `target.$[pred]` — last match.
    Last { target: Box<Ast>, body: Box<Ast> },
}

impl Ast {
    /// `true` if this node is a literal that never depends on the
    /// evaluation context (used by the compiler's constant-folding pass).
    #[must_use]
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            Ast::Null | Ast::Bool(_) | Ast::Int(_) | Ast::Decimal(_) | Ast::Str(_) | Ast::Date(_) | Ast::Time(_)
        )
    }

    /// Converts a constant literal node directly into its `Value`, without
    /// a context. Panics-free: returns `None` for non-constant nodes.
    #[must_use]
    pub fn as_constant_value(&self) -> Option<Value> {
        match self {
            Ast::Null => Some(Value::Null),
            Ast::Bool(b) => Some(Value::Bool(*b)),
            Ast::Int(n) => Some(Value::Int64(*n)),
            Ast::Decimal(d) => Some(Value::Decimal(d.clone())),
            Ast::Str(s) => Some(Value::String(s.clone())),
            Ast::Date(d) => Some(Value::Date(*d)),
            Ast::Time(t) => Some(Value::Time(*t)),
            _ => None,
        }
    }
}
