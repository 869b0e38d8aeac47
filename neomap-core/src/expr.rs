//! Projection and predicate expression AST.
//!
//! Expressions are built explicitly (no runtime introspection or lambda
//! recompilation): literals are evaluated once at construction, external
//! variable references and pass-through markers are first-class nodes, and
//! the [`projection`](crate::projection) module walks the finished tree in
//! a single pass.

use serde_json::Value;

use crate::error::NeomapError;

/// A node in a projection or predicate expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// The root entity parameter (the `p` in `p -> ...`).
    Param,
    /// Member access: `base.field`. Chains are allowed over [`Expr::Param`]
    /// and [`Expr::Var`].
    Field(Box<Expr>, String),
    /// An already-evaluated constant.
    Lit(Value),
    /// External variable reference marker: renders as a bare textual
    /// reference (e.g. `u.name`), never as a quoted literal.
    Var(String),
    /// Pass-through marker: the wrapped member name is emitted literally,
    /// without metadata renaming.
    Raw(Box<Expr>),
    /// Anonymous-record construction: ordered `(name, value)` members.
    Record(Vec<(String, Expr)>),
    /// List construction.
    List(Vec<Expr>),
    /// Assignment intent in predicate context. `left == right` is
    /// deliberately repurposed to mean `left := right`; it is never a
    /// boolean test.
    Eq(Box<Expr>, Box<Expr>),
    /// Conjunction of predicate assignments.
    All(Vec<Expr>),
    /// Function or aggregate placeholder: recognized syntactically and
    /// rendered textually, never evaluated.
    Call(String, Vec<Expr>),
}

impl Expr {
    /// The root entity parameter.
    pub fn param() -> Expr {
        Expr::Param
    }

    /// Access a field of the root parameter: `p.field`.
    pub fn field(name: impl Into<String>) -> Expr {
        Expr::Field(Box::new(Expr::Param), name.into())
    }

    /// Access a field of `self`: chained member access.
    pub fn get(self, name: impl Into<String>) -> Expr {
        Expr::Field(Box::new(self), name.into())
    }

    /// Evaluate a constant once, at construction. Serialization failure is
    /// an [`NeomapError::InvalidExpression`] — never swallowed.
    pub fn lit<T: serde::Serialize>(value: T) -> Result<Expr, NeomapError> {
        serde_json::to_value(value)
            .map(Expr::Lit)
            .map_err(|e| NeomapError::InvalidExpression(e.to_string()))
    }

    /// An external variable reference.
    pub fn var(name: impl Into<String>) -> Expr {
        Expr::Var(name.into())
    }

    /// Wrap `self` in the pass-through marker.
    pub fn raw(self) -> Expr {
        Expr::Raw(Box::new(self))
    }

    /// Assignment intent: `self := value` (spelled `==` in the source DSL).
    pub fn eq(self, value: Expr) -> Expr {
        Expr::Eq(Box::new(self), Box::new(value))
    }

    /// Anonymous-record construction from ordered members.
    pub fn record<I, S>(members: I) -> Expr
    where
        I: IntoIterator<Item = (S, Expr)>,
        S: Into<String>,
    {
        Expr::Record(members.into_iter().map(|(n, e)| (n.into(), e)).collect())
    }

    /// Conjunction of predicate assignments.
    pub fn all(preds: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::All(preds.into_iter().collect())
    }

    /// Function/aggregate placeholder.
    pub fn call(name: impl Into<String>, args: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Call(name.into(), args.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_projection_shape() {
        let expr = Expr::record([
            ("name", Expr::field("name")),
            ("home", Expr::field("address")),
        ]);
        match expr {
            Expr::Record(members) => {
                assert_eq!(members.len(), 2);
                assert_eq!(members[0].0, "name");
            }
            other => panic!("expected Record, got {other:?}"),
        }
    }

    #[test]
    fn lit_evaluates_at_construction() {
        let e = Expr::lit(42).unwrap();
        assert_eq!(e, Expr::Lit(serde_json::json!(42)));
    }

    #[test]
    fn chained_access_over_var() {
        let e = Expr::var("u").get("address").get("city");
        match e {
            Expr::Field(base, name) => {
                assert_eq!(name, "city");
                assert!(matches!(*base, Expr::Field(_, _)));
            }
            other => panic!("expected Field, got {other:?}"),
        }
    }
}
