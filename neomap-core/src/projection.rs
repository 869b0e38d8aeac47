//! The projection engine: a single-pass walk over an [`Expr`] tree that
//! emits an ordered sequence of `(name, value-or-reference)` pairs for the
//! query-fragment writer.
//!
//! Two contexts exist. A *projection* is evaluated against a bound entity
//! instance (its [`FlatRecord`]) and describes an output shape; a
//! *predicate* carries no instance and reinterprets `==` as assignment
//! intent (`left := right`) — a deliberate mini-language construct, not a
//! boolean test.
//!
//! A wrong name/value pairing would silently corrupt the generated query
//! fragment, so every unrecognized shape is a hard error.

use serde_json::Value;

use crate::error::NeomapError;
use crate::expr::Expr;
use crate::flatten::FlatRecord;
use crate::metadata::EntityMetadata;

/// The value side of an emitted pair.
#[derive(Clone, Debug, PartialEq)]
pub enum PairValue {
    /// A literal, rendered (quoted/escaped) by the fragment writer.
    Literal(Value),
    /// A captured external reference, emitted as bare syntax — never quoted
    /// or parameterized.
    Reference(String),
}

/// One emitted `name = value` (or bare `name`) pair.
#[derive(Clone, Debug, PartialEq)]
pub struct Pair {
    pub name: String,
    pub value: PairValue,
}

/// The engine's output: ordered pairs plus the side list of captured
/// external references, indexed in capture order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pairs {
    pub pairs: Vec<Pair>,
    pub references: Vec<String>,
}

impl Pairs {
    fn push_literal(&mut self, name: String, value: Value) {
        self.pairs.push(Pair {
            name,
            value: PairValue::Literal(value),
        });
    }

    fn push_reference(&mut self, name: String, text: String) {
        self.references.push(text.clone());
        self.pairs.push(Pair {
            name,
            value: PairValue::Reference(text),
        });
    }
}

/// Walk a projection expression against a bound entity instance.
///
/// Recognized top-level shapes: anonymous-record construction, a single
/// member-access chain, or a single function call. A member access that
/// terminates on a complex field auto-expands into one pair per spliced
/// leaf, so one projected member can yield several output pairs.
///
/// For record members that access a field of the root parameter, the output
/// name is the auto-resolved flat name, not the declared member name — the
/// declared name only applies to literals, references, and calls.
pub fn project(
    expr: &Expr,
    source: &FlatRecord,
    meta: &EntityMetadata,
) -> Result<Pairs, NeomapError> {
    let mut out = Pairs::default();
    match expr {
        Expr::Record(members) => {
            for (declared, member) in members {
                project_member(declared, member, source, meta, &mut out)?;
            }
        }
        Expr::Field(_, _) | Expr::Raw(_) => {
            project_member("", expr, source, meta, &mut out)?;
        }
        Expr::Call(name, args) => {
            let text = render_call(name, args, meta)?;
            out.push_reference(name.clone(), text);
        }
        other => {
            return Err(NeomapError::ExpressionShape(format!(
                "projection must be a record, member access, or call; got {other:?}"
            )));
        }
    }
    Ok(out)
}

/// Walk a predicate expression into assignment pairs.
///
/// Recognized shapes: a single `Eq` or a conjunction of `Eq` nodes. Each
/// `left == right` is recorded as `left := right`: the left side must
/// resolve to exactly one flat name, the right side to a literal or a bare
/// reference.
pub fn predicate(expr: &Expr, meta: &EntityMetadata) -> Result<Pairs, NeomapError> {
    let mut out = Pairs::default();
    match expr {
        Expr::Eq(left, right) => assign(left, right, meta, &mut out)?,
        Expr::All(preds) => {
            for pred in preds {
                match pred {
                    Expr::Eq(left, right) => assign(left, right, meta, &mut out)?,
                    other => {
                        return Err(NeomapError::ExpressionShape(format!(
                            "predicate conjunction may only contain assignments; got {other:?}"
                        )));
                    }
                }
            }
        }
        other => {
            return Err(NeomapError::ExpressionShape(format!(
                "predicate must be an assignment or a conjunction of assignments; got {other:?}"
            )));
        }
    }
    Ok(out)
}

fn project_member(
    declared: &str,
    member: &Expr,
    source: &FlatRecord,
    meta: &EntityMetadata,
    out: &mut Pairs,
) -> Result<(), NeomapError> {
    match member {
        Expr::Field(_, _) if is_param_chain(member) => {
            let path = param_chain(member)?;
            emit_entity_access(&path, source, meta, out)
        }
        Expr::Raw(inner) => {
            // Pass-through: the literal member name, no renaming.
            let path = param_chain(inner)?;
            let name = path.join(crate::metadata::NAME_SEPARATOR);
            let value = source.get(&name).cloned().unwrap_or(Value::Null);
            out.push_literal(name, value);
            Ok(())
        }
        Expr::Field(_, _) if is_var_chain(member) => {
            require_name(declared, member)?;
            let text = render_var_chain(member)?;
            out.push_reference(declared.to_owned(), text);
            Ok(())
        }
        Expr::Var(name) => {
            require_name(declared, member)?;
            out.push_reference(declared.to_owned(), name.clone());
            Ok(())
        }
        Expr::Lit(value) => {
            require_name(declared, member)?;
            out.push_literal(declared.to_owned(), value.clone());
            Ok(())
        }
        Expr::Call(name, args) => {
            let out_name = if declared.is_empty() { name } else { declared };
            let text = render_call(name, args, meta)?;
            out.push_reference(out_name.to_owned(), text);
            Ok(())
        }
        other => Err(NeomapError::ExpressionShape(format!(
            "unsupported projection member: {other:?}"
        ))),
    }
}

/// Emit the pairs for a member access chain rooted at the entity parameter.
/// A terminal complex field explodes into its spliced leaves.
fn emit_entity_access(
    path: &[String],
    source: &FlatRecord,
    meta: &EntityMetadata,
    out: &mut Pairs,
) -> Result<(), NeomapError> {
    match path {
        [field] => {
            let resolved = meta.field(field).ok_or_else(|| {
                NeomapError::missing_field(field, meta.type_name)
            })?;
            if resolved.excluded {
                // Complex field: one pair per leaf. Declared-type leaves
                // always apply; derived-contributed leaves only when the
                // instance actually carries them.
                let parent = resolved.path[0].clone();
                let known = source.key_set();
                let leaves: Vec<(String, Value)> = meta
                    .complex_leaves(&parent)
                    .filter(|leaf| !leaf.from_derived || known.contains(&leaf.flat_name))
                    .map(|leaf| {
                        let value = source.get(&leaf.flat_name).cloned().unwrap_or(Value::Null);
                        (leaf.flat_name.clone(), value)
                    })
                    .collect();
                for (name, value) in leaves {
                    out.push_literal(name, value);
                }
            } else {
                let value = source.get(&resolved.flat_name).cloned().unwrap_or(Value::Null);
                out.push_literal(resolved.flat_name.clone(), value);
            }
            Ok(())
        }
        [field, sub] => {
            let parent = meta.field(field).ok_or_else(|| {
                NeomapError::missing_field(field, meta.type_name)
            })?;
            let leaf = meta
                .complex_leaves(&parent.path[0])
                .find(|l| l.field_name == sub)
                .ok_or_else(|| NeomapError::missing_field(sub, parent.source_type_name))?;
            let value = source.get(&leaf.flat_name).cloned().unwrap_or(Value::Null);
            out.push_literal(leaf.flat_name.clone(), value);
            Ok(())
        }
        _ => Err(NeomapError::ExpressionShape(format!(
            "member access chain is too deep: {}",
            path.join(".")
        ))),
    }
}

fn assign(
    left: &Expr,
    right: &Expr,
    meta: &EntityMetadata,
    out: &mut Pairs,
) -> Result<(), NeomapError> {
    let name = resolve_single_name(left, meta)?;
    match right {
        Expr::Lit(value) => {
            out.push_literal(name, value.clone());
            Ok(())
        }
        Expr::Var(var) => {
            out.push_reference(name, var.clone());
            Ok(())
        }
        Expr::Field(_, _) if is_var_chain(right) => {
            let text = render_var_chain(right)?;
            out.push_reference(name, text);
            Ok(())
        }
        Expr::Call(fn_name, args) => {
            let text = render_call(fn_name, args, meta)?;
            out.push_reference(name, text);
            Ok(())
        }
        other => Err(NeomapError::ExpressionShape(format!(
            "assignment right side must be a literal, reference, or call; got {other:?}"
        ))),
    }
}

/// Resolve a Param-rooted access chain to exactly one flat name. Used for
/// assignment left sides and ORDER BY keys, where a complex terminal would
/// expand to several names and is therefore ambiguous.
pub fn resolve_name(expr: &Expr, meta: &EntityMetadata) -> Result<String, NeomapError> {
    resolve_single_name(expr, meta)
}

/// Resolve an assignment's left side to exactly one flat name. A complex
/// terminal would expand to several names and is ambiguous here.
fn resolve_single_name(left: &Expr, meta: &EntityMetadata) -> Result<String, NeomapError> {
    if let Expr::Raw(inner) = left {
        let path = param_chain(inner)?;
        return Ok(path.join(crate::metadata::NAME_SEPARATOR));
    }
    if !is_param_chain(left) {
        return Err(NeomapError::ExpressionShape(format!(
            "assignment left side must access a field of the entity parameter; got {left:?}"
        )));
    }
    let path = param_chain(left)?;
    match path.as_slice() {
        [field] => {
            let resolved = meta
                .field(field)
                .ok_or_else(|| NeomapError::missing_field(field, meta.type_name))?;
            if resolved.excluded {
                return Err(NeomapError::ExpressionShape(format!(
                    "assignment to complex field '{field}' is ambiguous; assign its leaves individually"
                )));
            }
            Ok(resolved.flat_name.clone())
        }
        [field, sub] => {
            let parent = meta
                .field(field)
                .ok_or_else(|| NeomapError::missing_field(field, meta.type_name))?;
            let leaf = meta
                .complex_leaves(&parent.path[0])
                .find(|l| l.field_name == sub)
                .ok_or_else(|| NeomapError::missing_field(sub, parent.source_type_name))?;
            Ok(leaf.flat_name.clone())
        }
        _ => Err(NeomapError::ExpressionShape(format!(
            "assignment left side is too deep: {}",
            path.join(".")
        ))),
    }
}

/// True when the access chain bottoms out at [`Expr::Param`].
fn is_param_chain(expr: &Expr) -> bool {
    match expr {
        Expr::Param => true,
        Expr::Field(base, _) => is_param_chain(base),
        _ => false,
    }
}

/// True when the access chain bottoms out at [`Expr::Var`].
fn is_var_chain(expr: &Expr) -> bool {
    match expr {
        Expr::Var(_) => true,
        Expr::Field(base, _) => is_var_chain(base),
        _ => false,
    }
}

/// Collect the field segments of a Param-rooted chain, outermost last.
fn param_chain(expr: &Expr) -> Result<Vec<String>, NeomapError> {
    match expr {
        Expr::Param => Ok(Vec::new()),
        Expr::Field(base, name) => {
            let mut path = param_chain(base)?;
            path.push(name.clone());
            Ok(path)
        }
        other => Err(NeomapError::ExpressionShape(format!(
            "expected a member access on the entity parameter; got {other:?}"
        ))),
    }
}

/// Render a Var-rooted chain as `var.field1.field2`. Any non-access node in
/// the chain makes the path ambiguous — a hard error.
fn render_var_chain(expr: &Expr) -> Result<String, NeomapError> {
    match expr {
        Expr::Var(name) => Ok(name.clone()),
        Expr::Field(base, name) => {
            let base = render_var_chain(base)?;
            Ok(format!("{base}.{name}"))
        }
        other => Err(NeomapError::ExpressionShape(format!(
            "ambiguous external-variable path: {other:?}"
        ))),
    }
}

/// Render a function placeholder textually: `name(arg, ...)`.
fn render_call(name: &str, args: &[Expr], meta: &EntityMetadata) -> Result<String, NeomapError> {
    let mut rendered = Vec::with_capacity(args.len());
    for arg in args {
        let text = match arg {
            Expr::Lit(value) => value.to_string(),
            Expr::Var(_) | Expr::Field(_, _) if is_var_chain(arg) => render_var_chain(arg)?,
            Expr::Field(_, _) if is_param_chain(arg) => {
                resolve_single_name(arg, meta)?
            }
            Expr::Call(inner_name, inner_args) => render_call(inner_name, inner_args, meta)?,
            other => {
                return Err(NeomapError::ExpressionShape(format!(
                    "unsupported call argument: {other:?}"
                )));
            }
        };
        rendered.push(text);
    }
    Ok(format!("{name}({})", rendered.join(", ")))
}

fn require_name(declared: &str, member: &Expr) -> Result<(), NeomapError> {
    if declared.is_empty() {
        return Err(NeomapError::ExpressionShape(format!(
            "projection member needs a declared name: {member:?}"
        )));
    }
    Ok(())
}
