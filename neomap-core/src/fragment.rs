//! The query-fragment writer.
//!
//! Turns the projection engine's `(name, value-or-reference)` pairs into
//! textual Cypher fragments, either binding literals as `$p0`-style
//! parameters or inlining them as JSON text. Captured references are always
//! emitted bare — they are syntax, not values.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::projection::{PairValue, Pairs};

/// Whether literals become bound parameters or inline text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamMode {
    Parameterized,
    Inline,
}

/// Sort direction for ORDER BY fragments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// A rendered fragment plus the parameters it bound.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub params: BTreeMap<String, Value>,
}

/// Writes fragments for one aliased node (`alias.field = ...`).
///
/// The writer owns placeholder allocation: parameter names are `p0`, `p1`,
/// ... in emission order, unique across all fragments written by one
/// instance so a whole query can share a single parameter map.
pub struct FragmentWriter {
    alias: String,
    mode: ParamMode,
    counter: usize,
}

impl FragmentWriter {
    pub fn new(alias: impl Into<String>, mode: ParamMode) -> Self {
        FragmentWriter {
            alias: alias.into(),
            mode,
            counter: 0,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// `alias.name = value, alias.name = value, ...` — for SET clauses and
    /// inline property maps.
    pub fn set_fragment(&mut self, pairs: &Pairs) -> Fragment {
        self.joined(pairs, ", ")
    }

    /// `alias.name = value AND alias.name = value AND ...` — for WHERE
    /// clauses built from assignment-style predicates.
    pub fn where_fragment(&mut self, pairs: &Pairs) -> Fragment {
        self.joined(pairs, " AND ")
    }

    /// `name: value, name: value, ...` — an inline property map, for MERGE
    /// patterns. No alias prefix; keys are bare property names.
    pub fn map_fragment(&mut self, pairs: &Pairs) -> Fragment {
        let mut params = BTreeMap::new();
        let text = pairs
            .pairs
            .iter()
            .map(|pair| {
                let value = match &pair.value {
                    PairValue::Literal(value) => self.render_literal(value, &mut params),
                    PairValue::Reference(text) => text.clone(),
                };
                format!("{}: {}", pair.name, value)
            })
            .collect::<Vec<_>>()
            .join(", ");
        Fragment { text, params }
    }

    /// `alias.name AS name, ...` — for RETURN/WITH clauses. Literal pairs
    /// originate from entity fields, so their value is not re-emitted;
    /// references are emitted as-is.
    pub fn return_fragment(&self, pairs: &Pairs) -> Fragment {
        let text = pairs
            .pairs
            .iter()
            .map(|pair| match &pair.value {
                PairValue::Literal(_) => {
                    format!("{}.{} AS {}", self.alias, pair.name, pair.name)
                }
                PairValue::Reference(text) => format!("{} AS {}", text, pair.name),
            })
            .collect::<Vec<_>>()
            .join(", ");
        Fragment {
            text,
            params: BTreeMap::new(),
        }
    }

    /// `alias.name ASC, alias.name DESC, ...` — for ORDER BY clauses.
    pub fn order_fragment(&self, names: &[(String, Direction)]) -> Fragment {
        let text = names
            .iter()
            .map(|(name, dir)| {
                let dir = match dir {
                    Direction::Asc => "ASC",
                    Direction::Desc => "DESC",
                };
                format!("{}.{} {}", self.alias, name, dir)
            })
            .collect::<Vec<_>>()
            .join(", ");
        Fragment {
            text,
            params: BTreeMap::new(),
        }
    }

    fn joined(&mut self, pairs: &Pairs, separator: &str) -> Fragment {
        let mut params = BTreeMap::new();
        let text = pairs
            .pairs
            .iter()
            .map(|pair| {
                let value = match &pair.value {
                    PairValue::Literal(value) => self.render_literal(value, &mut params),
                    // Bare syntax: never quoted, never parameterized.
                    PairValue::Reference(text) => text.clone(),
                };
                format!("{}.{} = {}", self.alias, pair.name, value)
            })
            .collect::<Vec<_>>()
            .join(separator);
        Fragment { text, params }
    }

    fn render_literal(&mut self, value: &Value, params: &mut BTreeMap<String, Value>) -> String {
        match self.mode {
            ParamMode::Parameterized => {
                let placeholder = format!("p{}", self.counter);
                self.counter += 1;
                params.insert(placeholder.clone(), value.clone());
                format!("${placeholder}")
            }
            ParamMode::Inline => value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::Pair;
    use serde_json::json;

    fn pairs(items: Vec<Pair>) -> Pairs {
        Pairs {
            pairs: items,
            references: Vec::new(),
        }
    }

    #[test]
    fn parameterized_set() {
        let mut writer = FragmentWriter::new("u", ParamMode::Parameterized);
        let frag = writer.set_fragment(&pairs(vec![
            Pair {
                name: "name".into(),
                value: PairValue::Literal(json!("Ada")),
            },
            Pair {
                name: "age".into(),
                value: PairValue::Literal(json!(36)),
            },
        ]));
        assert_eq!(frag.text, "u.name = $p0, u.age = $p1");
        assert_eq!(frag.params.get("p0"), Some(&json!("Ada")));
        assert_eq!(frag.params.get("p1"), Some(&json!(36)));
    }

    #[test]
    fn inline_where() {
        let mut writer = FragmentWriter::new("u", ParamMode::Inline);
        let frag = writer.where_fragment(&pairs(vec![
            Pair {
                name: "name".into(),
                value: PairValue::Literal(json!("Ada")),
            },
            Pair {
                name: "age".into(),
                value: PairValue::Literal(json!(36)),
            },
        ]));
        assert_eq!(frag.text, "u.name = \"Ada\" AND u.age = 36");
        assert!(frag.params.is_empty());
    }

    #[test]
    fn references_stay_bare() {
        let mut writer = FragmentWriter::new("u", ParamMode::Parameterized);
        let frag = writer.where_fragment(&pairs(vec![Pair {
            name: "name".into(),
            value: PairValue::Reference("other.name".into()),
        }]));
        assert_eq!(frag.text, "u.name = other.name");
        assert!(frag.params.is_empty());
    }

    #[test]
    fn placeholder_allocation_spans_fragments() {
        let mut writer = FragmentWriter::new("u", ParamMode::Parameterized);
        let first = writer.set_fragment(&pairs(vec![Pair {
            name: "a".into(),
            value: PairValue::Literal(json!(1)),
        }]));
        let second = writer.where_fragment(&pairs(vec![Pair {
            name: "b".into(),
            value: PairValue::Literal(json!(2)),
        }]));
        assert_eq!(first.text, "u.a = $p0");
        assert_eq!(second.text, "u.b = $p1");
    }

    #[test]
    fn map_fragment_has_no_alias_prefix() {
        let mut writer = FragmentWriter::new("u", ParamMode::Parameterized);
        let frag = writer.map_fragment(&pairs(vec![
            Pair {
                name: "name".into(),
                value: PairValue::Literal(json!("Ada")),
            },
            Pair {
                name: "ref".into(),
                value: PairValue::Reference("other.id".into()),
            },
        ]));
        assert_eq!(frag.text, "name: $p0, ref: other.id");
        assert_eq!(frag.params.get("p0"), Some(&json!("Ada")));
    }

    #[test]
    fn return_fragment_aliases() {
        let writer = FragmentWriter::new("u", ParamMode::Parameterized);
        let frag = writer.return_fragment(&pairs(vec![
            Pair {
                name: "name".into(),
                value: PairValue::Literal(json!("Ada")),
            },
            Pair {
                name: "total".into(),
                value: PairValue::Reference("count(u.name)".into()),
            },
        ]));
        assert_eq!(frag.text, "u.name AS name, count(u.name) AS total");
    }

    #[test]
    fn order_fragment_directions() {
        let writer = FragmentWriter::new("u", ParamMode::Parameterized);
        let frag = writer.order_fragment(&[
            ("name".to_owned(), Direction::Asc),
            ("age".to_owned(), Direction::Desc),
        ]);
        assert_eq!(frag.text, "u.name ASC, u.age DESC");
    }
}
