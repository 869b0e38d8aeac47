//! Conversion between `neo4rs::BoltType` and `serde_json::Value`.
//!
//! The flattening codec and the projection engine work on JSON trees; this
//! module is the single place where Bolt values cross that boundary, in
//! both directions (reading node properties, binding query parameters).

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

use crate::error::NeomapError;
use crate::flatten::FlatRecord;

/// Returns a human-readable name for a [`neo4rs::BoltType`] variant.
///
/// Used in error messages to describe the actual type received when a
/// conversion fails.
pub fn type_name(v: &neo4rs::BoltType) -> &'static str {
    match v {
        neo4rs::BoltType::Null(_) => "Null",
        neo4rs::BoltType::Boolean(_) => "Boolean",
        neo4rs::BoltType::Integer(_) => "Integer",
        neo4rs::BoltType::Float(_) => "Float",
        neo4rs::BoltType::String(_) => "String",
        neo4rs::BoltType::Bytes(_) => "Bytes",
        neo4rs::BoltType::List(_) => "List",
        neo4rs::BoltType::Map(_) => "Map",
        neo4rs::BoltType::Node(_) => "Node",
        neo4rs::BoltType::Relation(_) => "Relationship",
        neo4rs::BoltType::UnboundedRelation(_) => "UnboundedRelationship",
        neo4rs::BoltType::Path(_) => "Path",
        neo4rs::BoltType::Point2D(_) => "Point2D",
        neo4rs::BoltType::Point3D(_) => "Point3D",
        neo4rs::BoltType::Duration(_) => "Duration",
        neo4rs::BoltType::Date(_) => "Date",
        neo4rs::BoltType::Time(_) => "Time",
        neo4rs::BoltType::LocalTime(_) => "LocalTime",
        neo4rs::BoltType::LocalDateTime(_) => "LocalDateTime",
        neo4rs::BoltType::DateTime(_) => "DateTime",
        neo4rs::BoltType::DateTimeZoneId(_) => "DateTimeZoneId",
    }
}

/// Convert a Bolt value into a JSON value.
///
/// Temporal types render as ISO 8601 / RFC 3339 strings, bytes as lowercase
/// hex, points as objects, durations as fractional seconds. Nodes convert
/// to their property map; relationships and paths are not property values
/// and fail with a type mismatch.
pub fn bolt_to_json(value: neo4rs::BoltType) -> Result<Value, NeomapError> {
    match value {
        neo4rs::BoltType::Null(_) => Ok(Value::Null),
        neo4rs::BoltType::Boolean(b) => Ok(Value::Bool(b.value)),
        neo4rs::BoltType::Integer(i) => Ok(Value::Number(Number::from(i.value))),
        neo4rs::BoltType::Float(f) => Number::from_f64(f.value)
            .map(Value::Number)
            .ok_or_else(|| NeomapError::Mapping("non-finite float has no JSON form".to_owned())),
        neo4rs::BoltType::String(s) => Ok(Value::String(s.value)),
        neo4rs::BoltType::Bytes(b) => {
            let hex: String = b.value.iter().map(|byte| format!("{byte:02x}")).collect();
            Ok(Value::String(hex))
        }
        neo4rs::BoltType::List(xs) => {
            let items: Result<Vec<Value>, NeomapError> =
                xs.value.into_iter().map(bolt_to_json).collect();
            Ok(Value::Array(items?))
        }
        neo4rs::BoltType::Map(m) => {
            let mut obj = Map::new();
            for (k, v) in m.value {
                obj.insert(k.to_string(), bolt_to_json(v)?);
            }
            Ok(Value::Object(obj))
        }
        neo4rs::BoltType::Node(n) => {
            let mut obj = Map::new();
            for (k, v) in n.properties.value {
                obj.insert(k.to_string(), bolt_to_json(v)?);
            }
            Ok(Value::Object(obj))
        }
        neo4rs::BoltType::Point2D(p) => Ok(serde_json::json!({
            "sr_id": p.sr_id.value,
            "x": p.x.value,
            "y": p.y.value,
        })),
        neo4rs::BoltType::Point3D(p) => Ok(serde_json::json!({
            "sr_id": p.sr_id.value,
            "x": p.x.value,
            "y": p.y.value,
            "z": p.z.value,
        })),
        neo4rs::BoltType::Duration(d) => {
            let d: std::time::Duration = d.into();
            Number::from_f64(d.as_secs_f64())
                .map(Value::Number)
                .ok_or_else(|| NeomapError::Mapping("non-finite duration".to_owned()))
        }
        neo4rs::BoltType::Date(d) => {
            let date: chrono::NaiveDate = d.try_into().map_err(|e: neo4rs::Error| {
                NeomapError::Mapping(format!("BoltDate -> NaiveDate: {e}"))
            })?;
            Ok(Value::String(date.to_string()))
        }
        neo4rs::BoltType::LocalTime(t) => {
            let time: chrono::NaiveTime = t.into();
            Ok(Value::String(time.to_string()))
        }
        neo4rs::BoltType::Time(t) => {
            let (time, offset): (chrono::NaiveTime, chrono::FixedOffset) = t.into();
            Ok(Value::String(format!("{time}{offset}")))
        }
        neo4rs::BoltType::LocalDateTime(dt) => {
            let ndt: chrono::NaiveDateTime = dt.try_into().map_err(|e: neo4rs::Error| {
                NeomapError::Mapping(format!("BoltLocalDateTime -> NaiveDateTime: {e}"))
            })?;
            Ok(Value::String(ndt.to_string()))
        }
        neo4rs::BoltType::DateTime(dt) => {
            let cdt: chrono::DateTime<chrono::FixedOffset> =
                dt.try_into().map_err(|e: neo4rs::Error| {
                    NeomapError::Mapping(format!("BoltDateTime -> DateTime: {e}"))
                })?;
            Ok(Value::String(cdt.to_rfc3339()))
        }
        neo4rs::BoltType::DateTimeZoneId(dt) => {
            let cdt: chrono::DateTime<chrono::FixedOffset> =
                (&dt).try_into().map_err(|e: neo4rs::Error| {
                    NeomapError::Mapping(format!("BoltDateTimeZoneId -> DateTime: {e}"))
                })?;
            Ok(Value::String(cdt.to_rfc3339()))
        }
        other => Err(NeomapError::type_mismatch(
            "a property value",
            type_name(&other),
            "bolt_to_json",
        )),
    }
}

/// Convert a JSON value into a Bolt value for use as a query parameter.
pub fn json_to_bolt(value: &Value) -> neo4rs::BoltType {
    match value {
        Value::Null => neo4rs::BoltType::Null(neo4rs::BoltNull),
        Value::Bool(b) => neo4rs::BoltType::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                neo4rs::BoltType::from(i)
            } else {
                neo4rs::BoltType::from(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => neo4rs::BoltType::from(s.as_str()),
        Value::Array(items) => neo4rs::BoltType::List(neo4rs::BoltList {
            value: items.iter().map(json_to_bolt).collect(),
        }),
        Value::Object(obj) => {
            let mut map = neo4rs::BoltMap::new();
            for (k, v) in obj {
                map.put(neo4rs::BoltString::from(k.as_str()), json_to_bolt(v));
            }
            neo4rs::BoltType::Map(map)
        }
    }
}

/// Read a node's property map into a [`FlatRecord`], extracting the null
/// sentinel back into the side list.
pub fn node_to_flat(node: &neo4rs::BoltNode) -> Result<FlatRecord, NeomapError> {
    let mut wire = BTreeMap::new();
    for (k, v) in &node.properties.value {
        wire.insert(k.to_string(), bolt_to_json(v.clone())?);
    }
    FlatRecord::from_wire(wire)
}
