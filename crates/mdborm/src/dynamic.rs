//! MariaDB dynamic columns.
//!
//! A dynamic column is a schema-less key/value blob stored in a `dyn_`
//! prefixed column and manipulated with `COLUMN_CREATE`, `COLUMN_GET` and
//! `COLUMN_JSON`.

use crate::error::{OrmError, OrmResult};
use crate::ident::quote_dynamic_field;
use crate::param::Params;
use crate::value::{ToValue, Value};

/// Cast used by `select_dynamic_char`.
pub const DEFAULT_DYNAMIC_TYPE: &str = "CHAR(255)";

/// Whether an entry is left out of a `COLUMN_CREATE` list.
///
/// Falsy values are omitted (null, `false`, `0`, `0.0`, empty text, empty
/// bytes or list) except the text `"0"`, which is kept as data.
pub fn is_omitted(value: &Value) -> bool {
    match value {
        Value::Text(s) if s == "0" => false,
        Value::Wrapped { value, .. } => is_omitted(value),
        other => other.is_falsy(),
    }
}

/// Build a `COLUMN_CREATE(?, ?, ...)` expression, binding key then value for
/// every surviving entry.
///
/// Returns the empty string literal `''` when nothing survives: dynamic blob
/// columns are not nullable.
pub fn column_create<I, K, V>(params: &mut Params, pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: ToValue,
{
    let mut parts = Vec::new();
    for (key, value) in pairs {
        let value = value.to_param();
        if is_omitted(&value) {
            continue;
        }
        let key_placeholder = params.bind(Value::Text(key.as_ref().to_string()));
        let value_placeholder = params.bind(value);
        parts.push(format!("{key_placeholder}, {value_placeholder}"));
    }

    if parts.is_empty() {
        "''".to_string()
    } else {
        format!("COLUMN_CREATE({})", parts.join(", "))
    }
}

/// `COLUMN_GET(`dyn_field`, <key> AS <data_type>)`
pub fn column_get(field: &str, key_placeholder: &str, data_type: &str) -> String {
    format!(
        "COLUMN_GET({}, {} AS {})",
        quote_dynamic_field(field),
        key_placeholder,
        data_type
    )
}

/// `COLUMN_JSON(`dyn_field`)`
pub fn column_json(field: &str) -> String {
    format!("COLUMN_JSON({})", quote_dynamic_field(field))
}

/// Decode the text produced by `COLUMN_JSON`.
///
/// `""` and `"{}"` mean no data and decode to `Null`; anything else must be a
/// JSON object.
pub fn decode_json(value: Value) -> OrmResult<Value> {
    let text = match &value {
        Value::Text(s) => s.as_str(),
        Value::Bytes(b) => std::str::from_utf8(b)
            .map_err(|e| OrmError::decode("", e.to_string()))?,
        Value::Json(serde_json::Value::Object(map)) if map.is_empty() => return Ok(Value::Null),
        Value::Json(serde_json::Value::Object(_)) => return Ok(value),
        other => {
            return Err(OrmError::decode(
                "",
                format!("expected text, got {}", other.type_name()),
            ));
        }
    };

    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "{}" {
        return Ok(Value::Null);
    }
    match serde_json::from_str::<serde_json::Value>(trimmed)? {
        json @ serde_json::Value::Object(_) => Ok(Value::Json(json)),
        _ => Err(OrmError::decode("", "expected a JSON object")),
    }
}
