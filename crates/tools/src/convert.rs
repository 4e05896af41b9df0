//! Conversions between JSON cells, rhai values and tables.

use rhai::{Array, Dynamic, Map};
use serde_json::Value;

use crate::table::{Record, Table, SCALAR_COLUMN};

pub(crate) fn json_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Dynamic::from(i)
            } else if let Some(f) = n.as_f64() {
                Dynamic::from(f)
            } else {
                Dynamic::UNIT
            }
        }
        Value::String(s) => Dynamic::from(s.clone()),
        Value::Array(arr) => {
            let rhai_arr: Array = arr.iter().map(json_to_dynamic).collect();
            Dynamic::from_array(rhai_arr)
        }
        Value::Object(obj) => {
            let mut map = Map::new();
            for (k, v) in obj {
                map.insert(k.as_str().into(), json_to_dynamic(v));
            }
            Dynamic::from_map(map)
        }
    }
}

pub(crate) fn dynamic_to_json(value: &Dynamic) -> Value {
    if value.is_unit() {
        Value::Null
    } else if let Ok(b) = value.as_bool() {
        Value::Bool(b)
    } else if let Ok(i) = value.as_int() {
        Value::Number(i.into())
    } else if let Ok(f) = value.as_float() {
        // NaN and infinities have no JSON form and count as missing.
        serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    } else if value.is_string() {
        Value::String(value.clone().into_string().unwrap_or_default())
    } else if value.is::<char>() {
        Value::String(value.clone().cast::<char>().to_string())
    } else if value.is_array() {
        let arr = value.clone().into_array().unwrap_or_default();
        Value::Array(arr.iter().map(dynamic_to_json).collect())
    } else if value.is_map() {
        match value.clone().try_cast::<Map>() {
            Some(map) => Value::Object(map_to_record(&map)),
            None => Value::String(value.to_string()),
        }
    } else if value.is::<Table>() {
        let table = value.clone().cast::<Table>();
        Value::Array(table.to_records().into_iter().map(Value::Object).collect())
    } else {
        Value::String(value.to_string())
    }
}

pub(crate) fn map_to_record(map: &Map) -> Record {
    map.iter()
        .map(|(k, v)| (k.to_string(), dynamic_to_json(v)))
        .collect()
}

/// Row of a table as a rhai object map.
pub(crate) fn row_to_map(columns: &[String], row: &[Value]) -> Map {
    columns
        .iter()
        .zip(row)
        .map(|(c, v)| (c.as_str().into(), json_to_dynamic(v)))
        .collect()
}

/// Build a table from a rhai array: an array of object maps becomes a
/// record table, anything else becomes a single series column.
pub(crate) fn table_from_array(items: Array) -> Table {
    if !items.is_empty() && items.iter().all(|item| item.is_map()) {
        let records: Vec<Record> = items
            .into_iter()
            .filter_map(|item| item.try_cast::<Map>())
            .map(|map| map_to_record(&map))
            .collect();
        return Table::from_records(&records);
    }

    Table::from_series(SCALAR_COLUMN, items.iter().map(dynamic_to_json).collect())
}

/// Coerce whatever a step produced into a table.
pub(crate) fn table_from_dynamic(value: Dynamic) -> Table {
    if value.is::<Table>() {
        value.cast::<Table>()
    } else if value.is_array() {
        table_from_array(value.into_array().unwrap_or_default())
    } else if value.is_map() {
        match value.try_cast::<Map>() {
            Some(map) => Table::from_records(&[map_to_record(&map)]),
            None => Table::default(),
        }
    } else {
        Table::from_scalar(dynamic_to_json(&value))
    }
}
