//! The `DataFrame` script type and the `pd` table library.
//!
//! Step code manipulates tables through a small pandas-flavoured surface:
//!
//! ```text
//! let joined = pd::merge(df_gl_transactions, df_bank_statement, "ref_id", "outer");
//! joined = joined.fillna(0.0);
//! joined["diff"] = joined.with_column("diff", |r| r.amount_x - r.amount_y)["diff"];
//! joined.sort_by("diff", false)
//! ```

use indexmap::IndexMap;
use rhai::{
    Array, Dynamic, Engine, EvalAltResult, FnPtr, ImmutableString, Map, Module, NativeCallContext,
};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::convert::{
    dynamic_to_json, json_to_dynamic, map_to_record, row_to_map, table_from_array,
};
use crate::table::{Record, Table, MISSING_PLACEHOLDER};

type RhaiResult<T> = Result<T, Box<EvalAltResult>>;

/// Name under which the table library is exposed to step code.
pub const LIBRARY_ALIAS: &str = "pd";

/// Script-visible name of [`Table`].
pub const TYPE_NAME: &str = "DataFrame";

const PREVIEW_ROWS: usize = 10;

/// Row and wall-clock limits for tables built by native functions.
///
/// Script operations are metered by the engine, but a single native call
/// such as a many-to-many join never returns to it, so the table builders
/// check this budget as they go.
#[derive(Debug, Clone, Copy)]
pub struct TableBudget {
    max_rows: usize,
    started: Instant,
    timeout: Option<Duration>,
}

impl TableBudget {
    /// Budget whose clock starts now.
    pub fn new(max_rows: usize, timeout: Duration) -> Self {
        Self {
            max_rows,
            started: Instant::now(),
            timeout: Some(timeout),
        }
    }

    pub fn unlimited() -> Self {
        Self {
            max_rows: usize::MAX,
            started: Instant::now(),
            timeout: None,
        }
    }

    pub fn check_time(&self) -> Result<(), String> {
        match self.timeout {
            Some(timeout) if self.started.elapsed() > timeout => Err(format!(
                "step exceeded time limit of {} ms",
                timeout.as_millis()
            )),
            _ => Ok(()),
        }
    }

    pub fn check_rows(&self, rows: usize) -> Result<(), String> {
        if rows > self.max_rows {
            return Err(format!("table exceeded row limit of {}", self.max_rows));
        }
        self.check_time()
    }

    fn push(&self, table: &mut Table, row: Vec<Value>) -> Result<(), String> {
        self.check_rows(table.num_rows() + 1)?;
        table.push_row(row);
        Ok(())
    }
}

/// How two tables are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Outer,
}

impl JoinKind {
    pub fn parse(how: &str) -> Result<Self, String> {
        match how {
            "inner" => Ok(JoinKind::Inner),
            "left" => Ok(JoinKind::Left),
            "right" => Ok(JoinKind::Right),
            "outer" => Ok(JoinKind::Outer),
            other => Err(format!("Unsupported join type: {}", other)),
        }
    }
}

/// Column reduction used by `groupby_agg` and the column aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
    Count,
    Min,
    Max,
    First,
    Last,
}

impl Aggregation {
    pub fn parse(name: &str) -> Result<Self, String> {
        match name {
            "sum" => Ok(Aggregation::Sum),
            "mean" | "avg" => Ok(Aggregation::Mean),
            "count" => Ok(Aggregation::Count),
            "min" => Ok(Aggregation::Min),
            "max" => Ok(Aggregation::Max),
            "first" => Ok(Aggregation::First),
            "last" => Ok(Aggregation::Last),
            other => Err(format!("Unsupported aggregation: {}", other)),
        }
    }

    /// Reduce the cells of one column. Missing values are skipped.
    pub fn apply(&self, cells: &[&Value]) -> Value {
        let present = cells.iter().copied().filter(|v| !v.is_null());
        match self {
            Aggregation::Sum => {
                let numbers: Vec<&Value> = present.filter(|v| v.is_number()).collect();
                if numbers.iter().all(|v| v.is_i64()) {
                    Value::from(numbers.iter().filter_map(|v| v.as_i64()).sum::<i64>())
                } else {
                    float_value(numbers.iter().filter_map(|v| v.as_f64()).sum())
                }
            }
            Aggregation::Mean => {
                let numbers: Vec<f64> = present.filter_map(|v| v.as_f64()).collect();
                if numbers.is_empty() {
                    Value::Null
                } else {
                    float_value(numbers.iter().sum::<f64>() / numbers.len() as f64)
                }
            }
            Aggregation::Count => Value::from(present.count() as i64),
            Aggregation::Min => present.min_by(|a, b| compare_cells(a, b)).cloned().unwrap_or(Value::Null),
            Aggregation::Max => present.max_by(|a, b| compare_cells(a, b)).cloned().unwrap_or(Value::Null),
            Aggregation::First => present.take(1).last().cloned().unwrap_or(Value::Null),
            Aggregation::Last => present.last().cloned().unwrap_or(Value::Null),
        }
    }
}

fn float_value(f: f64) -> Value {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Total order over cells: missing values sort last, numbers compare by
/// value, mixed kinds compare by kind.
pub fn compare_cells(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Bool(_) => 0,
            Value::Number(_) => 1,
            Value::String(_) => 2,
            Value::Array(_) => 3,
            Value::Object(_) => 4,
            Value::Null => 5,
        }
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Hashable identity of a cell, so that `1` and `1.0` join together.
fn cell_key(value: &Value) -> String {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => MISSING_PLACEHOLDER.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn column_indices(table: &Table, names: &[String], side: &str) -> Result<Vec<usize>, String> {
    names
        .iter()
        .map(|n| {
            table
                .column_index(n)
                .ok_or_else(|| format!("Key '{}' not found in {} table", n, side))
        })
        .collect()
}

/// Join two tables on equal key columns.
///
/// Output columns are the keys, then the remaining left columns, then the
/// remaining right columns. Non-key names present on both sides get the
/// `_x` and `_y` suffixes.
pub fn merge(
    left: &Table,
    right: &Table,
    on: &[String],
    how: JoinKind,
    budget: &TableBudget,
) -> Result<Table, String> {
    if on.is_empty() {
        return Err("merge requires at least one key column".to_string());
    }
    let left_keys = column_indices(left, on, "left")?;
    let right_keys = column_indices(right, on, "right")?;
    let left_rest: Vec<usize> = (0..left.num_columns())
        .filter(|i| !left_keys.contains(i))
        .collect();
    let right_rest: Vec<usize> = (0..right.num_columns())
        .filter(|i| !right_keys.contains(i))
        .collect();

    let left_names: Vec<&String> = left_rest.iter().map(|&i| &left.columns()[i]).collect();
    let right_names: Vec<&String> = right_rest.iter().map(|&i| &right.columns()[i]).collect();

    let mut columns = on.to_vec();
    for name in &left_names {
        if right_names.contains(name) {
            columns.push(format!("{}_x", name));
        } else {
            columns.push((*name).clone());
        }
    }
    for name in &right_names {
        if left_names.contains(name) {
            columns.push(format!("{}_y", name));
        } else {
            columns.push((*name).clone());
        }
    }

    let key_of = |row: &[Value], keys: &[usize]| -> Vec<String> {
        keys.iter().map(|&i| cell_key(&row[i])).collect()
    };
    let key_values = |row: &[Value], keys: &[usize]| -> Vec<Value> {
        keys.iter().map(|&i| row[i].clone()).collect()
    };
    let joined = |keys: Vec<Value>, l: Option<&Vec<Value>>, r: Option<&Vec<Value>>| {
        let mut row = keys;
        row.extend(left_rest.iter().map(|&i| l.map_or(Value::Null, |l| l[i].clone())));
        row.extend(right_rest.iter().map(|&j| r.map_or(Value::Null, |r| r[j].clone())));
        row
    };

    let mut out = Table::new(columns);

    if how == JoinKind::Right {
        let mut left_index: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
        for (i, row) in left.rows().iter().enumerate() {
            left_index.entry(key_of(row, &left_keys)).or_default().push(i);
        }
        for rrow in right.rows() {
            match left_index.get(&key_of(rrow, &right_keys)) {
                Some(matches) => {
                    for &li in matches {
                        let lrow = &left.rows()[li];
                        budget.push(
                            &mut out,
                            joined(key_values(lrow, &left_keys), Some(lrow), Some(rrow)),
                        )?;
                    }
                }
                None => budget.push(&mut out, joined(key_values(rrow, &right_keys), None, Some(rrow)))?,
            }
        }
        return Ok(out);
    }

    let mut right_index: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
    for (j, row) in right.rows().iter().enumerate() {
        right_index.entry(key_of(row, &right_keys)).or_default().push(j);
    }
    let mut right_matched = vec![false; right.num_rows()];

    for lrow in left.rows() {
        match right_index.get(&key_of(lrow, &left_keys)) {
            Some(matches) => {
                for &rj in matches {
                    right_matched[rj] = true;
                    budget.push(
                        &mut out,
                        joined(key_values(lrow, &left_keys), Some(lrow), Some(&right.rows()[rj])),
                    )?;
                }
            }
            None if how != JoinKind::Inner => {
                budget.push(&mut out, joined(key_values(lrow, &left_keys), Some(lrow), None))?;
            }
            None => {}
        }
    }

    if how == JoinKind::Outer {
        for (rj, rrow) in right.rows().iter().enumerate() {
            if !right_matched[rj] {
                budget.push(&mut out, joined(key_values(rrow, &right_keys), None, Some(rrow)))?;
            }
        }
    }

    Ok(out)
}

/// Stack tables vertically. Columns are the union in first-appearance order.
pub fn concat(frames: &[Table], budget: &TableBudget) -> Result<Table, String> {
    budget.check_rows(frames.iter().map(Table::num_rows).sum())?;

    let mut columns: Vec<String> = Vec::new();
    for frame in frames {
        for column in frame.columns() {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
    }

    let mut out = Table::new(columns.clone());
    for frame in frames {
        budget.check_time()?;
        let positions: Vec<Option<usize>> = columns.iter().map(|c| frame.column_index(c)).collect();
        for row in frame.rows() {
            out.push_row(
                positions
                    .iter()
                    .map(|p| p.map_or(Value::Null, |i| row[i].clone()))
                    .collect(),
            );
        }
    }
    Ok(out)
}

/// Group rows by key columns and reduce the named columns.
///
/// Groups are ordered by key, like a sorted group-by.
pub fn groupby_agg(
    table: &Table,
    keys: &[String],
    aggs: &[(String, Aggregation)],
    budget: &TableBudget,
) -> Result<Table, String> {
    let key_idx = column_indices(table, keys, "grouped")?;
    let agg_idx: Vec<(usize, Aggregation)> = aggs
        .iter()
        .map(|(column, agg)| {
            table
                .column_index(column)
                .map(|i| (i, *agg))
                .ok_or_else(|| format!("Column not found: {}", column))
        })
        .collect::<Result<_, _>>()?;

    let mut groups: IndexMap<Vec<String>, (Vec<Value>, Vec<usize>)> = IndexMap::new();
    for (ri, row) in table.rows().iter().enumerate() {
        budget.check_time()?;
        let identity = key_idx.iter().map(|&i| cell_key(&row[i])).collect();
        groups
            .entry(identity)
            .or_insert_with(|| (key_idx.iter().map(|&i| row[i].clone()).collect(), Vec::new()))
            .1
            .push(ri);
    }

    let mut entries: Vec<(Vec<Value>, Vec<usize>)> = groups.into_values().collect();
    entries.sort_by(|(a, _), (b, _)| {
        a.iter()
            .zip(b)
            .map(|(x, y)| compare_cells(x, y))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });

    let mut columns = keys.to_vec();
    columns.extend(aggs.iter().map(|(column, _)| column.clone()));

    let mut out = Table::new(columns);
    for (key_values, members) in entries {
        let mut row = key_values;
        for (col, agg) in &agg_idx {
            let cells: Vec<&Value> = members.iter().map(|&ri| &table.rows()[ri][*col]).collect();
            row.push(agg.apply(&cells));
        }
        budget.push(&mut out, row)?;
    }
    Ok(out)
}

/// Plain-text preview of a table, used by `print(df)`.
pub fn render(table: &Table) -> String {
    let mut out = table.columns().join("\t");
    for row in table.rows().iter().take(PREVIEW_ROWS) {
        out.push('\n');
        out.push_str(&row.iter().map(cell_text).collect::<Vec<_>>().join("\t"));
    }
    if table.num_rows() > PREVIEW_ROWS {
        out.push_str(&format!("\n... [{} rows x {} columns]", table.num_rows(), table.num_columns()));
    }
    out
}

fn string_list(items: &Array) -> RhaiResult<Vec<String>> {
    items
        .iter()
        .map(|item| {
            item.clone().into_string().map_err(|t| -> Box<EvalAltResult> {
                format!("Expected a column name, got {}", t).into()
            })
        })
        .collect()
}

fn column_values(table: &Table, name: &str) -> RhaiResult<Vec<Value>> {
    table
        .column(name)
        .map(|cells| cells.into_iter().cloned().collect())
        .ok_or_else(|| format!("Column not found: {}", name).into())
}

fn aggregate(table: &Table, column: &str, agg: Aggregation) -> RhaiResult<Dynamic> {
    let cells = column_values(table, column)?;
    let refs: Vec<&Value> = cells.iter().collect();
    Ok(json_to_dynamic(&agg.apply(&refs)))
}

fn assign_column(table: &mut Table, name: &str, value: Dynamic) -> RhaiResult<()> {
    let values = if value.is_array() {
        value
            .into_array()
            .unwrap_or_default()
            .iter()
            .map(dynamic_to_json)
            .collect()
    } else {
        vec![dynamic_to_json(&value); table.num_rows()]
    };
    table.set_column(name, values).map_err(Into::into)
}

fn aggregations(spec: &Map) -> RhaiResult<Vec<(String, Aggregation)>> {
    spec.iter()
        .map(|(column, func)| {
            let func = func
                .clone()
                .into_string()
                .map_err(|t| format!("Aggregation for '{}' must be a string, got {}", column, t))?;
            Ok((column.to_string(), Aggregation::parse(&func)?))
        })
        .collect::<Result<_, String>>()
        .map_err(Into::into)
}

/// Table from a constructor argument: an array of records or scalars, a map
/// of column arrays, or a single record.
fn frame_from_dynamic(value: Dynamic, budget: &TableBudget) -> RhaiResult<Table> {
    let table = build_frame(value)?;
    budget.check_rows(table.num_rows())?;
    Ok(table)
}

fn build_frame(value: Dynamic) -> RhaiResult<Table> {
    if value.is::<Table>() {
        return Ok(value.cast::<Table>());
    }
    if value.is_array() {
        return Ok(table_from_array(value.into_array().unwrap_or_default()));
    }
    if let Some(map) = value.try_cast::<Map>() {
        if !map.is_empty() && map.values().all(|v| v.is_array()) {
            let mut table = Table::default();
            for (column, values) in map {
                let cells = values
                    .into_array()
                    .unwrap_or_default()
                    .iter()
                    .map(dynamic_to_json)
                    .collect();
                table.set_column(column.as_str(), cells)?;
            }
            return Ok(table);
        }
        let record: Record = map_to_record(&map);
        return Ok(Table::from_records(&[record]));
    }
    Err("DataFrame() expects an array of records or a map of columns".into())
}

fn frames_from_array(items: Array) -> RhaiResult<Vec<Table>> {
    items
        .into_iter()
        .map(|item| {
            let type_name = item.type_name();
            item.try_cast::<Table>().ok_or_else(|| -> Box<EvalAltResult> {
                format!("concat expects DataFrames, got {}", type_name).into()
            })
        })
        .collect()
}

fn to_numeric(value: Dynamic) -> Dynamic {
    if value.is_int() || value.is_float() {
        return value;
    }
    if let Ok(s) = value.into_string() {
        let s = s.trim();
        if let Ok(i) = s.parse::<i64>() {
            return Dynamic::from(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Dynamic::from(f);
        }
    }
    Dynamic::UNIT
}

fn is_missing(value: &Dynamic) -> bool {
    value.is_unit() || value.as_float().map(f64::is_nan).unwrap_or(false)
}

/// The `pd` module: constructors and table-level functions.
pub fn library_module(budget: TableBudget) -> Module {
    let mut module = Module::new();

    module.set_native_fn("DataFrame", || -> RhaiResult<Table> { Ok(Table::default()) });
    module.set_native_fn("DataFrame", move |value: Dynamic| -> RhaiResult<Table> {
        frame_from_dynamic(value, &budget)
    });

    module.set_native_fn(
        "merge",
        move |left: Table, right: Table, on: ImmutableString| -> RhaiResult<Table> {
            Ok(merge(&left, &right, &[on.to_string()], JoinKind::Inner, &budget)?)
        },
    );
    module.set_native_fn(
        "merge",
        move |left: Table, right: Table, on: ImmutableString, how: ImmutableString| -> RhaiResult<Table> {
            let how = JoinKind::parse(&how)?;
            Ok(merge(&left, &right, &[on.to_string()], how, &budget)?)
        },
    );
    module.set_native_fn(
        "merge",
        move |left: Table, right: Table, on: Array| -> RhaiResult<Table> {
            Ok(merge(&left, &right, &string_list(&on)?, JoinKind::Inner, &budget)?)
        },
    );
    module.set_native_fn(
        "merge",
        move |left: Table, right: Table, on: Array, how: ImmutableString| -> RhaiResult<Table> {
            let how = JoinKind::parse(&how)?;
            Ok(merge(&left, &right, &string_list(&on)?, how, &budget)?)
        },
    );

    module.set_native_fn("concat", move |frames: Array| -> RhaiResult<Table> {
        Ok(concat(&frames_from_array(frames)?, &budget)?)
    });
    module.set_native_fn("isna", |value: Dynamic| -> RhaiResult<bool> {
        Ok(is_missing(&value))
    });
    module.set_native_fn("notna", |value: Dynamic| -> RhaiResult<bool> {
        Ok(!is_missing(&value))
    });
    module.set_native_fn("to_numeric", |value: Dynamic| -> RhaiResult<Dynamic> {
        Ok(to_numeric(value))
    });

    module
}

/// Register the `DataFrame` type, its methods and the `pd` module.
pub fn register_dataframe(engine: &mut Engine, budget: TableBudget) {
    engine.register_type_with_name::<Table>(TYPE_NAME);

    engine.register_fn("to_string", |t: &mut Table| render(t));
    engine.register_fn("to_debug", |t: &mut Table| render(t));
    engine.register_fn("copy", |t: &mut Table| t.clone());
    engine.register_fn("len", |t: &mut Table| t.num_rows() as i64);
    engine.register_fn("is_empty", |t: &mut Table| t.is_empty());
    engine.register_get("columns", |t: &mut Table| -> Array {
        t.columns().iter().map(|c| Dynamic::from(c.clone())).collect()
    });
    engine.register_fn("head", |t: &mut Table, n: i64| t.head(n.max(0) as usize));
    engine.register_fn("records", |t: &mut Table| -> Array {
        t.rows()
            .iter()
            .map(|row| Dynamic::from_map(row_to_map(t.columns(), row)))
            .collect()
    });

    engine.register_indexer_get(|t: &mut Table, name: ImmutableString| -> RhaiResult<Array> {
        Ok(column_values(t, &name)?.iter().map(json_to_dynamic).collect())
    });
    engine.register_indexer_set(
        |t: &mut Table, name: ImmutableString, value: Dynamic| -> RhaiResult<()> {
            assign_column(t, &name, value)
        },
    );

    engine.register_fn("select", |t: &mut Table, names: Array| -> RhaiResult<Table> {
        t.select(&string_list(&names)?).map_err(Into::into)
    });
    engine.register_fn("drop", |t: &mut Table, names: Array| -> RhaiResult<Table> {
        let names = string_list(&names)?;
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut out = t.clone();
        out.drop_columns(&refs);
        Ok(out)
    });
    engine.register_fn("drop", |t: &mut Table, name: &str| {
        let mut out = t.clone();
        out.drop_columns(&[name]);
        out
    });
    engine.register_fn("rename", |t: &mut Table, mapping: Map| -> RhaiResult<Table> {
        let mut out = t.clone();
        for (from, to) in mapping {
            let to = to
                .into_string()
                .map_err(|t| format!("New column name must be a string, got {}", t))?;
            out.rename_column(from.as_str(), &to);
        }
        Ok(out)
    });

    engine.register_fn(
        "filter",
        move |ctx: NativeCallContext, t: &mut Table, predicate: FnPtr| -> RhaiResult<Table> {
            let mut out = Table::new(t.columns().to_vec());
            for row in t.rows() {
                budget.check_time()?;
                let keep: bool =
                    predicate.call_within_context(&ctx, (row_to_map(t.columns(), row),))?;
                if keep {
                    out.push_row(row.clone());
                }
            }
            Ok(out)
        },
    );
    engine.register_fn(
        "with_column",
        move |ctx: NativeCallContext, t: &mut Table, name: &str, f: FnPtr| -> RhaiResult<Table> {
            budget.check_rows(t.num_rows())?;
            let mut values = Vec::with_capacity(t.num_rows());
            for row in t.rows() {
                budget.check_time()?;
                let value: Dynamic = f.call_within_context(&ctx, (row_to_map(t.columns(), row),))?;
                values.push(dynamic_to_json(&value));
            }
            let mut out = t.clone();
            out.set_column(name, values)?;
            Ok(out)
        },
    );

    engine.register_fn("sort_by", |t: &mut Table, column: &str| -> RhaiResult<Table> {
        sort_by(t, column, true)
    });
    engine.register_fn(
        "sort_by",
        |t: &mut Table, column: &str, ascending: bool| -> RhaiResult<Table> {
            sort_by(t, column, ascending)
        },
    );

    engine.register_fn("fillna", |t: &mut Table, value: Dynamic| {
        let mut out = t.clone();
        out.fill_missing(&dynamic_to_json(&value));
        out
    });
    engine.register_fn("dropna", |t: &mut Table| {
        let mut out = t.clone();
        out.retain_rows(|row| row.iter().all(|v| !v.is_null()));
        out
    });

    engine.register_fn("sum", |t: &mut Table, column: &str| aggregate(t, column, Aggregation::Sum));
    engine.register_fn("mean", |t: &mut Table, column: &str| aggregate(t, column, Aggregation::Mean));
    engine.register_fn("count", |t: &mut Table, column: &str| aggregate(t, column, Aggregation::Count));

    engine.register_fn(
        "groupby_agg",
        move |t: &mut Table, key: &str, spec: Map| -> RhaiResult<Table> {
            groupby_agg(t, &[key.to_string()], &aggregations(&spec)?, &budget).map_err(Into::into)
        },
    );
    engine.register_fn(
        "groupby_agg",
        move |t: &mut Table, keys: Array, spec: Map| -> RhaiResult<Table> {
            groupby_agg(t, &string_list(&keys)?, &aggregations(&spec)?, &budget).map_err(Into::into)
        },
    );

    engine.register_static_module(LIBRARY_ALIAS, library_module(budget).into());
}

fn sort_by(table: &Table, column: &str, ascending: bool) -> RhaiResult<Table> {
    let idx = table
        .column_index(column)
        .ok_or_else(|| format!("Column not found: {}", column))?;
    let mut out = table.clone();
    out.sort_rows(|a, b| match (a[idx].is_null(), b[idx].is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let order = compare_cells(&a[idx], &b[idx]);
            if ascending {
                order
            } else {
                order.reverse()
            }
        }
    });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(value: Value) -> Table {
        let records: Vec<Record> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().unwrap().clone())
            .collect();
        Table::from_records(&records)
    }

    fn engine() -> Engine {
        let mut engine = Engine::new();
        register_dataframe(&mut engine, TableBudget::unlimited());
        engine
    }

    #[test]
    fn test_merge_outer_with_suffixes() {
        let left = table(json!([
            {"ref": "A", "amount": 10.0},
            {"ref": "B", "amount": 20.0}
        ]));
        let right = table(json!([
            {"ref": "B", "amount": 20.0},
            {"ref": "C", "amount": 5.0}
        ]));

        let joined = merge(&left, &right, &["ref".to_string()], JoinKind::Outer, &TableBudget::unlimited()).unwrap();
        assert_eq!(joined.columns(), &["ref", "amount_x", "amount_y"]);
        assert_eq!(joined.num_rows(), 3);
        assert_eq!(joined.rows()[0], vec![json!("A"), json!(10.0), Value::Null]);
        assert_eq!(joined.rows()[2], vec![json!("C"), Value::Null, json!(5.0)]);
    }

    #[test]
    fn test_merge_inner_and_right() {
        let left = table(json!([{"k": 1, "a": "x"}, {"k": 2, "a": "y"}]));
        let right = table(json!([{"k": 2.0, "b": true}, {"k": 3, "b": false}]));

        let inner = merge(&left, &right, &["k".to_string()], JoinKind::Inner, &TableBudget::unlimited()).unwrap();
        assert_eq!(inner.num_rows(), 1);
        assert_eq!(inner.rows()[0], vec![json!(2), json!("y"), json!(true)]);

        let right_join = merge(&left, &right, &["k".to_string()], JoinKind::Right, &TableBudget::unlimited()).unwrap();
        assert_eq!(right_join.num_rows(), 2);
        assert_eq!(right_join.rows()[1], vec![json!(3), Value::Null, json!(false)]);
    }

    #[test]
    fn test_merge_missing_key() {
        let left = table(json!([{"k": 1}]));
        let right = table(json!([{"j": 1}]));
        assert!(merge(&left, &right, &["k".to_string()], JoinKind::Inner, &TableBudget::unlimited()).is_err());
    }

    #[test]
    fn test_budget_caps_built_tables() {
        let budget = TableBudget::new(3, Duration::from_secs(30));
        let left = table(json!([{"k": 1, "a": 1}, {"k": 1, "a": 2}]));
        let right = table(json!([{"k": 1, "b": 1}, {"k": 1, "b": 2}]));

        let err = merge(&left, &right, &["k".to_string()], JoinKind::Inner, &budget).unwrap_err();
        assert_eq!(err, "table exceeded row limit of 3");
        assert!(concat(&[left.clone(), right.clone()], &budget).is_err());
        assert_eq!(concat(&[left], &budget).unwrap().num_rows(), 2);

        let mut engine = Engine::new();
        register_dataframe(&mut engine, budget);
        assert!(engine
            .eval::<Table>("pd::DataFrame([1, 2, 3, 4])")
            .is_err());
        assert!(engine.eval::<Table>("pd::DataFrame([1, 2, 3])").is_ok());
    }

    #[test]
    fn test_concat_unions_columns() {
        let a = table(json!([{"x": 1}]));
        let b = table(json!([{"y": 2}]));
        let out = concat(&[a, b], &TableBudget::unlimited()).unwrap();
        assert_eq!(out.columns(), &["x", "y"]);
        assert_eq!(out.rows()[1], vec![Value::Null, json!(2)]);
    }

    #[test]
    fn test_groupby_agg_sorted_groups() {
        let t = table(json!([
            {"cat": "b", "amt": 1},
            {"cat": "a", "amt": 2.5},
            {"cat": "b", "amt": 3},
            {"cat": "a", "amt": null}
        ]));
        let out = groupby_agg(
            &t,
            &["cat".to_string()],
            &[("amt".to_string(), Aggregation::Sum)],
            &TableBudget::unlimited(),
        )
        .unwrap();

        assert_eq!(out.columns(), &["cat", "amt"]);
        assert_eq!(out.rows()[0], vec![json!("a"), json!(2.5)]);
        assert_eq!(out.rows()[1], vec![json!("b"), json!(4)]);
    }

    #[test]
    fn test_script_methods() {
        let engine = engine();
        let mut scope = rhai::Scope::new();
        scope.push(
            "df",
            table(json!([
                {"name": "a", "v": 3},
                {"name": "b", "v": 1},
                {"name": "c", "v": 2}
            ])),
        );

        let out: Table = engine
            .eval_with_scope(
                &mut scope,
                r#"
                    let big = df.filter(|r| r.v > 1);
                    big = big.with_column("double", |r| r.v * 2);
                    big.sort_by("v")
                "#,
            )
            .unwrap();

        assert_eq!(out.columns(), &["name", "v", "double"]);
        assert_eq!(out.rows()[0], vec![json!("c"), json!(2), json!(4)]);
        assert_eq!(out.num_rows(), 2);
    }

    #[test]
    fn test_script_indexers_and_library() {
        let engine = engine();
        let out: Table = engine
            .eval(
                r#"
                    let df = pd::DataFrame([#{ id: 1, amount: 10 }, #{ id: 2, amount: 5 }]);
                    df["flag"] = true;
                    df["amount"] = df["amount"].map(|x| x * 10);
                    let other = pd::DataFrame(#{ id: [2, 3], note: ["x", "y"] });
                    pd::merge(df, other, "id", "left")
                "#,
            )
            .unwrap();

        assert_eq!(out.columns(), &["id", "amount", "flag", "note"]);
        assert_eq!(out.rows()[0], vec![json!(1), json!(100), json!(true), Value::Null]);
        assert_eq!(out.rows()[1], vec![json!(2), json!(50), json!(true), json!("x")]);
    }

    #[test]
    fn test_script_aggregates() {
        let engine = engine();
        let total: f64 = engine
            .eval(r#"pd::DataFrame([#{ a: 1.5 }, #{ a: 2.5 }]).sum("a")"#)
            .unwrap();
        assert_eq!(total, 4.0);

        let missing: bool = engine.eval("pd::isna(())").unwrap();
        assert!(missing);

        let parsed: i64 = engine.eval(r#"pd::to_numeric(" 42 ")"#).unwrap();
        assert_eq!(parsed, 42);
    }

    #[test]
    fn test_unknown_column_is_error() {
        let engine = engine();
        let result = engine.eval::<Array>(r#"pd::DataFrame([#{ a: 1 }])["b"]"#);
        assert!(result.is_err());
    }
}
