//! Sandboxed step execution.
//!
//! A step is a rhai script. Every dataset of the context is bound as a
//! variable, the table library is available as `pd`, and the script's
//! value (or the `df_result` variable) becomes the step's output table.

use rhai::module_resolvers::DummyModuleResolver;
use rhai::{Dynamic, Engine, Position, Scope};
use std::time::{Duration, Instant};

use crate::context::DatasetContext;
use crate::convert::table_from_dynamic;
use crate::error::StepError;
use crate::frame::{register_dataframe, TableBudget};
use crate::table::Table;

/// Variable consulted when a script's final value is empty.
pub const RESULT_VARIABLE: &str = "df_result";

/// Resource limits enforced on every script.
#[derive(Debug, Clone)]
pub struct ExecutorLimits {
    pub max_operations: u64,
    pub timeout: Duration,
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
    pub max_function_expr_depth: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
    /// Largest table a native table function may build.
    pub max_table_rows: usize,
}

impl Default for ExecutorLimits {
    fn default() -> Self {
        Self {
            max_operations: 50_000_000,
            timeout: Duration::from_secs(30),
            max_call_levels: 64,
            max_expr_depth: 128,
            max_function_expr_depth: 64,
            max_string_size: 10 * 1024 * 1024,
            max_array_size: 1_000_000,
            max_map_size: 10_000,
            max_table_rows: 1_000_000,
        }
    }
}

/// Output of a successful step.
#[derive(Debug, Clone)]
pub struct StepOutput {
    /// Normalized result table.
    pub table: Table,
    pub duration_ms: u64,
}

/// Runs step code against a dataset context.
#[derive(Debug, Clone, Default)]
pub struct StepExecutor {
    limits: ExecutorLimits,
}

impl StepExecutor {
    pub fn new(limits: ExecutorLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ExecutorLimits {
        &self.limits
    }

    /// Create a sandboxed engine. Module imports and `eval` are unavailable
    /// and the wall-clock budget starts now. The same budget bounds the
    /// native table functions.
    fn create_engine(&self) -> Engine {
        let mut engine = Engine::new();
        let limits = &self.limits;

        engine.set_module_resolver(DummyModuleResolver::new());
        engine.disable_symbol("eval");

        engine.set_max_operations(limits.max_operations);
        engine.set_max_call_levels(limits.max_call_levels);
        engine.set_max_expr_depths(limits.max_expr_depth, limits.max_function_expr_depth);
        engine.set_max_string_size(limits.max_string_size);
        engine.set_max_array_size(limits.max_array_size);
        engine.set_max_map_size(limits.max_map_size);

        let budget = TableBudget::new(limits.max_table_rows, limits.timeout);
        engine.on_progress(move |_| budget.check_time().err().map(Dynamic::from));

        // Register logging functions
        engine.on_print(|msg| {
            tracing::info!(target: "rhai", "{}", msg);
        });
        engine.on_debug(|msg, _source, pos: Position| {
            tracing::debug!(target: "rhai", "{} @ {}", msg, pos);
        });
        engine.register_fn("log", |msg: &str| {
            tracing::info!(target: "rhai", "{}", msg);
        });
        engine.register_fn("info", |msg: &str| {
            tracing::info!(target: "rhai", "{}", msg);
        });
        engine.register_fn("warn", |msg: &str| {
            tracing::warn!(target: "rhai", "{}", msg);
        });
        engine.register_fn("error", |msg: &str| {
            tracing::error!(target: "rhai", "{}", msg);
        });

        register_dataframe(&mut engine, budget);

        engine
    }

    /// Build a scope holding a private copy of every dataset.
    fn build_scope(&self, ctx: &DatasetContext) -> Scope<'static> {
        let mut scope = Scope::new();

        for (name, table) in ctx.iter() {
            scope.push(name.clone(), table.clone());
        }

        // Declared up front so that plain assignment works without `let`.
        scope.push(RESULT_VARIABLE, Dynamic::UNIT);

        scope
    }

    /// Execute step code and return its normalized output table.
    pub fn execute(&self, code: &str, ctx: &DatasetContext) -> Result<StepOutput, StepError> {
        let start = Instant::now();
        let engine = self.create_engine();
        let mut scope = self.build_scope(ctx);

        let ast = engine.compile_with_scope(&scope, code)?;
        let value = engine.eval_ast_with_scope::<Dynamic>(&mut scope, &ast)?;

        let value = if value.is_unit() {
            scope
                .get_value::<Dynamic>(RESULT_VARIABLE)
                .filter(|v| !v.is_unit())
                .ok_or_else(|| StepError::MissingResult(RESULT_VARIABLE.to_string()))?
        } else {
            value
        };

        let table = table_from_dynamic(value).normalize();
        let duration_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            run_id = ctx.run_id.as_deref().unwrap_or("-"),
            rows = table.num_rows(),
            columns = table.num_columns(),
            duration_ms,
            "Step executed"
        );

        Ok(StepOutput { table, duration_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn context() -> DatasetContext {
        let records: Vec<crate::table::Record> = json!([
            {"id": 1, "amount": 10.5, "memo": null},
            {"id": 2, "amount": 20.0, "memo": "x"}
        ])
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r.as_object().unwrap().clone())
        .collect();

        let mut ctx = DatasetContext::new().with_run_id("run_test");
        ctx.insert("df_x", Table::from_records(&records));
        ctx
    }

    #[test]
    fn test_copy_returns_normalized_input() {
        let executor = StepExecutor::default();
        let output = executor.execute("df_result = df_x.copy();", &context()).unwrap();

        assert_eq!(output.table.columns(), &["id", "amount", "memo"]);
        assert_eq!(output.table.rows()[0], vec![json!(1), json!(10.5), json!("NaN")]);
        assert_eq!(output.table.num_rows(), 2);
    }

    #[test]
    fn test_let_binding_result_variable() {
        let executor = StepExecutor::default();
        let output = executor
            .execute("let df_result = df_x.head(1);", &context())
            .unwrap();
        assert_eq!(output.table.num_rows(), 1);
    }

    #[test]
    fn test_final_expression_is_result() {
        let executor = StepExecutor::default();
        let output = executor
            .execute("let t = df_x.select([\"id\"]); t", &context())
            .unwrap();
        assert_eq!(output.table.columns(), &["id"]);
    }

    #[test]
    fn test_scalar_result() {
        let executor = StepExecutor::default();
        let output = executor.execute("df_x.sum(\"amount\")", &context()).unwrap();
        assert_eq!(output.table.columns(), &["result"]);
        assert_eq!(output.table.rows()[0], vec![json!(30.5)]);
    }

    #[test]
    fn test_missing_result() {
        let executor = StepExecutor::default();
        let err = executor.execute("let y = 1;", &context()).unwrap_err();
        assert!(matches!(err, StepError::MissingResult(_)));
        assert_eq!(err.to_string(), "Code executed but 'df_result' was not created");
    }

    #[test]
    fn test_runtime_and_parse_errors() {
        let executor = StepExecutor::default();

        let err = executor.execute("throw \"boom\";", &context()).unwrap_err();
        assert!(matches!(err, StepError::CodeExecution(ref m) if m.contains("boom")));

        let err = executor.execute("let = ;", &context()).unwrap_err();
        assert!(matches!(err, StepError::CodeExecution(_)));
    }

    #[test]
    fn test_operation_limit() {
        let executor = StepExecutor::new(ExecutorLimits {
            max_operations: 1_000,
            ..Default::default()
        });
        let err = executor.execute("loop {}", &context()).unwrap_err();
        assert!(matches!(err, StepError::CodeExecution(_)));
    }

    #[test]
    fn test_timeout() {
        let executor = StepExecutor::new(ExecutorLimits {
            timeout: Duration::from_millis(20),
            ..Default::default()
        });
        let err = executor.execute("loop {}", &context()).unwrap_err();
        assert!(matches!(err, StepError::CodeExecution(ref m) if m.contains("time limit")));
    }

    fn repeated_key_context(rows: usize) -> DatasetContext {
        let table = |name: &str| {
            Table::from_rows(
                vec!["k".into(), name.into()],
                (0..rows).map(|i| vec![json!(1), json!(i)]).collect(),
            )
        };
        let mut ctx = DatasetContext::new();
        ctx.insert("df_a", table("a"));
        ctx.insert("df_b", table("b"));
        ctx
    }

    #[test]
    fn test_merge_respects_row_limit() {
        let executor = StepExecutor::new(ExecutorLimits {
            max_array_size: 1_000,
            max_table_rows: 1_000,
            ..Default::default()
        });
        let ctx = repeated_key_context(1_500);

        let err = executor
            .execute("pd::merge(df_a, df_b, \"k\")", &ctx)
            .unwrap_err();
        assert!(matches!(err, StepError::CodeExecution(ref m) if m.contains("row limit of 1000")));

        let err = executor
            .execute("pd::concat([df_a, df_b])", &ctx)
            .unwrap_err();
        assert!(matches!(err, StepError::CodeExecution(ref m) if m.contains("row limit")));
    }

    #[test]
    fn test_merge_respects_timeout() {
        let executor = StepExecutor::new(ExecutorLimits {
            timeout: Duration::from_millis(20),
            max_table_rows: usize::MAX,
            ..Default::default()
        });
        let ctx = repeated_key_context(1_500);

        let started = Instant::now();
        let err = executor
            .execute("pd::merge(df_a, df_b, \"k\")", &ctx)
            .unwrap_err();
        assert!(matches!(err, StepError::CodeExecution(ref m) if m.contains("time limit")));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_small_merge_within_limits() {
        let executor = StepExecutor::new(ExecutorLimits {
            max_table_rows: 1_000,
            ..Default::default()
        });
        let output = executor
            .execute("pd::merge(df_a, df_b, \"k\")", &repeated_key_context(30))
            .unwrap();
        assert_eq!(output.table.num_rows(), 900);
    }

    #[test]
    fn test_imports_and_eval_denied() {
        let executor = StepExecutor::default();
        assert!(executor
            .execute("import \"std\" as s; df_x", &context())
            .is_err());
        assert!(executor.execute("eval(\"df_x\")", &context()).is_err());
    }

    #[test]
    fn test_context_is_not_mutated() {
        let executor = StepExecutor::default();
        let ctx = context();
        executor
            .execute("df_x[\"amount\"] = 0; df_x", &ctx)
            .unwrap();
        assert_eq!(ctx.get("df_x").unwrap().rows()[0][1], json!(10.5));
    }

    #[test]
    fn test_reconciliation_style_step() {
        let executor = StepExecutor::default();
        let mut ctx = context();
        ctx.insert(
            "df_y",
            Table::from_rows(
                vec!["id".into(), "amount".into()],
                vec![vec![json!(2), json!(18.0)], vec![json!(3), json!(4.0)]],
            ),
        );

        let code = r#"
            let joined = pd::merge(df_x.drop("memo"), df_y, "id", "outer");
            joined = joined.fillna(0.0);
            joined.with_column("difference", |r| r.amount_x - r.amount_y)
        "#;
        let output = executor.execute(code, &ctx).unwrap();

        assert_eq!(
            output.table.columns(),
            &["id", "amount_x", "amount_y", "difference"]
        );
        assert_eq!(output.table.num_rows(), 3);
        assert_eq!(output.table.rows()[1][3], json!(2.0));
        assert_eq!(output.table.rows()[2][3], Value::from(-4.0));
    }
}
