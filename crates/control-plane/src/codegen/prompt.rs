//! Prompt rendering using minijinja.

use autoflow_tools::DatasetContext;
use minijinja::{context, Environment};

use super::TaskType;
use crate::error::AppResult;

const LANGUAGE_GUIDE: &str = r#"Write a Rhai script. Every dataset above is already bound to a variable of
type DataFrame under the name shown. The `pd` module is available:
  pd::DataFrame(records | #{col: [..]}), pd::merge(left, right, on, how),
  pd::concat([frames]), pd::isna(v), pd::notna(v), pd::to_numeric(v)
DataFrame methods: copy(), head(n), len(), columns, records(), df["col"],
  df["col"] = values, select([cols]), drop(col | [cols]), rename(#{old: "new"}),
  filter(|row| bool), with_column(name, |row| value), sort_by(col, ascending),
  fillna(value), dropna(), sum(col), mean(col), count(col),
  groupby_agg(keys, #{col: "sum" | "mean" | "count" | "min" | "max" | "first" | "last"})
`how` is one of "inner", "left", "right", "outer". Overlapping columns get the
suffixes _x and _y. Rows passed to closures are object maps keyed by column."#;

const GENERAL_TEMPLATE: &str = r#"You are a Data Expert.
Context:
{{ schema }}
{{ guide }}
User Request: {{ instruction }}
Requirement: Store result in 'df_result'.
Return ONLY code."#;

const RECON_TEMPLATE: &str = r#"You are a strict Financial Reconciliation Agent.
YOUR MISSION: Compare datasets.
1. ALWAYS use 'outer' join on keys.
2. Fill missing values in Measure columns with 0.0.
3. Calculate Difference (Left - Right).
4. Output MUST be in 'df_result'.
Context:
{{ schema }}
{{ guide }}
User Instruction: {{ instruction }}
Return ONLY code."#;

/// Renders code generation prompts.
pub struct PromptBuilder {
    env: Environment<'static>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        let mut env = Environment::new();
        // Static sources are known to parse; a failure here would surface on render.
        let _ = env.add_template(TaskType::General.as_str(), GENERAL_TEMPLATE);
        let _ = env.add_template(TaskType::Recon.as_str(), RECON_TEMPLATE);
        Self { env }
    }

    /// Render the prompt for a task over the given datasets.
    pub fn render(
        &self,
        task: TaskType,
        instruction: &str,
        datasets: &DatasetContext,
    ) -> AppResult<String> {
        let template = self.env.get_template(task.as_str())?;
        let prompt = template.render(context! {
            schema => datasets.describe(),
            guide => LANGUAGE_GUIDE,
            instruction => instruction,
        })?;
        Ok(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoflow_tools::Table;
    use serde_json::json;

    fn datasets() -> DatasetContext {
        let mut ctx = DatasetContext::new();
        ctx.insert(
            "df_gl",
            Table::from_rows(
                vec!["txn_id".into(), "amount".into()],
                vec![vec![json!("GL-1"), json!(1.5)], vec![json!("GL-2"), json!(null)]],
            ),
        );
        ctx
    }

    #[test]
    fn test_general_prompt() {
        let prompt = PromptBuilder::new()
            .render(TaskType::General, "sum the amounts", &datasets())
            .unwrap();
        assert!(prompt.starts_with("You are a Data Expert."));
        assert!(prompt.contains("--- DataFrame: 'df_gl' ---"));
        assert!(prompt.contains("1 non-null  float64"));
        assert!(prompt.contains("User Request: sum the amounts"));
        assert!(prompt.contains("pd::merge"));
    }

    #[test]
    fn test_recon_prompt() {
        let prompt = PromptBuilder::new()
            .render(TaskType::Recon, "match on txn_id", &datasets())
            .unwrap();
        assert!(prompt.contains("ALWAYS use 'outer' join on keys."));
        assert!(prompt.contains("User Instruction: match on txn_id"));
    }

    #[test]
    fn test_instruction_is_not_escaped() {
        let prompt = PromptBuilder::new()
            .render(TaskType::General, "a < b & 'c'", &DatasetContext::new())
            .unwrap();
        assert!(prompt.contains("a < b & 'c'"));
    }
}
