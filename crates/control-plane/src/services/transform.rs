//! Ad-hoc transformation service.
//!
//! Runs code against request-supplied datasets without touching the
//! warehouse, either as given or after generating it from a prompt.

use autoflow_tools::{DatasetContext, StepExecutor};
use std::sync::Arc;
use tracing::debug;

use crate::codegen::{CodeProvider, PromptBuilder};
use crate::db::models::{ExecuteMultiRequest, ProcessMultiRequest, TransformResponse};
use crate::error::{AppError, AppResult};

/// Ad-hoc transformation service.
#[derive(Clone)]
pub struct TransformService {
    executor: StepExecutor,
    provider: Arc<dyn CodeProvider>,
    prompts: Arc<PromptBuilder>,
}

impl TransformService {
    pub fn new(executor: StepExecutor, provider: Arc<dyn CodeProvider>) -> Self {
        Self {
            executor,
            provider,
            prompts: Arc::new(PromptBuilder::new()),
        }
    }

    /// Whether prompts can be turned into code.
    pub fn can_generate(&self) -> bool {
        self.provider.is_configured()
    }

    /// Generate code for the prompt, then run it.
    pub async fn process_multi(&self, request: ProcessMultiRequest) -> AppResult<TransformResponse> {
        let ctx = DatasetContext::from_records(&request.datasets);
        let prompt = self.prompts.render(request.task_type, &request.prompt, &ctx)?;

        let code = self.provider.generate(&prompt).await?;
        debug!(task_type = request.task_type.as_str(), code = %code, "Executing generated code");

        self.execute(code, ctx).await
    }

    /// Run the supplied code.
    pub async fn execute_multi(&self, request: ExecuteMultiRequest) -> AppResult<TransformResponse> {
        let ctx = DatasetContext::from_records(&request.datasets);
        self.execute(request.code, ctx).await
    }

    async fn execute(&self, code: String, ctx: DatasetContext) -> AppResult<TransformResponse> {
        let executor = self.executor.clone();

        tokio::task::spawn_blocking(move || -> AppResult<TransformResponse> {
            let output = executor.execute(&code, &ctx)?;
            Ok(TransformResponse {
                result: output.table.to_records(),
                code,
            })
        })
        .await
        .map_err(|e| AppError::Internal(format!("Execution task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{StaticProvider, TaskType};
    use autoflow_tools::{Record, StepError};
    use serde_json::json;
    use std::collections::HashMap;

    fn datasets() -> HashMap<String, Vec<Record>> {
        let rows = json!([{"id": 1, "v": null}, {"id": 2, "v": 3}]);
        let records = rows
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().unwrap().clone())
            .collect();
        HashMap::from([("df_a".to_string(), records)])
    }

    fn service(code: &str) -> TransformService {
        TransformService::new(
            StepExecutor::default(),
            Arc::new(StaticProvider(code.to_string())),
        )
    }

    #[tokio::test]
    async fn test_execute_multi() {
        let response = service("")
            .execute_multi(ExecuteMultiRequest {
                datasets: datasets(),
                code: "df_result = df_a.copy();".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.result.len(), 2);
        assert_eq!(response.result[0]["v"], json!("NaN"));
        assert_eq!(response.code, "df_result = df_a.copy();");
    }

    #[tokio::test]
    async fn test_process_multi_uses_generated_code() {
        let response = service("```\ndf_a.head(1)\n```")
            .process_multi(ProcessMultiRequest {
                datasets: datasets(),
                prompt: "first row".to_string(),
                task_type: TaskType::General,
            })
            .await
            .unwrap();

        assert_eq!(response.code, "df_a.head(1)");
        assert_eq!(response.result.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_result_is_reported() {
        let err = service("")
            .execute_multi(ExecuteMultiRequest {
                datasets: datasets(),
                code: "let x = 1;".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Step(StepError::MissingResult(_))));
    }
}
