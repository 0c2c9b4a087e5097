//! Minutes-to-tasks extraction pipeline.
//!
//! Flow: raw minutes → [`prompt::build_extraction_prompt`] → oracle call →
//! [`parser::parse_tasks`] → [`staging::StagingStore`] → user confirmation →
//! one repository create per row. Extraction failures abort the import and
//! leave staging exactly as it was.

pub mod parser;
pub mod prompt;
pub mod staging;

pub use parser::{parse_tasks, ExtractionError};
pub use prompt::build_extraction_prompt;
pub use staging::{ConfirmError, StagingStore};

use crate::oracle::TextOracle;
use crate::types::ExtractedTask;

/// Run one extraction attempt end to end: build the prompt, call the oracle,
/// parse and normalize the reply. The caller decides what to do with the
/// result (usually [`StagingStore::replace_all`]).
pub async fn run_extraction(
    oracle: &dyn TextOracle,
    minutes: &str,
) -> Result<Vec<ExtractedTask>, ExtractionError> {
    let prompt = build_extraction_prompt(minutes);
    let reply = oracle.generate(&prompt).await?;
    log::debug!("oracle replied with {} bytes", reply.len());
    parse_tasks(&reply)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::oracle::{OracleError, TextOracle};
    use crate::types::PlanStatus;

    /// Oracle double that returns a canned reply.
    struct CannedOracle(String);

    #[async_trait]
    impl TextOracle for CannedOracle {
        async fn generate(&self, _prompt: &str) -> Result<String, OracleError> {
            Ok(self.0.clone())
        }
    }

    struct FailingOracle;

    #[async_trait]
    impl TextOracle for FailingOracle {
        async fn generate(&self, _prompt: &str) -> Result<String, OracleError> {
            Err(OracleError::EmptyReply)
        }
    }

    #[tokio::test]
    async fn test_run_extraction_end_to_end() {
        let oracle = CannedOracle(
            r#"Encontrei um plano:
[{"dateTime":"2024-01-10 09:00","sector":"TI","assignee":"João","action":"Atualizar servidores","solution":"-","startDate":"2024-01-10","endDate":"2024-01-15","status":"em andamento"}]"#
                .to_string(),
        );

        let tasks = run_extraction(&oracle, "Ata 10/01/2024: TI deve atualizar servidores até 15/01/2024, responsável João.")
            .await
            .unwrap();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, PlanStatus::Progress);
        assert_eq!(tasks[0].responsible, "João");
    }

    #[tokio::test]
    async fn test_run_extraction_no_array_leaves_staging_unchanged() {
        let oracle = CannedOracle("Desculpe, não encontrei nenhum plano de ação.".to_string());
        let staging = StagingStore::new();

        let result = run_extraction(&oracle, "ata vazia").await;
        assert!(matches!(result, Err(ExtractionError::Format)));

        // The import aborted before touching staging.
        assert!(staging.is_empty());
    }

    #[tokio::test]
    async fn test_run_extraction_propagates_oracle_failure() {
        let result = run_extraction(&FailingOracle, "ata").await;
        assert!(matches!(result, Err(ExtractionError::Oracle(_))));
    }
}
