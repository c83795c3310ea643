use crate::config::EvaluatorConfig;
use crate::error::{EvalError, Result};
use crate::model::{Database, Rule};
use crate::seminaive::{Evaluation, SemiNaive};

/// Evaluate a program on tokio's blocking pool
///
/// The fixpoint computation is CPU-bound and never yields, so it is moved off
/// the async executor.
///
/// # Errors
///
/// Evaluation errors as for [`SemiNaive::run`], or
/// [`EvalError::TaskFailed`] if the task panicked or was cancelled.
pub async fn evaluate_in_background(
    rules: Vec<Rule>,
    edb: Database,
    config: EvaluatorConfig,
) -> Result<Evaluation> {
    tokio::task::spawn_blocking(move || SemiNaive::with_config(&rules, &edb, config)?.run())
        .await
        .map_err(|e| EvalError::TaskFailed(e.to_string()))?
}
