//! Runs a substitution under a wall-clock budget.
//!
//! The work happens on the blocking pool and the join handle is raced
//! against a tokio timer. Whichever side wins, the other is dropped: an early
//! finish cancels the timer, a timeout detaches the worker. The `regex`
//! engine matches in linear time, so a detached worker always runs to
//! completion shortly after.

use std::time::Duration;

use tracing::warn;

use crate::error::ExecError;
use crate::statement::SubstitutionStatement;
use crate::template::Template;

pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedExecutor {
    budget: Duration,
}

impl Default for BoundedExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_EXEC_TIMEOUT)
    }
}

impl BoundedExecutor {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Apply `statement` to `input`: first match only, or every
    /// non-overlapping match left to right when the statement is global.
    pub async fn execute(
        &self,
        statement: &SubstitutionStatement,
        input: &str,
    ) -> Result<String, ExecError> {
        let statement = statement.clone();
        let input = input.to_string();
        self.run(move || substitute(&statement, &input)).await
    }

    pub(crate) async fn run<T, F>(&self, work: F) -> Result<T, ExecError>
    where
        F: FnOnce() -> Result<T, ExecError> + Send + 'static,
        T: Send + 'static,
    {
        let worker = tokio::task::spawn_blocking(work);
        match tokio::time::timeout(self.budget, worker).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(ExecError::WorkerFailed(join_err.to_string())),
            Err(_) => {
                warn!(budget_ms = self.budget.as_millis(), "substitution timed out");
                Err(ExecError::Timeout(self.budget))
            }
        }
    }
}

/// The unbounded substitution itself.
pub fn substitute(statement: &SubstitutionStatement, input: &str) -> Result<String, ExecError> {
    let template = Template::compile(&statement.replacement, &statement.pattern)?;
    let limit = if statement.is_global { 0 } else { 1 };
    Ok(statement
        .pattern
        .replacen(input, limit, &template)
        .into_owned())
}
