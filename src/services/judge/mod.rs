use async_trait::async_trait;

use crate::models::challenge::{Challenge, TestResult};

#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("submission error: {0}")]
    Submit(String),
    #[error("execution error: {0}")]
    Execution(String),
    #[error("timed out waiting for submission result after {0} attempts")]
    Timeout(u32),
}

/// Runs submitted code against a challenge's test cases. Per-test failures
/// (including transport errors talking to the judge) surface as failed
/// [`TestResult`]s; the call itself never fails.
#[async_trait]
pub trait JudgeService: Send + Sync {
    async fn run_tests(&self, code: &str, challenge: &Challenge) -> Vec<TestResult>;
}

/// Normalizes program output before comparison: line endings collapsed to
/// `\n`, trailing whitespace stripped per line and overall.
pub fn clean_output(raw: &str) -> String {
    let normalized = raw.replace("\r\n", "\n");
    let mut lines: Vec<&str> = normalized.lines().map(|l| l.trim_end()).collect();
    while matches!(lines.last(), Some(l) if l.is_empty()) {
        lines.pop();
    }
    lines.join("\n").trim_start_matches('\n').to_string()
}

/// Makes whitespace visible in mismatch messages shown to the user.
pub fn format_for_display(s: &str) -> String {
    s.replace('\n', "\\n").replace('\t', "\\t")
}

mod live;
mod mock;

#[allow(unused_imports)]
pub use live::Judge0Client;
#[allow(unused_imports)]
pub use mock::MockJudge;
