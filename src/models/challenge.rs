use serde::{Deserialize, Serialize};

fn default_time_limit() -> u32 {
    1
}

fn default_memory_limit() -> u32 {
    128
}

/// A code challenge, loaded once from static JSON configuration and immutable
/// afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub difficulty: String,
    pub description: String,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub initial_code: String,
    /// Reference solutions are never serialized back out to clients.
    #[serde(default, skip_serializing)]
    pub solutions: Vec<String>,
    /// CPU time limit in seconds.
    #[serde(default = "default_time_limit")]
    pub time_limit: u32,
    /// Memory limit in megabytes.
    #[serde(default = "default_memory_limit")]
    pub memory_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    #[serde(default)]
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub hidden: bool,
}

/// What `GET /api/challenges` returns per challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeSummary {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub challenge_id: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub test_case_id: String,
    pub passed: bool,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<i64>,
}

impl TestResult {
    pub fn failed(test_case_id: &str, error: String) -> Self {
        Self {
            test_case_id: test_case_id.to_string(),
            passed: false,
            output: String::new(),
            error,
            execution_time: None,
            memory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub success: bool,
    pub message: String,
    pub test_results: Vec<TestResult>,
}
