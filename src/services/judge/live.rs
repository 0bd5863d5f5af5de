#![allow(dead_code)]
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{clean_output, format_for_display, JudgeError, JudgeService};
use crate::config::JudgeSettings;
use crate::models::challenge::{Challenge, TestCase, TestResult};

/// Judge0 REST client. One submission per test case, polled until terminal.
pub struct Judge0Client {
    client: reqwest::Client,
    base_url: String,
    language_id: i64,
    poll_interval: Duration,
    max_polls: u32,
}

#[derive(Serialize)]
struct Judge0Submission<'a> {
    source_code: &'a str,
    language_id: i64,
    #[serde(skip_serializing_if = "str::is_empty")]
    stdin: &'a str,
    cpu_time_limit: f64,
    /// Kilobytes, per the Judge0 API.
    memory_limit: u32,
    compile_timeout: u32,
}

#[derive(Deserialize)]
struct Judge0Token {
    #[serde(default)]
    token: String,
}

#[derive(Deserialize, Default)]
struct Judge0Status {
    #[serde(default)]
    id: i64,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize, Default)]
struct Judge0Result {
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    stderr: Option<String>,
    #[serde(default)]
    compile_output: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    memory: Option<i64>,
    #[serde(default)]
    status: Judge0Status,
}

fn decode_base64(input: Option<&str>) -> String {
    let Some(input) = input else {
        return String::new();
    };
    if input.is_empty() {
        return String::new();
    }
    match BASE64_STANDARD.decode(input.trim()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
        Err(err) => {
            warn!(?err, "failed to decode base64 judge output");
            String::new()
        }
    }
}

impl Judge0Client {
    pub fn from_settings(settings: &JudgeSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build judge http client");
        Self {
            client,
            base_url: settings.base_url.clone(),
            language_id: settings.language_id,
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            max_polls: settings.max_polls,
        }
    }

    async fn submit_code(
        &self,
        code: &str,
        input: &str,
        challenge: &Challenge,
    ) -> Result<String, JudgeError> {
        let submission = Judge0Submission {
            source_code: code,
            language_id: self.language_id,
            stdin: input,
            cpu_time_limit: f64::from(challenge.time_limit),
            memory_limit: challenge.memory_limit * 1024,
            compile_timeout: 10,
        };

        let resp = self
            .client
            .post(format!("{}/submissions", self.base_url))
            .json(&submission)
            .send()
            .await
            .map_err(|e| JudgeError::Submit(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(JudgeError::Submit(format!(
                "failed to submit code, status: {}, body: {}",
                status, body
            )));
        }

        let token = resp
            .json::<Judge0Token>()
            .await
            .map_err(|e| JudgeError::Submit(e.to_string()))?
            .token;
        if token.is_empty() {
            return Err(JudgeError::Submit("received empty token from judge".into()));
        }

        debug!(%token, "submitted code to judge");
        Ok(token)
    }

    async fn wait_for_result(&self, token: &str) -> Result<Judge0Result, JudgeError> {
        let url = format!(
            "{}/submissions/{}?base64_encoded=true",
            self.base_url, token
        );

        for _ in 0..self.max_polls {
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| JudgeError::Execution(e.to_string()))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(JudgeError::Execution(format!(
                    "error status response: {}, body: {}",
                    status, body
                )));
            }

            let mut result = resp
                .json::<Judge0Result>()
                .await
                .map_err(|e| JudgeError::Execution(e.to_string()))?;

            result.stdout = Some(decode_base64(result.stdout.as_deref()));
            result.stderr = Some(decode_base64(result.stderr.as_deref()));
            result.compile_output = Some(decode_base64(result.compile_output.as_deref()));
            result.message = Some(decode_base64(result.message.as_deref()));

            // Terminal statuses start at 3 (Accepted); 1 and 2 are queued/processing.
            if result.status.id >= 3 {
                debug!(
                    status = result.status.id,
                    description = %result.status.description,
                    "submission completed"
                );
                return Ok(result);
            }

            tokio::time::sleep(self.poll_interval).await;
        }

        Err(JudgeError::Timeout(self.max_polls))
    }

    fn map_result(&self, tc: &TestCase, response: Judge0Result) -> TestResult {
        let mut result = TestResult {
            test_case_id: tc.id.clone(),
            passed: false,
            output: String::new(),
            error: String::new(),
            execution_time: response.time.as_deref().and_then(|t| t.parse::<f64>().ok()),
            memory: response.memory,
        };

        let stdout = response.stdout.unwrap_or_default();
        let compile_output = response.compile_output.unwrap_or_default();
        let stderr = response.stderr.unwrap_or_default();
        let message = response.message.unwrap_or_default();

        match response.status.id {
            3 => {
                result.output = clean_output(&stdout);
                let expected = clean_output(&tc.expected_output);
                result.passed = result.output == expected;
                if !result.passed {
                    result.error = format!(
                        "Expected '{}' but got '{}'",
                        format_for_display(&expected),
                        format_for_display(&result.output)
                    );
                }
            }
            5 => result.error = "Time limit exceeded".to_string(),
            6 => result.error = format!("Compilation error: {}", compile_output),
            11 => {
                result.output = stdout;
                result.error = format!("Runtime error: {}", message);
            }
            _ => {
                result.error = format!("Error: {}", response.status.description);
                if !compile_output.is_empty() {
                    result.error += &format!(" - {}", compile_output);
                }
                if !stderr.is_empty() {
                    result.error += &format!(" - {}", stderr);
                }
                if !message.is_empty() {
                    result.error += &format!(" - {}", message);
                }
            }
        }

        result
    }
}

#[async_trait]
impl JudgeService for Judge0Client {
    async fn run_tests(&self, code: &str, challenge: &Challenge) -> Vec<TestResult> {
        let mut results = Vec::with_capacity(challenge.test_cases.len());

        for tc in &challenge.test_cases {
            let token = match self.submit_code(code, &tc.input, challenge).await {
                Ok(token) => token,
                Err(err) => {
                    warn!(?err, challenge_id = %challenge.id, "failed to submit code");
                    results.push(TestResult::failed(&tc.id, format!("Submission error: {}", err)));
                    continue;
                }
            };

            match self.wait_for_result(&token).await {
                Ok(response) => results.push(self.map_result(tc, response)),
                Err(err) => {
                    warn!(?err, %token, "failed to fetch submission result");
                    results.push(TestResult::failed(&tc.id, format!("Execution error: {}", err)));
                }
            }
        }

        results
    }
}
