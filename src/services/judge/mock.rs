#![allow(dead_code)]
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::JudgeService;
use crate::models::challenge::{Challenge, TestResult};

/// Test double: passes or fails every test case and records submissions.
#[derive(Clone, Default)]
pub struct MockJudge {
    pub pass_all: bool,
    pub submissions: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockJudge {
    pub fn passing() -> Self {
        Self {
            pass_all: true,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JudgeService for MockJudge {
    async fn run_tests(&self, code: &str, challenge: &Challenge) -> Vec<TestResult> {
        self.submissions
            .lock()
            .unwrap()
            .push((challenge.id.clone(), code.to_string()));

        challenge
            .test_cases
            .iter()
            .map(|tc| TestResult {
                test_case_id: tc.id.clone(),
                passed: self.pass_all,
                output: if self.pass_all {
                    tc.expected_output.clone()
                } else {
                    String::new()
                },
                error: if self.pass_all {
                    String::new()
                } else {
                    "Wrong answer".to_string()
                },
                execution_time: None,
                memory: None,
            })
            .collect()
    }
}
