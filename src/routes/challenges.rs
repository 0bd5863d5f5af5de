use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::models::challenge::{SubmissionRequest, SubmissionResponse, TestResult};
use crate::responses::JsonResponse;
use crate::state::AppState;

/// GET /api/challenges — id → {id, title} for the selector.
pub async fn list_challenges(State(state): State<AppState>) -> Response {
    Json(state.challenges.summaries()).into_response()
}

/// GET /api/challenge/{id} — the full challenge definition.
pub async fn get_challenge(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.challenges.get(&id) {
        Some(challenge) => Json(challenge).into_response(),
        None => {
            info!(%id, "challenge not found");
            JsonResponse::not_found("Challenge not found").into_response()
        }
    }
}

fn all_tests_passed(results: &[TestResult]) -> bool {
    !results.is_empty() && results.iter().all(|r| r.passed)
}

/// POST /api/submit — run the submission against the challenge's test cases.
pub async fn submit_solution(
    State(state): State<AppState>,
    Json(req): Json<SubmissionRequest>,
) -> Response {
    let Some(challenge) = state.challenges.get(&req.challenge_id) else {
        return JsonResponse::not_found("Challenge not found").into_response();
    };

    let results = state.judge.run_tests(&req.code, challenge).await;

    Json(SubmissionResponse {
        success: all_tests_passed(&results),
        message: "Submission processed".to_string(),
        test_results: results,
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::db::mock_db::{MemBillingRepository, MockDb};
    use crate::models::challenge::{Challenge, TestCase};
    use crate::services::billing::MockPolarService;
    use crate::services::challenge_store::ChallengeStore;
    use crate::services::judge::{JudgeService, MockJudge};
    use crate::state::test_state;

    fn sum_challenge() -> Challenge {
        Challenge {
            id: "sum".into(),
            title: "Sum Two Numbers".into(),
            difficulty: "beginner".into(),
            description: "Read two integers and print their sum.".into(),
            hints: vec!["Use scanf".into()],
            test_cases: vec![
                TestCase {
                    id: "t1".into(),
                    input: "1 2".into(),
                    expected_output: "3".into(),
                    hidden: false,
                },
                TestCase {
                    id: "t2".into(),
                    input: "5 7".into(),
                    expected_output: "12".into(),
                    hidden: true,
                },
            ],
            initial_code: "#include <stdio.h>\n".into(),
            solutions: vec!["secret".into()],
            time_limit: 1,
            memory_limit: 128,
        }
    }

    fn app(judge: Arc<dyn JudgeService>) -> Router {
        let state = test_state(
            Arc::new(MockDb::default()),
            Arc::new(MemBillingRepository::default()),
            Arc::new(MockPolarService::new()),
            judge,
            Arc::new(ChallengeStore::from_challenges([sum_challenge()])),
        );
        Router::new()
            .route("/api/challenges", get(list_challenges))
            .route("/api/challenge/{id}", get(get_challenge))
            .route("/api/submit", post(submit_solution))
            .with_state(state)
    }

    async fn body_json(res: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(res.into_body(), 256 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn list_returns_id_to_summary_map() {
        let res = app(Arc::new(MockJudge::passing()))
            .oneshot(Request::get("/api/challenges").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["sum"]["id"], "sum");
        assert_eq!(json["sum"]["title"], "Sum Two Numbers");
        // summaries carry no test cases or code
        assert!(json["sum"].get("testCases").is_none());
    }

    #[tokio::test]
    async fn get_returns_the_full_challenge_without_solutions() {
        let res = app(Arc::new(MockJudge::passing()))
            .oneshot(
                Request::get("/api/challenge/sum")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["title"], "Sum Two Numbers");
        assert_eq!(json["testCases"].as_array().unwrap().len(), 2);
        assert!(json.get("solutions").is_none());
    }

    #[tokio::test]
    async fn get_unknown_challenge_is_not_found() {
        let res = app(Arc::new(MockJudge::passing()))
            .oneshot(
                Request::get("/api/challenge/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn submit_reports_per_test_results() {
        let judge = Arc::new(MockJudge::passing());
        let res = app(judge.clone())
            .oneshot(
                Request::post("/api/submit")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({ "challengeId": "sum", "code": "int main() {}" })
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Submission processed");
        assert_eq!(json["testResults"].as_array().unwrap().len(), 2);
        assert_eq!(json["testResults"][0]["testCaseId"], "t1");
        assert_eq!(json["testResults"][0]["passed"], true);

        let submissions = judge.submissions.lock().unwrap();
        assert_eq!(submissions[0].0, "sum");
    }

    #[tokio::test]
    async fn failing_tests_mark_the_submission_unsuccessful() {
        let res = app(Arc::new(MockJudge::failing()))
            .oneshot(
                Request::post("/api/submit")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({ "challengeId": "sum", "code": "int main() {}" })
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        let json = body_json(res).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["testResults"][0]["passed"], false);
        assert_eq!(json["testResults"][0]["error"], "Wrong answer");
    }

    #[tokio::test]
    async fn submit_for_unknown_challenge_is_not_found() {
        let res = app(Arc::new(MockJudge::passing()))
            .oneshot(
                Request::post("/api/submit")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({ "challengeId": "missing", "code": "x" }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
