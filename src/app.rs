use std::net::SocketAddr;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::state::AppState;
use crate::{auth, progress, tools};

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Product Management Guide API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(progress::router())
                .merge(tools::router())
                .route("/", get(root))
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::auth::repo::UserStore;

    struct Harness {
        app: Router,
        state: AppState,
    }

    impl Harness {
        fn new() -> Self {
            let state = AppState::fake();
            Self {
                app: build_app(state.clone()),
                state,
            }
        }

        async fn call(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut req = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let req = match body {
                Some(body) => req
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => req.body(Body::empty()).unwrap(),
            };
            let res = self.app.clone().oneshot(req).await.unwrap();
            let status = res.status();
            let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                    Value::String(String::from_utf8_lossy(&bytes).into_owned())
                })
            };
            (status, value)
        }

        async fn register(&self, email: &str) -> String {
            let (status, body) = self
                .call(
                    Method::POST,
                    "/api/auth/register",
                    None,
                    Some(json!({"email": email, "password": "secret1", "name": "Learner"})),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "{body}");
            body["token"].as_str().unwrap().to_string()
        }
    }

    #[tokio::test]
    async fn health_is_ok() {
        let h = Harness::new();
        let (status, body) = h.call(Method::GET, "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".into()));
    }

    #[tokio::test]
    async fn register_returns_bearer_token_and_public_user() {
        let h = Harness::new();
        let (status, body) = h
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({"email": "new@example.com", "password": "secret1", "name": "New"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "bearer");
        assert_eq!(body["user"]["email"], "new@example.com");
        assert_eq!(body["user"]["role"], "learner");
        assert!(body["user"]["last_login"].is_string());
        assert!(body["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_is_400() {
        let h = Harness::new();
        h.register("dup@example.com").await;
        let (status, body) = h
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({"email": "dup@example.com", "password": "secret2", "name": "Dup"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Email already registered");
    }

    #[tokio::test]
    async fn short_password_is_field_level_validation_error() {
        let h = Harness::new();
        let (status, body) = h
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({"email": "x@example.com", "password": "123", "name": "X"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Validation failed");
        assert!(body["detail"].as_str().unwrap().contains("password"));
    }

    #[tokio::test]
    async fn malformed_json_is_400_with_error_body() {
        let h = Harness::new();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = h.app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Invalid input");
    }

    #[tokio::test]
    async fn login_errors_are_indistinguishable() {
        let h = Harness::new();
        h.register("real@example.com").await;

        let (s1, b1) = h
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": "real@example.com", "password": "wrong-pw"})),
            )
            .await;
        let (s2, b2) = h
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": "ghost@example.com", "password": "secret1"})),
            )
            .await;
        assert_eq!(s1, StatusCode::UNAUTHORIZED);
        assert_eq!(s1, s2);
        assert_eq!(b1, b2);
    }

    #[tokio::test]
    async fn login_then_me() {
        let h = Harness::new();
        h.register("me@example.com").await;
        let (status, body) = h
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": "me@example.com", "password": "secret1"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, me) = h.call(Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "me@example.com");
        assert_eq!(me["name"], "Learner");
    }

    #[tokio::test]
    async fn protected_routes_require_bearer() {
        let h = Harness::new();
        for (method, uri) in [
            (Method::GET, "/api/auth/me"),
            (Method::POST, "/api/auth/logout"),
            (Method::GET, "/api/progress"),
            (Method::GET, "/api/tools/rice-history"),
            (Method::GET, "/api/tools/user-stories"),
        ] {
            let (status, body) = h.call(method, uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body["error"], "Missing or invalid authorization header");
        }

        let (status, body) = h
            .call(Method::GET, "/api/progress", Some("garbage"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Could not validate credentials");
    }

    #[tokio::test]
    async fn auth_is_checked_before_body_validation() {
        let h = Harness::new();
        let (status, _) = h
            .call(
                Method::POST,
                "/api/tools/rice-calculation",
                None,
                Some(json!({"feature_name": "", "effort": -1})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_is_stateless() {
        let h = Harness::new();
        let token = h.register("bye@example.com").await;
        let (status, body) = h
            .call(Method::POST, "/api/auth/logout", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Successfully logged out");

        let (status, _) = h.call(Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn progress_flow() {
        let h = Harness::new();
        let token = h.register("p@example.com").await;

        let (status, body) = h.call(Method::GET, "/api/progress", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_progress"], 0.0);
        assert_eq!(body["module_progress"].as_object().unwrap().len(), 6);
        assert_eq!(body["module_progress"]["pm-basics"]["completed"], false);

        let section = json!({"section_id": "basics-1", "module_id": "pm-basics", "completed": true});
        for _ in 0..2 {
            let (status, body) = h
                .call(Method::POST, "/api/progress/section", Some(&token), Some(section.clone()))
                .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["total_progress"], 12.0);
            assert_eq!(body["message"], "Progress updated successfully");
        }

        let (_, body) = h.call(Method::GET, "/api/progress", Some(&token), None).await;
        assert_eq!(body["completed_sections"], json!(["basics-1"]));
        assert_eq!(body["module_progress"]["pm-basics"]["completed"], true);
        assert!(body["module_progress"]["pm-basics"]["completed_at"].is_string());
        assert_eq!(body["last_accessed_module"], "pm-basics");

        let assessment = json!({"assessment_id": "quiz-1", "answers": {"q1": "a"}, "score": 75.5});
        for _ in 0..2 {
            let (status, body) = h
                .call(Method::POST, "/api/progress/assessment", Some(&token), Some(assessment.clone()))
                .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["score"], 75.5);
        }
        let (_, body) = h.call(Method::GET, "/api/progress", Some(&token), None).await;
        assert_eq!(body["assessment_scores"].as_array().unwrap().len(), 2);
        assert_eq!(body["total_progress"], 12.0);
    }

    #[tokio::test]
    async fn progress_for_user_without_record_is_created_on_read() {
        let h = Harness::new();
        let user = h
            .state
            .users
            .create(crate::auth::repo_types::NewUser {
                email: "legacy@example.com".into(),
                password_hash: "x".into(),
                name: "Legacy".into(),
            })
            .await
            .unwrap();
        let token = h.state.keys.issue_default(user.id).unwrap();
        let (status, body) = h.call(Method::GET, "/api/progress", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["completed_sections"], json!([]));
        assert_eq!(body["last_accessed_module"], Value::Null);
    }

    #[tokio::test]
    async fn rice_create_list_and_scoped_delete() {
        let h = Harness::new();
        let alice = h.register("alice@example.com").await;
        let bob = h.register("bob@example.com").await;

        let (status, calc) = h
            .call(
                Method::POST,
                "/api/tools/rice-calculation",
                Some(&alice),
                Some(json!({
                    "feature_name": "Onboarding",
                    "reach": 1000, "impact": 3, "confidence": 80, "effort": 5
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(calc["score"], 480.0);
        let id = calc["id"].as_str().unwrap().to_string();

        let (_, bob_history) = h
            .call(Method::GET, "/api/tools/rice-history", Some(&bob), None)
            .await;
        assert_eq!(bob_history, json!([]));

        let uri = format!("/api/tools/rice-calculation/{id}");
        let (status, body) = h.call(Method::DELETE, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Calculation not found");

        let (_, history) = h
            .call(Method::GET, "/api/tools/rice-history", Some(&alice), None)
            .await;
        assert_eq!(history.as_array().unwrap().len(), 1);

        let (status, _) = h.call(Method::DELETE, &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = h.call(Method::DELETE, &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rice_delete_with_bad_id_is_400() {
        let h = Harness::new();
        let token = h.register("id@example.com").await;
        let (status, body) = h
            .call(Method::DELETE, "/api/tools/rice-calculation/nope", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Invalid calculation ID");
    }

    #[tokio::test]
    async fn rice_ranges_are_validated() {
        let h = Harness::new();
        let token = h.register("range@example.com").await;
        let (status, body) = h
            .call(
                Method::POST,
                "/api/tools/rice-calculation",
                Some(&token),
                Some(json!({
                    "feature_name": "X",
                    "reach": -1, "impact": 11, "confidence": 101, "effort": 0
                })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let detail = body["detail"].as_str().unwrap();
        for field in ["reach", "impact", "confidence", "effort"] {
            assert!(detail.contains(field), "{detail}");
        }
    }

    #[tokio::test]
    async fn rice_overflowing_score_is_rejected() {
        let h = Harness::new();
        let token = h.register("huge@example.com").await;
        let (status, body) = h
            .call(
                Method::POST,
                "/api/tools/rice-calculation",
                Some(&token),
                Some(json!({
                    "feature_name": "Everything",
                    "reach": 1e308, "impact": 10, "confidence": 100, "effort": 0.5
                })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().starts_with("score:"));

        let (_, history) = h
            .call(Method::GET, "/api/tools/rice-history", Some(&token), None)
            .await;
        assert_eq!(history, json!([]));
    }

    #[tokio::test]
    async fn rice_history_is_capped_at_fifty() {
        let h = Harness::new();
        let token = h.register("many@example.com").await;
        for i in 0..55 {
            let (status, _) = h
                .call(
                    Method::POST,
                    "/api/tools/rice-calculation",
                    Some(&token),
                    Some(json!({
                        "feature_name": format!("f{i}"),
                        "reach": 1, "impact": 1, "confidence": 100, "effort": 1
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
        }
        let (_, history) = h
            .call(Method::GET, "/api/tools/rice-history", Some(&token), None)
            .await;
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 50);
        assert_eq!(history[0]["feature_name"], "f54");
    }

    #[tokio::test]
    async fn user_stories_are_formatted_and_listed() {
        let h = Harness::new();
        let token = h.register("stories@example.com").await;
        let (status, saved) = h
            .call(
                Method::POST,
                "/api/tools/user-story",
                Some(&token),
                Some(json!({
                    "project_name": "Checkout",
                    "stories": [
                        {"story": "Pay With Apple Pay", "category": "payments", "priority": "high"},
                        {"story": "Save my card", "category": "payments", "priority": "low"}
                    ]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(saved["story_count"], 2);
        assert_eq!(saved["message"], "User stories saved successfully");

        let (status, body) = h
            .call(Method::GET, "/api/tools/user-stories", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let records = body["user_stories"].as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["id"], saved["id"]);
        assert_eq!(records[0]["project_name"], "Checkout");
        assert_eq!(
            records[0]["stories"][0]["formatted_story"],
            "As a [user type], I want to pay with apple pay so that [benefit]."
        );
        assert_eq!(records[0]["stories"][0]["story"], "Pay With Apple Pay");
    }

    #[tokio::test]
    async fn user_story_list_is_scoped_newest_first_and_capped_at_twenty() {
        let h = Harness::new();
        let owner = h.register("owner@example.com").await;
        let other = h.register("other@example.com").await;
        for i in 0..21 {
            let (status, _) = h
                .call(
                    Method::POST,
                    "/api/tools/user-story",
                    Some(&owner),
                    Some(json!({
                        "project_name": format!("project-{i}"),
                        "stories": [{"story": "Do a thing", "category": "core", "priority": "medium"}]
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, body) = h
            .call(Method::GET, "/api/tools/user-stories", Some(&owner), None)
            .await;
        let records = body["user_stories"].as_array().unwrap();
        assert_eq!(records.len(), 20);
        assert_eq!(records[0]["project_name"], "project-20");
        assert_eq!(records[19]["project_name"], "project-1");

        let (status, body) = h
            .call(Method::GET, "/api/tools/user-stories", Some(&other), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_stories"], json!([]));
    }
}
