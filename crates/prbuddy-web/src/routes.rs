//! The HTTP surface (spec §6): editor extensions talk to this router.
//! Every handler maps errors through `WebError` to the status/body
//! shape in the external-interface table.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use prbuddy_daemon::DaemonError;

use crate::error::WebError;
use crate::model::{
    AssistRequest, AssistResponse, ClearRequest, LoadDraftRequest, LoadDraftResponse,
    ModelListEntry, SaveDraftRequest, SetModelRequest, SetModelResponse, StatusResponse,
    WhatResponse,
};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/quickassist", post(quickassist))
        .route("/dce", post(dce))
        .route("/quickassist/clear", post(quickassist_clear))
        .route(
            "/extension/drafts",
            post(save_draft).put(save_draft),
        )
        .route("/extension/drafts/load", post(load_draft))
        .route("/what", post(what))
        .route("/extension/models", get(list_models))
        .route("/extension/model", post(set_model))
        .with_state(state)
}

async fn quickassist(
    State(state): State<AppState>,
    Json(request): Json<AssistRequest>,
) -> Result<Json<AssistResponse>, WebError> {
    let (conversation_id, response) = state
        .orchestrator
        .handle_persistent(request.conversation_id, &request.input)
        .await?;
    Ok(Json(AssistResponse {
        response,
        conversation_id,
    }))
}

async fn dce(
    State(state): State<AppState>,
    Json(request): Json<AssistRequest>,
) -> Result<Json<AssistResponse>, WebError> {
    let (conversation_id, response) = state
        .orchestrator
        .handle_ephemeral_with_dce(request.conversation_id, &request.input)
        .await?;
    Ok(Json(AssistResponse {
        response,
        conversation_id,
    }))
}

async fn quickassist_clear(
    State(state): State<AppState>,
    Json(request): Json<ClearRequest>,
) -> Result<Json<StatusResponse>, WebError> {
    if request.conversation_id.trim().is_empty() {
        return Err(WebError::bad_request("conversationId must not be empty"));
    }
    state.orchestrator.conversations().remove(&request.conversation_id).await;
    state.orchestrator.companions().remove(&request.conversation_id).await;
    Ok(Json(StatusResponse { status: "cleared" }))
}

async fn save_draft(
    State(state): State<AppState>,
    Json(request): Json<SaveDraftRequest>,
) -> Result<Json<StatusResponse>, WebError> {
    if request.branch.trim().is_empty() || request.commit.trim().is_empty() {
        return Err(WebError::bad_request("branch and commit must not be empty"));
    }
    state
        .orchestrator
        .draft_store()
        .save(&request.branch, &request.commit, &request.messages)
        .map_err(WebError::from)?;
    Ok(Json(StatusResponse { status: "success" }))
}

async fn load_draft(
    State(state): State<AppState>,
    Json(request): Json<LoadDraftRequest>,
) -> Result<Json<LoadDraftResponse>, WebError> {
    if request.branch.trim().is_empty() || request.commit.trim().is_empty() {
        return Err(WebError::bad_request("branch and commit must not be empty"));
    }
    let messages = state
        .orchestrator
        .draft_store()
        .load(&request.branch, &request.commit)
        .map_err(WebError::from)?;
    Ok(Json(LoadDraftResponse {
        status: "success",
        messages,
    }))
}

async fn what(State(state): State<AppState>) -> Result<Json<WhatResponse>, WebError> {
    let summary = state.orchestrator.generate_what_summary().await?;
    Ok(Json(WhatResponse { summary }))
}

async fn list_models(
    State(state): State<AppState>,
) -> Result<Json<Vec<ModelListEntry>>, WebError> {
    let models = state
        .orchestrator
        .llm()
        .list_models()
        .await
        .map_err(DaemonError::from)?;
    Ok(Json(models.into_iter().map(ModelListEntry::from).collect()))
}

async fn set_model(
    State(state): State<AppState>,
    Json(request): Json<SetModelRequest>,
) -> Result<Json<SetModelResponse>, WebError> {
    if request.model.trim().is_empty() {
        return Err(WebError::bad_request("model must not be empty"));
    }
    state.orchestrator.llm().set_active_model(request.model.clone()).await;
    Ok(Json(SetModelResponse {
        status: "model updated",
        active_model: request.model,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use prbuddy_daemon::{CompanionRegistry, ContextLog, ConversationStore, DraftStore, Orchestrator};
    use prbuddy_llm::LlmClient;
    use prbuddy_vcs::{DiffSource, VcsCli};
    use tower::ServiceExt;

    use super::router;
    use crate::state::AppState;

    fn init_git_repo(dir: &std::path::Path) {
        let cli = VcsCli::default();
        cli.run(dir, ["init", "-q"]).expect("init");
        cli.run(dir, ["config", "user.email", "dev@example.test"]).expect("config");
        cli.run(dir, ["config", "user.name", "dev"]).expect("config");
        std::fs::write(dir.join("a.txt"), "hello").expect("write");
        cli.run(dir, ["add", "."]).expect("add");
        cli.run(dir, ["commit", "-q", "-m", "initial commit"]).expect("commit");
    }

    fn test_state(repo: &std::path::Path) -> AppState {
        let diff_source = Arc::new(DiffSource::new(repo));
        let llm = Arc::new(LlmClient::new("http://127.0.0.1:1", "test-model"));
        let orchestrator = Orchestrator::new(
            ConversationStore::new(),
            CompanionRegistry::new(Arc::clone(&diff_source), Duration::from_secs(10)),
            diff_source,
            llm,
            DraftStore::new(repo.join(".git")),
            ContextLog::new(repo.join(".git").join("context.jsonl")),
        );
        AppState::new(orchestrator, prbuddy_core::PrbuddyConfig::default())
    }

    #[tokio::test]
    async fn quickassist_rejects_empty_input_with_400() {
        let dir = tempfile::tempdir().expect("tempdir");
        init_git_repo(dir.path());
        let app = router(test_state(dir.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/quickassist")
                    .method("POST")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&serde_json::json!({"input": ""})).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(payload["error"].as_str().unwrap().len() > 0);
    }

    #[tokio::test]
    async fn quickassist_clear_rejects_missing_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        init_git_repo(dir.path());
        let app = router(test_state(dir.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/quickassist/clear")
                    .method("POST")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&serde_json::json!({"conversationId": ""})).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn draft_round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        init_git_repo(dir.path());
        let app = router(test_state(dir.path()));

        let save_body = serde_json::json!({
            "branch": "feat/x",
            "commit": "abcdef1234567",
            "messages": [{"role": "user", "content": "hi"}],
        });
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/extension/drafts")
                    .method("POST")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&save_body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let load_body = serde_json::json!({"branch": "feat/x", "commit": "abcdef1234567"});
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/extension/drafts/load")
                    .method("POST")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&load_body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: LoadDraftResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.messages.len(), 1);
        assert_eq!(payload.messages[0].content, "hi");
    }

    #[tokio::test]
    async fn load_draft_missing_returns_404() {
        let dir = tempfile::tempdir().expect("tempdir");
        init_git_repo(dir.path());
        let app = router(test_state(dir.path()));

        let load_body = serde_json::json!({"branch": "nope", "commit": "0000000000000"});
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/extension/drafts/load")
                    .method("POST")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&load_body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_on_post_only_route_returns_405() {
        let dir = tempfile::tempdir().expect("tempdir");
        init_git_repo(dir.path());
        let app = router(test_state(dir.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/quickassist")
                    .method("GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn set_model_rejects_empty_model_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        init_git_repo(dir.path());
        let app = router(test_state(dir.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/extension/model")
                    .method("POST")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&serde_json::json!({"model": ""})).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn set_model_accepts_valid_name_and_echoes_it() {
        let dir = tempfile::tempdir().expect("tempdir");
        init_git_repo(dir.path());
        let app = router(test_state(dir.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/extension/model")
                    .method("POST")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&serde_json::json!({"model": "llama3.1"})).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: SetModelResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.active_model, "llama3.1");
    }

    #[tokio::test]
    async fn what_with_no_commits_is_a_400() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cli = VcsCli::default();
        cli.run(dir.path(), ["init", "-q"]).expect("init");
        let app = router(test_state(dir.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/what")
                    .method("POST")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&serde_json::json!({})).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
