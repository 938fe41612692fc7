//! HTTP route handlers for the live-feed API.

use std::fs;
use std::path::Path as FsPath;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use debate::io::paths::round_index_from_path;
use serde::Serialize;
use serde_json::Value;

use crate::state::AppState;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/state", get(get_state))
        .route("/session", get(get_session))
        .route("/rounds", get(list_rounds))
        .route("/rounds/{index}", get(get_round))
        .route("/synthesis", get(get_synthesis))
}

async fn health() -> &'static str {
    "ok"
}

/// GET /api/state - the live-state document the viewer polls.
async fn get_state(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    read_json_value(&state.paths.state_path).map(Json)
}

/// GET /api/session - the persisted session record.
async fn get_session(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    read_json_value(&state.paths.session_path).map(Json)
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct RoundsResponse {
    rounds: Vec<u32>,
}

/// GET /api/rounds - indices of the round documents written so far.
async fn list_rounds(State(state): State<AppState>) -> Result<Json<RoundsResponse>, StatusCode> {
    let rounds = round_indices(&state.paths.root).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(RoundsResponse { rounds }))
}

/// GET /api/rounds/:index - markdown of one round document.
async fn get_round(
    State(state): State<AppState>,
    Path(index): Path<u32>,
) -> Result<String, StatusCode> {
    read_text(&state.paths.round_path(index))
}

/// GET /api/synthesis - markdown of the synthesis, once written.
async fn get_synthesis(State(state): State<AppState>) -> Result<String, StatusCode> {
    read_text(&state.paths.synthesis_path)
}

fn round_indices(root: &FsPath) -> std::io::Result<Vec<u32>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut rounds: Vec<u32> = fs::read_dir(root)?
        .flatten()
        .filter_map(|entry| round_index_from_path(&entry.path()))
        .collect();
    rounds.sort_unstable();
    Ok(rounds)
}

fn read_text(path: &FsPath) -> Result<String, StatusCode> {
    if !path.exists() {
        return Err(StatusCode::NOT_FOUND);
    }
    fs::read_to_string(path).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

fn read_json_value(path: &FsPath) -> Result<Value, StatusCode> {
    let contents = read_text(path)?;
    serde_json::from_str(&contents).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_in(dir: &FsPath) -> AppState {
        AppState::new(dir.to_path_buf())
    }

    #[tokio::test]
    async fn rounds_are_listed_in_numeric_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        for name in ["round-10.md", "round-2.md", "round-1.md", "synthesis.md", "round-x.md"] {
            fs::write(temp.path().join(name), "# Round").expect("write");
        }

        let Json(response) = list_rounds(State(state_in(temp.path())))
            .await
            .expect("list");
        assert_eq!(response.rounds, vec![1, 2, 10]);
    }

    #[tokio::test]
    async fn missing_documents_are_not_found() {
        let temp = tempfile::tempdir().expect("tempdir");
        let state = state_in(temp.path());

        assert_eq!(
            get_round(State(state.clone()), Path(1)).await,
            Err(StatusCode::NOT_FOUND)
        );
        assert_eq!(
            get_synthesis(State(state.clone())).await,
            Err(StatusCode::NOT_FOUND)
        );
        assert_eq!(
            get_state(State(state)).await.map(|Json(value)| value),
            Err(StatusCode::NOT_FOUND)
        );
    }

    #[tokio::test]
    async fn state_is_served_as_json() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(
            temp.path().join("state.json"),
            r#"{"topic":"Adopt Rust","status":"in_progress","entries":[]}"#,
        )
        .expect("write");

        let Json(value) = get_state(State(state_in(temp.path())))
            .await
            .expect("state");
        assert_eq!(value["topic"], "Adopt Rust");
    }

    #[tokio::test]
    async fn unreadable_json_is_a_server_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("session.json"), "{not json").expect("write");

        let result = get_session(State(state_in(temp.path()))).await;
        assert_eq!(result.map(|Json(value)| value), Err(StatusCode::INTERNAL_SERVER_ERROR));
    }
}
