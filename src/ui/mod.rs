//! Operator host - server-rendered console page and its form handlers.
//!
//! The page is rendered with Dioxus SSR; every control on it is a plain form
//! posting to a `/ui/...` route. Handlers act on the shared `Console` and
//! redirect back to `/` (303), so reloading the page never re-submits.
//!
//! - components/ - Shared Dioxus components (layout, table, drawers, theme)
//! - pages/ - The console page

pub mod components;
pub mod pages;

use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use dioxus::prelude::*;
use serde::Deserialize;

use crate::console::{Console, UploadFile, UploadTarget};
use pages::ConsolePage;

/// Largest accepted upload (firmware images included).
const UPLOAD_LIMIT_BYTES: usize = 16 * 1024 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct UiState {
    pub console: Console,
    /// Page auto-refresh period while no drawer is open
    pub refresh: Duration,
}

impl UiState {
    pub fn new(console: Console, refresh: Duration) -> Self {
        Self { console, refresh }
    }
}

/// Build the operator host router.
pub fn router(state: UiState) -> Router {
    Router::new()
        .route("/", get(console_page))
        .route("/ui/session/add", post(session_add))
        .route("/ui/session/edit/{index}", post(session_edit))
        .route("/ui/session/commit", post(session_commit))
        .route("/ui/session/cancel", post(session_cancel))
        .route("/ui/session/delete", post(session_delete))
        .route("/ui/locate/{address}", post(locate_device))
        .route("/ui/upload/open", post(upload_open))
        .route("/ui/upload/close", post(upload_close))
        .route("/ui/upload/firmware", post(upload_firmware))
        .route("/ui/upload/public", post(upload_public))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
        .with_state(state)
}

fn back_to_console() -> Redirect {
    Redirect::to("/")
}

/// GET / - Device table, status and open drawers
pub async fn console_page(State(state): State<UiState>) -> impl IntoResponse {
    let view = state.console.view().await;
    let refresh_ms = state.refresh.as_millis() as u64;
    let html = dioxus::ssr::render_element(rsx! { ConsolePage { view: view, refresh_ms: refresh_ms } });
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n{}</html>",
        html
    ))
}

// =============================================================================
// Device drawer
// =============================================================================

/// Device drawer form. Unchecked checkboxes are absent from the body.
#[derive(Debug, Deserialize)]
pub struct DraftForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub calibration: String,
    pub enabled: Option<String>,
    pub reversed: Option<String>,
    pub broadcast: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    #[serde(default)]
    pub confirm: String,
}

/// POST /ui/session/add
pub async fn session_add(State(state): State<UiState>) -> Redirect {
    if !state.console.open_add().await {
        tracing::debug!("Add drawer not opened");
    }
    back_to_console()
}

/// POST /ui/session/edit/{index}
pub async fn session_edit(State(state): State<UiState>, Path(index): Path<usize>) -> Redirect {
    if !state.console.open_edit(index).await {
        tracing::debug!("Edit drawer not opened for index {}", index);
    }
    back_to_console()
}

/// POST /ui/session/commit
pub async fn session_commit(State(state): State<UiState>, Form(form): Form<DraftForm>) -> Redirect {
    let applied = state
        .console
        .update_draft(|draft| {
            draft.set_name(form.name);
            draft.set_calibration(form.calibration);
            draft.set_enabled(form.enabled.is_some());
            draft.set_reversed(form.reversed.is_some());
            draft.set_broadcast(form.broadcast.is_some());
        })
        .await;

    if applied {
        // Field errors stay on the draft and are shown on the re-rendered page
        if let Err(errors) = state.console.commit().await {
            tracing::debug!("Commit rejected: {:?}", errors);
        }
    }
    back_to_console()
}

/// POST /ui/session/cancel
pub async fn session_cancel(State(state): State<UiState>) -> Redirect {
    state.console.cancel().await;
    back_to_console()
}

/// POST /ui/session/delete - requires `confirm=yes`
pub async fn session_delete(State(state): State<UiState>, Form(form): Form<DeleteForm>) -> Redirect {
    let confirmed = form.confirm == "yes";
    state.console.delete(confirmed).await;
    back_to_console()
}

/// POST /ui/locate/{address} - returns before the device answers
pub async fn locate_device(State(state): State<UiState>, Path(address): Path<i64>) -> Redirect {
    state.console.start_locate(address).await;
    back_to_console()
}

// =============================================================================
// Upload drawer
// =============================================================================

/// POST /ui/upload/open
pub async fn upload_open(State(state): State<UiState>) -> Redirect {
    state.console.open_uploads().await;
    back_to_console()
}

/// POST /ui/upload/close
pub async fn upload_close(State(state): State<UiState>) -> Redirect {
    state.console.close_uploads().await;
    back_to_console()
}

/// POST /ui/upload/firmware
pub async fn upload_firmware(State(state): State<UiState>, multipart: Multipart) -> Response {
    forward_upload(&state, UploadTarget::Firmware, multipart).await
}

/// POST /ui/upload/public
pub async fn upload_public(State(state): State<UiState>, multipart: Multipart) -> Response {
    forward_upload(&state, UploadTarget::PublicFile, multipart).await
}

async fn forward_upload(state: &UiState, target: UploadTarget, multipart: Multipart) -> Response {
    let file = match read_file_field(multipart, target.field()).await {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!("Malformed upload form: {}", e);
            return (e.status(), e.body_text()).into_response();
        }
    };

    // Outcome and missing-file flags are rendered from the drawer state
    if let Err(e) = state.console.upload(target, file).await {
        tracing::debug!("Upload not completed: {}", e);
    }
    back_to_console().into_response()
}

/// First file in the form field `name`, or `None` when no file was chosen.
async fn read_file_field(
    mut multipart: Multipart,
    name: &str,
) -> Result<Option<UploadFile>, axum::extract::multipart::MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(name) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        if file_name.is_empty() {
            return Ok(None);
        }
        return Ok(Some(UploadFile {
            file_name,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}
