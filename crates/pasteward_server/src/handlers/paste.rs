//! Paste HTTP handlers.

use super::extract::{content_length, ClientAddr, SubmissionForm};
use crate::{error::HttpError, submit::submit_paste, AppError, AppState};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use pasteward_core::models::paste::{CreatedPaste, ForkDraft, PasteView, SubmitPasteRequest};
use serde_json::json;

pub const MSG_DIFF_NOT_FOUND: &str = "One of the pastes could not be found.";

/// Usage text served at `/`.
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let url = &state.config.public_url;
    let body = format!(
        "pasteward\n\n\
         Submit:  curl -F 'code=<-' -F name=you -F syntax=text {url}\n\
         Upload:  curl -F 'code=@file.txt' -F name=you -F syntax=text {url}\n\
         View:    {url}<id>\n\
         Raw:     {url}r/<id>\n\
         Fork:    {url}f/<id>\n\
         Diff:    {url}d/<orig>/<fork>\n",
        url = url
    );
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body)
}

/// Liveness probe.
pub async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Form submission.
///
/// # Returns
/// A `303` redirect to the new paste for web-form posts, or the paste URL
/// as a plain-text line for script posts.
///
/// # Errors
/// Returns an error if validation, abuse checks or persistence fail.
pub async fn submit_form(
    State(state): State<AppState>,
    ClientAddr(addr): ClientAddr,
    form: SubmissionForm,
) -> Result<Response, HttpError> {
    let submitted = submit_paste(&state, form.request, addr, form.body_len).await?;
    if submitted.web_form {
        return Ok(Redirect::to(&format!("/{}", submitted.id)).into_response());
    }
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("{}\n", submitted.url),
    )
        .into_response())
}

/// JSON submission; always treated as a script post.
///
/// # Returns
/// The new id and its URL.
///
/// # Errors
/// Returns `400` for bodies that do not decode, otherwise an error if
/// validation, abuse checks or persistence fail.
pub async fn create_paste(
    State(state): State<AppState>,
    ClientAddr(addr): ClientAddr,
    headers: HeaderMap,
    payload: Result<Json<SubmitPasteRequest>, JsonRejection>,
) -> Result<Json<CreatedPaste>, HttpError> {
    let Json(mut request) =
        payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    request.webform.clear();
    let body_len = content_length(&headers);
    let submitted = submit_paste(&state, request, addr, body_len).await?;
    Ok(Json(CreatedPaste {
        id: submitted.id,
        url: submitted.url,
    }))
}

/// Fetch a paste by id as JSON.
///
/// # Errors
/// Returns `404` if the paste does not exist.
pub async fn get_paste(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PasteView>, HttpError> {
    let paste = state.pastes.get(&id)?.ok_or(AppError::NotFound)?;
    Ok(Json(PasteView::new(&id, paste)))
}

/// Paste view; unknown ids go back to `/`.
pub async fn view_paste(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, HttpError> {
    match state.pastes.get(&id)? {
        Some(paste) => Ok(Json(PasteView::new(&id, paste)).into_response()),
        None => Ok(Redirect::to("/").into_response()),
    }
}

/// Code only, as plain text.
pub async fn get_raw(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, HttpError> {
    match state.pastes.get(&id)? {
        Some(paste) => Ok((
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            paste.code,
        )
            .into_response()),
        None => Ok(Redirect::to("/").into_response()),
    }
}

/// Pre-filled submission for forking a paste.
pub async fn fork_paste(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, HttpError> {
    let draft: Option<ForkDraft> = state.pastes.fork_draft(&id)?;
    match draft {
        Some(draft) => Ok(Json(draft).into_response()),
        None => Ok(Redirect::to("/").into_response()),
    }
}

/// Side-by-side line diff as an HTML table, `orig` on the left.
pub async fn diff_pastes(
    State(state): State<AppState>,
    Path((orig, fork)): Path<(String, String)>,
) -> Result<Response, HttpError> {
    match state.pastes.diff(&orig, &fork) {
        Ok(table) => Ok(Html(table.to_html()).into_response()),
        Err(AppError::NotFound) => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": MSG_DIFF_NOT_FOUND })),
        )
            .into_response()),
        Err(err) => Err(err.into()),
    }
}
