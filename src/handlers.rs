// handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Form,
};
use serde_json::json;
use tracing::info;

use crate::error::AppError;
use crate::events::{self, EventKind, SpaceEvent};
use crate::models::{FeedbackQuery, NewAnswers, NewQuestion, NewSpace};
use crate::store;
use crate::validate::FormFields;
use crate::views;
use crate::AppState;

/// Header set by the page script on background submissions.
pub const AJAX_HEADER: &str = "is-ajax-like";

fn is_ajax_like(headers: &HeaderMap) -> bool {
    headers
        .get(AJAX_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "true")
}

/// `302 Found` to `location`.
fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

pub async fn index() -> Html<String> {
    Html(views::index())
}

/// Create a space and send the host to its page with the password attached
pub async fn create_space(
    State(state): State<Arc<AppState>>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let new_space = NewSpace::try_from(&FormFields::from(pairs))?;
    let space = store::create_space(&state.pool, &new_space).await?;

    info!(slug = %space.slug, "space created");

    Ok(found(format!(
        "/s/{}?created&password={}",
        space.slug, space.password
    )))
}

/// Render a space with its questions, choices and answers
pub async fn feedback_page(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(query): Query<FeedbackQuery>,
) -> Result<Html<String>, AppError> {
    let feedback = store::load_feedback(&state.pool, &slug).await?;
    Ok(Html(views::feedback_page(
        &feedback,
        query.password.as_deref(),
        query.created.is_some(),
    )))
}

/// Add a question to a space (host only)
pub async fn add_question(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let form = FormFields::from(pairs);
    let space = store::find_space_by_slug(&state.pool, &slug).await?;

    let password = form.get("password").unwrap_or_default();
    if !space.is_host(Some(password)) {
        return Err(AppError::InvalidPassword);
    }

    let new_question = NewQuestion::try_from(&form)?;
    let (question, choices) = store::add_question(&state.pool, &space, &new_question).await?;

    info!(
        slug = %space.slug,
        question_id = %question.id,
        choices = choices.len(),
        "question added"
    );

    let fragment = views::question_fragment(&space, &question, &choices, &[]);
    state.events.publish(SpaceEvent {
        space_id: space.id.clone(),
        kind: EventKind::Question,
        data: json!({ "id": question.id, "html": &fragment }),
    });

    if is_ajax_like(&headers) {
        return Ok(Html(fragment).into_response());
    }

    Ok(found(format!("/s/{}?password={}", space.slug, space.password)))
}

/// Record one or more answers to a question
pub async fn add_answer(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let space = store::find_space_by_slug(&state.pool, &slug).await?;
    let new_answers = NewAnswers::try_from(&FormFields::from(pairs))?;
    let question = store::find_question(&state.pool, &space.id, &new_answers.question_id).await?;

    let answers = store::add_answers(&state.pool, &question, &new_answers.texts).await?;

    info!(
        slug = %space.slug,
        question_id = %question.id,
        answers = answers.len(),
        "answers recorded"
    );

    for answer in &answers {
        state.events.publish(SpaceEvent {
            space_id: space.id.clone(),
            kind: EventKind::Answer,
            data: json!({
                "id": answer.id,
                "question_id": answer.question_id,
                "text": answer.text,
            }),
        });
    }

    if is_ajax_like(&headers) {
        return Ok(StatusCode::OK.into_response());
    }

    Ok(found(format!("/s/{}", space.slug)))
}

/// Stream questions and answers added to a space while the page is open
pub async fn space_events(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let space = store::find_space_by_slug(&state.pool, &slug).await?;
    let rx = state.events.subscribe();

    info!(slug = %space.slug, "event stream opened");
    Ok(events::sse(rx, space.id))
}
