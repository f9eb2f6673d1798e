//! Live feed endpoints
//!
//! Each stream request attaches one subscription to the registry. The
//! subscription writes SSE frames into a [`ChannelSink`]; the receiving half
//! becomes the response body, so a client that goes away closes the channel
//! and ends the subscription at its next tick.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Form, Json,
    body::Body,
    extract::{Path, State},
    http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use feedboard_feed::{ChannelSink, FeedId};
use serde::{Deserialize, Serialize};
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tracing::debug;

use crate::auth::{Caller, CurrentUser};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SendForm {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SendReply {
    pub status: &'static str,
}

/// `POST /send`: publish to the message feed; blank messages are dropped.
///
/// The session is checked before the body is parsed, so a request without
/// one is redirected whatever its content type.
pub async fn send(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Form(form): Form<SendForm>,
) -> Result<Json<SendReply>, AppError> {
    let caller = Caller::from(&user);
    let sequence = state
        .registry
        .submit(&state.sessions, &caller, FeedId::Messages, form.message)?;
    debug!(?sequence, "Message submitted");
    Ok(Json(SendReply { status: "ok" }))
}

pub async fn stream_messages(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Response, AppError> {
    open_stream(&state, &caller, FeedId::Messages)
}

pub async fn stream_line(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Response, AppError> {
    open_stream(&state, &caller, FeedId::Line)
}

pub async fn stream_bar(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Response, AppError> {
    open_stream(&state, &caller, FeedId::Bar)
}

/// `GET /feeds/{feed}`: any feed by name
pub async fn stream_named(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(feed): Path<String>,
) -> Result<Response, AppError> {
    let feed: FeedId = feed.parse()?;
    open_stream(&state, &caller, feed)
}

fn open_stream(state: &AppState, caller: &Caller, feed: FeedId) -> Result<Response, AppError> {
    let (sink, frames) = ChannelSink::new(state.config.server.stream_buffer);
    state.registry.subscribe(&state.sessions, caller, feed, sink)?;

    let body = Body::from_stream(ReceiverStream::new(frames).map(Ok::<_, Infallible>));
    Ok((
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache"),
            (CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response())
}
