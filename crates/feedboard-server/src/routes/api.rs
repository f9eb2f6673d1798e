//! Small JSON endpoints behind the session check

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{Form, Json, extract::State};
use feedboard_feed::FeedId;
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::state::AppState;

const ITEMS: [&str; 4] = ["Rust", "Axum", "Frontend", "Backend"];

#[derive(Debug, Serialize)]
pub struct Items {
    pub items: &'static [&'static str],
}

pub async fn data(_user: CurrentUser) -> Json<Items> {
    Json(Items { items: &ITEMS })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubmitForm {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitReply {
    pub message: String,
}

pub async fn submit(_user: CurrentUser, Form(form): Form<SubmitForm>) -> Json<SubmitReply> {
    Json(SubmitReply {
        message: format!("Received {}", form.name),
    })
}

/// Live state of one feed
#[derive(Debug, Serialize)]
pub struct FeedStatus {
    pub subscribers: usize,
    pub retained: usize,
    pub last_sequence: Option<u64>,
}

/// `GET /api/feeds`: subscriber counts and, for the message feed, its window
pub async fn feeds(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
) -> Json<BTreeMap<FeedId, FeedStatus>> {
    let registry = &state.registry;
    let messages = registry.messages().log();

    let status = FeedId::ALL
        .into_iter()
        .map(|feed| {
            let (retained, last_sequence) = match feed {
                FeedId::Messages => (messages.len(), messages.last_sequence()),
                FeedId::Line | FeedId::Bar => (0, None),
            };
            let status = FeedStatus {
                subscribers: registry.subscriber_count(feed),
                retained,
                last_sequence,
            };
            (feed, status)
        })
        .collect();

    Json(status)
}
