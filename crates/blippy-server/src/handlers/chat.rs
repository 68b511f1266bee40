//! Interactive chat and live event subscription (SSE).
//!
//! `chat` runs one turn: the busy gate rejects a second concurrent start
//! with 409, the user message is persisted before the turn task spawns, and
//! the response streams broker events until `TurnDone`. `events` is a plain
//! subscription for UIs that attach to an already-running conversation.

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::Stream;
use futures::StreamExt;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::error;

use blippy_core::ConversationEvent;
use blippy_runtime::{Subscription, TurnOptions};
use blippy_store::repositories::{AgentRepo, ConversationRepo, MessageRepo};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub content: String,
}

/// Stream broker events as SSE frames; `None` from the mailbox ends the
/// stream, and when `until_turn_done` is set the frame after `TurnDone` is
/// the last.
fn event_stream(
    sub: Subscription,
    until_turn_done: bool,
) -> impl Stream<Item = Result<Event, Infallible>> {
    futures::stream::unfold(Some(sub), move |state| async move {
        let mut sub = state?;
        let event = sub.recv().await?;
        let done = until_turn_done && matches!(event, ConversationEvent::TurnDone { .. });
        let frame = Event::default().json_data(&event).ok()?;
        Some((Ok(frame), if done { None } else { Some(sub) }))
    })
}

/// `POST /api/conversations/{id}/chat`
pub async fn chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ChatBody>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    if body.content.is_empty() {
        return Err(ApiError::BadRequest("content is required".into()));
    }

    let (conversation, agent, history) = {
        let conn = state.store.conn().map_err(ApiError::from)?;
        let conversation = ConversationRepo::get(&conn, &id)?;
        let agent = AgentRepo::get(&conn, &conversation.agent_id)?;
        // History is everything persisted before this turn's user message.
        let history = MessageRepo::list_by_conversation(&conn, &id)?;
        (conversation, agent, history)
    };

    if !state.broker.set_busy(&id) {
        return Err(ApiError::Conflict(format!("conversation busy: {id}")));
    }

    // Subscribe before publishing so this client sees the whole turn.
    let sub = state.broker.subscribe(&id);
    state.broker.publish(&id, ConversationEvent::TurnStarted);

    if let Err(e) = state.agent_loop.save_user_message(&id, &body.content) {
        state.broker.clear_busy(&id);
        return Err(e.into());
    }

    let agent_loop = state.agent_loop.clone();
    let opts = TurnOptions {
        conversation,
        agent,
        user_content: body.content,
        history,
        model_override: String::new(),
        extra_instructions: String::new(),
        depth: 0,
    };
    let conversation_id = id.clone();
    let _turn = tokio::spawn(async move {
        // The loop publishes Error + TurnDone and clears busy on failure.
        if let Err(e) = agent_loop.run_turn(CancellationToken::new(), opts).await {
            error!(conversation_id = %conversation_id, error = %e, "chat turn failed");
        }
    });

    Ok(Sse::new(event_stream(sub, true)).keep_alive(KeepAlive::default()))
}

/// `GET /api/conversations/{id}/events`
pub async fn events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    {
        let conn = state.store.conn().map_err(ApiError::from)?;
        let _ = ConversationRepo::get(&conn, &id)?;
    }

    let sub = state.broker.subscribe(&id);

    // A subscriber arriving mid-turn gets a synthetic TurnStarted so it can
    // render the in-progress state.
    let preamble = if state.broker.is_busy(&id) {
        vec![ConversationEvent::TurnStarted]
    } else {
        Vec::new()
    };
    let preamble = futures::stream::iter(
        preamble
            .into_iter()
            .filter_map(|event| Event::default().json_data(&event).ok().map(Ok)),
    );

    Ok(Sse::new(preamble.chain(event_stream(sub, false))).keep_alive(KeepAlive::default()))
}
