use std::cmp::Ordering;
use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use waymate_db::models::ChatRow;
use waymate_types::api::{
    ChatCreatedResponse, ChatDetailResponse, ChatListResponse, ChatSummary, Claims,
    CreateChatRequest, MessageListResponse, MessageResponse, Participant, SendMessageRequest,
    SendMessageResponse,
};

use crate::auth::{AppState, AppStateInner};
use crate::convert::{message_from_row, parse_ts, parse_uuid};
use crate::error::ApiError;
use crate::routes::blocking;

pub async fn create_or_get_chat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.other_user_id == claims.sub {
        return Err(ApiError::InvalidInput(
            "cannot create a chat with yourself".into(),
        ));
    }

    let db = state.clone();
    let me = claims.sub.to_string();
    let other = req.other_user_id.to_string();
    let chat_id = Uuid::new_v4();

    let (summary, created) = blocking(move || {
        if db.db.get_user_by_id(&other)?.is_none() {
            return Err(ApiError::NotFound("user not found".into()));
        }

        let (row, created) = db.db.find_or_create_chat(&chat_id.to_string(), &me, &other)?;
        Ok((load_summary(&db, row, &me)?, created))
    })
    .await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ChatCreatedResponse { chat: summary, created })))
}

pub async fn list_chats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let me = claims.sub.to_string();

    let chats = blocking(move || {
        let rows = db.db.list_chats_for_user(&me)?;
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();

        let mut last_map: HashMap<String, MessageResponse> = db
            .db
            .last_messages_for_chats(&ids)?
            .into_iter()
            .map(|m| (m.chat_id.clone(), message_from_row(m)))
            .collect();
        let unread_map: HashMap<String, u32> =
            db.db.unread_counts_for_user(&me)?.into_iter().collect();

        let mut summaries: Vec<ChatSummary> = rows
            .into_iter()
            .map(|row| {
                let last = last_map.remove(&row.id);
                let unread = unread_map.get(&row.id).copied().unwrap_or(0);
                summary_from_parts(row, &me, last, unread)
            })
            .collect();

        sort_summaries(&mut summaries);
        Ok(summaries)
    })
    .await?;

    Ok(Json(ChatListResponse { chats }))
}

pub async fn get_chat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(chat_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let me = claims.sub.to_string();
    let id = chat_id.to_string();

    let summary = blocking(move || {
        let row = load_chat_for(&db, &id, &me)?;
        load_summary(&db, row, &me)
    })
    .await?;

    Ok(Json(ChatDetailResponse { chat: summary }))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(chat_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let me = claims.sub.to_string();
    let id = chat_id.to_string();

    let rows = blocking(move || {
        load_chat_for(&db, &id, &me)?;
        let rows = db.db.list_messages(&id)?;
        // Opening the conversation clears its unread badge.
        db.db.mark_chat_read(&id, &me)?;
        Ok(rows)
    })
    .await?;

    Ok(Json(MessageListResponse {
        messages: rows.into_iter().map(message_from_row).collect(),
    }))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(chat_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::InvalidInput("message content is required".into()));
    }

    let db = state.clone();
    let me = claims.sub.to_string();
    let id = chat_id.to_string();
    let message_id = Uuid::new_v4();
    let stored_content = content.clone();

    let created_at = blocking(move || {
        load_chat_for(&db, &id, &me)?;
        Ok(db
            .db
            .insert_message(&message_id.to_string(), &id, &me, &stored_content)?)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            message: MessageResponse {
                id: message_id,
                chat_id,
                sender_id: claims.sub,
                sender_username: claims.username.clone(),
                content,
                created_at: parse_ts(&created_at, "message created_at"),
            },
        }),
    ))
}

/// Chat lookup plus participant check: a missing chat is `not_found`, an
/// existing chat the caller is not part of is `forbidden`.
fn load_chat_for(state: &AppStateInner, chat_id: &str, me: &str) -> Result<ChatRow, ApiError> {
    let row = state
        .db
        .get_chat(chat_id)?
        .ok_or_else(|| ApiError::NotFound("chat not found".into()))?;

    if row.user_a != me && row.user_b != me {
        return Err(ApiError::Forbidden("not a participant in this chat".into()));
    }
    Ok(row)
}

fn load_summary(state: &AppStateInner, row: ChatRow, me: &str) -> Result<ChatSummary, ApiError> {
    let last = state
        .db
        .last_messages_for_chats(std::slice::from_ref(&row.id))?
        .pop()
        .map(message_from_row);
    let unread = state.db.unread_count_for_chat(&row.id, me)?;
    Ok(summary_from_parts(row, me, last, unread))
}

fn summary_from_parts(
    row: ChatRow,
    me: &str,
    last_message: Option<MessageResponse>,
    unread_count: u32,
) -> ChatSummary {
    let a = Participant {
        user_id: parse_uuid(&row.user_a, "chat user_a"),
        username: row.username_a,
    };
    let b = Participant {
        user_id: parse_uuid(&row.user_b, "chat user_b"),
        username: row.username_b,
    };
    let other = if row.user_a == me { b.clone() } else { a.clone() };

    ChatSummary {
        id: parse_uuid(&row.id, "chat id"),
        created_at: parse_ts(&row.created_at, "chat created_at"),
        participants: vec![a, b],
        other_participant: other,
        last_message,
        unread_count,
    }
}

/// Most recently active first: chats with messages by last message time
/// descending, then message-less chats by creation time descending.
pub(crate) fn sort_summaries(summaries: &mut [ChatSummary]) {
    summaries.sort_by(|a, b| match (&a.last_message, &b.last_message) {
        (Some(x), Some(y)) => y.created_at.cmp(&x.created_at),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.created_at.cmp(&a.created_at),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn participant(name: &str) -> Participant {
        Participant {
            user_id: Uuid::new_v4(),
            username: name.to_string(),
        }
    }

    fn summary(created_hour: u32, last_message_hour: Option<u32>) -> ChatSummary {
        let other = participant("other");
        ChatSummary {
            id: Uuid::new_v4(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, created_hour, 0, 0).unwrap(),
            participants: vec![participant("me"), other.clone()],
            other_participant: other,
            last_message: last_message_hour.map(|h| MessageResponse {
                id: Uuid::new_v4(),
                chat_id: Uuid::new_v4(),
                sender_id: Uuid::new_v4(),
                sender_username: "other".to_string(),
                content: "hi".to_string(),
                created_at: Utc.with_ymd_and_hms(2026, 1, 2, h, 0, 0).unwrap(),
            }),
            unread_count: 0,
        }
    }

    #[test]
    fn chats_with_messages_sort_by_last_activity_desc() {
        let mut summaries = vec![summary(0, Some(1)), summary(0, Some(5)), summary(0, Some(3))];
        sort_summaries(&mut summaries);

        let hours: Vec<u32> = summaries
            .iter()
            .map(|s| {
                use chrono::Timelike;
                s.last_message.as_ref().unwrap().created_at.hour()
            })
            .collect();
        assert_eq!(hours, vec![5, 3, 1]);
    }

    #[test]
    fn message_less_chats_sort_last_by_creation_desc() {
        let mut summaries = vec![summary(2, None), summary(0, Some(1)), summary(7, None)];
        sort_summaries(&mut summaries);

        assert!(summaries[0].last_message.is_some());
        assert!(summaries[1].last_message.is_none());
        use chrono::Timelike;
        assert_eq!(summaries[1].created_at.hour(), 7);
        assert_eq!(summaries[2].created_at.hour(), 2);
    }
}
