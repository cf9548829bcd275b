use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Route, User};

// -- JWT Claims --

/// JWT claims shared between token issuance (waymate-api auth handlers) and
/// the bearer middleware. Canonical definition lives here in waymate-types
/// to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// -- Route associations --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddRouteRequest {
    pub route_id: String,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub routes: Vec<Route>,
}

#[derive(Debug, Serialize)]
pub struct UserRouteResponse {
    pub id: Uuid,
    pub route_id: String,
    pub created_at: DateTime<Utc>,
    pub route: Route,
}

#[derive(Debug, Serialize)]
pub struct UserRouteListResponse {
    pub routes: Vec<UserRouteResponse>,
}

#[derive(Debug, Serialize)]
pub struct AddRouteResponse {
    pub route: UserRouteResponse,
}

// -- Matching --

#[derive(Debug, Serialize)]
pub struct MatchedUser {
    pub id: Uuid,
    pub username: String,
    pub shared_routes: Vec<Route>,
    pub shared_routes_count: usize,
}

#[derive(Debug, Serialize)]
pub struct MatchListResponse {
    pub users: Vec<MatchedUser>,
}

// -- Chats --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChatRequest {
    pub other_user_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct Participant {
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct ChatSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub participants: Vec<Participant>,
    pub other_participant: Participant,
    pub last_message: Option<MessageResponse>,
    pub unread_count: u32,
}

#[derive(Debug, Serialize)]
pub struct ChatCreatedResponse {
    pub chat: ChatSummary,
    pub created: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatDetailResponse {
    pub chat: ChatSummary,
}

#[derive(Debug, Serialize)]
pub struct ChatListResponse {
    pub chats: Vec<ChatSummary>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub message: MessageResponse,
}

#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub messages: Vec<MessageResponse>,
}
