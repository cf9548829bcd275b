//! Row-to-DTO conversions. Stored ids and timestamps are trusted but not
//! blindly: a corrupt value is logged and replaced with a default rather
//! than failing the whole response.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use waymate_db::models::{MessageRow, RouteRow, UserRouteRow};
use waymate_types::api::{MessageResponse, UserRouteResponse};
use waymate_types::models::{Route, RouteType};

pub(crate) fn parse_uuid(value: &str, field: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {field} '{value}': {e}");
        Uuid::default()
    })
}

pub(crate) fn parse_ts(value: &str, field: &str) -> DateTime<Utc> {
    value
        .parse::<DateTime<Utc>>()
        .unwrap_or_else(|e| {
            warn!("Corrupt {field} '{value}': {e}");
            DateTime::default()
        })
}

pub(crate) fn route_from_row(row: RouteRow) -> Route {
    let route_type = match row.route_type.as_str() {
        "train" => RouteType::Train,
        "bus" => RouteType::Bus,
        other => {
            warn!("Unknown route_type '{}' on route '{}'", other, row.id);
            RouteType::Bus
        }
    };

    Route {
        id: row.id,
        short_name: row.short_name,
        long_name: row.long_name,
        route_type,
        color: row.color,
        text_color: row.text_color,
    }
}

pub(crate) fn user_route_from_row(row: UserRouteRow) -> UserRouteResponse {
    UserRouteResponse {
        id: parse_uuid(&row.id, "user_route id"),
        route_id: row.route_id,
        created_at: parse_ts(&row.created_at, "user_route created_at"),
        route: route_from_row(row.route),
    }
}

pub(crate) fn message_from_row(row: MessageRow) -> MessageResponse {
    MessageResponse {
        id: parse_uuid(&row.id, "message id"),
        chat_id: parse_uuid(&row.chat_id, "message chat_id"),
        sender_id: parse_uuid(&row.sender_id, "message sender_id"),
        sender_username: row.sender_username,
        content: row.content,
        created_at: parse_ts(&row.created_at, "message created_at"),
    }
}
