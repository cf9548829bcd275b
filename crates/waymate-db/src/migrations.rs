use rusqlite::Connection;
use tracing::info;

use crate::{StoreError, seed};

pub fn run(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS routes (
            id          TEXT PRIMARY KEY,
            short_name  TEXT NOT NULL,
            long_name   TEXT NOT NULL,
            route_type  TEXT NOT NULL,
            color       TEXT NOT NULL,
            text_color  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS user_routes (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            route_id    TEXT NOT NULL REFERENCES routes(id),
            created_at  TEXT NOT NULL,
            UNIQUE(user_id, route_id)
        );

        CREATE INDEX IF NOT EXISTS idx_user_routes_route
            ON user_routes(route_id);

        -- The participant pair is stored in canonical order (user_a < user_b
        -- by id string), so this UNIQUE constraint is what guarantees at most
        -- one chat per pair even under concurrent first contact.
        CREATE TABLE IF NOT EXISTS chats (
            id           TEXT PRIMARY KEY,
            user_a       TEXT NOT NULL REFERENCES users(id),
            user_b       TEXT NOT NULL REFERENCES users(id),
            created_at   TEXT NOT NULL,
            last_read_a  TEXT,
            last_read_b  TEXT,
            UNIQUE(user_a, user_b),
            CHECK(user_a < user_b)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            chat_id     TEXT NOT NULL REFERENCES chats(id),
            sender_id   TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_chat
            ON messages(chat_id, created_at);
        ",
    )?;

    seed::run(conn)?;

    info!("Database migrations complete");
    Ok(())
}
