use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;

use crate::models::{ChatRow, MessageRow, RouteRow, SharedRouteRow, UserRouteRow, UserRow};
use crate::{Database, StoreError};

/// Timestamps are stored as fixed-width RFC 3339 strings (microseconds, Z
/// suffix) so lexicographic comparison in SQL equals chronological order.
fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<String, StoreError> {
        self.with_conn(|conn| {
            let created_at = now();
            conn.execute(
                "INSERT INTO users (id, username, email, password, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, username, email, password_hash, &created_at),
            )
            .map_err(StoreError::from_insert)?;
            Ok(created_at)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Catalog & route associations --

    pub fn list_routes(&self) -> Result<Vec<RouteRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, short_name, long_name, route_type, color, text_color
                 FROM routes
                 ORDER BY short_name",
            )?;
            let rows = stmt
                .query_map([], |row| route_from_row(row, 0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_route(&self, route_id: &str) -> Result<Option<RouteRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, short_name, long_name, route_type, color, text_color
                 FROM routes
                 WHERE id = ?1",
            )?;
            stmt.query_row([route_id], |row| route_from_row(row, 0))
                .optional()
        })
    }

    pub fn list_user_routes(&self, user_id: &str) -> Result<Vec<UserRouteRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT ur.id, ur.user_id, ur.route_id, ur.created_at,
                        r.id, r.short_name, r.long_name, r.route_type, r.color, r.text_color
                 FROM user_routes ur
                 JOIN routes r ON r.id = ur.route_id
                 WHERE ur.user_id = ?1
                 ORDER BY ur.created_at, ur.rowid",
            )?;
            let rows = stmt
                .query_map([user_id], user_route_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Inserts the association and returns the joined row. The
    /// UNIQUE(user_id, route_id) index rejects a concurrent duplicate with
    /// `Duplicate` rather than creating a second row.
    pub fn insert_user_route(
        &self,
        id: &str,
        user_id: &str,
        route_id: &str,
    ) -> Result<UserRouteRow, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_routes (id, user_id, route_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                (id, user_id, route_id, now()),
            )
            .map_err(StoreError::from_insert)?;

            query_user_route(conn, id)?.ok_or(StoreError::Sqlite(
                rusqlite::Error::QueryReturnedNoRows,
            ))
        })
    }

    pub fn get_user_route(&self, id: &str) -> Result<Option<UserRouteRow>, StoreError> {
        self.with_conn(|conn| query_user_route(conn, id))
    }

    pub fn delete_user_route(&self, id: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM user_routes WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Matching --

    /// One row per (other rider, route we both ride). Self-join on route_id;
    /// the caller's own rows are excluded here, grouping happens upstream.
    pub fn shared_route_rows(&self, user_id: &str) -> Result<Vec<SharedRouteRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username,
                        r.id, r.short_name, r.long_name, r.route_type, r.color, r.text_color
                 FROM user_routes mine
                 JOIN user_routes theirs
                   ON theirs.route_id = mine.route_id AND theirs.user_id <> mine.user_id
                 JOIN users u ON u.id = theirs.user_id
                 JOIN routes r ON r.id = mine.route_id
                 WHERE mine.user_id = ?1",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(SharedRouteRow {
                        user_id: row.get(0)?,
                        username: row.get(1)?,
                        route: route_from_row(row, 2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Chats --

    /// Looks up the chat for the unordered (me, other) pair, creating it if
    /// absent. The pair is normalized to canonical order before touching the
    /// table, so the UNIQUE(user_a, user_b) index makes a concurrent
    /// duplicate insert fail; that failure is retried as a lookup. Returns
    /// the row and whether this call created it.
    pub fn find_or_create_chat(
        &self,
        new_id: &str,
        me: &str,
        other: &str,
    ) -> Result<(ChatRow, bool), StoreError> {
        let (user_a, user_b) = if me < other { (me, other) } else { (other, me) };

        self.with_conn(|conn| {
            if let Some(row) = query_chat_by_pair(conn, user_a, user_b)? {
                return Ok((row, false));
            }

            let insert = conn.execute(
                "INSERT INTO chats (id, user_a, user_b, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                (new_id, user_a, user_b, now()),
            );

            let created = match insert.map_err(StoreError::from_insert) {
                Ok(_) => true,
                // Lost the race: the other participant inserted first.
                Err(StoreError::Duplicate) => false,
                Err(e) => return Err(e),
            };

            let row = query_chat_by_pair(conn, user_a, user_b)?.ok_or(StoreError::Sqlite(
                rusqlite::Error::QueryReturnedNoRows,
            ))?;
            Ok((row, created))
        })
    }

    pub fn get_chat(&self, chat_id: &str) -> Result<Option<ChatRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{CHAT_SELECT} WHERE c.id = ?1"))?;
            stmt.query_row([chat_id], chat_from_row).optional()
        })
    }

    pub fn list_chats_for_user(&self, user_id: &str) -> Result<Vec<ChatRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("{CHAT_SELECT} WHERE c.user_a = ?1 OR c.user_b = ?1"))?;
            let rows = stmt
                .query_map([user_id], chat_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch the newest message of each listed chat. MAX(rowid) per
    /// chat is the latest append, which in an append-only log is also the
    /// max created_at with insertion order breaking ties.
    pub fn last_messages_for_chats(
        &self,
        chat_ids: &[String],
    ) -> Result<Vec<MessageRow>, StoreError> {
        if chat_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=chat_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT m.id, m.chat_id, m.sender_id, u.username, m.content, m.created_at
                 FROM messages m
                 JOIN users u ON u.id = m.sender_id
                 WHERE m.rowid IN (
                     SELECT MAX(rowid) FROM messages
                     WHERE chat_id IN ({})
                     GROUP BY chat_id
                 )",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = chat_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), message_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Unread tally per chat for one user: messages from the other side
    /// newer than the user's read marker. A NULL marker means never read,
    /// which the COALESCE('') makes compare below every timestamp.
    pub fn unread_counts_for_user(&self, user_id: &str) -> Result<Vec<(String, u32)>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.chat_id, COUNT(*)
                 FROM messages m
                 JOIN chats c ON c.id = m.chat_id
                 WHERE (c.user_a = ?1 OR c.user_b = ?1)
                   AND m.sender_id <> ?1
                   AND m.created_at > COALESCE(
                       CASE WHEN c.user_a = ?1 THEN c.last_read_a ELSE c.last_read_b END, '')
                 GROUP BY m.chat_id",
            )?;
            let rows = stmt
                .query_map([user_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn unread_count_for_chat(
        &self,
        chat_id: &str,
        user_id: &str,
    ) -> Result<u32, StoreError> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*)
                 FROM messages m
                 JOIN chats c ON c.id = m.chat_id
                 WHERE c.id = ?1
                   AND m.sender_id <> ?2
                   AND m.created_at > COALESCE(
                       CASE WHEN c.user_a = ?2 THEN c.last_read_a ELSE c.last_read_b END, '')",
                (chat_id, user_id),
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Moves the caller's read marker to now. Only the side the user sits on
    /// is touched; the other participant's marker is untouched.
    pub fn mark_chat_read(&self, chat_id: &str, user_id: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE chats SET
                     last_read_a = CASE WHEN user_a = ?2 THEN ?3 ELSE last_read_a END,
                     last_read_b = CASE WHEN user_b = ?2 THEN ?3 ELSE last_read_b END
                 WHERE id = ?1",
                (chat_id, user_id, now()),
            )?;
            Ok(())
        })
    }

    // -- Messages --

    pub fn list_messages(&self, chat_id: &str) -> Result<Vec<MessageRow>, StoreError> {
        self.with_conn(|conn| {
            // JOIN users for sender_username in one query (no N+1); rowid
            // breaks created_at ties in insertion order.
            let mut stmt = conn.prepare(
                "SELECT m.id, m.chat_id, m.sender_id, u.username, m.content, m.created_at
                 FROM messages m
                 JOIN users u ON u.id = m.sender_id
                 WHERE m.chat_id = ?1
                 ORDER BY m.created_at, m.rowid",
            )?;
            let rows = stmt
                .query_map([chat_id], message_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn insert_message(
        &self,
        id: &str,
        chat_id: &str,
        sender_id: &str,
        content: &str,
    ) -> Result<String, StoreError> {
        self.with_conn(|conn| {
            let created_at = now();
            conn.execute(
                "INSERT INTO messages (id, chat_id, sender_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, chat_id, sender_id, content, &created_at),
            )
            .map_err(StoreError::from_insert)?;
            Ok(created_at)
        })
    }
}

const CHAT_SELECT: &str = "\
    SELECT c.id, c.user_a, ua.username, c.user_b, ub.username,
           c.created_at, c.last_read_a, c.last_read_b
    FROM chats c
    JOIN users ua ON ua.id = c.user_a
    JOIN users ub ON ub.id = c.user_b";

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>, StoreError> {
    // `column` is a compile-time constant at every call site, never input.
    let mut stmt = conn.prepare(&format!(
        "SELECT id, username, email, password, created_at FROM users WHERE {column} = ?1"
    ))?;

    stmt.query_row([value], |row| {
        Ok(UserRow {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password: row.get(3)?,
            created_at: row.get(4)?,
        })
    })
    .optional()
}

fn query_user_route(conn: &Connection, id: &str) -> Result<Option<UserRouteRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT ur.id, ur.user_id, ur.route_id, ur.created_at,
                r.id, r.short_name, r.long_name, r.route_type, r.color, r.text_color
         FROM user_routes ur
         JOIN routes r ON r.id = ur.route_id
         WHERE ur.id = ?1",
    )?;
    stmt.query_row([id], user_route_from_row).optional()
}

fn query_chat_by_pair(
    conn: &Connection,
    user_a: &str,
    user_b: &str,
) -> Result<Option<ChatRow>, StoreError> {
    let mut stmt = conn.prepare(&format!("{CHAT_SELECT} WHERE c.user_a = ?1 AND c.user_b = ?2"))?;
    stmt.query_row([user_a, user_b], chat_from_row).optional()
}

fn route_from_row(row: &rusqlite::Row<'_>, base: usize) -> rusqlite::Result<RouteRow> {
    Ok(RouteRow {
        id: row.get(base)?,
        short_name: row.get(base + 1)?,
        long_name: row.get(base + 2)?,
        route_type: row.get(base + 3)?,
        color: row.get(base + 4)?,
        text_color: row.get(base + 5)?,
    })
}

fn user_route_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRouteRow> {
    Ok(UserRouteRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        route_id: row.get(2)?,
        created_at: row.get(3)?,
        route: route_from_row(row, 4)?,
    })
}

fn chat_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatRow> {
    Ok(ChatRow {
        id: row.get(0)?,
        user_a: row.get(1)?,
        username_a: row.get(2)?,
        user_b: row.get(3)?,
        username_b: row.get(4)?,
        created_at: row.get(5)?,
        last_read_a: row.get(6)?,
        last_read_b: row.get(7)?,
    })
}

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        sender_id: row.get(2)?,
        sender_username: row.get(3)?,
        content: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, StoreError>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, StoreError> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
