/// Database row types — these map directly to SQLite rows.
/// Distinct from waymate-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

#[derive(Debug)]
pub struct RouteRow {
    pub id: String,
    pub short_name: String,
    pub long_name: String,
    pub route_type: String,
    pub color: String,
    pub text_color: String,
}

#[derive(Debug)]
pub struct UserRouteRow {
    pub id: String,
    pub user_id: String,
    pub route_id: String,
    pub created_at: String,
    pub route: RouteRow,
}

/// One (candidate, shared route) pair from the matching join. Grouping and
/// ranking happen in the API layer.
pub struct SharedRouteRow {
    pub user_id: String,
    pub username: String,
    pub route: RouteRow,
}

pub struct ChatRow {
    pub id: String,
    pub user_a: String,
    pub username_a: String,
    pub user_b: String,
    pub username_b: String,
    pub created_at: String,
    pub last_read_a: Option<String>,
    pub last_read_b: Option<String>,
}

pub struct MessageRow {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub sender_username: String,
    pub content: String,
    pub created_at: String,
}
