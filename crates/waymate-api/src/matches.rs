use std::collections::HashMap;

use axum::{Extension, Json, extract::State, response::IntoResponse};

use waymate_db::models::SharedRouteRow;
use waymate_types::api::{Claims, MatchListResponse, MatchedUser};

use crate::auth::AppState;
use crate::convert::{parse_uuid, route_from_row};
use crate::error::ApiError;
use crate::routes::blocking;

/// Other users sharing at least one route with the caller, ranked by
/// overlap. The storage layer provides one row per (candidate, shared
/// route); this handler only groups and ranks.
pub async fn find_matches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let rows = blocking(move || Ok(db.db.shared_route_rows(&user_id)?)).await?;

    Ok(Json(MatchListResponse {
        users: rank_matches(rows),
    }))
}

/// Group the join rows by candidate and order the result: most shared routes
/// first, username ascending among equals, so the ranking is deterministic.
pub(crate) fn rank_matches(rows: Vec<SharedRouteRow>) -> Vec<MatchedUser> {
    let mut grouped: HashMap<String, MatchedUser> = HashMap::new();
    for row in rows {
        let entry = grouped
            .entry(row.user_id.clone())
            .or_insert_with(|| MatchedUser {
                id: parse_uuid(&row.user_id, "match user id"),
                username: row.username.clone(),
                shared_routes: vec![],
                shared_routes_count: 0,
            });
        entry.shared_routes.push(route_from_row(row.route));
    }

    let mut matches: Vec<MatchedUser> = grouped
        .into_values()
        .map(|mut m| {
            m.shared_routes.sort_by(|a, b| a.short_name.cmp(&b.short_name));
            m.shared_routes_count = m.shared_routes.len();
            m
        })
        .collect();

    matches.sort_by(|a, b| {
        b.shared_routes_count
            .cmp(&a.shared_routes_count)
            .then_with(|| a.username.cmp(&b.username))
    });

    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use waymate_db::models::RouteRow;

    fn route(id: &str) -> RouteRow {
        RouteRow {
            id: id.to_string(),
            short_name: id.to_string(),
            long_name: format!("Route {id}"),
            route_type: "train".to_string(),
            color: "96092B".to_string(),
            text_color: "FFFFFF".to_string(),
        }
    }

    fn row(user: &Uuid, username: &str, route_id: &str) -> SharedRouteRow {
        SharedRouteRow {
            user_id: user.to_string(),
            username: username.to_string(),
            route: route(route_id),
        }
    }

    #[test]
    fn empty_rows_yield_no_matches() {
        assert!(rank_matches(vec![]).is_empty());
    }

    #[test]
    fn counts_equal_number_of_shared_routes() {
        let bob = Uuid::new_v4();
        let ranked = rank_matches(vec![row(&bob, "bob", "01"), row(&bob, "bob", "21")]);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, bob);
        assert_eq!(ranked[0].shared_routes_count, 2);
        assert_eq!(ranked[0].shared_routes.len(), 2);
    }

    #[test]
    fn higher_overlap_ranks_first() {
        let bob = Uuid::new_v4();
        let carol = Uuid::new_v4();
        let ranked = rank_matches(vec![
            row(&bob, "bob", "01"),
            row(&carol, "carol", "01"),
            row(&carol, "carol", "21"),
        ]);

        assert_eq!(ranked[0].username, "carol");
        assert_eq!(ranked[0].shared_routes_count, 2);
        assert_eq!(ranked[1].username, "bob");
        assert_eq!(ranked[1].shared_routes_count, 1);
    }

    #[test]
    fn equal_overlap_breaks_ties_by_username() {
        let zed = Uuid::new_v4();
        let amy = Uuid::new_v4();
        let ranked = rank_matches(vec![row(&zed, "zed", "01"), row(&amy, "amy", "01")]);

        assert_eq!(ranked[0].username, "amy");
        assert_eq!(ranked[1].username, "zed");
    }

    #[test]
    fn shared_routes_listed_in_short_name_order() {
        let bob = Uuid::new_v4();
        let ranked = rank_matches(vec![row(&bob, "bob", "21"), row(&bob, "bob", "01")]);

        let names: Vec<&str> = ranked[0]
            .shared_routes
            .iter()
            .map(|r| r.short_name.as_str())
            .collect();
        assert_eq!(names, vec!["01", "21"]);
    }
}
