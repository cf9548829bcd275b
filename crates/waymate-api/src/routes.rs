use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use waymate_db::StoreError;
use waymate_types::api::{
    AddRouteRequest, AddRouteResponse, CatalogResponse, Claims, UserRouteListResponse,
};

use crate::auth::AppState;
use crate::convert::{route_from_row, user_route_from_row};
use crate::error::ApiError;

/// Run storage work off the async runtime. The closure returns `ApiError`
/// directly so handlers can mix store calls (`?` via `From<StoreError>`)
/// with domain checks; join errors are logged and become internal errors.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("blocking task failed"))
    })?
}

pub async fn list_catalog_routes(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = blocking(move || Ok(db.db.list_routes()?)).await?;

    Ok(Json(CatalogResponse {
        routes: rows.into_iter().map(route_from_row).collect(),
    }))
}

pub async fn list_user_routes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let rows = blocking(move || Ok(db.db.list_user_routes(&user_id)?)).await?;

    Ok(Json(UserRouteListResponse {
        routes: rows.into_iter().map(user_route_from_row).collect(),
    }))
}

pub async fn add_user_route(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddRouteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let route_id = req.route_id.trim().to_string();
    if route_id.is_empty() {
        return Err(ApiError::InvalidInput("route_id is required".into()));
    }

    let db = state.clone();
    let user_id = claims.sub.to_string();
    let association_id = Uuid::new_v4();

    let row = blocking(move || {
        if db.db.get_route(&route_id)?.is_none() {
            return Err(ApiError::NotFound("route not found".into()));
        }

        db.db
            .insert_user_route(&association_id.to_string(), &user_id, &route_id)
            .map_err(|e| match e {
                StoreError::Duplicate => ApiError::Conflict("route already added".into()),
                other => other.into(),
            })
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(AddRouteResponse {
            route: user_route_from_row(row),
        }),
    ))
}

pub async fn remove_user_route(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_route_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let me = claims.sub.to_string();
    let id = user_route_id.to_string();

    blocking(move || {
        let row = db
            .db
            .get_user_route(&id)?
            .ok_or_else(|| ApiError::NotFound("route association not found".into()))?;

        if row.user_id != me {
            return Err(ApiError::Forbidden(
                "route association belongs to another user".into(),
            ));
        }

        db.db.delete_user_route(&id)?;
        Ok(())
    })
    .await?;

    Ok(Json(serde_json::json!({ "removed": true })))
}
