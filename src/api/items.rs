/// Item endpoints
///
/// Mutating an item requires the requester to own it or hold the superuser
/// flag.
use crate::{
    api::{validate_payload, Pagination},
    auth::ActiveUser,
    context::AppContext,
    db::models::{Item, User},
    error::{ApiError, ApiResult},
    repo::items::{ItemCreate, ItemUpdate},
    repo::Repository,
};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

/// Item creation payload; ownership comes from the credential, not the body
#[derive(Debug, Deserialize, Validate)]
pub struct ItemIn {
    #[validate(length(min = 1, max = 256))]
    pub title: String,
    pub description: Option<String>,
}

/// Build item routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/v1/items", get(list_items).post(create_item))
        .route(
            "/api/v1/items/:item_id",
            get(read_item).put(update_item).delete(delete_item),
        )
}

fn ensure_owner_or_superuser(requester: &User, item: &Item) -> ApiResult<()> {
    if requester.is_superuser || item.owner_id == requester.id {
        Ok(())
    } else {
        Err(ApiError::Authorization(
            "Not enough permissions".to_string(),
        ))
    }
}

/// List items, paginated; superusers see every item, others only their own
async fn list_items(
    State(ctx): State<AppContext>,
    ActiveUser(requester): ActiveUser,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<Item>>> {
    let items = if requester.is_superuser {
        ctx.items.list(page.skip, page.limit).await?
    } else {
        ctx.items
            .list_by_owner(requester.id, page.skip, page.limit)
            .await?
    };

    Ok(Json(items))
}

/// Create an item owned by the requester
async fn create_item(
    State(ctx): State<AppContext>,
    ActiveUser(requester): ActiveUser,
    Json(payload): Json<ItemIn>,
) -> ApiResult<Json<Item>> {
    validate_payload(&payload)?;

    let item = ctx
        .items
        .create(ItemCreate {
            title: payload.title,
            description: payload.description,
            owner_id: requester.id,
        })
        .await?;

    tracing::info!(item_id = item.id, owner_id = requester.id, "Created item");

    Ok(Json(item))
}

/// Fetch an item by id
async fn read_item(
    State(ctx): State<AppContext>,
    ActiveUser(requester): ActiveUser,
    Path(item_id): Path<i64>,
) -> ApiResult<Json<Item>> {
    let item = ctx
        .items
        .get(item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;

    ensure_owner_or_superuser(&requester, &item)?;

    Ok(Json(item))
}

/// Update an item by id
async fn update_item(
    State(ctx): State<AppContext>,
    ActiveUser(requester): ActiveUser,
    Path(item_id): Path<i64>,
    Json(payload): Json<ItemUpdate>,
) -> ApiResult<Json<Item>> {
    validate_payload(&payload)?;

    let existing = ctx
        .items
        .get(item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;

    ensure_owner_or_superuser(&requester, &existing)?;

    let updated = ctx.items.update(existing, payload).await?;

    Ok(Json(updated))
}

/// Delete an item by id
async fn delete_item(
    State(ctx): State<AppContext>,
    ActiveUser(requester): ActiveUser,
    Path(item_id): Path<i64>,
) -> ApiResult<Json<Item>> {
    let existing = ctx
        .items
        .get(item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;

    ensure_owner_or_superuser(&requester, &existing)?;

    let removed = ctx
        .items
        .remove(item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;

    tracing::info!(item_id, "Deleted item");

    Ok(Json(removed))
}
