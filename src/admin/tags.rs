use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{ListQuery, Message, NameRequest};
use crate::{
    auth::StaffUser,
    cache::HOME_KEY,
    error::{is_unique_violation_any, AppError, AppResult},
    pagination::Paged,
    state::AppState,
    tags::{
        repo,
        repo_types::{Tag, TagWithCount},
    },
};

pub const TAG_NAME_MAX: usize = 50;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/:id", get(tag_details).put(edit_tag).delete(delete_tag))
}

pub(super) fn clean_name(raw: &str, max: usize, what: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::bad_request(format!("{what} name is required")));
    }
    if name.chars().count() > max {
        return Err(AppError::bad_request(format!(
            "{what} name must be at most {max} characters"
        )));
    }
    Ok(name.to_string())
}

#[derive(Debug, Serialize)]
pub struct TagDetails {
    #[serde(flatten)]
    pub tag: Tag,
    pub recipe_count: i64,
}

#[instrument(skip(state))]
pub async fn list_tags(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Paged<TagWithCount>>> {
    let page = q.paging();
    let (rows, total) = repo::list_with_counts(&state.db, q.search(), page.limit(), page.offset()).await?;
    Ok(Json(Paged::new(rows, &page, total)))
}

#[instrument(skip(state, payload))]
pub async fn create_tag(
    State(state): State<AppState>,
    StaffUser(moderator): StaffUser,
    Json(payload): Json<NameRequest>,
) -> AppResult<(StatusCode, Json<Tag>)> {
    let name = clean_name(&payload.name, TAG_NAME_MAX, "Tag")?;
    if repo::find_by_name(&state.db, &name, None).await?.is_some() {
        warn!(%name, "duplicate tag");
        return Err(AppError::conflict("A tag with this name already exists"));
    }
    let tag = repo::create(&state.db, &name).await.map_err(|e| {
        if is_unique_violation_any(&e) {
            AppError::conflict("A tag with this name already exists")
        } else {
            AppError::Internal(e)
        }
    })?;
    info!(tag_id = %tag.id, %moderator, name = %tag.name, "tag created");
    Ok((StatusCode::CREATED, Json(tag)))
}

#[instrument(skip(state))]
pub async fn tag_details(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TagDetails>> {
    let tag = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Tag not found"))?;
    let recipe_count = repo::usage_count(&state.db, id).await?;
    Ok(Json(TagDetails { tag, recipe_count }))
}

#[instrument(skip(state, payload))]
pub async fn edit_tag(
    State(state): State<AppState>,
    StaffUser(moderator): StaffUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<NameRequest>,
) -> AppResult<Json<Tag>> {
    let name = clean_name(&payload.name, TAG_NAME_MAX, "Tag")?;
    if repo::find_by_name(&state.db, &name, Some(id)).await?.is_some() {
        warn!(%name, tag_id = %id, "rename collides with existing tag");
        return Err(AppError::conflict("A tag with this name already exists"));
    }
    let tag = repo::rename(&state.db, id, &name)
        .await?
        .ok_or_else(|| AppError::not_found("Tag not found"))?;
    state.cache.remove(HOME_KEY).await;
    info!(tag_id = %id, %moderator, name = %tag.name, "tag renamed");
    Ok(Json(tag))
}

#[instrument(skip(state))]
pub async fn delete_tag(
    State(state): State<AppState>,
    StaffUser(moderator): StaffUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Message>> {
    let tag = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Tag not found"))?;
    let used = repo::usage_count(&state.db, id).await?;
    if used > 0 {
        return Err(AppError::conflict(format!(
            "Tag \"{}\" is used by {used} recipe(s) and cannot be deleted",
            tag.name
        )));
    }
    repo::delete(&state.db, id).await?;
    state.cache.remove(HOME_KEY).await;
    info!(tag_id = %id, %moderator, "tag deleted");
    Ok(Json(Message::new(format!("Tag \"{}\" deleted", tag.name))))
}
