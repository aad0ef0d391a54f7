use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{EditUserRequest, ListQuery, LockRequest, Message},
    repo::{self, AdminUserRow, UserEdit},
};
use crate::{
    auth::{
        repo_types::{Role, User},
        services::is_valid_email,
        AdminUser,
    },
    cache::HOME_KEY,
    error::{is_unique_violation_any, AppError, AppResult},
    images,
    pagination::Paged,
    recipes::repo as recipes_repo,
    state::AppState,
};

const PERMANENT_LOCK_DAYS: i64 = 365 * 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(user_details).put(edit_user).delete(delete_user))
        .route("/users/:id/lock", post(lock_user))
        .route("/users/:id/unlock", post(unlock_user))
}

pub(super) async fn invalidate_dashboard(st: &AppState) {
    st.cache.remove_prefix("dashboard:").await;
}

/// `days` in `1..=PERMANENT_LOCK_DAYS` locks until now + days, anything else effectively forever.
pub fn lockout_end(now: OffsetDateTime, days: i64) -> OffsetDateTime {
    let days = if (1..=PERMANENT_LOCK_DAYS).contains(&days) {
        days
    } else {
        PERMANENT_LOCK_DAYS
    };
    now + Duration::days(days)
}

fn validate_edit(req: &EditUserRequest) -> AppResult<Role> {
    if req.username.trim().is_empty() {
        return Err(AppError::bad_request("Username is required"));
    }
    if !is_valid_email(req.email.trim()) {
        return Err(AppError::bad_request("Invalid email"));
    }
    Role::parse(&req.role).ok_or_else(|| AppError::bad_request("Role must be User, Moderator or Admin"))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Paged<AdminUserRow>>> {
    let page = q.paging();
    let (rows, total) = repo::list_users(&state.db, q.search(), page.limit(), page.offset()).await?;
    Ok(Json(Paged::new(rows, &page, total)))
}

#[instrument(skip(state))]
pub async fn user_details(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AdminUserRow>> {
    let row = repo::user_details(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(row))
}

#[instrument(skip(state, payload))]
pub async fn edit_user(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<EditUserRequest>,
) -> AppResult<Json<AdminUserRow>> {
    let role = validate_edit(&payload)?;
    let email = payload.email.trim().to_lowercase();
    let edit = UserEdit {
        username: payload.username.trim(),
        email: &email,
        phone_number: payload.phone_number.as_deref().map(str::trim).filter(|p| !p.is_empty()),
        email_confirmed: payload.email_confirmed,
        lockout_enabled: payload.lockout_enabled,
        lockout_end: payload.lockout_end,
        role,
    };
    repo::edit_user(&state.db, id, &edit)
        .await
        .map_err(|e| {
            if is_unique_violation_any(&e) {
                AppError::conflict("Email or username already in use")
            } else {
                AppError::Internal(e)
            }
        })?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    invalidate_dashboard(&state).await;
    info!(user_id = %id, %admin_id, role = role.as_str(), "user edited by admin");
    let row = repo::user_details(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(row))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Message>> {
    if id == admin_id {
        warn!(%admin_id, "admin attempted self-deletion");
        return Err(AppError::bad_request("You cannot delete your own account"));
    }
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    let urls: Vec<String> = recipes_repo::list_by_user(&state.db, id)
        .await?
        .into_iter()
        .filter_map(|r| r.image_url)
        .chain(user.avatar_url.clone())
        .collect();

    if !repo::delete_user_cascade(&state.db, id).await? {
        return Err(AppError::not_found("User not found"));
    }
    for url in &urls {
        images::services::delete_by_url(&state, Some(url)).await;
    }

    invalidate_dashboard(&state).await;
    state.cache.remove(HOME_KEY).await;
    info!(user_id = %id, %admin_id, username = %user.username, "user deleted by admin");
    Ok(Json(Message::new(format!("User {} deleted", user.username))))
}

#[instrument(skip(state))]
pub async fn lock_user(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
    Query(q): Query<LockRequest>,
) -> AppResult<Json<Message>> {
    let end = lockout_end(OffsetDateTime::now_utc(), q.days);
    if !repo::set_lockout(&state.db, id, Some(end)).await? {
        return Err(AppError::not_found("User not found"));
    }
    invalidate_dashboard(&state).await;
    info!(user_id = %id, %admin_id, days = q.days, "user locked");
    Ok(Json(Message::new("User locked")))
}

#[instrument(skip(state))]
pub async fn unlock_user(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Message>> {
    if !repo::set_lockout(&state.db, id, None).await? {
        return Err(AppError::not_found("User not found"));
    }
    invalidate_dashboard(&state).await;
    info!(user_id = %id, %admin_id, "user unlocked");
    Ok(Json(Message::new("User unlocked")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{app::build_app, auth::services::JwtKeys};
    use axum::{
        body::Body,
        extract::FromRef,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn token(state: &AppState, id: Uuid, role: Role) -> String {
        JwtKeys::from_ref(state).sign_access(id, role).unwrap()
    }

    #[test]
    fn lock_duration() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(lockout_end(now, 3), now + Duration::days(3));
        assert!(lockout_end(now, 0) > now + Duration::days(365 * 99));
        assert!(lockout_end(now, -5) > now + Duration::days(365 * 99));
    }

    #[test]
    fn oversized_lock_is_permanent() {
        let now = OffsetDateTime::now_utc();
        let forever = now + Duration::days(PERMANENT_LOCK_DAYS);
        assert_eq!(lockout_end(now, 200_000_000_000), forever);
        assert_eq!(lockout_end(now, i64::MAX), forever);
        assert_eq!(lockout_end(now, PERMANENT_LOCK_DAYS), forever);
    }

    #[tokio::test]
    async fn moderators_cannot_manage_users() {
        let state = AppState::fake();
        let t = token(&state, Uuid::new_v4(), Role::Moderator);
        let res = build_app(state)
            .oneshot(
                Request::builder()
                    .uri("/admin/users")
                    .header("authorization", format!("Bearer {t}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_cannot_delete_self() {
        let state = AppState::fake();
        let me = Uuid::new_v4();
        let t = token(&state, me, Role::Admin);
        let res = build_app(state)
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/admin/users/{me}"))
                    .header("authorization", format!("Bearer {t}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn edit_rejects_unknown_role() {
        let state = AppState::fake();
        let t = token(&state, Uuid::new_v4(), Role::Admin);
        let res = build_app(state)
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/admin/users/{}", Uuid::new_v4()))
                    .header("authorization", format!("Bearer {t}"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"username":"bob","email":"bob@x.io","role":"Root"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
