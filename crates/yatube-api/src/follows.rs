use axum::{
    Extension,
    extract::{Path, State},
    response::Redirect,
};
use tracing::info;

use yatube_db::Database;
use yatube_types::api::{Claims, FollowStats};

use crate::error::{ApiError, ApiResult};
use crate::posts::profile_url;
use crate::state::{AppState, with_db};

/// Follower/following counters for `author_id`, plus whether `viewer` follows
/// them.
pub fn follow_stats(db: &Database, author_id: i64, viewer: Option<i64>) -> anyhow::Result<FollowStats> {
    let following = match viewer {
        Some(viewer) => db.is_following(viewer, author_id)?,
        None => false,
    };

    Ok(FollowStats {
        subscribers: db.count_followers(author_id)?,
        signed: db.count_following(author_id)?,
        following,
    })
}

async fn resolve_author(state: &AppState, username: String) -> ApiResult<i64> {
    with_db(state, move |db| db.get_user_by_username(&username))
        .await?
        .map(|user| user.id)
        .ok_or(ApiError::NotFound)
}

/// /<username>/follow/
///
/// Following yourself and following twice are both quiet no-ops.
pub async fn follow(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Redirect> {
    let target = profile_url(&username);
    let author_id = resolve_author(&state, username.clone()).await?;

    if author_id == claims.sub {
        return Ok(Redirect::to(&target));
    }

    let user_id = claims.sub;
    let created = with_db(&state, move |db| db.insert_follow(user_id, author_id)).await?;
    if created {
        info!("{} now follows {}", claims.username, username);
    }

    Ok(Redirect::to(&target))
}

/// /<username>/unfollow/
///
/// Unlike `follow`, a missing edge is reported as not found.
pub async fn unfollow(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Redirect> {
    let target = profile_url(&username);
    let author_id = resolve_author(&state, username.clone()).await?;

    let user_id = claims.sub;
    let removed = with_db(&state, move |db| db.delete_follow(user_id, author_id)).await?;
    if !removed {
        return Err(ApiError::NotFound);
    }

    info!("{} unfollowed {}", claims.username, username);
    Ok(Redirect::to(&target))
}
