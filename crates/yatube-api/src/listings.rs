//! Paginated post listings and the user/group directories.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::Uri,
    response::Response,
};

use yatube_db::{Database, PostFilter};
use yatube_types::api::{Claims, GroupPage, GroupsPage, ProfilePage, UsersPage};
use yatube_types::models::{Page, Post};

use crate::cache::cached_json;
use crate::error::{ApiError, ApiResult};
use crate::follows::follow_stats;
use crate::middleware::Identity;
use crate::pagination::{PAGE_SIZE, PageQuery, PageWindow};
use crate::state::{AppState, with_db};
use crate::views;

fn cache_key(prefix: &str, uri: &Uri) -> String {
    let target = uri.path_and_query().map_or_else(|| uri.path(), |pq| pq.as_str());
    format!("{}:{}", prefix, target)
}

/// Count, clamp and fetch one page of `filter`.
fn load_page(db: &Database, filter: PostFilter, requested: Option<&str>) -> anyhow::Result<Page<Post>> {
    let count = db.count_posts(filter)?;
    let window = PageWindow::resolve(requested, count, PAGE_SIZE);
    let rows = db.list_posts(filter, window.limit(), window.offset())?;
    Ok(window.into_page(rows.into_iter().map(views::post).collect()))
}

/// GET /
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    uri: Uri,
) -> ApiResult<Response> {
    let db_state = state.clone();
    cached_json(
        state.cache.as_ref(),
        cache_key("index_page", &uri),
        state.cache_ttl.feed,
        move || async move {
            with_db(&db_state, move |db| load_page(db, PostFilter::All, query.page.as_deref())).await
        },
    )
    .await
}

/// GET /group/<slug>/
pub async fn group_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
    uri: Uri,
) -> ApiResult<Response> {
    let db_state = state.clone();
    cached_json(
        state.cache.as_ref(),
        cache_key("group_page", &uri),
        state.cache_ttl.feed,
        move || async move {
            with_db(&db_state, move |db| {
                let Some(group) = db.get_group_by_slug(&slug)? else {
                    return Ok(None);
                };
                let page = load_page(db, PostFilter::Group(group.id), query.page.as_deref())?;
                Ok(Some(GroupPage {
                    group: views::group(group),
                    page,
                }))
            })
            .await?
            .ok_or(ApiError::NotFound)
        },
    )
    .await
}

/// GET /<username>/
pub async fn profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<ProfilePage>> {
    let viewer = identity.user_id();

    with_db(&state, move |db| {
        let Some(author) = db.get_user_by_username(&username)? else {
            return Ok(None);
        };
        let page = load_page(db, PostFilter::Author(author.id), query.page.as_deref())?;
        let stats = follow_stats(db, author.id, viewer)?;
        Ok(Some(ProfilePage {
            author: views::user(author),
            page,
            stats,
        }))
    })
    .await?
    .map(Json)
    .ok_or(ApiError::NotFound)
}

/// GET /follow/
///
/// Cached per follower so one user's feed is never served to another.
pub async fn follow_index(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PageQuery>,
    uri: Uri,
) -> ApiResult<Response> {
    let user_id = claims.sub;
    let db_state = state.clone();
    cached_json(
        state.cache.as_ref(),
        cache_key(&format!("follow_page:{}", user_id), &uri),
        state.cache_ttl.feed,
        move || async move {
            with_db(&db_state, move |db| {
                load_page(db, PostFilter::FollowedBy(user_id), query.page.as_deref())
            })
            .await
        },
    )
    .await
}

/// GET /users/
pub async fn users_all(State(state): State<AppState>, uri: Uri) -> ApiResult<Response> {
    let db_state = state.clone();
    cached_json(
        state.cache.as_ref(),
        cache_key("users_all", &uri),
        state.cache_ttl.feed,
        move || async move {
            let users = with_db(&db_state, |db| db.list_users()).await?;
            Ok(UsersPage {
                users: users.into_iter().map(views::user).collect(),
            })
        },
    )
    .await
}

/// GET /groups_all/
pub async fn groups_all(State(state): State<AppState>, uri: Uri) -> ApiResult<Response> {
    let db_state = state.clone();
    cached_json(
        state.cache.as_ref(),
        cache_key("groups_all", &uri),
        state.cache_ttl.groups,
        move || async move {
            let groups = with_db(&db_state, |db| db.list_groups()).await?;
            Ok(GroupsPage {
                groups: groups.into_iter().map(views::group).collect(),
            })
        },
    )
    .await
}
