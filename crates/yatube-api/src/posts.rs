use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::{info, warn};

use yatube_db::models::PostRow;
use yatube_db::PostFilter;
use yatube_types::api::{Claims, FormMode, PostFormPage, PostPage};

use crate::error::{ApiError, ApiResult};
use crate::follows::follow_stats;
use crate::forms::RawPostForm;
use crate::middleware::Identity;
use crate::state::{AppState, with_db};
use crate::views;

pub fn post_url(username: &str, post_id: i64) -> String {
    format!("/{}/{}/", username, post_id)
}

pub fn profile_url(username: &str) -> String {
    format!("/{}/", username)
}

/// Resolve `/<username>/<post_id>/` to a post; the post must belong to that
/// user.
pub(crate) async fn load_post(state: &AppState, username: String, post_id: &str) -> ApiResult<PostRow> {
    let post_id: i64 = post_id.parse().map_err(|_| ApiError::NotFound)?;
    with_db(state, move |db| db.get_post(post_id))
        .await?
        .filter(|post| post.author_username == username)
        .ok_or(ApiError::NotFound)
}

/// GET /new/
pub async fn new_post_form(State(state): State<AppState>) -> ApiResult<Json<PostFormPage>> {
    let groups = with_db(&state, |db| db.list_groups()).await?;

    Ok(Json(PostFormPage {
        mode: FormMode::New,
        post: None,
        groups: groups.into_iter().map(views::group).collect(),
    }))
}

/// POST /new/
pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> ApiResult<Response> {
    let form = RawPostForm::read(multipart).await?.clean(&state).await?;

    let stored = match &form.image {
        Some(image) => Some(state.media.store(image).await?),
        None => None,
    };
    let image = stored.as_ref().map_or_else(String::new, |s| s.path.clone());

    let author_id = claims.sub;
    let text = form.text;
    let group_id = form.group_id;
    let inserted = with_db(&state, move |db| db.insert_post(author_id, &text, group_id, &image)).await;
    let post_id = match inserted {
        Ok(id) => id,
        Err(e) => {
            if let Some(stored) = &stored {
                state.media.discard(stored).await;
            }
            return Err(e);
        }
    };

    info!("Post {} created by {}", post_id, claims.username);
    Ok(Redirect::to("/").into_response())
}

/// GET /<username>/<post_id>/
pub async fn post_view(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<PostPage>> {
    let row = load_post(&state, username, &post_id).await?;
    let viewer = identity.user_id();

    let post_id = row.id;
    let author_id = row.author_id;
    let (posts, comments, stats) = with_db(&state, move |db| {
        let posts = db.count_posts(PostFilter::Author(author_id))?;
        let comments = db.list_comments(post_id)?;
        let stats = follow_stats(db, author_id, viewer)?;
        Ok((posts, comments, stats))
    })
    .await?;

    let post = views::post(row);
    Ok(Json(PostPage {
        author: post.author.clone(),
        post,
        posts,
        comments: comments.into_iter().map(views::comment).collect(),
        stats,
    }))
}

/// GET /<username>/<post_id>/edit/
pub async fn edit_post_form(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Response> {
    let row = load_post(&state, username, &post_id).await?;
    if row.author_id != claims.sub {
        return Ok(Redirect::to(&post_url(&row.author_username, row.id)).into_response());
    }

    let groups = with_db(&state, |db| db.list_groups()).await?;
    Ok(Json(PostFormPage {
        mode: FormMode::Edit,
        post: Some(views::post(row)),
        groups: groups.into_iter().map(views::group).collect(),
    })
    .into_response())
}

/// POST /<username>/<post_id>/edit/
///
/// Non-authors are sent to the post page and nothing changes. An edit never
/// touches `pub_date`; leaving the image field empty keeps the current image.
pub async fn edit_post(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> ApiResult<Response> {
    let row = load_post(&state, username, &post_id).await?;
    let target = post_url(&row.author_username, row.id);
    if row.author_id != claims.sub {
        warn!(
            "User {} tried to edit post {} owned by {}",
            claims.username, row.id, row.author_username
        );
        return Ok(Redirect::to(&target).into_response());
    }

    let form = RawPostForm::read(multipart).await?.clean(&state).await?;
    let stored = match &form.image {
        Some(image) => Some(state.media.store(image).await?),
        None => None,
    };
    let image = stored.as_ref().map_or(row.image, |s| s.path.clone());

    let post_id = row.id;
    let text = form.text;
    let group_id = form.group_id;
    let updated = with_db(&state, move |db| db.update_post(post_id, &text, group_id, &image)).await;
    if let Err(e) = updated {
        if let Some(stored) = &stored {
            state.media.discard(stored).await;
        }
        return Err(e);
    }

    info!("Post {} edited by {}", post_id, claims.username);
    Ok(Redirect::to(&target).into_response())
}

/// /<username>/<post_id>/delete/
pub async fn delete_post(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Response> {
    let row = load_post(&state, username, &post_id).await?;
    if row.author_id != claims.sub {
        warn!(
            "User {} tried to delete post {} owned by {}",
            claims.username, row.id, row.author_username
        );
        return Ok(Redirect::to(&post_url(&row.author_username, row.id)).into_response());
    }

    let post_id = row.id;
    with_db(&state, move |db| db.delete_post(post_id)).await?;

    let post = views::post(row);
    info!("Post {} ({:?}) deleted by {}", post_id, post.label(), claims.username);
    Ok(Redirect::to(&profile_url(&post.author.username)).into_response())
}
