use axum::{
    Extension, Form,
    extract::{Path, State},
    response::Redirect,
};
use tracing::{info, warn};

use yatube_types::api::Claims;

use crate::error::{ApiError, ApiResult};
use crate::forms::CommentForm;
use crate::posts::{load_post, post_url};
use crate::state::{AppState, with_db};

/// POST /<username>/<post_id>/comment
///
/// Always lands back on the post page; an invalid form just doesn't create
/// anything.
pub async fn add_comment(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
    Extension(claims): Extension<Claims>,
    Form(form): Form<CommentForm>,
) -> ApiResult<Redirect> {
    let post = load_post(&state, username, &post_id).await?;
    let target = post_url(&post.author_username, post.id);

    let Some(text) = form.clean().map(str::to_string) else {
        warn!("Empty comment from {} on post {} ignored", claims.username, post.id);
        return Ok(Redirect::to(&target));
    };

    let post_id = post.id;
    let author_id = claims.sub;
    let comment_id = with_db(&state, move |db| db.insert_comment(post_id, author_id, &text)).await?;

    info!("Comment {} added to post {} by {}", comment_id, post_id, claims.username);
    Ok(Redirect::to(&target))
}

/// /<username>/<post_id>/<comment_id>/delete_comment
///
/// Allowed for the comment's author and the post's author. Anyone else is
/// sent back to the post page with nothing deleted.
pub async fn delete_comment(
    State(state): State<AppState>,
    Path((username, post_id, comment_id)): Path<(String, String, String)>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Redirect> {
    let post = load_post(&state, username, &post_id).await?;
    let target = post_url(&post.author_username, post.id);

    let comment_id: i64 = comment_id.parse().map_err(|_| ApiError::NotFound)?;
    let comment = with_db(&state, move |db| db.get_comment(comment_id))
        .await?
        .filter(|c| c.post_id == post.id)
        .ok_or(ApiError::NotFound)?;

    if comment.author_id != claims.sub && post.author_id != claims.sub {
        warn!(
            "User {} tried to delete comment {} by {}",
            claims.username, comment.id, comment.author_username
        );
        return Ok(Redirect::to(&target));
    }

    with_db(&state, move |db| db.delete_comment(comment_id)).await?;

    info!("Comment {} on post {} deleted by {}", comment_id, post.id, claims.username);
    Ok(Redirect::to(&target))
}
