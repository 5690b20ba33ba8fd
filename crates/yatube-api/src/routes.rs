use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{StatusCode, Uri},
    middleware,
    response::IntoResponse,
    routing::get,
};

use yatube_types::api::ErrorBody;

use crate::middleware::{identify, require_auth};
use crate::state::AppState;
use crate::{auth, comments, follows, listings, posts};

/// Build the full application router.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let public_routes = Router::new()
        .route("/", get(listings::index))
        .route("/users/", get(listings::users_all))
        .route("/groups_all/", get(listings::groups_all))
        .route("/group/{slug}/", get(listings::group_posts))
        .route("/auth/login/", get(auth::login_page).post(auth::login))
        .route("/auth/signup/", axum::routing::post(auth::signup))
        .route("/{username}/", get(listings::profile))
        .route("/{username}/{post_id}/", get(posts::post_view));

    let protected_routes = Router::new()
        .route("/follow/", get(listings::follow_index))
        .route("/new/", get(posts::new_post_form).post(posts::create_post))
        .route(
            "/{username}/{post_id}/edit/",
            get(posts::edit_post_form).post(posts::edit_post),
        )
        .route(
            "/{username}/{post_id}/delete/",
            get(posts::delete_post).post(posts::delete_post),
        )
        .route(
            "/{username}/{post_id}/comment",
            axum::routing::post(comments::add_comment),
        )
        .route(
            "/{username}/{post_id}/{comment_id}/delete_comment",
            get(comments::delete_comment).post(comments::delete_comment),
        )
        .route(
            "/{username}/follow/",
            get(follows::follow).post(follows::follow),
        )
        .route(
            "/{username}/unfollow/",
            get(follows::unfollow).post(follows::unfollow),
        )
        .route_layer(middleware::from_fn(require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(middleware::from_fn_with_state(state.clone(), identify))
        .with_state(state)
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "not found".into(),
            path: Some(uri.path().to_string()),
        }),
    )
}
