use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use yatube_types::api::Claims;

use crate::state::AppState;

pub const LOGIN_URL: &str = "/auth/login/";

/// Characters escaped in the `next` parameter. `/` stays readable.
const NEXT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Who is making the request, as resolved from the bearer token.
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    User(Claims),
}

impl Identity {
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Identity::User(claims) => Some(claims.sub),
            Identity::Anonymous => None,
        }
    }
}

/// Resolve the `Authorization: Bearer` token (if any) into an [`Identity`].
/// A missing, malformed or expired token is treated as anonymous.
pub async fn identify(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let identity = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .and_then(|token| decode_token(&state.jwt_secret, token))
        .map_or(Identity::Anonymous, Identity::User);

    req.extensions_mut().insert(identity);
    next.run(req).await
}

/// Anonymous callers are sent to the login page with a return path;
/// authenticated ones get their [`Claims`] as a request extension.
pub async fn require_auth(mut req: Request, next: Next) -> Response {
    let claims = match req.extensions().get::<Identity>() {
        Some(Identity::User(claims)) => claims.clone(),
        _ => {
            let target = req
                .uri()
                .path_and_query()
                .map_or_else(|| req.uri().path().to_string(), |pq| pq.as_str().to_string());
            return login_redirect(&target).into_response();
        }
    };

    req.extensions_mut().insert(claims);
    next.run(req).await
}

pub fn login_redirect(next: &str) -> Redirect {
    Redirect::to(&format!(
        "{}?next={}",
        LOGIN_URL,
        utf8_percent_encode(next, NEXT_ENCODE_SET)
    ))
}

pub fn decode_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_redirect_keeps_slashes() {
        let redirect = login_redirect("/new/").into_response();
        assert_eq!(
            redirect.headers()[header::LOCATION],
            "/auth/login/?next=/new/"
        );
    }

    #[test]
    fn test_login_redirect_escapes_query() {
        let redirect = login_redirect("/follow/?page=2").into_response();
        assert_eq!(
            redirect.headers()[header::LOCATION],
            "/auth/login/?next=/follow/%3Fpage%3D2"
        );
    }
}
