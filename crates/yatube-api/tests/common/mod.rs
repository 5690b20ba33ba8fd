#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use yatube_api::auth::create_token;
use yatube_api::cache::{NoopCache, PageCache};
use yatube_api::media::MediaStorage;
use yatube_api::{AppState, AppStateInner, CacheTtl};
use yatube_db::Database;

pub const SECRET: &str = "integration-test-secret";
const BOUNDARY: &str = "yatube-test-boundary";

static NEXT_APP: AtomicUsize = AtomicUsize::new(0);

pub struct TestApp {
    pub state: AppState,
    router: Router,
    media_root: PathBuf,
}

pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub token: String,
}

impl TestApp {
    /// Fresh in-memory app with caching disabled.
    pub async fn new() -> Self {
        Self::with_cache(Arc::new(NoopCache)).await
    }

    pub async fn with_cache(cache: Arc<dyn PageCache>) -> Self {
        let media_root = std::env::temp_dir().join(format!(
            "yatube_api_test_{}_{}",
            std::process::id(),
            NEXT_APP.fetch_add(1, Ordering::Relaxed)
        ));

        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: SECRET.to_string(),
            cache,
            cache_ttl: CacheTtl::default(),
            media: MediaStorage::new(media_root.clone()).await.unwrap(),
        });
        let router = yatube_api::router(state.clone(), 10 * 1024 * 1024);

        Self {
            state,
            router,
            media_root,
        }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub fn media_root(&self) -> &PathBuf {
        &self.media_root
    }

    pub fn user(&self, username: &str) -> TestUser {
        let id = self.db().create_user(username, "not-a-real-hash").unwrap().unwrap();
        TestUser {
            id,
            username: username.to_string(),
            token: create_token(SECRET, id, username).unwrap(),
        }
    }

    pub fn group(&self, title: &str, slug: &str) -> i64 {
        self.db().create_group(title, slug, "test group").unwrap()
    }

    pub fn post(&self, author: &TestUser, text: &str, group: Option<i64>) -> i64 {
        self.db().insert_post(author.id, text, group, "").unwrap()
    }

    pub async fn send(&self, req: Request<Body>) -> Response {
        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn get(&self, uri: &str, user: Option<&TestUser>) -> Response {
        self.send(request("GET", uri, user).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_form(&self, uri: &str, user: Option<&TestUser>, body: &str) -> Response {
        let req = request("POST", uri, user)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(req).await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        user: Option<&TestUser>,
        fields: &[(&str, &str)],
        image: Option<&[u8]>,
    ) -> Response {
        let req = request("POST", uri, user)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(fields, image)))
            .unwrap();
        self.send(req).await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(req).await
    }

    /// Issue a GET to the response's `Location`, as a browser would.
    pub async fn follow_redirect(&self, response: Response, user: Option<&TestUser>) -> Response {
        assert!(
            response.status().is_redirection(),
            "expected a redirect, got {}",
            response.status()
        );
        self.get(&location(&response), user).await
    }

    pub fn post_count(&self) -> u64 {
        self.db().count_posts(yatube_db::PostFilter::All).unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.media_root);
    }
}

fn request(method: &str, uri: &str, user: Option<&TestUser>) -> axum::http::request::Builder {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", user.token));
    }
    builder
}

fn multipart_body(fields: &[(&str, &str)], image: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(bytes) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"upload.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect without Location")
        .to_str()
        .unwrap()
        .to_string()
}

pub async fn json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn assert_redirect(response: &Response, to: &str) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(response), to);
}

pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(3, 3, image::Rgb([10, 120, 200]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageOutputFormat::Png)
        .unwrap();
    out.into_inner()
}
