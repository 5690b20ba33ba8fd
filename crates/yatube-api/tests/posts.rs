mod common;

use axum::http::StatusCode;

use common::{TestApp, assert_redirect, json, png_bytes};

#[tokio::test]
async fn anonymous_new_post_redirects_to_login() {
    let app = TestApp::new().await;

    let response = app.get("/new/", None).await;
    assert_redirect(&response, "/auth/login/?next=/new/");

    let login = app.follow_redirect(response, None).await;
    assert_eq!(login.status(), StatusCode::OK);
    assert_eq!(json(login).await["next"], "/new/");
}

#[tokio::test]
async fn new_post_form_lists_groups() {
    let app = TestApp::new().await;
    let leo = app.user("leo");
    app.group("Zebras", "zebras");
    app.group("Ants", "ants");

    let response = app.get("/new/", Some(&leo)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json(response).await;
    assert_eq!(body["mode"], "new");
    assert_eq!(body["groups"][0]["slug"], "ants");
    assert_eq!(body["groups"][1]["slug"], "zebras");
}

#[tokio::test]
async fn create_post_with_group() {
    let app = TestApp::new().await;
    let leo = app.user("leo");
    let group = app.group("Cats", "cats");
    let before = app.post_count();

    let group_id = group.to_string();
    let response = app
        .post_multipart("/new/", Some(&leo), &[("text", "hello"), ("group", group_id.as_str())], None)
        .await;
    assert_redirect(&response, "/");

    let index = app.follow_redirect(response, Some(&leo)).await;
    assert_eq!(index.status(), StatusCode::OK);
    assert_eq!(app.post_count(), before + 1);

    let rows = app.db().list_posts(yatube_db::PostFilter::All, 1, 0).unwrap();
    assert_eq!(rows[0].text, "hello");
    assert_eq!(rows[0].group_id, Some(group));
    assert_eq!(rows[0].author_id, leo.id);
    assert_eq!(rows[0].image, "");
}

#[tokio::test]
async fn create_post_strips_text_and_requires_it() {
    let app = TestApp::new().await;
    let leo = app.user("leo");

    let response = app.post_multipart("/new/", Some(&leo), &[("text", "   ")], None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json(response).await;
    assert_eq!(body["errors"]["text"][0], "This field is required.");
    assert_eq!(app.post_count(), 0);
}

#[tokio::test]
async fn create_post_rejects_unknown_group() {
    let app = TestApp::new().await;
    let leo = app.user("leo");

    let response = app
        .post_multipart("/new/", Some(&leo), &[("text", "hi"), ("group", "4242")], None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json(response).await["errors"]["group"].is_array());
    assert_eq!(app.post_count(), 0);
}

#[tokio::test]
async fn create_post_rejects_non_image_upload() {
    let app = TestApp::new().await;
    let leo = app.user("leo");

    let response = app
        .post_multipart(
            "/new/",
            Some(&leo),
            &[("text", "with attachment")],
            Some(&b"this is plain text, not a picture"[..]),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json(response).await;
    assert!(body["errors"]["image"][0].as_str().unwrap().starts_with("Upload a valid image"));
    assert!(body["errors"].get("text").is_none());
    assert_eq!(app.post_count(), 0);
}

#[tokio::test]
async fn create_post_stores_image() {
    let app = TestApp::new().await;
    let leo = app.user("leo");

    let response = app
        .post_multipart("/new/", Some(&leo), &[("text", "picture")], Some(png_bytes().as_slice()))
        .await;
    assert_redirect(&response, "/");

    let rows = app.db().list_posts(yatube_db::PostFilter::All, 1, 0).unwrap();
    assert!(rows[0].image.starts_with("posts/"));
    assert!(app.media_root().join(&rows[0].image).exists());

    let index = json(app.get("/", None).await).await;
    assert_eq!(index["items"][0]["image"], rows[0].image.as_str());
}

#[tokio::test]
async fn failed_insert_removes_new_image() {
    let app = TestApp::new().await;
    let leo = app.user("leo");
    app.db()
        .with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_posts BEFORE INSERT ON posts
                 BEGIN SELECT RAISE(ABORT, 'posts are read-only'); END;",
            )?;
            Ok(())
        })
        .unwrap();

    let response = app
        .post_multipart("/new/", Some(&leo), &[("text", "lost")], Some(png_bytes().as_slice()))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let leftovers = std::fs::read_dir(app.media_root().join("posts")).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn post_view_shows_post_and_comments() {
    let app = TestApp::new().await;
    let leo = app.user("leo");
    let anna = app.user("anna");
    let post = app.post(&leo, "War and Peace", None);
    app.db().insert_comment(post, anna.id, "long read").unwrap();

    let body = json(app.get(&format!("/leo/{post}/"), None).await).await;
    assert_eq!(body["post"]["text"], "War and Peace");
    assert_eq!(body["post"]["comment_count"], 1);
    assert_eq!(body["author"]["username"], "leo");
    assert_eq!(body["posts"], 1);
    assert_eq!(body["comments"][0]["author"]["username"], "anna");
    assert_eq!(body["following"], false);
}

#[tokio::test]
async fn post_view_requires_matching_author() {
    let app = TestApp::new().await;
    let leo = app.user("leo");
    app.user("anna");
    let post = app.post(&leo, "mine", None);

    assert_eq!(app.get(&format!("/anna/{post}/"), None).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/leo/999/", None).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/leo/abc/", None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn author_can_edit_without_bumping_pub_date() {
    let app = TestApp::new().await;
    let leo = app.user("leo");
    let group = app.group("Cats", "cats");
    let post = app.post(&leo, "first draft", None);
    let before = app.db().get_post(post).unwrap().unwrap();

    let form = app.get(&format!("/leo/{post}/edit/"), Some(&leo)).await;
    assert_eq!(form.status(), StatusCode::OK);
    assert_eq!(json(form).await["post"]["text"], "first draft");

    let group_id = group.to_string();
    let response = app
        .post_multipart(
            &format!("/leo/{post}/edit/"),
            Some(&leo),
            &[("text", "final text"), ("group", group_id.as_str())],
            None,
        )
        .await;
    assert_redirect(&response, &format!("/leo/{post}/"));

    let after = app.db().get_post(post).unwrap().unwrap();
    assert_eq!(after.text, "final text");
    assert_eq!(after.group_id, Some(group));
    assert_eq!(after.pub_date, before.pub_date);
    assert_eq!(app.post_count(), 1);
}

#[tokio::test]
async fn edit_keeps_image_when_none_uploaded() {
    let app = TestApp::new().await;
    let leo = app.user("leo");
    let post = app.db().insert_post(leo.id, "pic", None, "posts/abc.png").unwrap();

    let response = app
        .post_multipart(&format!("/leo/{post}/edit/"), Some(&leo), &[("text", "pic v2")], None)
        .await;
    assert_redirect(&response, &format!("/leo/{post}/"));
    assert_eq!(app.db().get_post(post).unwrap().unwrap().image, "posts/abc.png");
}

#[tokio::test]
async fn non_author_edit_is_redirected_and_ignored() {
    let app = TestApp::new().await;
    let leo = app.user("leo");
    let anna = app.user("anna");
    let post = app.post(&leo, "original", None);

    let form = app.get(&format!("/leo/{post}/edit/"), Some(&anna)).await;
    assert_redirect(&form, &format!("/leo/{post}/"));

    let response = app
        .post_multipart(&format!("/leo/{post}/edit/"), Some(&anna), &[("text", "defaced")], None)
        .await;
    assert_redirect(&response, &format!("/leo/{post}/"));
    assert_eq!(app.db().get_post(post).unwrap().unwrap().text, "original");
}

#[tokio::test]
async fn invalid_edit_changes_nothing() {
    let app = TestApp::new().await;
    let leo = app.user("leo");
    let post = app.post(&leo, "original", None);

    let response = app
        .post_multipart(&format!("/leo/{post}/edit/"), Some(&leo), &[("text", "")], None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.db().get_post(post).unwrap().unwrap().text, "original");
}

#[tokio::test]
async fn delete_post_removes_comments() {
    let app = TestApp::new().await;
    let leo = app.user("leo");
    let anna = app.user("anna");
    let post = app.post(&leo, "short lived", None);
    app.db().insert_comment(post, anna.id, "first!").unwrap();
    app.db().insert_comment(post, leo.id, "bye").unwrap();

    let response = app.get(&format!("/leo/{post}/delete/"), Some(&leo)).await;
    assert_redirect(&response, "/leo/");

    assert_eq!(app.post_count(), 0);
    assert_eq!(app.db().count_comments(post).unwrap(), 0);
    assert_eq!(app.get(&format!("/leo/{post}/"), None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_author_delete_is_redirected() {
    let app = TestApp::new().await;
    let leo = app.user("leo");
    let anna = app.user("anna");
    let post = app.post(&leo, "keep me", None);

    let response = app.get(&format!("/leo/{post}/delete/"), Some(&anna)).await;
    assert_redirect(&response, &format!("/leo/{post}/"));
    assert_eq!(app.post_count(), 1);
}
