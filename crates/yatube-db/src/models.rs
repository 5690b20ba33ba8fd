//! Database row types. These map directly to SQLite rows and stay distinct
//! from the yatube-types view models.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub date_joined: String,
}

pub struct GroupRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// A post joined with its author, its group (if any) and its live comment count.
pub struct PostRow {
    pub id: i64,
    pub text: String,
    pub pub_date: String,
    pub author_id: i64,
    pub author_username: String,
    pub group_id: Option<i64>,
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
    /// Empty when the post has no image.
    pub image: String,
    pub comment_count: i64,
}

pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub text: String,
    pub created: String,
}
