use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// The slice of a group embedded in every post it tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: i64,
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author: User,
    pub group: Option<GroupRef>,
    /// Path relative to the media root, e.g. `posts/<sha256>.png`.
    pub image: Option<String>,
    /// Live number of comments, computed at query time.
    pub comment_count: u64,
}

impl Post {
    /// Short label used in log lines: the first 15 characters of the text.
    pub fn label(&self) -> String {
        self.text.chars().take(15).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author: User,
    pub text: String,
    pub created: DateTime<Utc>,
}

/// One fixed-size slice of an ordered listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// 1-indexed page number actually served (after clamping).
    pub number: u32,
    pub num_pages: u32,
    /// Total number of items across all pages.
    pub count: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub items: Vec<T>,
}
