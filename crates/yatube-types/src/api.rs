use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Comment, Group, Page, Post, User};

// -- JWT Claims --

/// Claims carried by the bearer token issued at login/signup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user_id: i64,
    pub username: String,
    pub token: String,
}

/// Rendered at the target of the login redirect.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginPage {
    pub next: Option<String>,
}

// -- Forms --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormMode {
    New,
    Edit,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostFormPage {
    pub mode: FormMode,
    /// Present when editing.
    pub post: Option<Post>,
    /// Group choices, ordered by title.
    pub groups: Vec<Group>,
}

/// Field name -> messages, the way a bound form reports errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(pub BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// -- Listings --

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupPage {
    pub group: Group,
    pub page: Page<Post>,
}

/// Follow counters shown next to an author.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FollowStats {
    /// Users following this author.
    pub subscribers: u64,
    /// Authors this user follows.
    pub signed: u64,
    /// Whether the current requester follows this author.
    pub following: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfilePage {
    pub author: User,
    pub page: Page<Post>,
    #[serde(flatten)]
    pub stats: FollowStats,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostPage {
    pub post: Post,
    pub author: User,
    /// Total number of posts by the author.
    pub posts: u64,
    pub comments: Vec<Comment>,
    #[serde(flatten)]
    pub stats: FollowStats,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsersPage {
    pub users: Vec<User>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupsPage {
    pub groups: Vec<Group>,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationErrorBody {
    pub errors: FieldErrors,
}
