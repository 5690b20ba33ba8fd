//! Row -> view model conversions.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use yatube_db::models::{CommentRow, GroupRow, PostRow, UserRow};
use yatube_db::queries::TIMESTAMP_FORMAT;
use yatube_types::models::{Comment, Group, GroupRef, Post, User};

pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .map(|ndt| ndt.and_utc())
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub fn user(row: UserRow) -> User {
    User {
        id: row.id,
        username: row.username,
    }
}

pub fn group(row: GroupRow) -> Group {
    Group {
        id: row.id,
        title: row.title,
        slug: row.slug,
        description: row.description,
    }
}

pub fn post(row: PostRow) -> Post {
    let group = match (row.group_id, row.group_title, row.group_slug) {
        (Some(id), Some(title), Some(slug)) => Some(GroupRef { id, title, slug }),
        _ => None,
    };

    Post {
        id: row.id,
        text: row.text,
        pub_date: parse_timestamp(&row.pub_date),
        author: User {
            id: row.author_id,
            username: row.author_username,
        },
        group,
        image: (!row.image.is_empty()).then_some(row.image),
        comment_count: row.comment_count.max(0) as u64,
    }
}

pub fn comment(row: CommentRow) -> Comment {
    Comment {
        id: row.id,
        post_id: row.post_id,
        author: User {
            id: row.author_id,
            username: row.author_username,
        },
        text: row.text,
        created: parse_timestamp(&row.created),
    }
}
