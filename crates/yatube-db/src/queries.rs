use crate::models::{CommentRow, GroupRow, PostRow, UserRow};
use crate::Database;
use anyhow::Result;
use rusqlite::types::ToSql;
use rusqlite::{Connection, ErrorCode, Row};

/// Timestamps are stored as UTC text with microseconds, so lexical order is
/// chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

fn now_timestamp() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Which posts a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(i64),
    Author(i64),
    /// Posts by every author the given user follows.
    FollowedBy(i64),
}

impl PostFilter {
    fn clause(self) -> (&'static str, Option<i64>) {
        match self {
            PostFilter::All => ("", None),
            PostFilter::Group(id) => ("WHERE p.group_id = ?", Some(id)),
            PostFilter::Author(id) => ("WHERE p.author_id = ?", Some(id)),
            PostFilter::FollowedBy(id) => (
                "WHERE p.author_id IN (SELECT author_id FROM follows WHERE user_id = ?)",
                Some(id),
            ),
        }
    }
}

const POST_SELECT: &str = "
    SELECT p.id, p.text, p.pub_date, p.author_id, u.username, p.group_id, g.title, g.slug, p.image,
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN post_groups g ON g.id = p.group_id";

const COMMENT_SELECT: &str = "
    SELECT c.id, c.post_id, c.author_id, u.username, c.text, c.created
    FROM comments c
    JOIN users u ON u.id = c.author_id";

impl Database {
    // -- Users --

    /// Returns `None` when the username is already taken.
    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            match conn.execute(
                "INSERT INTO users (username, password, date_joined) VALUES (?1, ?2, ?3)",
                (username, password_hash, now_timestamp()),
            ) {
                Ok(_) => Ok(Some(conn.last_insert_rowid())),
                Err(e) if is_unique_violation(&e) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, password, date_joined FROM users WHERE username = ?1",
                [username],
                map_user_row,
            )
            .optional()
        })
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, password, date_joined FROM users ORDER BY username",
            )?;
            let rows = stmt
                .query_map([], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Removes the user together with their posts, comments and follow edges.
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM users WHERE id = ?1", [id])? > 0))
    }

    // -- Groups --

    pub fn create_group(&self, title: &str, slug: &str, description: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO post_groups (title, slug, description) VALUES (?1, ?2, ?3)",
                (title, slug, description),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_group(&self, id: i64) -> Result<Option<GroupRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, title, slug, description FROM post_groups WHERE id = ?1",
                [id],
                map_group_row,
            )
            .optional()
        })
    }

    pub fn get_group_by_slug(&self, slug: &str) -> Result<Option<GroupRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, title, slug, description FROM post_groups WHERE slug = ?1",
                [slug],
                map_group_row,
            )
            .optional()
        })
    }

    pub fn list_groups(&self) -> Result<Vec<GroupRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, title, slug, description FROM post_groups ORDER BY title, id")?;
            let rows = stmt
                .query_map([], map_group_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Posts that referenced the group stay, with their group cleared.
    pub fn delete_group(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM post_groups WHERE id = ?1", [id])? > 0))
    }

    // -- Posts --

    pub fn insert_post(
        &self,
        author_id: i64,
        text: &str,
        group_id: Option<i64>,
        image: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (text, pub_date, author_id, group_id, image) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![text, now_timestamp(), author_id, group_id, image],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Rewrites the editable fields. `pub_date` is left alone so edits never
    /// reorder listings.
    pub fn update_post(
        &self,
        id: i64,
        text: &str,
        group_id: Option<i64>,
        image: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE posts SET text = ?1, group_id = ?2, image = ?3 WHERE id = ?4",
                rusqlite::params![text, group_id, image, id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Deletes the post and, through the foreign key, all of its comments.
    pub fn delete_post(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM posts WHERE id = ?1", [id])? > 0))
    }

    pub fn get_post(&self, id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            conn.query_row(&format!("{POST_SELECT} WHERE p.id = ?1"), [id], map_post_row)
                .optional()
        })
    }

    pub fn count_posts(&self, filter: PostFilter) -> Result<u64> {
        self.with_conn(|conn| query_count_posts(conn, filter))
    }

    /// One slice of a listing ordered newest first.
    pub fn list_posts(&self, filter: PostFilter, limit: u32, offset: u64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| query_posts(conn, filter, limit, offset))
    }

    // -- Comments --

    pub fn insert_comment(&self, post_id: i64, author_id: i64, text: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (post_id, author_id, text, created) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![post_id, author_id, text, now_timestamp()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_comment(&self, id: i64) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            conn.query_row(&format!("{COMMENT_SELECT} WHERE c.id = ?1"), [id], map_comment_row)
                .optional()
        })
    }

    /// Comments on a post, newest first.
    pub fn list_comments(&self, post_id: i64) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{COMMENT_SELECT} WHERE c.post_id = ?1 ORDER BY c.created DESC, c.id DESC"
            ))?;
            let rows = stmt
                .query_map([post_id], map_comment_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_comments(&self, post_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE post_id = ?1",
                [post_id],
                |r| r.get(0),
            )?;
            Ok(n as u64)
        })
    }

    pub fn delete_comment(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM comments WHERE id = ?1", [id])? > 0))
    }

    // -- Follows --

    /// Creates the (user, author) edge. Returns false when the edge already
    /// existed; the unique constraint is the only arbiter of that.
    pub fn insert_follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            match conn.execute(
                "INSERT INTO follows (user_id, author_id) VALUES (?1, ?2)",
                [user_id, author_id],
            ) {
                Ok(_) => Ok(true),
                Err(e) if is_unique_violation(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM follows WHERE user_id = ?1 AND author_id = ?2",
                [user_id, author_id],
            )?;
            Ok(removed > 0)
        })
    }

    pub fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found: i64 = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM follows WHERE user_id = ?1 AND author_id = ?2)",
                [user_id, author_id],
                |r| r.get(0),
            )?;
            Ok(found != 0)
        })
    }

    /// Number of users following `author_id`.
    pub fn count_followers(&self, author_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM follows WHERE author_id = ?1",
                [author_id],
                |r| r.get(0),
            )?;
            Ok(n as u64)
        })
    }

    /// Number of authors `user_id` follows.
    pub fn count_following(&self, user_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM follows WHERE user_id = ?1",
                [user_id],
                |r| r.get(0),
            )?;
            Ok(n as u64)
        })
    }

    pub fn count_follows(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM follows", [], |r| r.get(0))?;
            Ok(n as u64)
        })
    }
}

fn query_count_posts(conn: &Connection, filter: PostFilter) -> Result<u64> {
    let (clause, arg) = filter.clause();
    let sql = format!("SELECT COUNT(*) FROM posts p {clause}");

    let n: i64 = match arg {
        Some(arg) => conn.query_row(&sql, [arg], |r| r.get(0))?,
        None => conn.query_row(&sql, [], |r| r.get(0))?,
    };
    Ok(n as u64)
}

fn query_posts(conn: &Connection, filter: PostFilter, limit: u32, offset: u64) -> Result<Vec<PostRow>> {
    let (clause, arg) = filter.clause();
    let sql = format!("{POST_SELECT} {clause} ORDER BY p.pub_date DESC, p.id DESC LIMIT ? OFFSET ?");

    let limit = i64::from(limit);
    let offset = offset as i64;
    let mut params: Vec<&dyn ToSql> = Vec::with_capacity(3);
    if let Some(arg) = arg.as_ref() {
        params.push(arg);
    }
    params.push(&limit);
    params.push(&offset);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params.as_slice(), map_post_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn map_user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        date_joined: row.get(3)?,
    })
}

fn map_group_row(row: &Row<'_>) -> rusqlite::Result<GroupRow> {
    Ok(GroupRow {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
    })
}

fn map_post_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        text: row.get(1)?,
        pub_date: row.get(2)?,
        author_id: row.get(3)?,
        author_username: row.get(4)?,
        group_id: row.get(5)?,
        group_title: row.get(6)?,
        group_slug: row.get(7)?,
        image: row.get(8)?,
        comment_count: row.get(9)?,
    })
}

fn map_comment_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        author_username: row.get(3)?,
        text: row.get(4)?,
        created: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
