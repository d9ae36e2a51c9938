use anyhow::{anyhow, Context};
use axum::async_trait;
use chrono::{SubsecRound, Utc};
use futures::TryStreamExt;
use hikeko_api::{
    random_suffix, Activity, AuthToken, Blog, BlogContent, BlogFilter, BlogId, BlogSummary,
    Comment, CommentId, Error as ApiError, LikeBlog, LikeStatus, NewBlog, NewComment, Profile,
    Session, SignIn, SignUp, Store, Time, UserId, UserSummary, Uuid,
};
use sqlx::{postgres::PgRow, Connection, Row};

use crate::query;

#[cfg(not(test))]
const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const BCRYPT_COST: u32 = 4;

/// Random suffixes tried after the bare username is taken
const USERNAME_RETRIES: usize = 8;

/// Assumes tables b (blogs) and u (users, joined on the blog author) are available
const BLOG_COLUMNS: &str = "
    b.blog_id, b.title, b.des, b.banner, b.tags,
    b.total_likes, b.total_comments, b.total_reads, b.total_parent_comments,
    b.published_at, u.username, u.fullname, u.profile_img
";

// postgres only keeps microseconds
fn now() -> Time {
    Utc::now().trunc_subsecs(6)
}

fn counter(row: &PgRow, field: &str) -> anyhow::Result<u64> {
    let v: i64 = row
        .try_get(field)
        .with_context(|| format!("retrieving the {field} field"))?;
    u64::try_from(v).with_context(|| format!("{field} is negative"))
}

fn user_summary_from_row(row: &PgRow) -> anyhow::Result<UserSummary> {
    Ok(UserSummary {
        username: row
            .try_get("username")
            .context("retrieving the username field")?,
        fullname: row
            .try_get("fullname")
            .context("retrieving the fullname field")?,
        profile_img: row
            .try_get("profile_img")
            .context("retrieving the profile_img field")?,
    })
}

fn blog_summary_from_row(row: &PgRow) -> anyhow::Result<BlogSummary> {
    Ok(BlogSummary {
        blog_id: BlogId(
            row.try_get("blog_id")
                .context("retrieving the blog_id field")?,
        ),
        title: row.try_get("title").context("retrieving the title field")?,
        des: row.try_get("des").context("retrieving the des field")?,
        banner: row
            .try_get("banner")
            .context("retrieving the banner field")?,
        tags: row.try_get("tags").context("retrieving the tags field")?,
        activity: Activity {
            total_likes: counter(row, "total_likes")?,
            total_comments: counter(row, "total_comments")?,
            total_reads: counter(row, "total_reads")?,
            total_parent_comments: counter(row, "total_parent_comments")?,
        },
        published_at: row
            .try_get("published_at")
            .context("retrieving the published_at field")?,
        author: user_summary_from_row(row)?,
    })
}

async fn email_taken(conn: &mut sqlx::PgConnection, email: &str) -> anyhow::Result<bool> {
    Ok(sqlx::query("SELECT 1 FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(conn)
        .await
        .with_context(|| format!("checking whether email {email:?} is taken"))?
        .is_some())
}

async fn open_session(conn: &mut sqlx::PgConnection, user: UserId) -> anyhow::Result<AuthToken> {
    let token = AuthToken(Uuid::new_v4());
    sqlx::query("INSERT INTO sessions VALUES ($1, $2, $3)")
        .bind(token.0)
        .bind(user.0)
        .bind(now())
        .execute(conn)
        .await
        .with_context(|| format!("inserting session for user {user:?}"))?;
    Ok(token)
}

/// Username is the email's local part, disambiguated with a random suffix if needed
///
/// The insert itself detects taken usernames, so concurrent signups sharing a
/// local part both succeed.
pub async fn create_user(
    conn: &mut sqlx::PgConnection,
    data: &SignUp,
) -> anyhow::Result<Result<Session, ApiError>> {
    let password_hash = bcrypt::hash(&data.password, BCRYPT_COST).context("hashing password")?;
    let id = UserId(Uuid::new_v4());
    let base = data.base_username();
    let mut username = String::from(base);
    for _ in 0..=USERNAME_RETRIES {
        let profile_img = UserSummary::default_profile_img(&username);
        let res = sqlx::query(
            "
                INSERT INTO users
                    (id, fullname, email, username, password_hash, profile_img, joined_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT DO NOTHING
            ",
        )
        .bind(id.0)
        .bind(&data.fullname)
        .bind(&data.email)
        .bind(&username)
        .bind(&password_hash)
        .bind(&profile_img)
        .bind(now())
        .execute(&mut *conn)
        .await
        .with_context(|| format!("inserting user {username:?}"))?;
        if res.rows_affected() == 1 {
            return Ok(Ok(Session {
                access_token: open_session(&mut *conn, id).await?,
                username,
                fullname: data.fullname.clone(),
                profile_img,
            }));
        }
        if email_taken(&mut *conn, &data.email).await? {
            return Ok(Err(ApiError::EmailAlreadyUsed(data.email.clone())));
        }
        username = format!("{base}{}", random_suffix(5));
    }
    Err(anyhow!(
        "found no free username for {base:?} after {USERNAME_RETRIES} suffixes"
    ))
}

/// Returns None if the email is unknown or the password does not match
pub async fn login_user(
    conn: &mut sqlx::PgConnection,
    data: &SignIn,
) -> anyhow::Result<Option<Session>> {
    let row = sqlx::query(
        "SELECT id, password_hash, username, fullname, profile_img FROM users WHERE email = $1",
    )
    .bind(&data.email)
    .fetch_optional(&mut *conn)
    .await
    .context("fetching password hash")?;
    let row = match row {
        Some(row) => row,
        None => return Ok(None),
    };
    let hash: String = row
        .try_get("password_hash")
        .context("retrieving the password_hash field")?;
    if !bcrypt::verify(&data.password, &hash).context("verifying password")? {
        return Ok(None);
    }
    let user = UserId(row.try_get("id").context("retrieving the id field")?);
    let summary = user_summary_from_row(&row)?;
    Ok(Some(Session {
        access_token: open_session(&mut *conn, user).await?,
        username: summary.username,
        fullname: summary.fullname,
        profile_img: summary.profile_img,
    }))
}

/// Returns true if the session was actually removed
pub async fn logout_user(conn: &mut sqlx::PgConnection, token: &AuthToken) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(token.0)
        .execute(conn)
        .await
        .context("deleting session")?;
    Ok(res.rows_affected() == 1)
}

/// Returns the user behind `token`, if the session is still open
pub async fn recover_session(
    conn: &mut sqlx::PgConnection,
    token: AuthToken,
) -> anyhow::Result<Option<(UserId, UserSummary)>> {
    let row = sqlx::query(
        "
            SELECT u.id, u.username, u.fullname, u.profile_img
                FROM sessions s
            INNER JOIN users u
                ON u.id = s.user_id
            WHERE s.id = $1
        ",
    )
    .bind(token.0)
    .fetch_optional(conn)
    .await
    .context("querying sessions table")?;
    let row = match row {
        Some(row) => row,
        None => return Ok(None),
    };
    let id = UserId(row.try_get("id").context("retrieving the id field")?);
    Ok(Some((id, user_summary_from_row(&row)?)))
}

pub async fn get_profile(
    conn: &mut sqlx::PgConnection,
    username: &str,
) -> anyhow::Result<Option<Profile>> {
    let row = sqlx::query(
        "
            SELECT username, fullname, profile_img, bio, total_posts, total_reads, joined_at
                FROM users
            WHERE username = $1
        ",
    )
    .bind(username)
    .fetch_optional(conn)
    .await
    .with_context(|| format!("fetching profile of {username:?}"))?;
    let row = match row {
        Some(row) => row,
        None => return Ok(None),
    };
    Ok(Some(Profile {
        user: user_summary_from_row(&row)?,
        bio: row.try_get("bio").context("retrieving the bio field")?,
        total_posts: counter(&row, "total_posts")?,
        total_reads: counter(&row, "total_reads")?,
        joined_at: row
            .try_get("joined_at")
            .context("retrieving the joined_at field")?,
    }))
}

/// Counts a read on the blog and on its author, returning the updated blog
pub async fn get_blog(
    conn: &mut sqlx::PgConnection,
    blog_id: &BlogId,
) -> anyhow::Result<Option<Blog>> {
    let mut tx = conn.begin().await.context("starting transaction")?;
    let row = sqlx::query(&format!(
        "
            UPDATE blogs b
                SET total_reads = b.total_reads + 1
                FROM users u
            WHERE b.blog_id = $1
                AND u.id = b.author_id
            RETURNING b.author_id, b.content, {BLOG_COLUMNS}
        "
    ))
    .bind(&blog_id.0)
    .fetch_optional(&mut *tx)
    .await
    .with_context(|| format!("counting a read of blog {blog_id}"))?;
    let row = match row {
        Some(row) => row,
        None => return Ok(None),
    };
    let author: Uuid = row
        .try_get("author_id")
        .context("retrieving the author_id field")?;
    let summary = blog_summary_from_row(&row)?;
    let content: sqlx::types::Json<BlogContent> = row
        .try_get("content")
        .context("retrieving the content field")?;

    sqlx::query("UPDATE users SET total_reads = total_reads + 1 WHERE id = $1")
        .bind(author)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("counting a read for author of blog {blog_id}"))?;
    tx.commit().await.context("committing transaction")?;

    Ok(Some(Blog {
        blog_id: summary.blog_id,
        title: summary.title,
        des: summary.des,
        banner: summary.banner,
        content: content.0,
        tags: summary.tags,
        activity: summary.activity,
        published_at: summary.published_at,
        author: summary.author,
    }))
}

/// Assumes `blog` was validated
pub async fn create_blog(
    conn: &mut sqlx::PgConnection,
    author: UserId,
    blog: &NewBlog,
) -> anyhow::Result<BlogId> {
    let blog_id = BlogId::from_title(&blog.title, &random_suffix(21));
    let mut tx = conn.begin().await.context("starting transaction")?;
    sqlx::query(
        "
            INSERT INTO blogs
                (blog_id, author_id, title, des, banner, content, tags, draft, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ",
    )
    .bind(&blog_id.0)
    .bind(author.0)
    .bind(&blog.title)
    .bind(&blog.des)
    .bind(&blog.banner)
    .bind(sqlx::types::Json(&blog.content))
    .bind(blog.normalized_tags())
    .bind(blog.draft)
    .bind(now())
    .execute(&mut *tx)
    .await
    .with_context(|| format!("inserting blog {blog_id}"))?;
    if !blog.draft {
        sqlx::query("UPDATE users SET total_posts = total_posts + 1 WHERE id = $1")
            .bind(author.0)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("counting blog {blog_id} for its author"))?;
    }
    tx.commit().await.context("committing transaction")?;
    Ok(blog_id)
}

/// Returns None if the blog does not exist
pub async fn add_comment(
    conn: &mut sqlx::PgConnection,
    user: UserId,
    commented_by: UserSummary,
    c: &NewComment,
) -> anyhow::Result<Option<Comment>> {
    let mut tx = conn.begin().await.context("starting transaction")?;
    let row = sqlx::query(
        "
            UPDATE blogs
                SET total_comments = total_comments + 1,
                    total_parent_comments = total_parent_comments + 1
            WHERE blog_id = $1
            RETURNING author_id
        ",
    )
    .bind(&c.blog_id.0)
    .fetch_optional(&mut *tx)
    .await
    .with_context(|| format!("counting a comment on blog {}", c.blog_id))?;
    let blog_author = match row {
        Some(row) => UserId(
            row.try_get("author_id")
                .context("retrieving the author_id field")?,
        ),
        None => return Ok(None),
    };

    let comment = Comment {
        id: CommentId(Uuid::new_v4()),
        blog_id: c.blog_id.clone(),
        blog_author,
        commented_by,
        comment: c.comment.clone(),
        commented_at: now(),
    };
    sqlx::query(
        "
            INSERT INTO comments (id, blog_id, blog_author, commented_by, comment, commented_at)
            VALUES ($1, $2, $3, $4, $5, $6)
        ",
    )
    .bind(comment.id.0)
    .bind(&comment.blog_id.0)
    .bind(blog_author.0)
    .bind(user.0)
    .bind(&comment.comment)
    .bind(comment.commented_at)
    .execute(&mut *tx)
    .await
    .with_context(|| format!("inserting comment {:?}", comment.id))?;
    sqlx::query(
        "
            INSERT INTO notifications
                (id, kind, blog_id, notification_for, from_user, comment_id, created_at)
            VALUES ($1, 'comment', $2, $3, $4, $5, $6)
        ",
    )
    .bind(Uuid::new_v4())
    .bind(&comment.blog_id.0)
    .bind(blog_author.0)
    .bind(user.0)
    .bind(comment.id.0)
    .bind(comment.commented_at)
    .execute(&mut *tx)
    .await
    .with_context(|| format!("notifying {blog_author:?} of comment {:?}", comment.id))?;
    tx.commit().await.context("committing transaction")?;

    Ok(Some(comment))
}

/// Returns None if the blog does not exist
///
/// Only an actual change of state touches the counter and the author's
/// notifications.
pub async fn like_blog(
    conn: &mut sqlx::PgConnection,
    user: UserId,
    req: &LikeBlog,
) -> anyhow::Result<Option<LikeStatus>> {
    let blog_id = &req.blog_id;
    let mut tx = conn.begin().await.context("starting transaction")?;
    let row = sqlx::query(
        "
            SELECT author_id, total_likes
                FROM blogs
            WHERE blog_id = $1
            FOR UPDATE
        ",
    )
    .bind(&blog_id.0)
    .fetch_optional(&mut *tx)
    .await
    .with_context(|| format!("locking blog {blog_id}"))?;
    let row = match row {
        Some(row) => row,
        None => return Ok(None),
    };
    let author = UserId(
        row.try_get("author_id")
            .context("retrieving the author_id field")?,
    );
    let mut total_likes = counter(&row, "total_likes")?;

    let res = if req.liked {
        sqlx::query(
            "
                INSERT INTO likes (blog_id, user_id, liked_at)
                VALUES ($1, $2, $3)
                ON CONFLICT DO NOTHING
            ",
        )
        .bind(&blog_id.0)
        .bind(user.0)
        .bind(now())
        .execute(&mut *tx)
        .await
        .with_context(|| format!("recording like of {blog_id} by {user:?}"))?
    } else {
        sqlx::query("DELETE FROM likes WHERE blog_id = $1 AND user_id = $2")
            .bind(&blog_id.0)
            .bind(user.0)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("removing like of {blog_id} by {user:?}"))?
    };

    if res.rows_affected() == 1 {
        let delta: i64 = if req.liked { 1 } else { -1 };
        let row = sqlx::query(
            "
                UPDATE blogs
                    SET total_likes = total_likes + $2
                WHERE blog_id = $1
                RETURNING total_likes
            ",
        )
        .bind(&blog_id.0)
        .bind(delta)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("counting likes of {blog_id}"))?;
        total_likes = counter(&row, "total_likes")?;

        if req.liked {
            sqlx::query(
                "
                    INSERT INTO notifications
                        (id, kind, blog_id, notification_for, from_user, created_at)
                    VALUES ($1, 'like', $2, $3, $4, $5)
                ",
            )
            .bind(Uuid::new_v4())
            .bind(&blog_id.0)
            .bind(author.0)
            .bind(user.0)
            .bind(now())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("notifying {author:?} of a like on {blog_id}"))?;
        } else {
            sqlx::query(
                "DELETE FROM notifications WHERE kind = 'like' AND blog_id = $1 AND from_user = $2",
            )
            .bind(&blog_id.0)
            .bind(user.0)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("retracting like notification on {blog_id}"))?;
        }
    }
    tx.commit().await.context("committing transaction")?;

    Ok(Some(LikeStatus {
        liked: req.liked,
        total_likes,
    }))
}

/// Returns None if the blog does not exist
pub async fn is_liked_by_user(
    conn: &mut sqlx::PgConnection,
    user: UserId,
    blog_id: &BlogId,
) -> anyhow::Result<Option<LikeStatus>> {
    let row = sqlx::query(
        "
            SELECT b.total_likes, EXISTS (
                SELECT 1 FROM likes l WHERE l.blog_id = b.blog_id AND l.user_id = $2
            ) AS liked
                FROM blogs b
            WHERE b.blog_id = $1
        ",
    )
    .bind(&blog_id.0)
    .bind(user.0)
    .fetch_optional(conn)
    .await
    .with_context(|| format!("checking whether {user:?} likes {blog_id}"))?;
    let row = match row {
        Some(row) => row,
        None => return Ok(None),
    };
    Ok(Some(LikeStatus {
        liked: row.try_get("liked").context("retrieving the liked field")?,
        total_likes: counter(&row, "total_likes")?,
    }))
}

pub struct PostgresDb<'a> {
    pub conn: &'a mut sqlx::PgConnection,
}

// offsets past i64::MAX are past the end anyway
fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl<'a> Store for PostgresDb<'a> {
    async fn count_blogs(&mut self, filter: &BlogFilter) -> anyhow::Result<u64> {
        let sql = query::to_postgres(filter, 1);
        let q = format!(
            "
                SELECT COUNT(*) AS total
                    FROM blogs b
                INNER JOIN users u
                    ON u.id = b.author_id
                WHERE {}
            ",
            sql.where_clause
        );
        let row = sql
            .bind_to(sqlx::query(&q))
            .fetch_one(&mut *self.conn)
            .await
            .with_context(|| format!("counting blogs matching {filter:?}"))?;
        counter(&row, "total")
    }

    async fn find_blogs(
        &mut self,
        filter: &BlogFilter,
        skip: u64,
        limit: u64,
    ) -> anyhow::Result<Vec<BlogSummary>> {
        let sql = query::to_postgres(filter, 1);
        let skip_idx = 1 + sql.binds.len();
        let limit_idx = skip_idx + 1;
        let q = format!(
            "
                SELECT {BLOG_COLUMNS}
                    FROM blogs b
                INNER JOIN users u
                    ON u.id = b.author_id
                WHERE {}
                ORDER BY b.published_at DESC, b.seq DESC
                OFFSET ${skip_idx}
                LIMIT ${limit_idx}
            ",
            sql.where_clause
        );
        let mut rows = sql
            .bind_to(sqlx::query(&q))
            .bind(to_i64(skip))
            .bind(to_i64(limit))
            .fetch(&mut *self.conn);
        let mut res = Vec::new();
        while let Some(row) = rows.try_next().await.context("querying blogs table")? {
            res.push(blog_summary_from_row(&row)?);
        }
        Ok(res)
    }

    async fn find_comments(
        &mut self,
        blog: &BlogId,
        skip: u64,
        limit: u64,
    ) -> anyhow::Result<Vec<Comment>> {
        let mut rows = sqlx::query(
            "
                SELECT c.id, c.blog_author, c.comment, c.commented_at,
                       u.username, u.fullname, u.profile_img
                    FROM comments c
                INNER JOIN users u
                    ON u.id = c.commented_by
                WHERE c.blog_id = $1
                ORDER BY c.commented_at DESC, c.seq DESC
                OFFSET $2
                LIMIT $3
            ",
        )
        .bind(&blog.0)
        .bind(to_i64(skip))
        .bind(to_i64(limit))
        .fetch(&mut *self.conn);
        let mut res = Vec::new();
        while let Some(row) = rows.try_next().await.context("querying comments table")? {
            res.push(Comment {
                id: CommentId(row.try_get("id").context("retrieving the id field")?),
                blog_id: blog.clone(),
                blog_author: UserId(
                    row.try_get("blog_author")
                        .context("retrieving the blog_author field")?,
                ),
                commented_by: user_summary_from_row(&row)?,
                comment: row
                    .try_get("comment")
                    .context("retrieving the comment field")?,
                commented_at: row
                    .try_get("commented_at")
                    .context("retrieving the commented_at field")?,
            });
        }
        Ok(res)
    }

    async fn find_trending(&mut self, limit: u64) -> anyhow::Result<Vec<BlogSummary>> {
        let q = format!(
            "
                SELECT {BLOG_COLUMNS}
                    FROM blogs b
                INNER JOIN users u
                    ON u.id = b.author_id
                WHERE b.draft = false
                ORDER BY b.total_reads DESC, b.total_likes DESC, b.published_at DESC, b.seq DESC
                LIMIT $1
            "
        );
        let mut rows = sqlx::query(&q)
            .bind(to_i64(limit))
            .fetch(&mut *self.conn);
        let mut res = Vec::new();
        while let Some(row) = rows.try_next().await.context("querying trending blogs")? {
            res.push(blog_summary_from_row(&row)?);
        }
        Ok(res)
    }
}
