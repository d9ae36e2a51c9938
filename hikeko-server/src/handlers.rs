use anyhow::Context;
use axum::Json;
use hikeko_api::{
    count_blog_page, fetch_blog_page, fetch_comment_page, fetch_trending, Blog, BlogFilter,
    BlogId, BlogSummary, Comment, Error as ApiError, FetchBlogs, FetchComments, GetBlog,
    GetProfile, IsLikedByUser, LikeBlog, LikeStatus, NewBlog, NewComment, PageCount, Profile,
    Session, SignIn, SignUp, UserSummary,
};

use crate::{db, extractors::*, Error};

pub async fn signup(mut conn: Conn, Json(data): Json<SignUp>) -> Result<Json<Session>, Error> {
    data.validate()?;
    Ok(Json(
        db::create_user(conn.db(), &data)
            .await
            .with_context(|| format!("signing up {:?}", data.email))??,
    ))
}

pub async fn signin(mut conn: Conn, Json(data): Json<SignIn>) -> Result<Json<Session>, Error> {
    data.validate()?;
    Ok(Json(
        db::login_user(conn.db(), &data)
            .await
            .context("logging user in")?
            .ok_or(ApiError::PermissionDenied)?,
    ))
}

pub async fn signout(PreAuth(token): PreAuth, mut conn: Conn) -> Result<(), Error> {
    let closed = db::logout_user(conn.db(), &token)
        .await
        .context("logging user out")?;
    if !closed {
        return Err(ApiError::PermissionDenied.into());
    }
    Ok(())
}

pub async fn whoami(auth: Auth) -> Json<UserSummary> {
    Json(auth.user)
}

pub async fn latest_blogs(
    mut conn: Conn,
    Json(req): Json<FetchBlogs>,
) -> Result<Json<Vec<BlogSummary>>, Error> {
    let mut db = db::PostgresDb { conn: conn.db() };
    Ok(Json(
        fetch_blog_page(&mut db, &req)
            .await
            .with_context(|| format!("fetching blog page {:?}", req))??,
    ))
}

pub async fn count_blogs(
    mut conn: Conn,
    Json(filter): Json<BlogFilter>,
) -> Result<Json<PageCount>, Error> {
    let mut db = db::PostgresDb { conn: conn.db() };
    Ok(Json(
        count_blog_page(&mut db, &filter)
            .await
            .with_context(|| format!("counting blogs for {:?}", filter))??,
    ))
}

pub async fn trending_blogs(mut conn: Conn) -> Result<Json<Vec<BlogSummary>>, Error> {
    let mut db = db::PostgresDb { conn: conn.db() };
    Ok(Json(
        fetch_trending(&mut db)
            .await
            .context("fetching trending blogs")?,
    ))
}

pub async fn get_blog(mut conn: Conn, Json(req): Json<GetBlog>) -> Result<Json<Blog>, Error> {
    req.blog_id.validate()?;
    Ok(Json(
        db::get_blog(conn.db(), &req.blog_id)
            .await
            .with_context(|| format!("reading blog {}", req.blog_id))?
            .ok_or_else(|| ApiError::BlogNotFound(req.blog_id.0.clone()))?,
    ))
}

pub async fn create_blog(
    auth: Auth,
    mut conn: Conn,
    Json(blog): Json<NewBlog>,
) -> Result<Json<BlogId>, Error> {
    blog.validate()?;
    Ok(Json(
        db::create_blog(conn.db(), auth.id, &blog)
            .await
            .with_context(|| format!("creating blog {:?} for {:?}", blog.title, auth.id))?,
    ))
}

pub async fn add_comment(
    auth: Auth,
    mut conn: Conn,
    Json(comment): Json<NewComment>,
) -> Result<Json<Comment>, Error> {
    comment.validate()?;
    let Auth { id, user } = auth;
    Ok(Json(
        db::add_comment(conn.db(), id, user, &comment)
            .await
            .with_context(|| format!("adding comment by {:?} on {}", id, comment.blog_id))?
            .ok_or_else(|| ApiError::BlogNotFound(comment.blog_id.0.clone()))?,
    ))
}

pub async fn get_blog_comments(
    mut conn: Conn,
    Json(req): Json<FetchComments>,
) -> Result<Json<Vec<Comment>>, Error> {
    let mut db = db::PostgresDb { conn: conn.db() };
    Ok(Json(
        fetch_comment_page(&mut db, &req)
            .await
            .with_context(|| format!("fetching comments {:?}", req))??,
    ))
}

pub async fn like_blog(
    auth: Auth,
    mut conn: Conn,
    Json(req): Json<LikeBlog>,
) -> Result<Json<LikeStatus>, Error> {
    req.validate()?;
    Ok(Json(
        db::like_blog(conn.db(), auth.id, &req)
            .await
            .with_context(|| format!("setting like of {} by {:?}", req.blog_id, auth.id))?
            .ok_or_else(|| ApiError::BlogNotFound(req.blog_id.0.clone()))?,
    ))
}

pub async fn is_liked_by_user(
    auth: Auth,
    mut conn: Conn,
    Json(req): Json<IsLikedByUser>,
) -> Result<Json<LikeStatus>, Error> {
    req.validate()?;
    Ok(Json(
        db::is_liked_by_user(conn.db(), auth.id, &req.blog_id)
            .await
            .with_context(|| format!("checking like of {} by {:?}", req.blog_id, auth.id))?
            .ok_or_else(|| ApiError::BlogNotFound(req.blog_id.0.clone()))?,
    ))
}

pub async fn get_profile(
    mut conn: Conn,
    Json(req): Json<GetProfile>,
) -> Result<Json<Profile>, Error> {
    hikeko_api::validate_string(&req.username)?;
    Ok(Json(
        db::get_profile(conn.db(), &req.username)
            .await
            .with_context(|| format!("fetching profile of {:?}", req.username))?
            .ok_or_else(|| ApiError::UserNotFound(req.username.clone()))?,
    ))
}
