use anyhow::Context;
use async_trait::async_trait;

use crate::{
    api::{
        AuthToken, Blog, BlogFilter, BlogId, BlogSummary, Comment, Error, FetchBlogs,
        FetchComments, GetBlog, GetProfile, IsLikedByUser, LikeBlog, LikeStatus, NewBlog,
        NewComment, PageCount, Profile, Session, SignIn, SignUp, UserSummary,
    },
    Backend,
};

/// HTTP client for a hikeko server
#[derive(Clone, Debug)]
pub struct Client {
    host: String,
    http: reqwest::Client,
    token: Option<AuthToken>,
}

impl Client {
    pub fn new(host: String) -> Client {
        Client {
            host,
            http: reqwest::Client::new(),
            token: None,
        }
    }

    pub fn with_token(self, token: AuthToken) -> Client {
        Client {
            token: Some(token),
            ..self
        }
    }

    pub fn token(&self) -> Option<AuthToken> {
        self.token
    }

    async fn send(
        &self,
        req: reqwest::RequestBuilder,
        route: &str,
    ) -> anyhow::Result<reqwest::Response> {
        let req = match self.token {
            Some(token) => req.bearer_auth(token.0),
            None => req,
        };
        let resp = req
            .send()
            .await
            .with_context(|| format!("sending request to {route}"))?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .with_context(|| format!("reading error body from {route}"))?;
        let err = Error::parse(&body)
            .with_context(|| format!("parsing {status} error body from {route}"))?;
        Err(anyhow::Error::new(err).context(format!("server rejected request to {route}")))
    }

    async fn get<Resp>(&self, route: &str) -> anyhow::Result<Resp>
    where
        Resp: for<'de> serde::Deserialize<'de>,
    {
        let req = self.http.get(format!("{}/api/{}", self.host, route));
        self.send(req, route)
            .await?
            .json()
            .await
            .with_context(|| format!("parsing response from {route}"))
    }

    async fn post<Req, Resp>(&self, route: &str, body: &Req) -> anyhow::Result<Resp>
    where
        Req: ?Sized + serde::Serialize,
        Resp: for<'de> serde::Deserialize<'de>,
    {
        let req = self
            .http
            .post(format!("{}/api/{}", self.host, route))
            .json(body);
        self.send(req, route)
            .await?
            .json()
            .await
            .with_context(|| format!("parsing response from {route}"))
    }

    pub async fn signup(&self, data: &SignUp) -> anyhow::Result<Session> {
        self.post("signup", data).await
    }

    pub async fn signin(&self, data: &SignIn) -> anyhow::Result<Session> {
        self.post("signin", data).await
    }

    pub async fn signout(&self) -> anyhow::Result<()> {
        let req = self.http.post(format!("{}/api/signout", self.host));
        self.send(req, "signout").await?;
        Ok(())
    }

    pub async fn whoami(&self) -> anyhow::Result<UserSummary> {
        self.get("whoami").await
    }

    pub async fn get_blog(&self, blog_id: BlogId) -> anyhow::Result<Blog> {
        self.post("get-blog", &GetBlog { blog_id }).await
    }

    pub async fn create_blog(&self, blog: &NewBlog) -> anyhow::Result<BlogId> {
        self.post("create-blog", blog).await
    }

    pub async fn add_comment(&self, comment: &NewComment) -> anyhow::Result<Comment> {
        self.post("add-comment", comment).await
    }

    pub async fn get_profile(&self, username: String) -> anyhow::Result<Profile> {
        self.post("get-profile", &GetProfile { username }).await
    }

    pub async fn like_blog(&self, blog_id: BlogId, liked: bool) -> anyhow::Result<LikeStatus> {
        self.post("like-blog", &LikeBlog { blog_id, liked }).await
    }

    pub async fn is_liked_by_user(&self, blog_id: BlogId) -> anyhow::Result<LikeStatus> {
        self.post("isliked-by-user", &IsLikedByUser { blog_id }).await
    }

    pub async fn trending_blogs(&self) -> anyhow::Result<Vec<BlogSummary>> {
        self.get("trending-blogs").await
    }
}

#[async_trait]
impl Backend for Client {
    async fn count_blogs(&self, filter: &BlogFilter) -> anyhow::Result<u64> {
        let count: PageCount = self.post("count-blogs", filter).await?;
        Ok(count.total_docs)
    }

    async fn fetch_blogs(
        &self,
        filter: &BlogFilter,
        page: u64,
    ) -> anyhow::Result<Vec<BlogSummary>> {
        self.post(
            "latest-blogs",
            &FetchBlogs {
                filter: filter.clone(),
                page,
            },
        )
        .await
    }

    async fn fetch_comments(&self, blog: &BlogId, skip: u64) -> anyhow::Result<Vec<Comment>> {
        self.post(
            "get-blog-comments",
            &FetchComments {
                blog_id: blog.clone(),
                skip,
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::{
        http::{header, HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };

    use super::*;
    use crate::{
        api::{BLOGS_PER_PAGE, STUB_UUID},
        seed_total, test_util, BlogFeed,
    };

    async fn serve(app: Router) -> Client {
        let server = axum::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0)))
            .serve(app.into_make_service());
        let addr = server.local_addr();
        tokio::spawn(server);
        Client::new(format!("http://{addr}"))
    }

    fn reject(err: Error) -> (StatusCode, Vec<u8>) {
        (err.status_code(), err.contents())
    }

    #[tokio::test]
    async fn failed_count_seeds_zero() {
        let app = Router::new().route(
            "/api/count-blogs",
            post(|| async { reject(Error::Unknown(String::from("database is down"))) }),
        );
        let client = serve(app).await;

        let err = client
            .count_blogs(&BlogFilter::Latest)
            .await
            .expect_err("count should fail");
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::Unknown(String::from("database is down")))
        );
        assert_eq!(seed_total(&client, &BlogFilter::Latest).await, 0);

        let feed = BlogFeed::new(BlogFilter::Latest);
        let feed = feed.load_next_page(&client).await.expect("loading page");
        // no latest-blogs route, so the fetch fails and nothing changes
        assert!(feed.pages().is_none());
    }

    #[tokio::test]
    async fn feed_pages_over_http() {
        let blogs: Vec<_> = (0..7).map(test_util::blog).collect();
        let total_docs = blogs.len() as u64;
        let served = blogs.clone();
        let app = Router::new()
            .route(
                "/api/count-blogs",
                post(move |Json(_): Json<BlogFilter>| async move {
                    Json(PageCount { total_docs })
                }),
            )
            .route(
                "/api/latest-blogs",
                post(move |Json(req): Json<FetchBlogs>| {
                    let served = served.clone();
                    async move {
                        let per_page = BLOGS_PER_PAGE as usize;
                        let skip = (req.page as usize - 1) * per_page;
                        Json(served.into_iter().skip(skip).take(per_page).collect::<Vec<_>>())
                    }
                }),
            );
        let client = serve(app).await;

        let feed = BlogFeed::new(BlogFilter::Latest)
            .load_next_page(&client)
            .await
            .expect("loading first page");
        assert_eq!(feed.pages().map(|p| (p.page, p.total_docs)), Some((1, 7)));
        assert_eq!(feed.blogs().len(), 5);
        assert!(feed.has_more());

        let feed = feed.load_next_page(&client).await.expect("loading second page");
        assert_eq!(feed.pages().map(|p| (p.page, p.total_docs)), Some((2, 7)));
        let ids = feed.blogs().iter().map(|b| &b.blog_id).collect::<Vec<_>>();
        assert_eq!(ids, blogs.iter().map(|b| &b.blog_id).collect::<Vec<_>>());
        assert!(!feed.has_more());
    }

    async fn whoami(headers: HeaderMap) -> Result<Json<UserSummary>, (StatusCode, Vec<u8>)> {
        let expected = format!("Bearer {STUB_UUID}");
        let auth = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
        if auth != Some(expected.as_str()) {
            return Err(reject(Error::PermissionDenied));
        }
        Ok(Json(test_util::user("jane")))
    }

    #[tokio::test]
    async fn bearer_token_and_likes() {
        let app = Router::new()
            .route("/api/whoami", get(whoami))
            .route(
                "/api/like-blog",
                post(|Json(req): Json<LikeBlog>| async move {
                    Json(LikeStatus {
                        liked: req.liked,
                        total_likes: u64::from(req.liked),
                    })
                }),
            )
            .route(
                "/api/trending-blogs",
                get(|| async { Json(vec![test_util::blog(3)]) }),
            );
        let client = serve(app).await;

        let err = client.whoami().await.expect_err("anonymous whoami");
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::PermissionDenied));

        let client = client.with_token(AuthToken::stub());
        let me = client.whoami().await.expect("whoami with token");
        assert_eq!(me.username, "jane");

        let blog = BlogId(String::from("blog-3"));
        let status = client.like_blog(blog.clone(), true).await.expect("liking");
        assert_eq!(
            status,
            LikeStatus {
                liked: true,
                total_likes: 1,
            }
        );
        let status = client.like_blog(blog.clone(), false).await.expect("unliking");
        assert!(!status.liked);

        let trending = client.trending_blogs().await.expect("fetching trending");
        assert_eq!(trending.len(), 1);
        assert_eq!(trending[0].blog_id, blog);
    }
}
