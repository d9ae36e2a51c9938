#![cfg(test)]

use async_recursion::async_recursion;
use axum::{
    extract::FromRequestParts,
    http::{self, request},
};
use hikeko_api::{
    AuthToken, BlogContent, BlogFilter, BlogId, Error as ApiError, FetchBlogs, FetchComments,
    GetBlog, GetProfile, IsLikedByUser, LikeBlog, LikeStatus, NewBlog, NewComment, SignIn, SignUp,
    Uuid,
};
use hikeko_mock_server::MockServer;
use std::{cmp, fmt::Debug, future::Future, ops::RangeTo, panic::AssertUnwindSafe, path::Path};
use tower::{Service, ServiceExt};

use crate::{extractors::*, *};

macro_rules! do_tokio_test {
    ( $name:ident, $typ:ty, $fn:expr ) => {
        #[test]
        fn $name() {
            let runtime = AssertUnwindSafe(
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed initializing tokio runtime"),
            );
            bolero::check!()
                .with_type::<$typ>()
                .cloned()
                .for_each(move |v| {
                    let () = runtime.block_on($fn(v));
                })
        }
    };
}

fn build_pg_cluster(data: &Path) -> Option<postgresfixture::cluster::Cluster> {
    let mut runtime = None;
    let mut best_version = None;
    for r in postgresfixture::runtime::Runtime::find_on_path() {
        if let Ok(v) = r.version() {
            match (&mut runtime, &mut best_version) {
                (None, None) => {
                    runtime = Some(r);
                    best_version = Some(v);
                }
                (Some(runtime), Some(best_version)) => {
                    if *best_version < v {
                        *runtime = r;
                        *best_version = v;
                    }
                }
                _ => unreachable!(),
            }
        }
    }
    Some(postgresfixture::cluster::Cluster::new(data, runtime?))
}

macro_rules! do_sqlx_test {
    ( $name:ident, $gen:expr, $fn:expr ) => {
        #[test]
        fn $name() {
            if std::env::var("RUST_LOG").is_ok() {
                tracing_subscriber::fmt::init();
            }
            let lockfile = tempfile::tempfile().expect("creating tempfile");
            let datadir = tempfile::tempdir().expect("creating tempdir");
            let datadir_path: &Path = datadir.as_ref();
            let cluster = match build_pg_cluster(datadir_path) {
                Some(cluster) => cluster,
                None => {
                    eprintln!("postgresql seems to not be installed in path, skipping {}", stringify!($name));
                    return;
                }
            };
            let datadir_path: &str = datadir_path.to_str().expect("tempdir is not valid utf8");
            postgresfixture::coordinate::run_and_destroy(&cluster, lockfile.into(), || {
                cluster.createdb("test_db").expect("creating test_db database");
                let runtime = AssertUnwindSafe(
                    tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                        .expect("failed initializing tokio runtime"),
                );
                // create test db
                let pool = AssertUnwindSafe(runtime.block_on(async move {
                    let pool = create_sqlx_pool(&format!("postgresql://?host={}&dbname=test_db", datadir_path), 8).await.expect("creating sqlx pool");
                    MIGRATOR
                        .run(&mut *pool.acquire().await.expect("getting migrator connection"))
                        .await
                        .expect("failed applying migrations");
                    pool
                }));
                bolero::check!()
                    .with_generator($gen)
                    .cloned()
                    .for_each(move |v| {
                        let pool = pool.clone();
                        // run the test
                        let idle_before = pool.num_idle();
                        let v_str = format!("{v:?}");
                        let idle_after_res: Result<usize, _> = {
                            let pool = pool.clone();
                            std::panic::catch_unwind(AssertUnwindSafe(|| {
                                runtime.block_on(async move {
                                    let () = $fn(pool.clone(), v).await;
                                    let mut idle_after = pool.num_idle();
                                    let wait_release_since = std::time::Instant::now();
                                    while idle_after < idle_before
                                        && wait_release_since.elapsed()
                                            <= std::time::Duration::from_secs(1)
                                    {
                                        tokio::task::yield_now().await;
                                        idle_after = pool.num_idle();
                                    }
                                    idle_after
                                })
                            }))
                        };
                        runtime.block_on(async move {
                            // cleanup
                            let mut conn =
                                pool.acquire().await.expect("getting db cleanup connection");
                            sqlx::query(include_str!("../reset-test-db.sql"))
                                .execute(&mut *conn)
                                .await
                                .expect("failed cleaning up database");
                        });
                        // resume the panics
                        match idle_after_res {
                            Err(e) => std::panic::resume_unwind(e),
                            Ok(idle_after) => assert!(
                                idle_after >= idle_before,
                                "test {} held onto pool after exiting test: before there were {idle_before} connections, and after there were {idle_after} with value {v_str}",
                                stringify!($name)
                            ),
                        }
                    });
            })
            .expect("coordinating spinup and shutdown of the pg cluster");
        }
    };
}

/// Runs `test` once against a freshly migrated database
fn sqlx_scenario<F, Fut>(name: &str, test: F)
where
    F: FnOnce(PgPool) -> Fut,
    Fut: Future<Output = ()>,
{
    let lockfile = tempfile::tempfile().expect("creating tempfile");
    let datadir = tempfile::tempdir().expect("creating tempdir");
    let datadir_path: &Path = datadir.as_ref();
    let cluster = match build_pg_cluster(datadir_path) {
        Some(cluster) => cluster,
        None => {
            eprintln!("postgresql seems to not be installed in path, skipping {name}");
            return;
        }
    };
    let datadir_path: &str = datadir_path.to_str().expect("tempdir is not valid utf8");
    let test = AssertUnwindSafe(test);
    postgresfixture::coordinate::run_and_destroy(&cluster, lockfile.into(), || {
        let wrapped = test;
        let AssertUnwindSafe(test) = wrapped;
        cluster.createdb("test_db").expect("creating test_db database");
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("failed initializing tokio runtime");
        runtime.block_on(async move {
            let url = format!("postgresql://?host={datadir_path}&dbname=test_db");
            let pool = create_sqlx_pool(&url, 8).await.expect("creating sqlx pool");
            MIGRATOR.run(&pool).await.expect("failed applying migrations");
            test(pool).await
        })
    })
    .expect("coordinating spinup and shutdown of the pg cluster");
}

do_tokio_test!(fuzz_preauth_extractor, String, |token| async move {
    if let Ok(req) = http::Request::builder()
        .method(http::Method::GET)
        .uri("/")
        .header(http::header::AUTHORIZATION, token)
        .body(())
    {
        let mut req = req.into_parts().0;
        let res = PreAuth::from_request_parts(&mut req, &()).await;
        match res {
            Ok(_) => (),
            Err(Error::Rejected(ApiError::PermissionDenied)) => (),
            Err(e) => panic!("got unexpected error: {e}"),
        }
    }
});

const TAGS: [&str; 4] = ["Travel", "food", "rust", "Alps"];

// (op, id, param, text)
type RawOp = (u8, usize, usize, String);

#[derive(Clone, Debug)]
enum FuzzOp {
    Signup { user: usize, password_ok: bool, fullname: String },
    Signin { uid: usize, password_ok: bool },
    Signout { sid: usize },
    Whoami { sid: usize },
    CreateBlog { sid: usize, tags: usize, draft: bool, title: String },
    CountBlogs { filter: FuzzFilter },
    LatestBlogs { filter: FuzzFilter, page: u64 },
    GetBlog { bid: usize },
    AddComment { sid: usize, bid: usize, comment: String },
    GetBlogComments { bid: usize, skip: u64 },
    GetProfile { uid: usize },
    LikeBlog { sid: usize, bid: usize, liked: bool },
    IsLikedByUser { sid: usize, bid: usize },
    TrendingBlogs,
}

#[derive(Clone, Debug)]
enum FuzzFilter {
    Latest,
    Tag { tag: usize, eliminate: Option<usize> },
    Author { uid: usize },
    Search { query: String },
}

// search and title matching only agree across the app and the mock on ascii
fn ascii(s: &str) -> String {
    s.chars().filter(char::is_ascii).collect()
}

impl FuzzOp {
    fn from_raw((op, id, param, text): RawOp) -> FuzzOp {
        match op % 14 {
            0 => FuzzOp::Signup {
                user: id % 8,
                password_ok: param % 5 != 0,
                fullname: text,
            },
            1 => FuzzOp::Signin {
                uid: id,
                password_ok: param % 4 != 0,
            },
            2 => FuzzOp::Signout { sid: id },
            3 => FuzzOp::Whoami { sid: id },
            4 => FuzzOp::CreateBlog {
                sid: id,
                tags: param,
                draft: param % 7 == 0,
                title: ascii(&text),
            },
            5 => FuzzOp::CountBlogs {
                filter: FuzzFilter::from_raw(id, param, text),
            },
            6 => FuzzOp::LatestBlogs {
                filter: FuzzFilter::from_raw(id, param, text),
                page: (param % 4) as u64,
            },
            7 => FuzzOp::GetBlog { bid: id },
            8 => FuzzOp::AddComment {
                sid: id,
                bid: param,
                comment: text,
            },
            9 => FuzzOp::GetBlogComments {
                bid: id,
                skip: (param % 12) as u64,
            },
            10 => FuzzOp::GetProfile { uid: id },
            11 => FuzzOp::LikeBlog {
                sid: id,
                bid: param,
                liked: param % 3 != 0,
            },
            12 => FuzzOp::IsLikedByUser { sid: id, bid: param },
            _ => FuzzOp::TrendingBlogs,
        }
    }
}

impl FuzzFilter {
    fn from_raw(id: usize, param: usize, text: String) -> FuzzFilter {
        match param % 4 {
            0 => FuzzFilter::Latest,
            1 => FuzzFilter::Tag {
                tag: id,
                eliminate: (id % 3 == 0).then_some(param),
            },
            2 => FuzzFilter::Author { uid: id },
            _ => FuzzFilter::Search {
                query: ascii(&text),
            },
        }
    }
}

async fn call<Req, Resp>(
    app: &mut Router,
    req: request::Request<axum::body::Body>,
    req_body: &Req,
) -> Result<Resp, ApiError>
where
    Req: Debug,
    Resp: 'static + for<'de> serde::Deserialize<'de>,
{
    app.ready().await.expect("waiting for app to be ready");
    let resp = app.call(req).await.expect("running request");
    let status = resp.status();
    let body = hyper::body::to_bytes(resp.into_body())
        .await
        .expect("recovering resp bytes");
    if status == http::StatusCode::OK {
        if std::any::TypeId::of::<Resp>() == std::any::TypeId::of::<()>() {
            // the server answers () with an empty body, which serde_json cannot parse
            return Ok(serde_json::from_slice(b"null").unwrap());
        } else {
            return Ok(serde_json::from_slice(&body).unwrap_or_else(|err| {
                panic!(
                    r#"
                        Failed parsing resp body!

                        The error is the following:
                        ---
                        {err}
                        ---

                        Response body is:
                        ---
                        {body:?}
                        ---

                        Request was:
                        ---
                        {req_body:?}
                        ---
                    "#
                )
            }));
        }
    }
    Err(ApiError::parse(&body)
        .unwrap_or_else(|err| panic!("parsing error response body {err}, body is {body:?}")))
}

async fn run_on_app<Req, Resp>(
    app: &mut Router,
    method: &str,
    uri: &str,
    token: Option<AuthToken>,
    body: &Req,
) -> Result<Resp, ApiError>
where
    Req: Debug + serde::Serialize,
    Resp: 'static + for<'de> serde::Deserialize<'de>,
{
    let req = request::Builder::new()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    let req = match token {
        Some(token) => req.header(http::header::AUTHORIZATION, format!("bearer {}", token.0)),
        None => req,
    };
    let req = req
        .body(axum::body::Body::from(
            serde_json::to_vec(body).expect("serializing request body to json"),
        ))
        .expect("building request");
    call(app, req, body).await
}

/// Compares the parts of the results that do not depend on generated ids or timestamps
fn compare<T, V, F>(
    name: &str,
    app_res: Result<T, ApiError>,
    mock_res: Result<T, ApiError>,
    view: F,
) where
    V: Debug + PartialEq,
    F: Fn(&T) -> V,
{
    assert_eq!(
        app_res.as_ref().map(&view),
        mock_res.as_ref().map(&view),
        "app and mock did not return the same result for {name}"
    );
}

fn resize_int(fuzz_id: usize, RangeTo { end }: RangeTo<usize>) -> Option<usize> {
    if end == 0 {
        return None;
    }
    let bucket_size = cmp::max(1, usize::MAX / end); // in case we rounded to 0
    let id = fuzz_id / bucket_size;
    Some(cmp::min(id, end - 1)) // in case id was actually over end - 1 due to rounding
}

fn blog_view(b: &hikeko_api::BlogSummary) -> impl Debug + PartialEq {
    (
        b.title.clone(),
        b.des.clone(),
        b.tags.clone(),
        b.activity,
        b.author.clone(),
    )
}

fn comment_view(c: &hikeko_api::Comment) -> impl Debug + PartialEq {
    (c.comment.clone(), c.commented_by.clone())
}

struct Session {
    app: AuthToken,
    mock: AuthToken,
}

struct Blog {
    app: BlogId,
    mock: BlogId,
}

struct ComparativeFuzzer {
    app: Router,
    mock: MockServer,
    sessions: Vec<Session>,
    blogs: Vec<Blog>,
}

impl ComparativeFuzzer {
    fn new(pool: PgPool) -> ComparativeFuzzer {
        ComparativeFuzzer {
            app: app(pool),
            mock: MockServer::new(),
            sessions: Vec::new(),
            blogs: Vec::new(),
        }
    }

    fn session(&self, sid: usize) -> Option<&Session> {
        resize_int(sid, ..self.sessions.len()).map(|i| &self.sessions[i])
    }

    /// Unknown sessions are fresh tokens on both sides
    fn tokens(&self, sid: usize) -> (AuthToken, AuthToken) {
        match self.session(sid) {
            Some(s) => (s.app, s.mock),
            None => (AuthToken(Uuid::new_v4()), AuthToken(Uuid::new_v4())),
        }
    }

    /// Unknown blogs are looked up under the same id on both sides
    fn blog_ids(&self, bid: usize) -> (BlogId, BlogId) {
        match resize_int(bid, ..self.blogs.len()) {
            Some(i) => (self.blogs[i].app.clone(), self.blogs[i].mock.clone()),
            None => {
                let unknown = BlogId(String::from("unknown-blog"));
                (unknown.clone(), unknown)
            }
        }
    }

    fn username(&self, uid: usize) -> String {
        match resize_int(uid, ..self.mock.test_num_users()) {
            Some(i) => String::from(self.mock.test_get_username(i)),
            None => String::from("nobody"),
        }
    }

    fn filters(&self, f: &FuzzFilter) -> (BlogFilter, BlogFilter) {
        match f {
            FuzzFilter::Latest => (BlogFilter::Latest, BlogFilter::Latest),
            FuzzFilter::Tag { tag, eliminate } => {
                let tag = String::from(TAGS[tag % TAGS.len()]);
                let (app_elim, mock_elim) = match eliminate {
                    Some(bid) => {
                        let (app, mock) = self.blog_ids(*bid);
                        (Some(app), Some(mock))
                    }
                    None => (None, None),
                };
                (
                    BlogFilter::Tag {
                        tag: tag.clone(),
                        eliminate: app_elim,
                    },
                    BlogFilter::Tag {
                        tag,
                        eliminate: mock_elim,
                    },
                )
            }
            FuzzFilter::Author { uid } => {
                let username = self.username(*uid);
                (
                    BlogFilter::Author {
                        username: username.clone(),
                    },
                    BlogFilter::Author { username },
                )
            }
            FuzzFilter::Search { query } => {
                let f = BlogFilter::Search {
                    query: query.clone(),
                };
                (f.clone(), f)
            }
        }
    }

    async fn signup(&mut self, user: usize, password_ok: bool, fullname: String) {
        let data = SignUp {
            fullname,
            email: format!("user{user}@example.com"),
            password: String::from(if password_ok { "Passw0rd" } else { "short" }),
        };
        let app_res: Result<hikeko_api::Session, ApiError> = run_on_app(&mut self.app, "POST", "/api/signup", None, &data).await;
        let mock_res = self.mock.signup(data);
        if let (Ok(app), Ok(mock)) = (&app_res, &mock_res) {
            self.sessions.push(Session {
                app: app.access_token,
                mock: mock.access_token,
            });
        }
        compare("Signup", app_res, mock_res, |s: &hikeko_api::Session| {
            (s.username.clone(), s.fullname.clone(), s.profile_img.clone())
        });
    }

    #[async_recursion]
    async fn execute_fuzz_op(&mut self, op: FuzzOp) {
        match op {
            FuzzOp::Signup {
                user,
                password_ok,
                fullname,
            } => self.signup(user, password_ok, fullname).await,
            FuzzOp::Signin { uid, password_ok } => {
                if let Some(uid) = resize_int(uid, ..self.mock.test_num_users()) {
                    let (email, password) = self.mock.test_get_user_info(uid);
                    let data = SignIn {
                        email: String::from(email),
                        password: match password_ok {
                            true => String::from(password),
                            false => format!("{password}x"),
                        },
                    };
                    let app_res: Result<hikeko_api::Session, ApiError> =
                        run_on_app(&mut self.app, "POST", "/api/signin", None, &data).await;
                    let mock_res = self.mock.signin(data);
                    if let (Ok(app), Ok(mock)) = (&app_res, &mock_res) {
                        self.sessions.push(Session {
                            app: app.access_token,
                            mock: mock.access_token,
                        });
                    }
                    compare("Signin", app_res, mock_res, |s: &hikeko_api::Session| {
                        s.username.clone()
                    });
                } else {
                    self.signup(0, true, String::from("User Zero")).await;
                    self.execute_fuzz_op(FuzzOp::Signin { uid, password_ok })
                        .await;
                }
            }
            FuzzOp::Signout { sid } => {
                if let Some(s) = self.session(sid) {
                    let (app_tok, mock_tok) = (s.app, s.mock);
                    let app_res: Result<(), ApiError> =
                        run_on_app(&mut self.app, "POST", "/api/signout", Some(app_tok), &()).await;
                    compare("Signout", app_res, self.mock.signout(mock_tok), |r| *r);
                }
            }
            FuzzOp::Whoami { sid } => {
                if let Some(s) = self.session(sid) {
                    let (app_tok, mock_tok) = (s.app, s.mock);
                    let req = request::Builder::new()
                        .method("GET")
                        .uri("/api/whoami")
                        .header(http::header::AUTHORIZATION, format!("bearer {}", app_tok.0))
                        .body(axum::body::Body::empty())
                        .expect("building request");
                    let app_res = call(&mut self.app, req, &()).await;
                    compare("Whoami", app_res, self.mock.whoami(mock_tok), |u| u.clone());
                }
            }
            FuzzOp::CreateBlog {
                sid,
                tags,
                draft,
                title,
            } => {
                let (app_tok, mock_tok) = self.tokens(sid);
                let blog = NewBlog {
                    title,
                    des: String::from("a fuzzed blog"),
                    banner: String::from("https://example.com/banner.png"),
                    tags: TAGS
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| tags & (1 << i) != 0)
                        .map(|(_, t)| String::from(*t))
                        .collect(),
                    content: BlogContent {
                        blocks: vec![serde_json::json!({
                            "type": "paragraph",
                            "data": { "text": "hi" },
                        })],
                    },
                    draft,
                };
                let app_res: Result<BlogId, ApiError> =
                    run_on_app(&mut self.app, "POST", "/api/create-blog", Some(app_tok), &blog)
                        .await;
                let mock_res = self.mock.create_blog(mock_tok, blog);
                if let (Ok(app), Ok(mock)) = (&app_res, &mock_res) {
                    self.blogs.push(Blog {
                        app: app.clone(),
                        mock: mock.clone(),
                    });
                }
                compare("CreateBlog", app_res, mock_res, |_| ());
            }
            FuzzOp::CountBlogs { filter } => {
                let (app_filter, mock_filter) = self.filters(&filter);
                let app_res =
                    run_on_app(&mut self.app, "POST", "/api/count-blogs", None, &app_filter).await;
                compare(
                    "CountBlogs",
                    app_res,
                    self.mock.count_blogs(mock_filter).await,
                    |c| *c,
                );
            }
            FuzzOp::LatestBlogs { filter, page } => {
                let (app_filter, mock_filter) = self.filters(&filter);
                let app_req = FetchBlogs {
                    filter: app_filter,
                    page,
                };
                let app_res: Result<Vec<hikeko_api::BlogSummary>, ApiError> =
                    run_on_app(&mut self.app, "POST", "/api/latest-blogs", None, &app_req).await;
                let mock_res = self
                    .mock
                    .latest_blogs(FetchBlogs {
                        filter: mock_filter,
                        page,
                    })
                    .await;
                compare("LatestBlogs", app_res, mock_res, |blogs| {
                    blogs.iter().map(blog_view).collect::<Vec<_>>()
                });
            }
            FuzzOp::GetBlog { bid } => {
                let (app_id, mock_id) = self.blog_ids(bid);
                let app_res: Result<hikeko_api::Blog, ApiError> = run_on_app(
                    &mut self.app,
                    "POST",
                    "/api/get-blog",
                    None,
                    &GetBlog { blog_id: app_id },
                )
                .await;
                let mock_res = self.mock.get_blog(GetBlog { blog_id: mock_id });
                compare("GetBlog", app_res, mock_res, |b| {
                    (blog_view(&b.summary()), b.content.clone())
                });
            }
            FuzzOp::AddComment { sid, bid, comment } => {
                let (app_tok, mock_tok) = self.tokens(sid);
                let (app_id, mock_id) = self.blog_ids(bid);
                let app_res: Result<hikeko_api::Comment, ApiError> = run_on_app(
                    &mut self.app,
                    "POST",
                    "/api/add-comment",
                    Some(app_tok),
                    &NewComment {
                        blog_id: app_id,
                        comment: comment.clone(),
                    },
                )
                .await;
                let mock_res = self.mock.add_comment(
                    mock_tok,
                    NewComment {
                        blog_id: mock_id,
                        comment,
                    },
                );
                compare("AddComment", app_res, mock_res, comment_view);
            }
            FuzzOp::GetBlogComments { bid, skip } => {
                let (app_id, mock_id) = self.blog_ids(bid);
                let app_res: Result<Vec<hikeko_api::Comment>, ApiError> = run_on_app(
                    &mut self.app,
                    "POST",
                    "/api/get-blog-comments",
                    None,
                    &FetchComments {
                        blog_id: app_id,
                        skip,
                    },
                )
                .await;
                let mock_res = self
                    .mock
                    .get_blog_comments(FetchComments {
                        blog_id: mock_id,
                        skip,
                    })
                    .await;
                compare("GetBlogComments", app_res, mock_res, |comments| {
                    comments.iter().map(comment_view).collect::<Vec<_>>()
                });
            }
            FuzzOp::GetProfile { uid } => {
                let req = GetProfile {
                    username: self.username(uid),
                };
                let app_res: Result<hikeko_api::Profile, ApiError> =
                    run_on_app(&mut self.app, "POST", "/api/get-profile", None, &req).await;
                compare("GetProfile", app_res, self.mock.get_profile(req), |p| {
                    (p.user.clone(), p.bio.clone(), p.total_posts, p.total_reads)
                });
            }
            FuzzOp::LikeBlog { sid, bid, liked } => {
                let (app_tok, mock_tok) = self.tokens(sid);
                let (app_id, mock_id) = self.blog_ids(bid);
                let app_res: Result<LikeStatus, ApiError> = run_on_app(
                    &mut self.app,
                    "POST",
                    "/api/like-blog",
                    Some(app_tok),
                    &LikeBlog {
                        blog_id: app_id,
                        liked,
                    },
                )
                .await;
                let mock_res = self.mock.like_blog(
                    mock_tok,
                    LikeBlog {
                        blog_id: mock_id,
                        liked,
                    },
                );
                compare("LikeBlog", app_res, mock_res, |s| *s);
            }
            FuzzOp::IsLikedByUser { sid, bid } => {
                let (app_tok, mock_tok) = self.tokens(sid);
                let (app_id, mock_id) = self.blog_ids(bid);
                let app_res: Result<LikeStatus, ApiError> = run_on_app(
                    &mut self.app,
                    "POST",
                    "/api/isliked-by-user",
                    Some(app_tok),
                    &IsLikedByUser { blog_id: app_id },
                )
                .await;
                let mock_res = self
                    .mock
                    .is_liked_by_user(mock_tok, IsLikedByUser { blog_id: mock_id });
                compare("IsLikedByUser", app_res, mock_res, |s| *s);
            }
            FuzzOp::TrendingBlogs => {
                let req = request::Builder::new()
                    .method("GET")
                    .uri("/api/trending-blogs")
                    .body(axum::body::Body::empty())
                    .expect("building request");
                let app_res: Result<Vec<hikeko_api::BlogSummary>, ApiError> =
                    call(&mut self.app, req, &()).await;
                compare(
                    "TrendingBlogs",
                    app_res,
                    self.mock.trending_blogs().await,
                    |blogs| blogs.iter().map(blog_view).collect::<Vec<_>>(),
                );
            }
        }
    }
}

do_sqlx_test!(
    compare_with_mock,
    bolero::generator::gen_with::<Vec<RawOp>>().len(1..100usize),
    |pool, test: Vec<RawOp>| async move {
        let mut fuzzer = ComparativeFuzzer::new(pool);
        for op in test {
            fuzzer.execute_fuzz_op(FuzzOp::from_raw(op)).await;
        }
    }
);

#[test]
fn signups_sharing_a_username_get_suffixes() {
    sqlx_scenario("signups_sharing_a_username_get_suffixes", |pool| async move {
        let mut conn = pool.acquire().await.expect("acquiring connection");
        let signup = |email: &str| SignUp {
            fullname: String::from("Jane Doe"),
            email: String::from(email),
            password: String::from("Passw0rd"),
        };

        let mut usernames = Vec::new();
        for email in ["jane@example.com", "jane@example.org", "jane@example.net"] {
            let session = db::create_user(&mut conn, &signup(email))
                .await
                .expect("creating user")
                .expect("user should be accepted");
            usernames.push(session.username);
        }
        assert_eq!(usernames[0], "jane");
        for u in &usernames[1..] {
            assert!(u.starts_with("jane") && u.len() == "jane".len() + 5, "{u}");
        }
        assert_ne!(usernames[1], usernames[2]);

        assert_eq!(
            db::create_user(&mut conn, &signup("jane@example.org"))
                .await
                .expect("creating user"),
            Err(ApiError::EmailAlreadyUsed(String::from("jane@example.org")))
        );
    });
}
