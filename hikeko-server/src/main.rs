use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::net::SocketAddr;
use structopt::StructOpt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod db;
mod error;
mod extractors;
mod fuzz;
mod handlers;
mod query;

pub use error::Error;
use extractors::AppState;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

#[derive(StructOpt)]
struct Opt {
    /// PostgreSQL connection string
    #[structopt(long, env = "DATABASE_URL")]
    database_url: String,

    /// Address to listen on
    #[structopt(long, env = "LISTEN_ADDR", default_value = "127.0.0.1:3000")]
    listen: SocketAddr,

    #[structopt(long, env = "MAX_DB_CONNECTIONS", default_value = "16")]
    max_db_connections: u32,
}

pub async fn create_sqlx_pool(url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .with_context(|| format!("opening database {:?}", url))
}

pub fn app(db: PgPool) -> Router {
    Router::new()
        .route("/api/signup", post(handlers::signup))
        .route("/api/signin", post(handlers::signin))
        .route("/api/signout", post(handlers::signout))
        .route("/api/whoami", get(handlers::whoami))
        .route("/api/latest-blogs", post(handlers::latest_blogs))
        .route("/api/count-blogs", post(handlers::count_blogs))
        .route("/api/trending-blogs", get(handlers::trending_blogs))
        .route("/api/get-blog", post(handlers::get_blog))
        .route("/api/create-blog", post(handlers::create_blog))
        .route("/api/add-comment", post(handlers::add_comment))
        .route("/api/get-blog-comments", post(handlers::get_blog_comments))
        .route("/api/like-blog", post(handlers::like_blog))
        .route("/api/isliked-by-user", post(handlers::is_liked_by_user))
        .route("/api/get-profile", post(handlers::get_profile))
        .with_state(AppState { db })
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let opt = Opt::from_args();

    let db = create_sqlx_pool(&opt.database_url, opt.max_db_connections).await?;
    MIGRATOR.run(&db).await.context("applying migrations")?;

    tracing::info!("listening on {}", opt.listen);
    axum::Server::bind(&opt.listen)
        .serve(app(db).into_make_service())
        .await
        .context("serving axum webserver")
}
