use anyhow::Context;
use hikeko_client::{
    api::{
        AuthToken, BlogContent, BlogId, BlogSummary, LikeStatus, NewBlog, NewComment, SignIn,
        SignUp, Uuid,
    },
    parse_search, BlogFeed, Client, CommentThread,
};

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long, env = "HIKEKO_HOST", default_value = "http://localhost:3000")]
    host: String,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Create an account and print its session token
    Signup {
        fullname: String,
        email: String,
        password: String,
    },

    /// Open a session and print its token
    Signin { email: String, password: String },

    /// Close the session in HIKEKO_TOKEN
    Signout,

    /// Show who HIKEKO_TOKEN belongs to
    Whoami,

    /// List blogs, like the search bar would
    ///
    /// `#tag` lists a tag, `@username` an author, anything else searches
    /// titles, and nothing lists the latest blogs.
    Blogs {
        #[structopt(default_value = "")]
        search: String,

        /// Number of pages to load
        #[structopt(short, long, default_value = "1")]
        pages: u64,
    },

    /// Print a blog (this counts as a read)
    Read { blog_id: String },

    /// Publish a blog whose content is one paragraph
    Publish {
        #[structopt(long)]
        title: String,

        #[structopt(long, default_value = "")]
        des: String,

        #[structopt(long, default_value = "")]
        banner: String,

        #[structopt(long = "tag")]
        tags: Vec<String>,

        #[structopt(long)]
        draft: bool,

        /// Paragraph text
        text: String,
    },

    /// List the comments of a blog
    Comments {
        blog_id: String,

        /// Number of pages to load
        #[structopt(short, long, default_value = "1")]
        pages: u64,
    },

    /// Comment on a blog
    Comment { blog_id: String, comment: String },

    /// Show a user's profile
    Profile { username: String },

    /// Like a blog
    Like { blog_id: String },

    /// Take back a like
    Unlike { blog_id: String },

    /// Show whether HIKEKO_TOKEN likes a blog
    Liked { blog_id: String },

    /// List the most read blogs
    Trending,
}

fn print_likes(s: LikeStatus) {
    let liked = if s.liked { "liked" } else { "not liked" };
    println!("{liked}, {} likes in total", s.total_likes);
}

fn token() -> anyhow::Result<AuthToken> {
    let tok =
        std::env::var("HIKEKO_TOKEN").context("retrieving HIKEKO_TOKEN environment variable")?;
    let tok = Uuid::try_parse(&tok).context("parsing HIKEKO_TOKEN as an auth token")?;
    Ok(AuthToken(tok))
}

fn print_blog(b: &BlogSummary) {
    println!(
        "{}  {:?} by @{} ({} reads, {} likes, {} comments) [{}]",
        b.blog_id,
        b.title,
        b.author.username,
        b.activity.total_reads,
        b.activity.total_likes,
        b.activity.total_comments,
        b.tags.join(", "),
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let opt = <Opt as structopt::StructOpt>::from_args();

    let client = Client::new(opt.host);

    match opt.cmd {
        Command::Signup {
            fullname,
            email,
            password,
        } => {
            let session = client
                .signup(&SignUp {
                    fullname,
                    email,
                    password,
                })
                .await?;
            println!("signed up as @{}", session.username);
            println!("HIKEKO_TOKEN={}", session.access_token.0);
        }
        Command::Signin { email, password } => {
            let session = client.signin(&SignIn { email, password }).await?;
            println!("signed in as @{}", session.username);
            println!("HIKEKO_TOKEN={}", session.access_token.0);
        }
        Command::Signout => client.with_token(token()?).signout().await?,
        Command::Whoami => {
            let user = client.with_token(token()?).whoami().await?;
            println!("@{} ({})", user.username, user.fullname);
        }
        Command::Blogs { search, pages } => {
            let mut feed = BlogFeed::new(parse_search(&search));
            for _ in 0..pages {
                if !feed.has_more() {
                    break;
                }
                let loaded = feed.blogs().len();
                feed = feed.load_next_page(&client).await?;
                if feed.blogs().len() == loaded {
                    break;
                }
            }
            for b in feed.blogs() {
                print_blog(b);
            }
            if let Some(p) = feed.pages() {
                println!("-- {} of {} blogs", p.results.len(), p.total_docs);
            }
        }
        Command::Read { blog_id } => {
            let blog = client.get_blog(BlogId(blog_id)).await?;
            print_blog(&blog.summary());
            println!("{}", blog.des);
            println!(
                "{}",
                serde_json::to_string_pretty(&blog.content.blocks)
                    .context("formatting blog content")?
            );
        }
        Command::Publish {
            title,
            des,
            banner,
            tags,
            draft,
            text,
        } => {
            let blog_id = client
                .with_token(token()?)
                .create_blog(&NewBlog {
                    title,
                    des,
                    banner,
                    tags,
                    content: BlogContent {
                        blocks: vec![serde_json::json!({
                            "type": "paragraph",
                            "data": { "text": text },
                        })],
                    },
                    draft,
                })
                .await?;
            println!("{blog_id}");
        }
        Command::Comments { blog_id, pages } => {
            let mut thread = CommentThread::new(BlogId(blog_id));
            for _ in 0..pages {
                let loaded = thread.parents_loaded();
                thread = thread.load_more(&client).await;
                if thread.parents_loaded() == loaded {
                    break;
                }
            }
            for c in thread.comments() {
                println!(
                    "{}@{} at {}: {}",
                    "  ".repeat(c.depth),
                    c.comment.commented_by.username,
                    c.comment.commented_at,
                    c.comment.comment,
                );
            }
        }
        Command::Comment { blog_id, comment } => {
            let comment = client
                .with_token(token()?)
                .add_comment(&NewComment {
                    blog_id: BlogId(blog_id),
                    comment,
                })
                .await?;
            println!("commented at {}", comment.commented_at);
        }
        Command::Profile { username } => {
            let p = client.get_profile(username).await?;
            println!("@{} ({})", p.user.username, p.user.fullname);
            if !p.bio.is_empty() {
                println!("{}", p.bio);
            }
            println!(
                "{} posts, {} reads, joined {}",
                p.total_posts, p.total_reads, p.joined_at
            );
        }
        Command::Like { blog_id } => {
            let client = client.with_token(token()?);
            print_likes(client.like_blog(BlogId(blog_id), true).await?);
        }
        Command::Unlike { blog_id } => {
            let client = client.with_token(token()?);
            print_likes(client.like_blog(BlogId(blog_id), false).await?);
        }
        Command::Liked { blog_id } => {
            let client = client.with_token(token()?);
            print_likes(client.is_liked_by_user(BlogId(blog_id)).await?);
        }
        Command::Trending => {
            for b in client.trending_blogs().await? {
                print_blog(&b);
            }
        }
    }

    Ok(())
}
