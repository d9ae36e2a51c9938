use chrono::{DateTime, Duration, Utc};
use hikeko_api::{random_suffix, BlogId, UserSummary};
use rand::{seq::SliceRandom, Rng};
use uuid::Uuid;

const NUM_USERS: usize = 5;
const PASSWORD: &str = "Passw0rd";

const NUM_BLOGS: usize = 60;
const DRAFT_ONE_IN: u32 = 10;
const TAGS: [&str; 8] = [
    "travel", "food", "rust", "alps", "music", "books", "design", "science",
];
const MAX_TAGS_PER_BLOG: usize = 4;
const DES_WORD_COUNT: usize = 15;
const PARAGRAPHS_PER_BLOG: usize = 3;
const PARAGRAPH_WORD_COUNT: usize = 60;

const NUM_COMMENTS: usize = 250;
const COMMENT_WORD_COUNT: usize = 20;
const MAX_READS: u64 = 500;
const LIKE_ONE_IN: u32 = 3;
const HISTORY_DAYS: i64 = 90;

fn gen_n_items<T>(table: &str, columns: &str, items: &[T], f: impl Fn(&T) -> String) {
    if items.is_empty() {
        return;
    }
    println!("INSERT INTO {} ({}) VALUES", table, columns);
    for (i, item) in items.iter().enumerate() {
        if i != 0 {
            println!(",");
        }
        print!("    {}", f(item));
    }
    println!();
    println!("ON CONFLICT DO NOTHING;");
}

fn sql_str(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn sql_time(t: &DateTime<Utc>) -> String {
    sql_str(&t.to_rfc3339())
}

struct User {
    id: Uuid,
    username: String,
    fullname: String,
    total_posts: u64,
    total_reads: u64,
    joined_at: DateTime<Utc>,
}

struct Blog {
    blog_id: BlogId,
    author: usize,
    title: String,
    des: String,
    tags: Vec<&'static str>,
    content: serde_json::Value,
    draft: bool,
    total_reads: u64,
    total_likes: u64,
    total_comments: u64,
    published_at: DateTime<Utc>,
}

struct Comment {
    blog: usize,
    commented_by: usize,
    text: String,
    commented_at: DateTime<Utc>,
}

struct Like {
    blog: usize,
    user: usize,
    liked_at: DateTime<Utc>,
}

fn gen_time_since(rng: &mut impl Rng, start: DateTime<Utc>) -> DateTime<Utc> {
    let span = (Utc::now() - start).num_seconds().max(1);
    start + Duration::seconds(rng.gen_range(0..span))
}

fn main() {
    let mut rng = rand::thread_rng();
    let start = Utc::now() - Duration::days(HISTORY_DAYS);
    let password_hash = bcrypt::hash(PASSWORD, bcrypt::DEFAULT_COST).expect("hashing password");

    // Generate users, all with the same password
    let mut users = (0..NUM_USERS)
        .map(|i| User {
            id: Uuid::new_v4(),
            username: format!("user{i}"),
            fullname: lipsum::lipsum_title(),
            total_posts: 0,
            total_reads: 0,
            joined_at: start,
        })
        .collect::<Vec<_>>();

    // Generate blogs, most recent last
    let mut blogs = (0..NUM_BLOGS)
        .map(|_| {
            let author = rng.gen_range(0..users.len());
            let title = lipsum::lipsum_title();
            let ntags = rng.gen_range(0..=MAX_TAGS_PER_BLOG);
            let paragraphs = (0..PARAGRAPHS_PER_BLOG)
                .map(|_| {
                    serde_json::json!({
                        "type": "paragraph",
                        "data": { "text": lipsum::lipsum_words(PARAGRAPH_WORD_COUNT) },
                    })
                })
                .collect::<Vec<_>>();
            Blog {
                blog_id: BlogId::from_title(&title, &random_suffix(21)),
                author,
                title,
                des: lipsum::lipsum_words(DES_WORD_COUNT).chars().take(200).collect(),
                tags: TAGS.choose_multiple(&mut rng, ntags).copied().collect(),
                content: serde_json::json!({ "blocks": paragraphs }),
                draft: rng.gen_ratio(1, DRAFT_ONE_IN),
                total_reads: rng.gen_range(0..MAX_READS),
                total_likes: 0,
                total_comments: 0,
                published_at: gen_time_since(&mut rng, start),
            }
        })
        .collect::<Vec<_>>();
    blogs.sort_by_key(|b| b.published_at);

    // Generate comments on published blogs
    let published = (0..blogs.len())
        .filter(|b| !blogs[*b].draft)
        .collect::<Vec<_>>();
    let mut comments = Vec::new();
    if !published.is_empty() {
        for _ in 0..NUM_COMMENTS {
            let blog = published[rng.gen_range(0..published.len())];
            comments.push(Comment {
                blog,
                commented_by: rng.gen_range(0..users.len()),
                text: lipsum::lipsum_words(COMMENT_WORD_COUNT),
                commented_at: gen_time_since(&mut rng, blogs[blog].published_at),
            });
        }
    }
    comments.sort_by_key(|c| c.commented_at);

    // Each user likes some of the published blogs, at most once each
    let mut likes = Vec::new();
    for &blog in &published {
        for user in 0..users.len() {
            if rng.gen_ratio(1, LIKE_ONE_IN) {
                likes.push(Like {
                    blog,
                    user,
                    liked_at: gen_time_since(&mut rng, blogs[blog].published_at),
                });
            }
        }
    }

    // Fill in the counters
    for c in &comments {
        blogs[c.blog].total_comments += 1;
    }
    for l in &likes {
        blogs[l.blog].total_likes += 1;
    }
    for b in &blogs {
        if !b.draft {
            users[b.author].total_posts += 1;
        }
        users[b.author].total_reads += b.total_reads;
    }

    gen_n_items(
        "users",
        "id, fullname, email, username, password_hash, profile_img, total_posts, total_reads, \
         joined_at",
        &users,
        |u| {
            format!(
                "('{}', {}, {}, {}, {}, {}, {}, {}, {})",
                u.id,
                sql_str(&u.fullname),
                sql_str(&format!("{}@example.com", u.username)),
                sql_str(&u.username),
                sql_str(&password_hash),
                sql_str(&UserSummary::default_profile_img(&u.username)),
                u.total_posts,
                u.total_reads,
                sql_time(&u.joined_at),
            )
        },
    );

    gen_n_items(
        "blogs",
        "blog_id, author_id, title, des, banner, content, tags, draft, total_likes, total_comments, \
         total_reads, total_parent_comments, published_at",
        &blogs,
        |b| {
            let tags = b.tags.iter().map(|t| sql_str(t)).collect::<Vec<_>>();
            format!(
                "({}, '{}', {}, {}, {}, {}::JSONB, ARRAY[{}]::TEXT[], {}, {}, {}, {}, {}, {})",
                sql_str(&b.blog_id.0),
                users[b.author].id,
                sql_str(&b.title),
                sql_str(&b.des),
                sql_str(&format!("https://picsum.photos/seed/{}/800/400", b.blog_id)),
                sql_str(&b.content.to_string()),
                tags.join(", "),
                b.draft,
                b.total_likes,
                b.total_comments,
                b.total_reads,
                b.total_comments,
                sql_time(&b.published_at),
            )
        },
    );

    gen_n_items(
        "comments",
        "id, blog_id, blog_author, commented_by, comment, commented_at",
        &comments,
        |c| {
            let blog = &blogs[c.blog];
            format!(
                "('{}', {}, '{}', '{}', {}, {})",
                Uuid::new_v4(),
                sql_str(&blog.blog_id.0),
                users[blog.author].id,
                users[c.commented_by].id,
                sql_str(&c.text),
                sql_time(&c.commented_at),
            )
        },
    );

    gen_n_items("likes", "blog_id, user_id, liked_at", &likes, |l| {
        format!(
            "({}, '{}', {})",
            sql_str(&blogs[l.blog].blog_id.0),
            users[l.user].id,
            sql_time(&l.liked_at),
        )
    });
}
