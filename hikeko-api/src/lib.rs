use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

/// Number of blogs returned by one page of any blog listing
pub const BLOGS_PER_PAGE: u64 = 5;

/// Number of top-level comments returned by one page of a blog's comments
pub const COMMENTS_PER_PAGE: u64 = 5;

/// Number of blogs in the trending listing
pub const TRENDING_BLOGS: u64 = 5;

mod auth;
pub use auth::{AuthToken, Session, SignIn, SignUp};

mod blog;
pub use blog::{Activity, Blog, BlogContent, BlogId, BlogSummary, GetBlog, NewBlog};

mod comment;
pub use comment::{Comment, CommentId, NewComment};

mod error;
pub use error::Error;

mod filter;
pub use filter::BlogFilter;

mod like;
pub use like::{IsLikedByUser, LikeBlog, LikeStatus};

mod page;
pub use page::{FetchBlogs, FetchComments, PageCount};

mod store;
pub use store::{count_blog_page, fetch_blog_page, fetch_comment_page, fetch_trending, Store};

mod user;
pub use user::{GetProfile, Profile, UserId, UserSummary};

pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(String::from(s)));
    }
    Ok(())
}

/// Random alphanumeric string, used to disambiguate usernames and blog ids
pub fn random_suffix(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
