use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;

use crate::{
    api::{
        Activity, BlogFilter, BlogId, BlogSummary, Comment, CommentId, UserId, UserSummary, Uuid,
        BLOGS_PER_PAGE, COMMENTS_PER_PAGE,
    },
    Backend,
};

pub fn user(name: &str) -> UserSummary {
    UserSummary {
        username: String::from(name),
        fullname: String::from(name),
        profile_img: String::new(),
    }
}

pub fn blog(i: usize) -> BlogSummary {
    BlogSummary {
        blog_id: BlogId(format!("blog-{i}")),
        title: format!("Blog {i}"),
        des: String::new(),
        banner: String::new(),
        tags: Vec::new(),
        activity: Activity::default(),
        published_at: chrono::Utc::now(),
        author: user("jane"),
    }
}

pub fn comment(blog: &BlogId, text: &str) -> Comment {
    Comment {
        id: CommentId(Uuid::new_v4()),
        blog_id: blog.clone(),
        blog_author: UserId::stub(),
        commented_by: user("john"),
        comment: String::from(text),
        commented_at: chrono::Utc::now(),
    }
}

#[derive(Default)]
struct State {
    count: Option<u64>,
    count_calls: usize,
    fail_fetches: bool,
}

/// Serves `blogs` and `comments` (already in recency order) and a settable count
#[derive(Default)]
pub struct FakeBackend {
    pub blogs: Vec<BlogSummary>,
    pub comments: Vec<Comment>,
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn with_count(count: u64) -> FakeBackend {
        let res = FakeBackend::default();
        res.set_count(Some(count));
        res
    }

    /// `None` makes count queries fail
    pub fn set_count(&self, count: Option<u64>) {
        self.state.lock().unwrap().count = count;
    }

    pub fn set_fail_fetches(&self, fail: bool) {
        self.state.lock().unwrap().fail_fetches = fail;
    }

    pub fn count_calls(&self) -> usize {
        self.state.lock().unwrap().count_calls
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn count_blogs(&self, _filter: &BlogFilter) -> anyhow::Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.count_calls += 1;
        state.count.ok_or_else(|| anyhow!("count unavailable"))
    }

    async fn fetch_blogs(
        &self,
        filter: &BlogFilter,
        page: u64,
    ) -> anyhow::Result<Vec<BlogSummary>> {
        if self.state.lock().unwrap().fail_fetches {
            return Err(anyhow!("fetch unavailable"));
        }
        Ok(self
            .blogs
            .iter()
            .filter(|b| filter.matches(b))
            .skip(((page - 1) * BLOGS_PER_PAGE) as usize)
            .take(BLOGS_PER_PAGE as usize)
            .cloned()
            .collect())
    }

    async fn fetch_comments(&self, blog: &BlogId, skip: u64) -> anyhow::Result<Vec<Comment>> {
        if self.state.lock().unwrap().fail_fetches {
            return Err(anyhow!("fetch unavailable"));
        }
        Ok(self
            .comments
            .iter()
            .filter(|c| c.blog_id == *blog)
            .skip(skip as usize)
            .take(COMMENTS_PER_PAGE as usize)
            .cloned()
            .collect())
    }
}
