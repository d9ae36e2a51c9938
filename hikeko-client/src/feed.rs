use crate::{
    accumulate,
    api::{BlogFilter, BlogId, BlogSummary, Comment, Error},
    load_comments, Backend, CommentNode, PageResult,
};

/// A blog listing being scrolled through
///
/// Updates consume the feed and return the new one, so a feed has only one
/// fetch in flight at any time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlogFeed {
    filter: BlogFilter,
    pages: Option<PageResult<BlogSummary>>,
}

impl BlogFeed {
    pub fn new(filter: BlogFilter) -> BlogFeed {
        BlogFeed {
            filter,
            pages: None,
        }
    }

    pub fn filter(&self) -> &BlogFilter {
        &self.filter
    }

    pub fn pages(&self) -> Option<&PageResult<BlogSummary>> {
        self.pages.as_ref()
    }

    pub fn blogs(&self) -> &[BlogSummary] {
        self.pages.as_ref().map(|p| &p.results[..]).unwrap_or(&[])
    }

    /// Whether there is something left to load
    pub fn has_more(&self) -> bool {
        self.pages.as_ref().map_or(true, |p| p.has_more())
    }

    /// Fetches the page after the last one loaded, or the first one
    ///
    /// If the fetch fails the feed is returned unchanged.
    pub async fn load_next_page<B>(self, backend: &B) -> Result<BlogFeed, Error>
    where
        B: ?Sized + Sync + Backend,
    {
        let page = self.pages.as_ref().map_or(1, |p| p.page + 1);
        let blogs = match backend.fetch_blogs(&self.filter, page).await {
            Ok(blogs) => blogs,
            Err(err) => {
                tracing::warn!(?err, filter = ?self.filter, page, "failed fetching blogs");
                return Ok(self);
            }
        };
        let BlogFeed { filter, pages } = self;
        let pages = accumulate(backend, &filter, pages, blogs, page, false).await?;
        Ok(BlogFeed {
            filter,
            pages: Some(pages),
        })
    }

    /// Drops everything loaded and starts over on page 1 of `filter`
    pub async fn switch_filter<B>(self, filter: BlogFilter, backend: &B) -> Result<BlogFeed, Error>
    where
        B: ?Sized + Sync + Backend,
    {
        let blogs = match backend.fetch_blogs(&filter, 1).await {
            Ok(blogs) => blogs,
            Err(err) => {
                tracing::warn!(?err, ?filter, "failed fetching first page of blogs");
                return Ok(BlogFeed::new(filter));
            }
        };
        let pages = accumulate(backend, &filter, self.pages, blogs, 1, true).await?;
        Ok(BlogFeed {
            filter,
            pages: Some(pages),
        })
    }

    /// Starts over on the current filter, re-seeding the total
    pub async fn reload<B>(self, backend: &B) -> Result<BlogFeed, Error>
    where
        B: ?Sized + Sync + Backend,
    {
        let filter = self.filter.clone();
        self.switch_filter(filter, backend).await
    }
}

/// The comments panel of one blog
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommentThread {
    blog_id: BlogId,
    comments: Vec<CommentNode>,
    parents_loaded: u64,
}

impl CommentThread {
    pub fn new(blog_id: BlogId) -> CommentThread {
        CommentThread {
            blog_id,
            comments: Vec::new(),
            parents_loaded: 0,
        }
    }

    pub fn blog_id(&self) -> &BlogId {
        &self.blog_id
    }

    pub fn comments(&self) -> &[CommentNode] {
        &self.comments
    }

    /// Number of top-level comments loaded or posted in this thread
    pub fn parents_loaded(&self) -> u64 {
        self.parents_loaded
    }

    /// `total_parent_comments` comes from the blog's activity counters
    pub fn has_more(&self, total_parent_comments: u64) -> bool {
        self.parents_loaded < total_parent_comments
    }

    pub async fn load_more<B>(self, backend: &B) -> CommentThread
    where
        B: ?Sized + Sync + Backend,
    {
        let CommentThread {
            blog_id,
            comments,
            mut parents_loaded,
        } = self;
        let comments = load_comments(
            backend,
            &blog_id,
            parents_loaded,
            |n| parents_loaded += n as u64,
            Some(comments),
        )
        .await;
        CommentThread {
            blog_id,
            comments,
            parents_loaded,
        }
    }

    /// Shows a comment the user just posted, on top of the others
    pub fn push_new(mut self, comment: Comment) -> CommentThread {
        self.comments.insert(0, CommentNode::top_level(comment));
        self.parents_loaded += 1;
        self
    }
}
