use async_trait::async_trait;

use crate::{
    BlogFilter, BlogId, BlogSummary, Comment, Error, FetchBlogs, FetchComments, PageCount,
    BLOGS_PER_PAGE, COMMENTS_PER_PAGE, TRENDING_BLOGS,
};

/// Document store backing the blog listings
///
/// Blogs come out most recently published first, comments most recently
/// written first. Trending blogs come out by reads, then likes, then
/// recency. Remaining ties are broken by insertion order, most recent first.
#[async_trait]
pub trait Store {
    async fn count_blogs(&mut self, filter: &BlogFilter) -> anyhow::Result<u64>;
    async fn find_blogs(
        &mut self,
        filter: &BlogFilter,
        skip: u64,
        limit: u64,
    ) -> anyhow::Result<Vec<BlogSummary>>;
    async fn find_comments(
        &mut self,
        blog: &BlogId,
        skip: u64,
        limit: u64,
    ) -> anyhow::Result<Vec<Comment>>;
    async fn find_trending(&mut self, limit: u64) -> anyhow::Result<Vec<BlogSummary>>;
}

pub async fn count_blog_page<S: Store + Send>(
    store: &mut S,
    filter: &BlogFilter,
) -> anyhow::Result<Result<PageCount, Error>> {
    if let Err(e) = filter.validate() {
        return Ok(Err(e));
    }
    let total_docs = store.count_blogs(filter).await?;
    Ok(Ok(PageCount { total_docs }))
}

pub async fn fetch_blog_page<S: Store + Send>(
    store: &mut S,
    req: &FetchBlogs,
) -> anyhow::Result<Result<Vec<BlogSummary>, Error>> {
    if let Err(e) = req.filter.validate() {
        return Ok(Err(e));
    }
    let skip = match req.skip() {
        Ok(skip) => skip,
        Err(e) => return Ok(Err(e)),
    };
    Ok(Ok(store
        .find_blogs(&req.filter, skip, BLOGS_PER_PAGE)
        .await?))
}

/// Comments of an unknown blog are an empty page, not an error
pub async fn fetch_comment_page<S: Store + Send>(
    store: &mut S,
    req: &FetchComments,
) -> anyhow::Result<Result<Vec<Comment>, Error>> {
    if let Err(e) = req.validate() {
        return Ok(Err(e));
    }
    Ok(Ok(store
        .find_comments(&req.blog_id, req.skip, COMMENTS_PER_PAGE)
        .await?))
}

pub async fn fetch_trending<S: Store + Send>(store: &mut S) -> anyhow::Result<Vec<BlogSummary>> {
    store.find_trending(TRENDING_BLOGS).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Activity, UserSummary};

    struct VecStore(Vec<BlogSummary>);

    #[async_trait]
    impl Store for VecStore {
        async fn count_blogs(&mut self, filter: &BlogFilter) -> anyhow::Result<u64> {
            Ok(self.0.iter().filter(|b| filter.matches(b)).count() as u64)
        }

        async fn find_blogs(
            &mut self,
            filter: &BlogFilter,
            skip: u64,
            limit: u64,
        ) -> anyhow::Result<Vec<BlogSummary>> {
            Ok(self
                .0
                .iter()
                .filter(|b| filter.matches(b))
                .skip(skip as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn find_comments(
            &mut self,
            _blog: &BlogId,
            _skip: u64,
            _limit: u64,
        ) -> anyhow::Result<Vec<Comment>> {
            Ok(Vec::new())
        }

        async fn find_trending(&mut self, limit: u64) -> anyhow::Result<Vec<BlogSummary>> {
            let mut blogs = self.0.clone();
            blogs.sort_by_key(|b| std::cmp::Reverse(b.activity.total_reads));
            blogs.truncate(limit as usize);
            Ok(blogs)
        }
    }

    fn store(n: usize) -> VecStore {
        VecStore(
            (0..n)
                .map(|i| BlogSummary {
                    blog_id: BlogId(format!("blog-{i}")),
                    title: format!("Blog {i}"),
                    des: String::new(),
                    banner: String::new(),
                    tags: Vec::new(),
                    activity: Activity {
                        total_reads: (i % 4) as u64,
                        ..Activity::default()
                    },
                    published_at: chrono::Utc::now(),
                    author: UserSummary {
                        username: String::from("jane"),
                        fullname: String::from("Jane"),
                        profile_img: String::new(),
                    },
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn pages_are_fixed_size() {
        let mut s = store(12);
        let page = |page| FetchBlogs {
            filter: BlogFilter::Latest,
            page,
        };
        let p1 = fetch_blog_page(&mut s, &page(1)).await.unwrap().unwrap();
        let p3 = fetch_blog_page(&mut s, &page(3)).await.unwrap().unwrap();
        let p4 = fetch_blog_page(&mut s, &page(4)).await.unwrap().unwrap();
        assert_eq!(p1.len(), 5);
        assert_eq!(p1[0].blog_id, BlogId(String::from("blog-0")));
        assert_eq!(p3.len(), 2);
        assert_eq!(p3[0].blog_id, BlogId(String::from("blog-10")));
        assert!(p4.is_empty());
        assert_eq!(
            count_blog_page(&mut s, &BlogFilter::Latest)
                .await
                .unwrap()
                .unwrap(),
            PageCount { total_docs: 12 }
        );
    }

    #[tokio::test]
    async fn page_zero_is_rejected() {
        let mut s = store(1);
        let res = fetch_blog_page(
            &mut s,
            &FetchBlogs {
                filter: BlogFilter::Latest,
                page: 0,
            },
        )
        .await
        .unwrap();
        assert_eq!(res, Err(Error::InvalidPage(0)));
    }

    #[tokio::test]
    async fn trending_is_capped() {
        let mut s = store(12);
        let trending = fetch_trending(&mut s).await.unwrap();
        assert_eq!(trending.len(), TRENDING_BLOGS as usize);
        assert_eq!(
            trending
                .iter()
                .map(|b| b.activity.total_reads)
                .collect::<Vec<_>>(),
            vec![3, 3, 3, 2, 2]
        );
        assert!(fetch_trending(&mut store(0)).await.unwrap().is_empty());
    }
}
