use crate::{
    api::{BlogId, Comment},
    Backend,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommentNode {
    pub comment: Comment,

    /// Number of reply levels below a top-level comment, used for indentation
    pub depth: usize,
}

impl CommentNode {
    pub fn top_level(comment: Comment) -> CommentNode {
        CommentNode { comment, depth: 0 }
    }
}

/// Fetches the next page of `blog`'s top-level comments and appends it to `prev`
///
/// `on_count` gets the number of newly fetched comments. If the fetch fails,
/// `prev` is returned as-is and `on_count` is not called.
pub async fn load_comments<B, F>(
    backend: &B,
    blog: &BlogId,
    skip: u64,
    on_count: F,
    prev: Option<Vec<CommentNode>>,
) -> Vec<CommentNode>
where
    B: ?Sized + Sync + Backend,
    F: Send + FnOnce(usize),
{
    let mut res = prev.unwrap_or_default();
    match backend.fetch_comments(blog, skip).await {
        Ok(comments) => {
            on_count(comments.len());
            res.extend(comments.into_iter().map(CommentNode::top_level));
        }
        Err(err) => {
            tracing::warn!(?err, ?blog, skip, "failed fetching comments");
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{comment, FakeBackend};

    fn backend_with(n: usize) -> (FakeBackend, BlogId) {
        let blog = BlogId(String::from("alps-xyz"));
        let mut backend = FakeBackend::default();
        backend.comments = (0..n).map(|i| comment(&blog, &format!("c{i}"))).collect();
        backend
            .comments
            .push(comment(&BlogId(String::from("other")), "elsewhere"));
        (backend, blog)
    }

    #[tokio::test]
    async fn seven_comments_in_two_pages() {
        let (backend, blog) = backend_with(7);
        let mut count = 0;

        let first = load_comments(&backend, &blog, 0, |n| count += n, None).await;
        assert_eq!(count, 5);
        assert_eq!(first.len(), 5);
        assert!(first.iter().all(|c| c.depth == 0));
        assert_eq!(first[0].comment.comment, "c0");

        let second = load_comments(&backend, &blog, 5, |n| count += n, Some(first.clone())).await;
        assert_eq!(count, 7);
        assert_eq!(&second[..5], &first[..]);
        assert_eq!(
            second[5..]
                .iter()
                .map(|c| c.comment.comment.as_str())
                .collect::<Vec<_>>(),
            vec!["c5", "c6"]
        );
    }

    #[tokio::test]
    async fn failure_keeps_previous_state() {
        let (backend, blog) = backend_with(3);
        let mut count = 0;
        let loaded = load_comments(&backend, &blog, 0, |n| count += n, None).await;
        assert_eq!(count, 3);

        backend.set_fail_fetches(true);
        let after = load_comments(&backend, &blog, 3, |n| count += n, Some(loaded.clone())).await;
        assert_eq!(after, loaded);
        assert_eq!(count, 3);

        let empty = load_comments(&backend, &blog, 0, |n| count += n, None).await;
        assert!(empty.is_empty());
        assert_eq!(count, 3);
    }
}
