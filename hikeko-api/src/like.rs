use crate::{BlogId, Error};

/// Sets whether the current user likes a blog
///
/// Setting the state the blog is already in changes nothing.
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct LikeBlog {
    pub blog_id: BlogId,
    pub liked: bool,
}

impl LikeBlog {
    pub fn validate(&self) -> Result<(), Error> {
        self.blog_id.validate()
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct IsLikedByUser {
    pub blog_id: BlogId,
}

impl IsLikedByUser {
    pub fn validate(&self) -> Result<(), Error> {
        self.blog_id.validate()
    }
}

/// Whether the current user likes a blog, along with its like counter
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LikeStatus {
    pub liked: bool,
    pub total_likes: u64,
}
