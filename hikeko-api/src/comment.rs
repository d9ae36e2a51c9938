use uuid::Uuid;

use crate::{BlogId, Error, Time, UserId, UserSummary};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub Uuid);

/// A top-level comment on a blog
///
/// Comments are immutable once created.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub blog_id: BlogId,
    pub blog_author: UserId,
    pub commented_by: UserSummary,
    pub comment: String,
    pub commented_at: Time,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub blog_id: BlogId,
    pub comment: String,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), Error> {
        self.blog_id.validate()?;
        crate::validate_string(&self.comment)?;
        if self.comment.is_empty() {
            return Err(Error::EmptyComment);
        }
        Ok(())
    }
}
