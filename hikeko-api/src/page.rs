use crate::{BlogFilter, BlogId, Error, BLOGS_PER_PAGE};

/// Request for one page of a blog listing
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct FetchBlogs {
    pub filter: BlogFilter,

    /// 1-based
    pub page: u64,
}

impl FetchBlogs {
    pub fn validate(&self) -> Result<(), Error> {
        self.filter.validate()?;
        self.skip().map(|_| ())
    }

    /// Number of blogs listed on the pages before this one
    pub fn skip(&self) -> Result<u64, Error> {
        self.page
            .checked_sub(1)
            .and_then(|p| p.checked_mul(BLOGS_PER_PAGE))
            .ok_or(Error::InvalidPage(self.page))
    }
}

/// Total number of blogs matching a filter
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PageCount {
    pub total_docs: u64,
}

/// Request for one page of top-level comments, most recent first
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct FetchComments {
    pub blog_id: BlogId,

    /// Number of comments the client already has
    pub skip: u64,
}

impl FetchComments {
    pub fn validate(&self) -> Result<(), Error> {
        self.blog_id.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_from_page() {
        let req = |page| FetchBlogs {
            filter: BlogFilter::Latest,
            page,
        };
        assert_eq!(req(1).skip(), Ok(0));
        assert_eq!(req(3).skip(), Ok(2 * BLOGS_PER_PAGE));
        assert_eq!(req(0).skip(), Err(Error::InvalidPage(0)));
        assert_eq!(req(u64::MAX).skip(), Err(Error::InvalidPage(u64::MAX)));
    }
}
