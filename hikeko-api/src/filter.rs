use crate::{BlogId, BlogSummary, Error};

/// Which blogs a listing is about
///
/// Drafts never match any filter.
#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum BlogFilter {
    /// Every published blog
    Latest,

    /// Blogs carrying `tag`, optionally leaving out one blog (the one being read)
    Tag {
        tag: String,
        eliminate: Option<BlogId>,
    },

    /// Blogs written by the user with this username
    Author { username: String },

    /// Blogs whose title contains `query`, ignoring case
    Search { query: String },
}

impl BlogFilter {
    pub fn tag(tag: String) -> BlogFilter {
        BlogFilter::Tag {
            tag,
            eliminate: None,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        match self {
            BlogFilter::Latest => Ok(()),
            BlogFilter::Tag { tag, eliminate } => {
                crate::validate_string(tag)?;
                if let Some(b) = eliminate {
                    b.validate()?;
                }
                Ok(())
            }
            BlogFilter::Author { username } => crate::validate_string(username),
            BlogFilter::Search { query } => crate::validate_string(query),
        }
    }

    /// Assumes `blog` is published
    pub fn matches(&self, blog: &BlogSummary) -> bool {
        match self {
            BlogFilter::Latest => true,
            BlogFilter::Tag { tag, eliminate } => {
                let tag = tag.to_lowercase();
                blog.tags.iter().any(|t| *t == tag)
                    && eliminate.as_ref().map_or(true, |e| *e != blog.blog_id)
            }
            BlogFilter::Author { username } => blog.author.username == *username,
            BlogFilter::Search { query } => blog
                .title
                .to_lowercase()
                .contains(&query.to_lowercase()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Activity, UserSummary};

    fn blog(id: &str, title: &str, tags: &[&str], author: &str) -> BlogSummary {
        BlogSummary {
            blog_id: BlogId(String::from(id)),
            title: String::from(title),
            des: String::new(),
            banner: String::new(),
            tags: tags.iter().map(|t| String::from(*t)).collect(),
            activity: Activity::default(),
            published_at: chrono::Utc::now(),
            author: UserSummary {
                username: String::from(author),
                fullname: String::from(author),
                profile_img: String::new(),
            },
        }
    }

    #[test]
    fn tag_filter() {
        let b = blog("alps-1", "Alps", &["travel", "hiking"], "jane");
        assert!(BlogFilter::tag(String::from("Travel")).matches(&b));
        assert!(!BlogFilter::tag(String::from("food")).matches(&b));
        assert!(!BlogFilter::Tag {
            tag: String::from("travel"),
            eliminate: Some(BlogId(String::from("alps-1"))),
        }
        .matches(&b));
    }

    #[test]
    fn author_and_search_filters() {
        let b = blog("alps-1", "Hiking the Alps", &[], "jane");
        assert!(BlogFilter::Author {
            username: String::from("jane")
        }
        .matches(&b));
        assert!(!BlogFilter::Author {
            username: String::from("john")
        }
        .matches(&b));
        assert!(BlogFilter::Search {
            query: String::from("the alps")
        }
        .matches(&b));
        assert!(!BlogFilter::Search {
            query: String::from("pyrenees")
        }
        .matches(&b));
    }
}
