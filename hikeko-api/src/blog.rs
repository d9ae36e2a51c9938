use crate::{Error, Time, UserSummary};

pub const MAX_DESCRIPTION_LEN: usize = 200;
pub const MAX_TAGS: usize = 10;

/// Human-readable identifier of a blog, derived from its title
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
pub struct BlogId(pub String);

impl BlogId {
    /// Slugifies `title` and appends `suffix` to make the id unique
    pub fn from_title(title: &str, suffix: &str) -> BlogId {
        let cleaned = title
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
            .collect::<String>();
        let slug = cleaned.split_whitespace().collect::<Vec<_>>().join("-");
        BlogId(format!("{slug}-{suffix}"))
    }

    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.0)
    }
}

impl std::fmt::Display for BlogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Editor output, kept opaque apart from its list of blocks
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct BlogContent {
    pub blocks: Vec<serde_json::Value>,
}

impl BlogContent {
    pub fn validate(&self) -> Result<(), Error> {
        for b in &self.blocks {
            validate_json(b)?;
        }
        Ok(())
    }
}

// postgres rejects NUL anywhere in a jsonb document, keys included
fn validate_json(v: &serde_json::Value) -> Result<(), Error> {
    use serde_json::Value;
    match v {
        Value::Null | Value::Bool(_) | Value::Number(_) => Ok(()),
        Value::String(s) => crate::validate_string(s),
        Value::Array(values) => values.iter().try_for_each(validate_json),
        Value::Object(map) => map.iter().try_for_each(|(k, v)| {
            crate::validate_string(k)?;
            validate_json(v)
        }),
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Activity {
    pub total_likes: u64,
    pub total_comments: u64,
    pub total_reads: u64,
    pub total_parent_comments: u64,
}

/// What blog listings return for each blog
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct BlogSummary {
    pub blog_id: BlogId,
    pub title: String,
    pub des: String,
    pub banner: String,
    pub tags: Vec<String>,
    pub activity: Activity,
    pub published_at: Time,
    pub author: UserSummary,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Blog {
    pub blog_id: BlogId,
    pub title: String,
    pub des: String,
    pub banner: String,
    pub content: BlogContent,
    pub tags: Vec<String>,
    pub activity: Activity,
    pub published_at: Time,
    pub author: UserSummary,
}

impl Blog {
    pub fn summary(&self) -> BlogSummary {
        BlogSummary {
            blog_id: self.blog_id.clone(),
            title: self.title.clone(),
            des: self.des.clone(),
            banner: self.banner.clone(),
            tags: self.tags.clone(),
            activity: self.activity,
            published_at: self.published_at,
            author: self.author.clone(),
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct NewBlog {
    pub title: String,
    #[serde(default)]
    pub des: String,
    #[serde(default)]
    pub banner: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub content: BlogContent,
    #[serde(default)]
    pub draft: bool,
}

impl NewBlog {
    /// Drafts only need a title, published blogs need everything
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.title)?;
        crate::validate_string(&self.des)?;
        crate::validate_string(&self.banner)?;
        for t in &self.tags {
            crate::validate_string(t)?;
        }
        self.content.validate()?;
        if self.title.is_empty() {
            return Err(Error::MissingField(String::from("title")));
        }
        if self.draft {
            return Ok(());
        }
        if self.des.is_empty() {
            return Err(Error::MissingField(String::from("des")));
        }
        if self.des.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(Error::FieldTooLong {
                field: String::from("des"),
                max: MAX_DESCRIPTION_LEN,
            });
        }
        if self.banner.is_empty() {
            return Err(Error::MissingField(String::from("banner")));
        }
        if self.content.blocks.is_empty() {
            return Err(Error::MissingField(String::from("content")));
        }
        if self.tags.len() > MAX_TAGS {
            return Err(Error::TooManyTags(self.tags.len()));
        }
        Ok(())
    }

    pub fn normalized_tags(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.to_lowercase()).collect()
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct GetBlog {
    pub blog_id: BlogId,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn published() -> NewBlog {
        NewBlog {
            title: String::from("Hiking the Alps"),
            des: String::from("Three weeks on foot"),
            banner: String::from("https://example.com/banner.jpeg"),
            tags: vec![String::from("Travel"), String::from("alps")],
            content: BlogContent {
                blocks: vec![serde_json::json!({"type": "paragraph", "data": {"text": "hi"}})],
            },
            draft: false,
        }
    }

    #[test]
    fn blog_id_from_title() {
        assert_eq!(
            BlogId::from_title("  Hello, world! Part 2 ", "abc"),
            BlogId(String::from("Hello-world-Part-2-abc"))
        );
        assert_eq!(
            BlogId::from_title("été", "x"),
            BlogId(String::from("t-x"))
        );
    }

    #[test]
    fn drafts_only_need_a_title() {
        let draft = NewBlog {
            title: String::from("wip"),
            des: String::new(),
            banner: String::new(),
            tags: Vec::new(),
            content: BlogContent::default(),
            draft: true,
        };
        assert_eq!(draft.validate(), Ok(()));
        assert_eq!(
            NewBlog {
                title: String::new(),
                ..draft
            }
            .validate(),
            Err(Error::MissingField(String::from("title")))
        );
    }

    #[test]
    fn published_blog_requirements() {
        assert_eq!(published().validate(), Ok(()));
        assert_eq!(
            NewBlog {
                des: "a".repeat(201),
                ..published()
            }
            .validate(),
            Err(Error::FieldTooLong {
                field: String::from("des"),
                max: 200
            })
        );
        assert_eq!(
            NewBlog {
                banner: String::new(),
                ..published()
            }
            .validate(),
            Err(Error::MissingField(String::from("banner")))
        );
        assert_eq!(
            NewBlog {
                content: BlogContent::default(),
                ..published()
            }
            .validate(),
            Err(Error::MissingField(String::from("content")))
        );
        assert_eq!(
            NewBlog {
                tags: (0..11).map(|i| format!("t{i}")).collect(),
                ..published()
            }
            .validate(),
            Err(Error::TooManyTags(11))
        );
    }

    #[test]
    fn null_bytes_in_content_are_rejected() {
        let blog = NewBlog {
            content: BlogContent {
                blocks: vec![serde_json::json!({"data": {"text": "a\u{0}b"}})],
            },
            ..published()
        };
        assert!(matches!(blog.validate(), Err(Error::NullByteInString(_))));
    }

    #[test]
    fn tags_are_lowercased() {
        assert_eq!(published().normalized_tags(), vec!["travel", "alps"]);
    }
}
