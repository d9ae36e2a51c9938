use anyhow::{anyhow, Context};
use serde_json::json;

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Fullname must be at least 3 letters long {0:?}")]
    InvalidFullname(String),

    #[error("Invalid email {0:?}")]
    InvalidEmail(String),

    #[error("Password should be 6-20 characters long with a numeric, lowercase, and uppercase")]
    InvalidPassword,

    #[error("Email already used {0}")]
    EmailAlreadyUsed(String),

    #[error("Missing field {0}")]
    MissingField(String),

    #[error("Field {field} is longer than {max} characters")]
    FieldTooLong { field: String, max: usize },

    #[error("At most 10 tags are allowed, got {0}")]
    TooManyTags(usize),

    #[error("Comment is empty")]
    EmptyComment,

    #[error("Blog not found {0}")]
    BlogNotFound(String),

    #[error("User not found {0}")]
    UserNotFound(String),

    #[error("Invalid page number {0}")]
    InvalidPage(u64),
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::PermissionDenied => StatusCode::FORBIDDEN,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
            Error::InvalidFullname(_) => StatusCode::BAD_REQUEST,
            Error::InvalidEmail(_) => StatusCode::BAD_REQUEST,
            Error::InvalidPassword => StatusCode::BAD_REQUEST,
            Error::EmailAlreadyUsed(_) => StatusCode::CONFLICT,
            Error::MissingField(_) => StatusCode::BAD_REQUEST,
            Error::FieldTooLong { .. } => StatusCode::BAD_REQUEST,
            Error::TooManyTags(_) => StatusCode::BAD_REQUEST,
            Error::EmptyComment => StatusCode::BAD_REQUEST,
            Error::BlogNotFound(_) => StatusCode::NOT_FOUND,
            Error::UserNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidPage(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::PermissionDenied => json!({
                "message": "permission denied",
                "type": "permission-denied",
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
            Error::InvalidFullname(n) => json!({
                "message": "fullname must be at least 3 letters long",
                "type": "invalid-fullname",
                "name": n,
            }),
            Error::InvalidEmail(e) => json!({
                "message": "invalid email",
                "type": "invalid-email",
                "email": e,
            }),
            Error::InvalidPassword => json!({
                "message": "password should be 6-20 characters long with a numeric, lowercase, and uppercase",
                "type": "invalid-password",
            }),
            Error::EmailAlreadyUsed(e) => json!({
                "message": "email already used",
                "type": "conflict-email",
                "email": e,
            }),
            Error::MissingField(f) => json!({
                "message": "a required field is missing",
                "type": "missing-field",
                "field": f,
            }),
            Error::FieldTooLong { field, max } => json!({
                "message": "a field is too long",
                "type": "field-too-long",
                "field": field,
                "max": max,
            }),
            Error::TooManyTags(n) => json!({
                "message": "at most 10 tags are allowed",
                "type": "too-many-tags",
                "count": n,
            }),
            Error::EmptyComment => json!({
                "message": "write something to leave a comment",
                "type": "empty-comment",
            }),
            Error::BlogNotFound(b) => json!({
                "message": "blog not found",
                "type": "blog-not-found",
                "blog_id": b,
            }),
            Error::UserNotFound(u) => json!({
                "message": "user not found",
                "type": "user-not-found",
                "username": u,
            }),
            Error::InvalidPage(p) => json!({
                "message": "page numbers start at 1",
                "type": "invalid-page",
                "page": p,
            }),
        })
        .expect("serializing error")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let str_field = |name: &str| -> anyhow::Result<String> {
            data.get(name)
                .and_then(|s| s.as_str())
                .map(String::from)
                .ok_or_else(|| anyhow!("error contents is missing string field {name}"))
        };
        let int_field = |name: &str| -> anyhow::Result<u64> {
            data.get(name)
                .and_then(|n| n.as_u64())
                .ok_or_else(|| anyhow!("error contents is missing integer field {name}"))
        };
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(str_field("message").unwrap_or_default()),
                "permission-denied" => Error::PermissionDenied,
                "null-byte" => Error::NullByteInString(str_field("string")?),
                "invalid-fullname" => Error::InvalidFullname(str_field("name")?),
                "invalid-email" => Error::InvalidEmail(str_field("email")?),
                "invalid-password" => Error::InvalidPassword,
                "conflict-email" => Error::EmailAlreadyUsed(str_field("email")?),
                "missing-field" => Error::MissingField(str_field("field")?),
                "field-too-long" => Error::FieldTooLong {
                    field: str_field("field")?,
                    max: usize::try_from(int_field("max")?).context("max out of range")?,
                },
                "too-many-tags" => Error::TooManyTags(
                    usize::try_from(int_field("count")?).context("count out of range")?,
                ),
                "empty-comment" => Error::EmptyComment,
                "blog-not-found" => Error::BlogNotFound(str_field("blog_id")?),
                "user-not-found" => Error::UserNotFound(str_field("username")?),
                "invalid-page" => Error::InvalidPage(int_field("page")?),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_back_contents() {
        for err in [
            Error::PermissionDenied,
            Error::InvalidEmail(String::from("foo@")),
            Error::FieldTooLong {
                field: String::from("des"),
                max: 200,
            },
            Error::TooManyTags(11),
            Error::BlogNotFound(String::from("hello-world-abc")),
            Error::InvalidPage(0),
        ] {
            assert_eq!(Error::parse(&err.contents()).unwrap(), err);
        }
    }

    #[test]
    fn parse_rejects_unknown_type() {
        assert!(Error::parse(br#"{"type": "whatever"}"#).is_err());
        assert!(Error::parse(b"not json").is_err());
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            Error::BlogNotFound(String::new()).status_code(),
            http::StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::EmailAlreadyUsed(String::new()).status_code(),
            http::StatusCode::CONFLICT
        );
    }
}
