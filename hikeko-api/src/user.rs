use uuid::Uuid;

use crate::{Time, STUB_UUID};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn stub() -> UserId {
        UserId(STUB_UUID)
    }
}

/// The public part of a user, as attached to blogs and comments
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct UserSummary {
    pub username: String,
    pub fullname: String,
    pub profile_img: String,
}

impl UserSummary {
    pub fn default_profile_img(username: &str) -> String {
        format!("https://api.dicebear.com/6.x/notionists-neutral/svg?seed={username}")
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Profile {
    pub user: UserSummary,
    pub bio: String,
    pub total_posts: u64,
    pub total_reads: u64,
    pub joined_at: Time,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct GetProfile {
    pub username: String,
}
