mod backend;
pub use backend::Backend;

mod comments;
pub use comments::{load_comments, CommentNode};

mod feed;
pub use feed::{BlogFeed, CommentThread};

mod paginate;
pub use paginate::{accumulate, seed_total, PageResult};

mod remote;
pub use remote::Client;

mod search;
pub use search::parse_search;

#[cfg(test)]
mod test_util;

pub mod api {
    pub use hikeko_api::*;
}
