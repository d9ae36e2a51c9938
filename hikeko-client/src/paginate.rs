use crate::{
    api::{BlogFilter, Error},
    Backend,
};

/// Everything fetched so far for one filter
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PageResult<T> {
    /// In fetch order
    pub results: Vec<T>,

    /// Last page fetched, 1-based
    pub page: u64,

    /// Seeded once per filter, 0 if the count could not be fetched
    pub total_docs: u64,
}

impl<T> PageResult<T> {
    pub fn validate(&self) -> Result<(), Error> {
        if self.page == 0 {
            return Err(Error::InvalidPage(self.page));
        }
        Ok(())
    }

    pub fn has_more(&self) -> bool {
        (self.results.len() as u64) < self.total_docs
    }
}

/// Asks the backend how many blogs match `filter`, falling back to 0
pub async fn seed_total<B>(backend: &B, filter: &BlogFilter) -> u64
where
    B: ?Sized + Sync + Backend,
{
    match backend.count_blogs(filter).await {
        Ok(total) => total,
        Err(err) => {
            tracing::warn!(?err, ?filter, "failed fetching blog count, assuming 0");
            0
        }
    }
}

/// Merges a freshly fetched page into `prev`
///
/// Without `prev`, or with `fresh` set, this starts over at page 1 and seeds
/// the total. Otherwise `data` is appended and the total carried over.
pub async fn accumulate<T, B>(
    backend: &B,
    filter: &BlogFilter,
    prev: Option<PageResult<T>>,
    data: Vec<T>,
    page: u64,
    fresh: bool,
) -> Result<PageResult<T>, Error>
where
    T: Send,
    B: ?Sized + Sync + Backend,
{
    match prev {
        Some(mut prev) if !fresh => {
            prev.validate()?;
            if page == 0 {
                return Err(Error::InvalidPage(page));
            }
            prev.results.extend(data);
            prev.page = page;
            Ok(prev)
        }
        _ => Ok(PageResult {
            results: data,
            page: 1,
            total_docs: seed_total(backend, filter).await,
        }),
    }
}
