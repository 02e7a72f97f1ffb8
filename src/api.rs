use serde::{Deserialize, Serialize};

/// A list endpoint's body: either a bare JSON array or a paginated
/// `{count, next, previous, results}` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Bare(Vec<T>),
    Paginated {
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        previous: Option<String>,
        results: Vec<T>,
    },
}

impl<T> Listing<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(items) => items,
            Listing::Paginated { results, .. } => results,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Listing::Bare(items) => items.len(),
            Listing::Paginated { results, .. } => results.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_more(&self) -> bool {
        matches!(self, Listing::Paginated { next: Some(_), .. })
    }
}

impl<T> From<Listing<T>> for Vec<T> {
    fn from(listing: Listing<T>) -> Self {
        listing.into_vec()
    }
}
