//! Port onto the external service catalog: resolves what a `BookableRef`
//! actually means in minutes (and money).

use async_trait::async_trait;
use dashmap::DashMap;

use crate::model::BookableRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookableDetails {
    pub duration_minutes: u32,
    pub buffer_after_minutes: u32,
    pub price_cents: Option<u64>,
}

/// Catalog lookup contract. Returns `None` for bookables the catalog does
/// not know about.
#[async_trait]
pub trait BookableCatalog: Send + Sync {
    async fn resolve(&self, bookable: &BookableRef) -> Option<BookableDetails>;
}

/// In-memory catalog for tests and embedders.
#[derive(Default)]
pub struct StaticCatalog {
    entries: DashMap<BookableRef, BookableDetails>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bookable: BookableRef, details: BookableDetails) {
        self.entries.insert(bookable, details);
    }
}

#[async_trait]
impl BookableCatalog for StaticCatalog {
    async fn resolve(&self, bookable: &BookableRef) -> Option<BookableDetails> {
        self.entries.get(bookable).map(|e| *e.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[tokio::test]
    async fn resolve_known_and_unknown() {
        let catalog = StaticCatalog::new();
        let service = BookableRef::Service(Ulid::new());
        catalog.insert(
            service,
            BookableDetails {
                duration_minutes: 45,
                buffer_after_minutes: 15,
                price_cents: Some(9_900),
            },
        );

        let details = catalog.resolve(&service).await.unwrap();
        assert_eq!(details.duration_minutes, 45);
        assert_eq!(details.buffer_after_minutes, 15);

        assert!(catalog
            .resolve(&BookableRef::Consultant(Ulid::new()))
            .await
            .is_none());
    }
}
