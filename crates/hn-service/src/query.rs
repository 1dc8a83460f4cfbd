//! The `listItems` query path.
//!
//! A request naming one of the five ranked categories is served from the
//! materialized views. Every other request becomes an [`ItemQuery`]
//! against the item store, filtered to stories unless a type is given.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use hn_search::{ItemQuery, ItemStore, SortOrder};
use hn_sync::ViewCache;
use hn_types::{Category, Item};

/// Parameters of a list request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    /// Free text over author, title and body
    #[serde(default)]
    pub text: Option<String>,

    /// Exact type filter; stories when absent
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,

    /// "newest" (default), "oldest" or "score"
    #[serde(default)]
    pub sort: Option<String>,

    /// 1-based page, 1 when absent
    #[serde(default)]
    pub page: Option<u32>,

    /// Ranked category name: top, new, ask, show or job
    #[serde(default)]
    pub special: Option<String>,
}

impl ListRequest {
    pub fn special(category: Category) -> Self {
        Self {
            special: Some(category.as_str().to_string()),
            ..Default::default()
        }
    }

    pub fn search(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = Some(item_type.into());
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }
}

/// One page of results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListResponse {
    pub items: Vec<Item>,
    pub total_count: usize,
    pub page_number: u32,
    pub page_count: u32,
    pub page_size: usize,
}

/// Serves list requests from the views and the item store.
pub struct QueryService {
    store: Arc<dyn ItemStore>,
    views: Arc<ViewCache>,
    page_size: usize,
}

impl QueryService {
    pub fn new(store: Arc<dyn ItemStore>, views: Arc<ViewCache>) -> Self {
        let page_size = views.page_size();
        Self {
            store,
            views,
            page_size,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Answer one list request. Store failures yield an empty page.
    pub async fn list_items(&self, request: &ListRequest) -> ListResponse {
        let page = request.page.unwrap_or(1).max(1);

        if let Some(category) = request.special.as_deref().and_then(Category::parse) {
            let view_page = self.views.get_page(category, page);
            debug!(
                category = %category,
                page = view_page.page_number,
                total = view_page.total_count,
                "Served ranked view"
            );
            return ListResponse {
                items: view_page.items,
                total_count: view_page.total_count,
                page_number: view_page.page_number,
                page_count: view_page.page_count,
                page_size: view_page.page_size,
            };
        }

        if let Some(special) = &request.special {
            debug!(special = %special, "Unknown special view, searching instead");
        }

        let query = self.build_query(request, page);
        match self.store.query(&query).await {
            Ok(result) => ListResponse {
                page_count: page_count(result.total, self.page_size),
                items: result.hits,
                total_count: result.total,
                page_number: page,
                page_size: self.page_size,
            },
            Err(e) => {
                warn!(error = %e, "Item query failed, returning empty page");
                ListResponse {
                    page_number: page,
                    page_size: self.page_size,
                    ..Default::default()
                }
            }
        }
    }

    fn build_query(&self, request: &ListRequest, page: u32) -> ItemQuery {
        let mut query = ItemQuery::new()
            .with_page(page)
            .with_page_size(self.page_size);

        if let Some(text) = &request.text {
            query = query.with_text(text.clone());
        }
        if let Some(item_type) = request.item_type.as_deref().filter(|t| !t.is_empty()) {
            query = query.with_item_type(item_type);
        }
        if let Some(sort) = &request.sort {
            match SortOrder::parse(sort) {
                Some(order) => query = query.with_sort(order),
                None => debug!(sort = %sort, "Unknown sort order, using newest"),
            }
        }
        query
    }
}

fn page_count(total: usize, page_size: usize) -> u32 {
    total.div_ceil(page_size.max(1)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use hn_search::MemoryItemStore;
    use hn_sync::PaginatedView;

    fn service(store: MemoryItemStore, views: ViewCache) -> QueryService {
        QueryService::new(Arc::new(store), Arc::new(views))
    }

    fn ids(response: &ListResponse) -> Vec<u64> {
        response.items.iter().map(|i| i.id).collect()
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 30), 0);
        assert_eq!(page_count(30, 30), 1);
        assert_eq!(page_count(31, 30), 2);
    }

    #[tokio::test]
    async fn test_special_reads_view() {
        let views = ViewCache::new(2);
        views.replace(
            Category::Top,
            PaginatedView::build((1..=3).map(|id| Item::new(id, "story")).collect(), 2),
        );
        let service = service(MemoryItemStore::new(), views);

        let response = service
            .list_items(&ListRequest::special(Category::Top).with_page(2))
            .await;
        assert_eq!(ids(&response), vec![3]);
        assert_eq!(response.total_count, 3);
        assert_eq!(response.page_number, 2);
        assert_eq!(response.page_count, 2);

        let response = service
            .list_items(&ListRequest::special(Category::Top).with_page(9))
            .await;
        assert_eq!(response.page_number, 1);
        assert_eq!(ids(&response), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_unpopulated_special_is_empty() {
        let service = service(MemoryItemStore::new(), ViewCache::new(30));
        let response = service.list_items(&ListRequest::special(Category::Job)).await;
        assert!(response.items.is_empty());
        assert_eq!(response.total_count, 0);
        assert_eq!(response.page_count, 0);
    }

    #[tokio::test]
    async fn test_search_defaults_to_stories() {
        let store = MemoryItemStore::with_items(vec![
            Item::new(1, "story").with_title("Rust in production").with_time(10),
            Item::new(2, "comment").with_text("rust rocks").with_time(20),
            Item::new(3, "story").with_title("Rust async").with_time(30),
        ]);
        let service = service(store, ViewCache::new(30));

        let response = service.list_items(&ListRequest::search("rust")).await;
        assert_eq!(ids(&response), vec![3, 1]);
        assert_eq!(response.total_count, 2);
        assert_eq!(response.page_count, 1);

        let response = service
            .list_items(&ListRequest::search("rust").with_type("comment"))
            .await;
        assert_eq!(ids(&response), vec![2]);

        let response = service
            .list_items(&ListRequest::search("rust").with_sort("oldest"))
            .await;
        assert_eq!(ids(&response), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_unknown_special_falls_through_to_search() {
        let store = MemoryItemStore::with_items(vec![Item::new(1, "story")]);
        let service = service(store, ViewCache::new(30));

        let request = ListRequest {
            special: Some("best".to_string()),
            ..Default::default()
        };
        let response = service.list_items(&request).await;
        assert_eq!(ids(&response), vec![1]);
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_empty() {
        let store = MemoryItemStore::new();
        store.set_fail_queries(true);
        let service = service(store, ViewCache::new(30));

        let response = service.list_items(&ListRequest::search("x").with_page(3)).await;
        assert!(response.items.is_empty());
        assert_eq!(response.page_number, 3);
    }
}
