//! Materialized ranked views.
//!
//! Each category holds one immutable [`PaginatedView`] behind an `RwLock`.
//! Its reconciler swaps in a new `Arc` after every rebuild; readers clone
//! the `Arc` and page through it without holding the lock.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use hn_types::{Category, Item};

/// One page of a ranked view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub items: Vec<Item>,
    /// Items in the whole view
    pub total_count: usize,
    /// 1-based number of this page
    pub page_number: u32,
    pub page_count: u32,
    pub page_size: usize,
}

/// A ranked list resolved to items and split into pages.
#[derive(Debug, Clone)]
pub struct PaginatedView {
    pages: Vec<Vec<Item>>,
    total_count: usize,
    page_size: usize,
    built_at: Option<DateTime<Utc>>,
}

impl PaginatedView {
    /// A view that has never been populated.
    pub fn empty(page_size: usize) -> Self {
        Self {
            pages: Vec::new(),
            total_count: 0,
            page_size: page_size.max(1),
            built_at: None,
        }
    }

    /// Split `items` into pages of `page_size`, keeping their order.
    pub fn build(items: Vec<Item>, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let total_count = items.len();
        let pages = items
            .chunks(page_size)
            .map(|chunk| chunk.to_vec())
            .collect();

        Self {
            pages,
            total_count,
            page_size,
            built_at: Some(Utc::now()),
        }
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// ceil(total_count / page_size)
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// When the view was last rebuilt; `None` if never.
    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }

    /// Every item of the view in ranked order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.pages.iter().flatten()
    }

    /// Page `page_number`, 1-based.
    ///
    /// 0 reads as 1. A page past the end falls back to page 1.
    pub fn page(&self, page_number: u32) -> Page {
        let page_count = self.page_count();
        let requested = page_number.max(1);
        let page_number = if requested > page_count { 1 } else { requested };

        let items = self
            .pages
            .get(page_number as usize - 1)
            .cloned()
            .unwrap_or_default();

        Page {
            items,
            total_count: self.total_count,
            page_number,
            page_count,
            page_size: self.page_size,
        }
    }
}

/// Latest view of every ranked category.
pub struct ViewCache {
    slots: HashMap<Category, RwLock<Arc<PaginatedView>>>,
    page_size: usize,
}

impl ViewCache {
    /// Create a cache with an empty view for every category.
    pub fn new(page_size: usize) -> Self {
        let slots = Category::ALL
            .iter()
            .map(|category| {
                (
                    *category,
                    RwLock::new(Arc::new(PaginatedView::empty(page_size))),
                )
            })
            .collect();

        Self {
            slots,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Current view of `category`.
    pub fn snapshot(&self, category: Category) -> Arc<PaginatedView> {
        match self.slots.get(&category) {
            Some(slot) => slot
                .read()
                .map(|view| Arc::clone(&*view))
                .unwrap_or_else(|poisoned| Arc::clone(&*poisoned.into_inner())),
            None => Arc::new(PaginatedView::empty(self.page_size)),
        }
    }

    /// Read one page of `category`.
    pub fn get_page(&self, category: Category, page_number: u32) -> Page {
        self.snapshot(category).page(page_number)
    }

    /// Atomically replace the view of `category`.
    pub fn replace(&self, category: Category, view: PaginatedView) {
        let Some(slot) = self.slots.get(&category) else {
            return;
        };

        let total = view.total_count();
        let pages = view.page_count();
        let mut guard = slot.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(view);
        drop(guard);

        debug!(category = %category, total, pages, "Replaced ranked view");
    }
}
