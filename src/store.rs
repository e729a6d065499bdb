//! In-memory catalogue of categories and their pages.

use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

pub type CategoryId = u64;
pub type PageId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub views: u32,
    pub likes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub id: PageId,
    pub category_id: CategoryId,
    pub title: String,
    pub url: String,
    pub views: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Category with this name already exists: {0}")]
    DuplicateCategory(String),

    #[error("Unknown category id {0}")]
    UnknownCategory(CategoryId),
}

/// Lowercases ASCII letters and digits and joins everything else into
/// single dashes, e.g. `"Other Frameworks!"` becomes `"other-frameworks"`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[derive(Default)]
struct Tables {
    categories: Vec<Category>,
    pages: Vec<Page>,
    next_id: u64,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone, Default)]
pub struct Store {
    tables: Arc<RwLock<Tables>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_category(&self, name: &str) -> Result<Category, StoreError> {
        self.create_category_with_stats(name, 0, 0)
    }

    pub fn create_category_with_stats(
        &self,
        name: &str,
        views: u32,
        likes: u32,
    ) -> Result<Category, StoreError> {
        let slug = slugify(name);
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);

        if tables
            .categories
            .iter()
            .any(|c| c.name == name || c.slug == slug)
        {
            return Err(StoreError::DuplicateCategory(name.to_string()));
        }

        let category = Category {
            id: tables.next_id(),
            name: name.to_string(),
            slug,
            views,
            likes,
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    /// True if a category already uses this name or the slug it would get.
    pub fn category_exists(&self, name: &str) -> bool {
        let slug = slugify(name);
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .categories
            .iter()
            .any(|c| c.name == name || c.slug == slug)
    }

    pub fn category_by_slug(&self, slug: &str) -> Option<Category> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .categories
            .iter()
            .find(|c| c.slug == slug)
            .cloned()
    }

    pub fn create_page(
        &self,
        category_id: CategoryId,
        title: &str,
        url: &str,
    ) -> Result<Page, StoreError> {
        self.create_page_with_views(category_id, title, url, 0)
    }

    pub fn create_page_with_views(
        &self,
        category_id: CategoryId,
        title: &str,
        url: &str,
        views: u32,
    ) -> Result<Page, StoreError> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);

        if !tables.categories.iter().any(|c| c.id == category_id) {
            return Err(StoreError::UnknownCategory(category_id));
        }

        let page = Page {
            id: tables.next_id(),
            category_id,
            title: title.to_string(),
            url: url.to_string(),
            views,
        };
        tables.pages.push(page.clone());
        Ok(page)
    }

    pub fn pages_in(&self, category_id: CategoryId) -> Vec<Page> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .pages
            .iter()
            .filter(|p| p.category_id == category_id)
            .cloned()
            .collect()
    }

    /// The `n` most liked categories; ties keep creation order.
    pub fn top_categories(&self, n: usize) -> Vec<Category> {
        let mut categories = self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .categories
            .clone();
        categories.sort_by(|a, b| b.likes.cmp(&a.likes));
        categories.truncate(n);
        categories
    }

    /// The `n` most viewed pages; ties keep creation order.
    pub fn top_pages(&self, n: usize) -> Vec<Page> {
        let mut pages = self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .pages
            .clone();
        pages.sort_by(|a, b| b.views.cmp(&a.views));
        pages.truncate(n);
        pages
    }

    pub fn category_count(&self) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .categories
            .len()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn slugs() {
        assert_eq!(slugify("Python"), "python");
        assert_eq!(slugify("Other Frameworks"), "other-frameworks");
        assert_eq!(slugify("  C++ / Rust!  "), "c-rust");
        assert_eq!(slugify("?!"), "");
    }

    #[test]
    fn rejects_duplicate_names_and_slugs() {
        let store = Store::new();
        store.create_category("Other Frameworks").unwrap();
        assert_eq!(
            store.create_category("Other Frameworks"),
            Err(StoreError::DuplicateCategory("Other Frameworks".to_string()))
        );
        assert!(store.create_category("other frameworks").is_err());
        assert!(store.category_exists("OTHER-frameworks"));
        assert_eq!(store.category_count(), 1);
    }

    #[test]
    fn looks_up_by_slug() {
        let store = Store::new();
        let python = store.create_category("Python").unwrap();
        assert_eq!(store.category_by_slug("python"), Some(python));
        assert_eq!(store.category_by_slug("perl"), None);
    }

    #[test]
    fn pages_belong_to_their_category() {
        let store = Store::new();
        let python = store.create_category("Python").unwrap();
        let django = store.create_category("Django").unwrap();
        let tutorial = store
            .create_page(python.id, "Official Tutorial", "http://docs.python.org/3/tutorial/")
            .unwrap();
        store
            .create_page(django.id, "Django Rocks", "http://www.djangorocks.com/")
            .unwrap();

        assert_eq!(tutorial.views, 0);
        assert_eq!(store.pages_in(python.id), vec![tutorial]);
        assert_eq!(
            store.create_page(999, "Orphan", "http://example.com"),
            Err(StoreError::UnknownCategory(999))
        );
    }

    #[test]
    fn top_lists_are_ordered_and_capped() {
        let store = Store::new();
        for (i, likes) in [3, 40, 7, 40, 1, 12].into_iter().enumerate() {
            let c = store
                .create_category_with_stats(&format!("Category {i}"), 0, likes)
                .unwrap();
            store
                .create_page_with_views(c.id, &format!("Page {i}"), "http://example.com", likes * 2)
                .unwrap();
        }

        let names: Vec<_> = store.top_categories(5).into_iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec!["Category 1", "Category 3", "Category 5", "Category 2", "Category 0"]
        );

        let views: Vec<_> = store.top_pages(5).into_iter().map(|p| p.views).collect();
        assert_eq!(views, vec![80, 80, 24, 14, 6]);
        assert!(store.top_pages(0).is_empty());
    }
}
