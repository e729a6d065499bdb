//! Demo catalogue for a freshly started server.

use tracing::info;

use crate::store::{Store, StoreError};

struct SeedCategory {
    name: &'static str,
    views: u32,
    likes: u32,
    pages: &'static [(&'static str, &'static str, u32)],
}

const CATEGORIES: &[SeedCategory] = &[
    SeedCategory {
        name: "Python",
        views: 128,
        likes: 64,
        pages: &[
            ("Official Python Tutorial", "http://docs.python.org/2/tutorial/", 42),
            ("How to Think like a Computer Scientist", "http://www.greenteapress.com/thinkpython/", 17),
            ("Learn Python in 10 Minutes", "http://www.korokithakis.net/tutorials/python/", 23),
        ],
    },
    SeedCategory {
        name: "Django",
        views: 64,
        likes: 32,
        pages: &[
            ("Official Django Tutorial", "https://docs.djangoproject.com/en/1.9/intro/tutorial01/", 35),
            ("Django Rocks", "http://www.djangorocks.com/", 8),
            ("How to Tango with Django", "http://www.tangowithdjango.com/", 51),
        ],
    },
    SeedCategory {
        name: "Other Frameworks",
        views: 32,
        likes: 16,
        pages: &[
            ("Bottle", "http://bottlepy.org/docs/dev/", 5),
            ("Flask", "http://flask.pocoo.org", 12),
        ],
    },
];

/// Adds the demo categories and pages. Fails if any category already exists.
pub fn populate(store: &Store) -> Result<(), StoreError> {
    for seed in CATEGORIES {
        let category = store.create_category_with_stats(seed.name, seed.views, seed.likes)?;
        for (title, url, views) in seed.pages {
            store.create_page_with_views(category.id, title, url, *views)?;
        }
        info!(category = seed.name, pages = seed.pages.len(), "seeded category");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn populates_once() {
        let store = Store::new();
        populate(&store).unwrap();

        let top = store.top_categories(5);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].slug, "python");

        let django = store.category_by_slug("django").unwrap();
        assert_eq!(store.pages_in(django.id).len(), 3);
        assert_eq!(store.top_pages(1)[0].title, "How to Tango with Django");

        assert!(matches!(
            populate(&store),
            Err(StoreError::DuplicateCategory(_))
        ));
    }
}
