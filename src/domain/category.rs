/// Static table translating the app's category selection into API slugs.
///
/// Id `1` is reserved for the unfiltered "latest" stream and never maps to
/// a remote taxonomy term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub id: u64,
    pub slug: &'static str,
    pub title: &'static str,
}

pub const LATEST_CATEGORY_ID: u64 = 1;

pub const CATEGORIES: &[Category] = &[
    Category { id: 1, slug: "latest", title: "Latest" },
    Category { id: 2, slug: "politics", title: "Politics" },
    Category { id: 3, slug: "business", title: "Business" },
    Category { id: 4, slug: "technology", title: "Technology" },
    Category { id: 5, slug: "sports", title: "Sports" },
    Category { id: 6, slug: "entertainment", title: "Entertainment" },
    Category { id: 7, slug: "health", title: "Health" },
];

pub fn category_by_id(id: u64) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.id == id)
}
