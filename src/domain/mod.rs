pub mod category;
pub mod post;
pub mod raw;

pub use category::{category_by_id, Category, CATEGORIES, LATEST_CATEGORY_ID};
pub use post::{Article, ArticlePage};
pub use raw::RawPost;
