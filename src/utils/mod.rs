pub mod text;

pub use text::{normalize_whitespace, truncate_chars, truncate_with_ellipsis};
