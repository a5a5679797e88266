//! Knowledge index implementations for Bariatric GPT.
//!
//! The corpus is built offline; everything here is read-mostly.

pub mod file_index;
pub mod in_memory;
pub mod keyword;
pub mod noop;
pub mod vector;

pub use file_index::FileIndex;
pub use in_memory::InMemoryIndex;
pub use keyword::{keyword_search, query_terms};
pub use noop::NoopIndex;
pub use vector::{cosine_similarity, reciprocal_rank_fusion, vector_search};
