pub mod index;
pub mod index_vec;
pub mod span;

pub use index::X32;
pub use index_vec::IndexVec;
pub use span::Span;
