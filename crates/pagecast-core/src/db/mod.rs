//! Memoized record storage and pull-based pagination.

mod page;
mod paginator;
pub mod range;
mod store;

#[cfg(test)]
mod tests;

pub use page::{Dataset, Page};
pub use paginator::{PaginationCursor, Paginator};
pub use range::{Range, resolve};
pub use store::RecordStore;
