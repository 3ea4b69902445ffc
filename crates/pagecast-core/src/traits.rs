use std::{fmt::Debug, hash::Hash};

///
/// Path
/// Fully-qualified record path, used as the label in logs and metrics.
///

pub trait Path {
    const PATH: &'static str;
}

///
/// Record
///
/// One immutable row of a dataset.
///
/// ## Semantics
/// - identity is `id()`; ids are unique within one store
/// - natural order is the order the source produced, not id order
/// - records are shared read-only once loaded, hence `Send + Sync`
///

pub trait Record: Path + Clone + Debug + Send + Sync + 'static {
    type Id: Copy + Debug + Eq + Hash + Ord + ToString;

    fn id(&self) -> Self::Id;
}
