// Retrieval module
// Exact flat vector index, aligned metadata table, bundle persistence and search

pub mod builder;
pub mod bundle;
pub mod distance;
pub mod error;
pub mod index;
pub mod metadata;
pub mod search;

pub use builder::IndexBuilder;
pub use bundle::{BundleInfo, FORMAT_VERSION};
pub use distance::DistanceMetric;
pub use error::RetrievalError;
pub use index::{FlatIndex, Neighbor};
pub use metadata::{MetadataRecord, MetadataTable};
pub use search::{Query, SearchContext, SearchResult, SharedContext};
