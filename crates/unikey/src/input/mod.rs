//! Dataset model, file loading and directory scanning.

mod dataset;
mod loader;
mod scan;
mod source;

pub use dataset::{Dataset, HashKey, Value};
pub use loader::{Loader, LoaderConfig};
pub use scan::{DirectoryScanner, DEFAULT_EXCLUDE_PATTERN};
pub use source::SourceMetadata;
