//! Reference voice catalog.
//!
//! * [`scan`]: collect `<name>.wav` + `<name>.lab` pairs from a directory.
//! * [`to_lookup`]: name → voice map.
//! * [`ReferenceCatalog`]: both views behind one read-only value.

pub mod catalog;

pub use catalog::{scan, to_lookup, ReferenceCatalog, ReferenceVoice};
