//! Static content for alignment sessions.
//!
//! The built-in catalog of corporate mandates and crises lives in
//! [`catalog`]. With the `loaders` feature (on by default), session settings
//! and catalogs can also be read from TOML/RON data files.
pub mod catalog;

#[cfg(feature = "loaders")]
pub mod loaders;

pub use catalog::{builtin_catalog, builtin_crises, builtin_mandates};

#[cfg(feature = "loaders")]
pub use loaders::{ContentFactory, CrisisLoader, LoadResult, MandateLoader, SettingsLoader};
