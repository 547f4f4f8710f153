// Asset Control Module
//
// Reference-counted asset loading on top of the resource backend:
// - Individual loads by key or reference, deduplicated per location
// - Label batch loads with batch-scoped release
// - Label set helpers

mod batch;
pub mod controller;
pub mod entry;
mod individual;
pub mod labels;
pub(crate) mod loader;

pub use controller::AssetController;
pub use entry::AssetEntry;
