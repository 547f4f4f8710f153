// Scene Control Module
//
// Scene load / unload / activation bookkeeping over the resource backend.

pub mod controller;
pub mod entry;

pub use controller::SceneController;
pub use entry::SceneEntry;
