//! Chrome DevTools backed implementation of the site seam.

pub mod adapter;
pub mod launcher;

pub use adapter::ChromeSiteAdapter;
pub use launcher::ChromeLauncher;
