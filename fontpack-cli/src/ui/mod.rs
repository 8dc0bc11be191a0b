//! Terminal output for fontpack.

mod progress;

pub use progress::ProgressView;
