//! Window-space geometry.
//!
//! Window space follows GL conventions:
//! - integer pixels
//! - origin bottom-left
//! - +X right, +Y up

mod viewport;

pub use viewport::Viewport;
