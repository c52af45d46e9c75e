//! Request handlers.

pub mod announce;
pub mod detect;
pub mod health;

pub use announce::*;
pub use detect::*;
pub use health::*;
