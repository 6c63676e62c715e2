//! Plugin protocol definitions.
//!
//! Plugins are the executors behind capabilities. A manifest declares what a
//! plugin provides and depends on; a handler implements it.

mod context;
mod descriptor;
mod manifest;
mod state;
mod traits;

pub use context::*;
pub use descriptor::*;
pub use manifest::*;
pub use state::*;
pub use traits::*;
