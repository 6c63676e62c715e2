//! Common types used across the protocol layer.

mod common;

pub use common::*;
