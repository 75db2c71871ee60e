#![allow(clippy::needless_range_loop, clippy::float_cmp, clippy::manual_range_contains)]

pub mod contents;
pub mod parse;
pub mod q_shared;

pub use contents::*;
pub use q_shared::*;
