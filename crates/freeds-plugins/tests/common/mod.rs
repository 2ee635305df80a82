//! Common test utilities for freeds-plugins
//!
//! - Fixtures that write plugin directories into a temp root
//! - A recording service runner
//! - Store helpers

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
