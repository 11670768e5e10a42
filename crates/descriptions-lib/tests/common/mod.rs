#![allow(dead_code)]

#[path = "../../src/test_support.rs"]
mod support;

pub use support::*;
