#![deny(warnings)]
#![deny(clippy::all, clippy::perf, clippy::suspicious)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

//! Compilation driver and preprocessing front-end for SystemVerilog: command
//! assembly, source acquisition, preprocessing, and design binding with a
//! configurable diagnostic pipeline.

pub mod ast;
pub mod cli;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod logging;
pub mod source;
pub mod syntax;

pub use driver::Driver;
pub use error::{Error, Result};
