//! Shared test utilities for scanform integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring a `DocumentService` to an in-memory database,
//!   a temp upload directory and scripted OCR engines
//! - Fakes for the OCR engines, the PDF rasterizer and the repository
//! - Builders for fixture images and configs

pub mod builders;
pub mod fakes;
pub mod harness;

pub use builders::*;
pub use fakes::*;
pub use harness::TestHarness;
