//! Unit tests for the workflow module.
//!
//! Domain tests are pure; service tests drive the in-memory adapters with a
//! manual clock so polling runs without real delays.

mod finish_tests;
mod support;
