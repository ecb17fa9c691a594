//! Step definitions for finish-task behaviour tests.

mod given;
mod then;
mod when;
pub mod world;
