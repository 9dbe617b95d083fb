//! Facade generation pipeline.
//!
//! This module turns the metadata of one type into the C# source of its access facade. The
//! stages are independent and can be used on their own:
//!
//! 1. [`render`] - spelling of type descriptors, reflection handles and constraint clauses
//! 2. [`classify`] - selects the members a facade exposes
//! 3. [`overload`] - removes shadowed methods and numbers overloads
//! 4. [`strategy`] - decides how each member is reached and compiles trampolines
//! 5. [`emit`] and [`literal`] - lay out the facade text and spell default values
//!
//! [`crate::FacadeGenerator`] runs all stages for every type of a metadata source, configured
//! by [`config::GeneratorConfig`].

pub mod classify;
pub mod config;
pub mod emit;
pub mod literal;
pub mod overload;
pub mod render;
pub mod strategy;
