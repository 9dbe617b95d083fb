// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # dotfacade
//!
//! [![Crates.io](https://img.shields.io/crates/v/dotfacade.svg)](https://crates.io/crates/dotfacade)
//! [![Documentation](https://docs.rs/dotfacade/badge.svg)](https://docs.rs/dotfacade)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://github.com/BinFlip/dotfacade/blob/main/LICENSE-APACHE)
//!
//! Generates statically typed C# access facades for .NET types, from their metadata alone.
//!
//! A facade is a companion class that exposes every member of a wrapped type, public or not,
//! through an ordinary public surface. `dotfacade` decides for each member how the facade
//! reaches it and writes the C# source accordingly:
//!
//! - **Direct** - public members are called as they are
//! - **Trampoline** - non-public members with a nameable signature go through a delegate
//!   bound once to the member's metadata handle
//! - **DynamicInvoke** - everything else is reached through reflection at call time
//!
//! Type system details are reproduced from metadata: by-reference returns, `in`/`out`/`ref`
//! parameters, generic constraints, overloads, shadowed members and explicit interface
//! implementations. The wrapped type is never loaded or executed.
//!
//! ## Features
//!
//! - **🧭 Metadata driven** - Works from type and member descriptors, any source can supply them
//! - **⚡ Parallel** - Types are generated concurrently with `rayon`, output is deterministic
//! - **🛡️ Failure scoped** - A type that can not be wrapped never aborts the run
//! - **🔧 Pluggable trampolines** - The delegate factory is a trait object
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use dotfacade::prelude::*;
//!
//! let metadata = MemoryMetadata::new("Sample");
//! let foo = metadata.define(TypeRef::class("Ns", "Foo"))?;
//! let int = Arc::new(TypeRef::primitive(TypeFlavor::I4));
//!
//! metadata.add_field(FieldDescriptor::new("A", &foo, &int, MemberAccess::Public))?;
//! metadata.add_field(FieldDescriptor::new("B", &foo, &int, MemberAccess::Private))?;
//!
//! let report = FacadeGenerator::new(&metadata, GeneratorConfig::default()).run();
//! let facade = &report.units[0];
//!
//! assert_eq!(facade.name, "Ns.FooFacade");
//! assert!(facade.text.contains("get => __instance.A;"));
//! assert!(facade.text.contains("get => __Meta.B_Get(__instance);"));
//! # Ok::<(), dotfacade::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`] - Type and member descriptors, the [`metadata::source::MetadataSource`]
//!   trait and the in-memory [`metadata::source::MemoryMetadata`] registry
//! - [`facade`] - The pipeline stages: rendering, classification, overloads, strategies and
//!   emission
//! - [`generator`] - Runs the pipeline for every type and collects a [`GenerationReport`]
//! - [`diagnostics`] - What was skipped or degraded along the way
//!
//! ## Logging
//!
//! `dotfacade` emits [`tracing`](https://docs.rs/tracing) events and installs no subscriber.
//! Classifier and strategy decisions are logged at `debug`, skipped types and trampoline
//! fallbacks at `warn`, and the per-run summary at `info`. Each run and each generated type
//! is wrapped in a span.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use dotfacade::prelude::*;
///
/// let metadata = MemoryMetadata::new("Sample");
/// let report = FacadeGenerator::new(&metadata, GeneratorConfig::sequential()).run();
/// assert!(report.units.is_empty());
/// ```
pub mod prelude;

/// Type and member descriptors, and the sources that supply them
///
/// Descriptors are read-only snapshots built once per run and shared behind `Arc`. The
/// [`metadata::source::MetadataSource`] trait is the only way the pipeline learns about
/// types; [`metadata::source::MemoryMetadata`] is a concurrent implementation that callers
/// fill themselves.
pub mod metadata;

/// The facade generation pipeline
pub mod facade;

/// Diagnostics collected during generation
pub mod diagnostics;

/// The generation driver
pub mod generator;

/// `dotfacade` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `dotfacade` Error type
///
/// The main error type for all operations in this crate. Errors are scoped to a single type;
/// the generator turns them into diagnostics and continues.
pub use error::Error;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};

pub use facade::config::GeneratorConfig;

pub use generator::{FacadeGenerator, GeneratedFacade, GenerationReport};
