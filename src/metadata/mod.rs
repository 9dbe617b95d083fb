//! Metadata descriptors consumed by the facade generator.
//!
//! Everything in this module is a read-only snapshot of ECMA-335 metadata: types, their
//! members, parameter defaults and the relations between types. The generator never decodes
//! assemblies itself; it reads these descriptors through a [`source::MetadataSource`].
//!
//! # Key Components
//!
//! - [`token`] - Metadata table row references used as type and member identity
//! - [`types`] - Type descriptors ([`types::TypeRef`]) and their flavors
//! - [`members`] - Property, field and method descriptors plus their flag sets
//! - [`literal`] - Constant values used as parameter defaults
//! - [`source`] - The [`source::MetadataSource`] trait and the in-memory registry
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use dotfacade::metadata::{
//!     members::{MemberAccess, MethodDescriptor, ParameterDescriptor},
//!     source::MemoryMetadata,
//!     types::{TypeFlavor, TypeRef},
//! };
//!
//! let metadata = MemoryMetadata::new("Sample");
//! let calc = metadata.define(TypeRef::class("Sample", "Calculator"))?;
//! let int = Arc::new(TypeRef::primitive(TypeFlavor::I4));
//!
//! let add = metadata.add_method(
//!     MethodDescriptor::new("Add", &calc, &int, MemberAccess::Private)
//!         .with_param(ParameterDescriptor::new("left", &int))
//!         .with_param(ParameterDescriptor::new("right", &int)),
//! )?;
//! assert_eq!(add.params.len(), 2);
//! # Ok::<(), dotfacade::Error>(())
//! ```

/// Constant values attached to parameters and fields
pub mod literal;
/// Property, field and method descriptors
pub mod members;
/// Metadata queries and the in-memory registry
pub mod source;
/// Commonly used metadata token type
pub mod token;
/// Type descriptors
pub mod types;
