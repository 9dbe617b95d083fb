//! # dotfacade Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the dotfacade library. Import this module to get quick access to the essential
//! types for describing .NET types and generating their facades.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotfacade operations
pub use crate::Error;

/// The result type used throughout dotfacade
pub use crate::Result;

/// Diagnostics reported by a generation run
pub use crate::{Diagnostic, Diagnostics, Severity};

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The generation driver and its results
pub use crate::{FacadeGenerator, GeneratedFacade, GenerationReport};

/// Configuration of a generation run
pub use crate::GeneratorConfig;

// ================================================================================================
// Metadata
// ================================================================================================

/// Metadata token type for referencing types and members
pub use crate::metadata::token::Token;

/// Type descriptors
pub use crate::metadata::types::{EnumValue, TypeFlavor, TypeRc, TypeRef};

/// Member descriptors and their flags
pub use crate::metadata::members::{
    FieldAttributes, FieldDescriptor, GenericParamAttributes, GenericParameter, MemberAccess,
    MemberDescriptor, MethodDescriptor, MethodModifiers, ParameterDescriptor, PassingMode,
    PropertyDescriptor,
};

/// Default values of parameters and constants
pub use crate::metadata::literal::Literal;

/// Metadata sources
pub use crate::metadata::source::{BindingMask, InterfaceMap, MemoryMetadata, MetadataSource};

// ================================================================================================
// Facade Pipeline
// ================================================================================================

/// Access strategies and trampoline compilation
pub use crate::facade::strategy::{
    AccessStrategy, DelegateTrampolineCompiler, Trampoline, TrampolineCompiler,
    TrampolineSignature,
};

/// Emitted output
pub use crate::facade::emit::{FacadeUnit, LineEnding};

/// Type name rendering
pub use crate::facade::render::render;
