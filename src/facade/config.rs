//! Generator configuration
//!
//! This module provides the options that shape a generation run: which types are skipped,
//! how facades are named and laid out, and how the work is scheduled.

use crate::{
    facade::emit::LineEnding,
    metadata::{source::BindingMask, types::TypeRc},
};

/// Configuration for a facade generation run
///
/// The defaults generate a facade for every supported type in parallel, named
/// `<Type>Facade`, in the namespace of the wrapped type, with `\n` line endings.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Types that get no facade; members they (or types derived from them) declare are
    /// dropped from every other facade
    pub excluded: Vec<TypeRc>,

    /// Appended to the wrapped type's nested name to form the facade name
    pub facade_suffix: String,

    /// Emit every facade into this namespace instead of the wrapped type's own
    pub namespace: Option<String>,

    /// Line terminator of the generated text
    pub line_ending: LineEnding,

    /// Generate types concurrently (output is identical either way)
    pub parallel: bool,

    /// Which members are requested from the metadata source
    pub binding: BindingMask,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            excluded: Vec::new(),
            facade_suffix: "Facade".to_string(),
            namespace: None,
            line_ending: LineEnding::Lf,
            parallel: true,
            binding: BindingMask::all(),
        }
    }
}

impl GeneratorConfig {
    /// Creates a configuration that generates one type after another
    ///
    /// Useful for debugging and for callers that already parallelize at a higher level.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Creates a configuration that only looks at members declared by the type itself
    #[must_use]
    pub fn declared_only() -> Self {
        Self {
            binding: BindingMask::all() - BindingMask::INHERITED,
            ..Self::default()
        }
    }

    /// Adds a type to the exclusion list
    #[must_use]
    pub fn exclude(mut self, ty: &TypeRc) -> Self {
        self.excluded.push(ty.clone());
        self
    }

    /// The facade name for a wrapped type's nesting-qualified name, see
    /// [`TypeRef::nested_name`](crate::metadata::types::TypeRef::nested_name)
    #[must_use]
    pub fn facade_name(&self, type_name: &str) -> String {
        format!("{type_name}{}", self.facade_suffix)
    }
}
