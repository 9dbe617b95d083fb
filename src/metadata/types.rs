//! Type descriptors as seen by the facade generator.
//!
//! A [`TypeRef`] is an immutable snapshot of everything the pipeline needs to know about one
//! type: its raw metadata name (nesting separator `+`, generic arity markers `` `N ``), the
//! assembly that declares it, its generic arguments, array shape, visibility and a handful of
//! flags. Descriptors are built once, wrapped in a [`TypeRc`], and shared between members.
//!
//! Composite descriptors derive their visibility from their parts: an array is visible iff its
//! element type is, and a generic instantiation is visible iff the definition and every
//! argument are.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use dotfacade::metadata::types::{TypeFlavor, TypeRef};
//!
//! let list = Arc::new(TypeRef::class("System.Collections.Generic", "List`1")
//!     .with_assembly("System.Private.CoreLib")
//!     .with_generic_params(1));
//! let int = Arc::new(TypeRef::primitive(TypeFlavor::I4));
//! let list_of_int = TypeRef::generic_instance(&list, vec![int]);
//!
//! assert!(list.is_generic_definition());
//! assert!(!list_of_int.is_generic_definition());
//! assert!(list_of_int.is_visible);
//! ```

use std::sync::Arc;

use strum::Display;

use crate::metadata::token::{TableKind, Token};

/// Reference to a shared [`TypeRef`]
pub type TypeRc = Arc<TypeRef>;

/// The assembly that declares all built-in primitive types
pub const CORE_LIBRARY: &str = "System.Private.CoreLib";

#[allow(missing_docs)]
/// The kind of a type, primitives spelled out individually
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TypeFlavor {
    // Built-in types with a C# keyword
    Void,
    Boolean,
    Char,
    I1,
    U1,
    I2,
    U2,
    I4,
    U4,
    I8,
    U8,
    R4,
    R8,
    I,
    U,
    Object,
    String,
    Decimal,

    // Declared types
    Class,
    ValueType,
    Interface,
    Enum,

    // Constructed types
    Array {
        /// The rank (number of dimensions)
        rank: u32,
    },
    GenericParameter {
        /// Position in the owning generic parameter list
        index: u32,
        /// Whether it belongs to a method (true) or a type (false)
        method: bool,
    },
}

impl TypeFlavor {
    /// Check if this is a built-in type with a C# keyword
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TypeFlavor::Void
                | TypeFlavor::Boolean
                | TypeFlavor::Char
                | TypeFlavor::I1
                | TypeFlavor::U1
                | TypeFlavor::I2
                | TypeFlavor::U2
                | TypeFlavor::I4
                | TypeFlavor::U4
                | TypeFlavor::I8
                | TypeFlavor::U8
                | TypeFlavor::R4
                | TypeFlavor::R8
                | TypeFlavor::I
                | TypeFlavor::U
                | TypeFlavor::Object
                | TypeFlavor::String
                | TypeFlavor::Decimal
        )
    }

    /// Check if this is a value type
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        matches!(
            self,
            TypeFlavor::Boolean
                | TypeFlavor::Char
                | TypeFlavor::I1
                | TypeFlavor::U1
                | TypeFlavor::I2
                | TypeFlavor::U2
                | TypeFlavor::I4
                | TypeFlavor::U4
                | TypeFlavor::I8
                | TypeFlavor::U8
                | TypeFlavor::R4
                | TypeFlavor::R8
                | TypeFlavor::I
                | TypeFlavor::U
                | TypeFlavor::Decimal
                | TypeFlavor::ValueType
                | TypeFlavor::Enum
        )
    }

    /// The C# keyword of a built-in type
    #[must_use]
    pub fn keyword(&self) -> Option<&'static str> {
        Some(match self {
            TypeFlavor::Void => "void",
            TypeFlavor::Boolean => "bool",
            TypeFlavor::Char => "char",
            TypeFlavor::I1 => "sbyte",
            TypeFlavor::U1 => "byte",
            TypeFlavor::I2 => "short",
            TypeFlavor::U2 => "ushort",
            TypeFlavor::I4 => "int",
            TypeFlavor::U4 => "uint",
            TypeFlavor::I8 => "long",
            TypeFlavor::U8 => "ulong",
            TypeFlavor::R4 => "float",
            TypeFlavor::R8 => "double",
            TypeFlavor::I => "nint",
            TypeFlavor::U => "nuint",
            TypeFlavor::Object => "object",
            TypeFlavor::String => "string",
            TypeFlavor::Decimal => "decimal",
            _ => return None,
        })
    }

    /// The metadata name of a built-in type (always in the `System` namespace)
    #[must_use]
    pub fn clr_name(&self) -> Option<&'static str> {
        Some(match self {
            TypeFlavor::Void => "Void",
            TypeFlavor::Boolean => "Boolean",
            TypeFlavor::Char => "Char",
            TypeFlavor::I1 => "SByte",
            TypeFlavor::U1 => "Byte",
            TypeFlavor::I2 => "Int16",
            TypeFlavor::U2 => "UInt16",
            TypeFlavor::I4 => "Int32",
            TypeFlavor::U4 => "UInt32",
            TypeFlavor::I8 => "Int64",
            TypeFlavor::U8 => "UInt64",
            TypeFlavor::R4 => "Single",
            TypeFlavor::R8 => "Double",
            TypeFlavor::I => "IntPtr",
            TypeFlavor::U => "UIntPtr",
            TypeFlavor::Object => "Object",
            TypeFlavor::String => "String",
            TypeFlavor::Decimal => "Decimal",
            _ => return None,
        })
    }

    /// Artificial token of a built-in type
    fn primitive_row(&self) -> u32 {
        match self {
            TypeFlavor::Void => 0x01,
            TypeFlavor::Boolean => 0x02,
            TypeFlavor::Char => 0x03,
            TypeFlavor::I1 => 0x04,
            TypeFlavor::U1 => 0x05,
            TypeFlavor::I2 => 0x06,
            TypeFlavor::U2 => 0x07,
            TypeFlavor::I4 => 0x08,
            TypeFlavor::U4 => 0x09,
            TypeFlavor::I8 => 0x0a,
            TypeFlavor::U8 => 0x0b,
            TypeFlavor::R4 => 0x0c,
            TypeFlavor::R8 => 0x0d,
            TypeFlavor::String => 0x0e,
            TypeFlavor::I => 0x18,
            TypeFlavor::U => 0x19,
            TypeFlavor::Object => 0x1c,
            TypeFlavor::Decimal => 0x30,
            _ => 0,
        }
    }
}

/// A named constant of an enum type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    /// The constant's name
    pub name: String,
    /// The constant's value, widened to 64 bits
    pub value: i64,
}

impl EnumValue {
    /// Create a new enum constant
    pub fn new(name: &str, value: i64) -> Self {
        EnumValue {
            name: name.to_string(),
            value,
        }
    }
}

/// Identity and shape of a type, as needed to render and reason about it.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct TypeRef {
    /// Token (null until registered, artificial for primitives)
    pub token: Token,
    /// The kind of this type
    pub flavor: TypeFlavor,
    /// `TypeNamespace` (empty for nested types' inner segments and generic parameters)
    pub namespace: String,
    /// Raw metadata name, e.g. ``Outer`1+Inner`2``; generic parameters carry their declared name
    pub name: String,
    /// The assembly (compiled unit) that declares this type
    pub assembly: String,
    /// Generic arguments of an instantiation, spread over all nesting levels
    pub generic_args: Vec<TypeRc>,
    /// Element type of an array
    pub element: Option<TypeRc>,
    /// Is the type reachable from outside its assembly
    pub is_visible: bool,
    /// Is this the by-reference form of the type (`T&`)
    pub is_by_ref: bool,
    /// Is the type `abstract sealed` (a C# static class)
    pub is_static: bool,
    /// Was the type synthesized by a compiler
    pub is_compiler_generated: bool,
    /// Number of generic parameters of an open definition, 0 for everything else
    pub generic_param_count: u32,
    /// Named constants of an enum type, in declaration order
    pub enum_values: Vec<EnumValue>,
    /// Is the enum marked `[Flags]`
    pub is_flags: bool,
}

impl TypeRef {
    fn declared(flavor: TypeFlavor, namespace: &str, name: &str) -> Self {
        TypeRef {
            token: Token::default(),
            flavor,
            namespace: namespace.to_string(),
            name: name.to_string(),
            assembly: String::new(),
            generic_args: Vec::new(),
            element: None,
            is_visible: true,
            is_by_ref: false,
            is_static: false,
            is_compiler_generated: false,
            generic_param_count: 0,
            enum_values: Vec::new(),
            is_flags: false,
        }
    }

    /// Create a built-in type
    ///
    /// ## Arguments
    /// * `flavor` - One of the primitive flavors; other flavors produce an unnamed class
    #[must_use]
    pub fn primitive(flavor: TypeFlavor) -> Self {
        let mut primitive =
            TypeRef::declared(flavor, "System", flavor.clr_name().unwrap_or_default());
        primitive.token = Token::from_parts(TableKind::PRIMITIVE, flavor.primitive_row());
        primitive.assembly = CORE_LIBRARY.to_string();
        primitive
    }

    /// Create a class
    ///
    /// ## Arguments
    /// * `namespace` - Namespace of the outermost enclosing type
    /// * `name`      - Raw name, nested types separated by `+`
    #[must_use]
    pub fn class(namespace: &str, name: &str) -> Self {
        TypeRef::declared(TypeFlavor::Class, namespace, name)
    }

    /// Create a value type
    #[must_use]
    pub fn value_type(namespace: &str, name: &str) -> Self {
        TypeRef::declared(TypeFlavor::ValueType, namespace, name)
    }

    /// Create an interface
    #[must_use]
    pub fn interface(namespace: &str, name: &str) -> Self {
        TypeRef::declared(TypeFlavor::Interface, namespace, name)
    }

    /// Create an enum with its named constants
    #[must_use]
    pub fn enumeration(namespace: &str, name: &str, values: Vec<EnumValue>) -> Self {
        let mut enumeration = TypeRef::declared(TypeFlavor::Enum, namespace, name);
        enumeration.enum_values = values;
        enumeration
    }

    /// Create a generic parameter placeholder
    ///
    /// ## Arguments
    /// * `name`   - The declared name, e.g. `T`
    /// * `index`  - Position in the owning parameter list
    /// * `method` - Whether the parameter belongs to a method
    #[must_use]
    pub fn generic_param(name: &str, index: u32, method: bool) -> Self {
        TypeRef::declared(TypeFlavor::GenericParameter { index, method }, "", name)
    }

    /// Create an array of `element` with the given rank
    #[must_use]
    pub fn array(element: &TypeRc, rank: u32) -> Self {
        let mut array = TypeRef::declared(
            TypeFlavor::Array { rank: rank.max(1) },
            &element.namespace,
            &element.name,
        );
        array.token = Token::from_parts(TableKind::TYPE_SPEC, 0);
        array.assembly.clone_from(&element.assembly);
        array.is_visible = element.is_visible;
        array.element = Some(element.clone());
        array
    }

    /// Create an instantiation of the generic definition `definition`
    ///
    /// Arguments are listed in metadata order, outermost nesting level first.
    #[must_use]
    pub fn generic_instance(definition: &TypeRc, args: Vec<TypeRc>) -> Self {
        let mut instance = (**definition).clone();
        instance.token = Token::from_parts(TableKind::TYPE_SPEC, 0);
        instance.is_visible = definition.is_visible && args.iter().all(|arg| arg.is_visible);
        instance.generic_param_count = 0;
        instance.generic_args = args;
        instance
    }

    /// Create the by-reference form of `base`
    #[must_use]
    pub fn by_ref(base: &TypeRc) -> Self {
        let mut by_ref = (**base).clone();
        by_ref.is_by_ref = true;
        by_ref
    }

    /// Set the declaring assembly
    #[must_use]
    pub fn with_assembly(mut self, assembly: &str) -> Self {
        self.assembly = assembly.to_string();
        self
    }

    /// Set the token
    #[must_use]
    pub fn with_token(mut self, token: Token) -> Self {
        self.token = token;
        self
    }

    /// Mark the type as not visible outside its assembly
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.is_visible = false;
        self
    }

    /// Mark the type as a static class
    #[must_use]
    pub fn static_class(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Mark the type as compiler-synthesized
    #[must_use]
    pub fn compiler_generated(mut self) -> Self {
        self.is_compiler_generated = true;
        self
    }

    /// Mark the type as an open generic definition with `count` parameters
    #[must_use]
    pub fn with_generic_params(mut self, count: u32) -> Self {
        self.generic_param_count = count;
        self
    }

    /// Mark an enum as `[Flags]`
    #[must_use]
    pub fn flags(mut self) -> Self {
        self.is_flags = true;
        self
    }

    /// Returns the raw qualified name (`Namespace.Name`, or `Name` without a namespace)
    #[must_use]
    pub fn fullname(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{0}.{1}", self.namespace, self.name)
        }
    }

    /// The simple names of every nesting level joined with `_`, arity markers stripped
    ///
    /// `Outer`1+Inner` becomes `Outer_Inner`, which keeps nested types of different
    /// enclosing types apart.
    #[must_use]
    pub fn nested_name(&self) -> String {
        self.name
            .split('+')
            .map(|segment| segment.split('`').next().unwrap_or(segment))
            .collect::<Vec<_>>()
            .join("_")
    }

    /// The rank of an array type, 0 for everything else
    #[must_use]
    pub fn array_rank(&self) -> u32 {
        match self.flavor {
            TypeFlavor::Array { rank } => rank,
            _ => 0,
        }
    }

    /// Is this an open generic type definition
    #[must_use]
    pub fn is_generic_definition(&self) -> bool {
        self.generic_param_count > 0
            || (self.generic_args.is_empty()
                && self.element.is_none()
                && !matches!(self.flavor, TypeFlavor::GenericParameter { .. })
                && self.name.contains('`'))
    }

    /// Is this a generic parameter placeholder
    #[must_use]
    pub fn is_generic_param(&self) -> bool {
        matches!(self.flavor, TypeFlavor::GenericParameter { .. })
    }

    /// Is this a value type (by-ref forms report their element's kind)
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        self.flavor.is_value_type()
    }

    /// Is this `void`
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.flavor == TypeFlavor::Void
    }

    /// Does this type, or any type it is composed of, fail the visibility check
    ///
    /// Generic parameters count as visible: they are rendered by name.
    #[must_use]
    pub fn is_fully_visible(&self) -> bool {
        self.is_visible
            && self.generic_args.iter().all(|arg| arg.is_fully_visible())
            && self
                .element
                .as_ref()
                .map_or(true, |element| element.is_fully_visible())
    }

    /// Structural identity used for signature comparison
    ///
    /// Tokens are ignored; generic parameters compare by position only, so `M<T>(T)` and
    /// `M<U>(U)` have the same signature.
    #[must_use]
    pub fn same_type(&self, other: &TypeRef) -> bool {
        if self.is_by_ref != other.is_by_ref || self.flavor != other.flavor {
            return false;
        }

        if self.is_generic_param() {
            return true;
        }

        if self.namespace != other.namespace
            || self.name != other.name
            || self.generic_args.len() != other.generic_args.len()
        {
            return false;
        }

        let elements_match = match (&self.element, &other.element) {
            (Some(left), Some(right)) => left.same_type(right),
            (None, None) => true,
            _ => false,
        };

        elements_match
            && self
                .generic_args
                .iter()
                .zip(&other.generic_args)
                .all(|(left, right)| left.same_type(right))
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.same_type(other)
    }
}
