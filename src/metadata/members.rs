//! Member descriptors: properties, fields, methods and their parameters.
//!
//! Descriptors are read-only snapshots of what a metadata query reports about a member. The
//! flag sets reuse the ECMA-335 bit values (§II.23.1), so a metadata reader can hand its raw
//! attribute words straight to the `from_*_flags` helpers.
//!
//! # Key Types
//! - [`MemberDescriptor`]: tagged variant over [`PropertyDescriptor`], [`FieldDescriptor`] and
//!   [`MethodDescriptor`]
//! - [`ParameterDescriptor`] and [`PassingMode`]: parameters with their `in`/`out`/`ref` mode
//! - [`GenericParameter`]: a method generic parameter and its constraints
//! - [`MemberAccess`]: the seven accessibility levels of a member

use std::sync::Arc;

use bitflags::bitflags;
use strum::{Display, EnumIter};

use crate::metadata::{literal::Literal, token::Token, types::TypeRc};

/// Reference to a shared [`PropertyDescriptor`]
pub type PropertyRc = Arc<PropertyDescriptor>;
/// Reference to a shared [`FieldDescriptor`]
pub type FieldRc = Arc<FieldDescriptor>;
/// Reference to a shared [`MethodDescriptor`]
pub type MethodRc = Arc<MethodDescriptor>;

/// Bitmask for member access extraction from method and field attributes
pub const MEMBER_ACCESS_MASK: u32 = 0x0007;

/// Accessibility of a member (§II.23.1.5, §II.23.1.10)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
pub enum MemberAccess {
    /// Member not referenceable
    CompilerControlled,
    /// Accessible only by the parent type
    Private,
    /// Accessible by sub-types only in this assembly
    FamilyAndAssembly,
    /// Accessible by anyone in the assembly
    Assembly,
    /// Accessible only by type and sub-types
    Family,
    /// Accessible by sub-types anywhere, plus anyone in the assembly
    FamilyOrAssembly,
    /// Accessible by anyone who has visibility to this scope
    Public,
}

impl MemberAccess {
    /// Extract the access level from raw method or field attributes
    #[must_use]
    pub fn from_member_flags(flags: u32) -> Self {
        match flags & MEMBER_ACCESS_MASK {
            0x0001 => MemberAccess::Private,
            0x0002 => MemberAccess::FamilyAndAssembly,
            0x0003 => MemberAccess::Assembly,
            0x0004 => MemberAccess::Family,
            0x0005 => MemberAccess::FamilyOrAssembly,
            0x0006 => MemberAccess::Public,
            _ => MemberAccess::CompilerControlled,
        }
    }

    /// Is the member public
    #[must_use]
    pub fn is_public(&self) -> bool {
        *self == MemberAccess::Public
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method modifiers and properties (§II.23.1.10, access bits excluded)
    pub struct MethodModifiers: u32 {
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Method cannot be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method hides by name+sig, else just by name
        const HIDE_BY_SIG = 0x0080;
        /// Method always gets a new slot in the vtable
        const NEW_SLOT = 0x0100;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
        /// Method is special (accessor, operator)
        const SPECIAL_NAME = 0x0800;
        /// CLI provides 'special' behavior, depending upon the name of the method
        const RTSPECIAL_NAME = 0x1000;
    }
}

impl MethodModifiers {
    /// Extract method modifiers from raw method attributes
    #[must_use]
    pub fn from_method_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & !MEMBER_ACCESS_MASK)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Field attributes (§II.23.1.5, access bits excluded)
    pub struct FieldAttributes: u32 {
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Field can only be initialized, not written to after init
        const INIT_ONLY = 0x0020;
        /// Value is compile time constant
        const LITERAL = 0x0040;
        /// Field is special
        const SPECIAL_NAME = 0x0200;
        /// CLI provides 'special' behavior, depending upon the name of the field
        const RTSPECIAL_NAME = 0x0400;
        /// Field has a default value
        const HAS_DEFAULT = 0x8000;
    }
}

impl FieldAttributes {
    /// Extract field attributes from raw field flags
    #[must_use]
    pub fn from_field_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & !MEMBER_ACCESS_MASK)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Parameter attributes (§II.23.1.13)
    pub struct ParamAttributes: u32 {
        /// Param is `In`
        const IN = 0x0001;
        /// Param is `Out`
        const OUT = 0x0002;
        /// Param is optional
        const OPTIONAL = 0x0010;
        /// Param has default value
        const HAS_DEFAULT = 0x1000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Generic parameter attributes (§II.23.1.7)
    pub struct GenericParamAttributes: u32 {
        /// The generic parameter is covariant
        const COVARIANT = 0x0001;
        /// The generic parameter is contravariant
        const CONTRAVARIANT = 0x0002;
        /// The generic parameter has a reference type constraint
        const REFERENCE_TYPE_CONSTRAINT = 0x0004;
        /// The generic parameter has a value type constraint
        const NOT_NULLABLE_VALUE_TYPE_CONSTRAINT = 0x0008;
        /// The generic parameter has a constructor constraint
        const DEFAULT_CONSTRUCTOR_CONSTRAINT = 0x0010;
    }
}

/// How an argument is handed to a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum PassingMode {
    /// Plain by-value parameter
    ByValue,
    /// Read-only reference (`in`)
    In,
    /// Write-only reference (`out`)
    Out,
    /// Read-write reference (`ref`)
    Ref,
}

impl PassingMode {
    /// Derive the passing mode from parameter attributes and the signature's by-ref marker
    ///
    /// A by-ref parameter flagged `[In]` only is `in`, flagged `[Out]` only is `out`, anything
    /// else by-ref is `ref`. Attributes on by-value parameters are marshalling hints and do not
    /// change the mode.
    #[must_use]
    pub fn from_param(flags: ParamAttributes, by_ref: bool) -> Self {
        if !by_ref {
            return PassingMode::ByValue;
        }

        let is_in = flags.contains(ParamAttributes::IN);
        let is_out = flags.contains(ParamAttributes::OUT);
        match (is_in, is_out) {
            (true, false) => PassingMode::In,
            (false, true) => PassingMode::Out,
            _ => PassingMode::Ref,
        }
    }

    /// The C# modifier keyword, if any
    #[must_use]
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            PassingMode::ByValue => None,
            PassingMode::In => Some("in"),
            PassingMode::Out => Some("out"),
            PassingMode::Ref => Some("ref"),
        }
    }

    /// Is the argument passed by reference
    #[must_use]
    pub fn is_by_ref(&self) -> bool {
        *self != PassingMode::ByValue
    }

    /// Must the value be copied back after a dynamic invocation
    #[must_use]
    pub fn writes_back(&self) -> bool {
        matches!(self, PassingMode::Out | PassingMode::Ref)
    }
}

/// A method parameter
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    /// The parameter name (may be empty in metadata)
    pub name: String,
    /// The parameter type, without the by-ref marker
    pub param_type: TypeRc,
    /// How the argument is passed
    pub mode: PassingMode,
    /// `HAS_DEFAULT` -> the default value of this parameter
    pub default: Option<Literal>,
}

impl ParameterDescriptor {
    /// Create a by-value parameter
    pub fn new(name: &str, param_type: &TypeRc) -> Self {
        ParameterDescriptor {
            name: name.to_string(),
            param_type: param_type.clone(),
            mode: PassingMode::ByValue,
            default: None,
        }
    }

    /// Create a parameter from raw metadata: attributes plus the signature type
    ///
    /// ## Arguments
    /// * `name`      - The parameter name
    /// * `flags`     - Raw `ParamAttributes` bits
    /// * `signature` - The signature type; a by-ref type yields a by-ref passing mode
    /// * `default`   - The constant attached to the parameter, if any
    pub fn from_metadata(
        name: &str,
        flags: u32,
        signature: &TypeRc,
        default: Option<Literal>,
    ) -> Self {
        let attributes = ParamAttributes::from_bits_truncate(flags);
        let mode = PassingMode::from_param(attributes, signature.is_by_ref);
        let param_type = if signature.is_by_ref {
            let mut element = (**signature).clone();
            element.is_by_ref = false;
            Arc::new(element)
        } else {
            signature.clone()
        };

        ParameterDescriptor {
            name: name.to_string(),
            param_type,
            mode,
            default: default.filter(|_| attributes.contains(ParamAttributes::HAS_DEFAULT)),
        }
    }

    /// Set the passing mode
    #[must_use]
    pub fn with_mode(mut self, mode: PassingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the default value
    #[must_use]
    pub fn with_default(mut self, default: Literal) -> Self {
        self.default = Some(default);
        self
    }
}

/// A generic parameter of a method
#[derive(Debug, Clone)]
pub struct GenericParameter {
    /// The declared name
    pub name: String,
    /// Position in the method's generic parameter list
    pub index: u32,
    /// Special constraints (class, struct, new())
    pub flags: GenericParamAttributes,
    /// Types the argument must be assignable to
    pub constraints: Vec<TypeRc>,
}

impl GenericParameter {
    /// Create an unconstrained generic parameter
    pub fn new(name: &str, index: u32) -> Self {
        GenericParameter {
            name: name.to_string(),
            index,
            flags: GenericParamAttributes::empty(),
            constraints: Vec::new(),
        }
    }

    /// Add special constraint flags
    #[must_use]
    pub fn with_flags(mut self, flags: GenericParamAttributes) -> Self {
        self.flags |= flags;
        self
    }

    /// Add an assignable-to constraint
    #[must_use]
    pub fn with_constraint(mut self, constraint: &TypeRc) -> Self {
        self.constraints.push(constraint.clone());
        self
    }
}

/// A property accessor method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accessor {
    /// Token of the accessor method
    pub token: Token,
    /// Access level of the accessor method
    pub access: MemberAccess,
}

impl Accessor {
    /// Create a new accessor
    pub fn new(access: MemberAccess) -> Self {
        Accessor {
            token: Token::default(),
            access,
        }
    }
}

/// A property of a type
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct PropertyDescriptor {
    /// Token
    pub token: Token,
    /// Property name
    pub name: String,
    /// The type declaring this property
    pub declaring: TypeRc,
    /// The property type
    pub property_type: TypeRc,
    /// The getter, if readable
    pub getter: Option<Accessor>,
    /// The setter, if writable
    pub setter: Option<Accessor>,
    /// Property belongs to the type, not an instance
    pub is_static: bool,
    /// The getter returns a reference
    pub returns_by_ref: bool,
    /// The returned reference is read-only
    pub readonly_ref: bool,
    /// Index parameters (non-empty for indexers)
    pub index_parameters: Vec<ParameterDescriptor>,
    /// The property was synthesized by a compiler
    pub is_compiler_generated: bool,
}

impl PropertyDescriptor {
    /// Create a property without accessors
    pub fn new(name: &str, declaring: &TypeRc, property_type: &TypeRc) -> Self {
        PropertyDescriptor {
            token: Token::default(),
            name: name.to_string(),
            declaring: declaring.clone(),
            property_type: property_type.clone(),
            getter: None,
            setter: None,
            is_static: false,
            returns_by_ref: false,
            readonly_ref: false,
            index_parameters: Vec::new(),
            is_compiler_generated: false,
        }
    }

    /// Add a getter with the given access
    #[must_use]
    pub fn with_getter(mut self, access: MemberAccess) -> Self {
        self.getter = Some(Accessor::new(access));
        self
    }

    /// Add a setter with the given access
    #[must_use]
    pub fn with_setter(mut self, access: MemberAccess) -> Self {
        self.setter = Some(Accessor::new(access));
        self
    }

    /// Mark the property as static
    #[must_use]
    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Mark the getter as returning a reference (`ref` or `ref readonly`)
    #[must_use]
    pub fn by_ref(mut self, readonly: bool) -> Self {
        self.returns_by_ref = true;
        self.readonly_ref = readonly;
        self
    }

    /// The most visible accessor's access level
    #[must_use]
    pub fn access(&self) -> MemberAccess {
        self.getter
            .iter()
            .chain(self.setter.iter())
            .map(|accessor| accessor.access)
            .max()
            .unwrap_or(MemberAccess::CompilerControlled)
    }
}

/// A field of a type
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Token
    pub token: Token,
    /// Field name
    pub name: String,
    /// The type declaring this field
    pub declaring: TypeRc,
    /// The field type
    pub field_type: TypeRc,
    /// Access level
    pub access: MemberAccess,
    /// Field attributes
    pub flags: FieldAttributes,
    /// The field is a `ref` field
    pub is_by_ref: bool,
    /// The field was synthesized by a compiler
    pub is_compiler_generated: bool,
}

impl FieldDescriptor {
    /// Create an instance field
    pub fn new(name: &str, declaring: &TypeRc, field_type: &TypeRc, access: MemberAccess) -> Self {
        FieldDescriptor {
            token: Token::default(),
            name: name.to_string(),
            declaring: declaring.clone(),
            field_type: field_type.clone(),
            access,
            flags: FieldAttributes::empty(),
            is_by_ref: false,
            is_compiler_generated: false,
        }
    }

    /// Add field attributes
    #[must_use]
    pub fn with_flags(mut self, flags: FieldAttributes) -> Self {
        self.flags |= flags;
        self
    }

    /// Is the field static (constants are implicitly static)
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags
            .intersects(FieldAttributes::STATIC | FieldAttributes::LITERAL)
    }

    /// Is the field a compile-time constant
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.flags.contains(FieldAttributes::LITERAL)
    }

    /// Is the field write-once (`readonly`)
    #[must_use]
    pub fn is_init_only(&self) -> bool {
        self.flags.contains(FieldAttributes::INIT_ONLY)
    }
}

/// A method of a type
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    /// Token
    pub token: Token,
    /// Method name
    pub name: String,
    /// The type declaring this method
    pub declaring: TypeRc,
    /// Access level
    pub access: MemberAccess,
    /// Method modifiers
    pub modifiers: MethodModifiers,
    /// Parameters in signature order
    pub params: Vec<ParameterDescriptor>,
    /// The return type; a by-ref type marks a `ref` return
    pub return_type: TypeRc,
    /// The returned reference is read-only
    pub readonly_ref: bool,
    /// Generic parameters of the method
    pub generic_params: Vec<GenericParameter>,
    /// The method explicitly implements an interface member
    pub is_explicit_impl: bool,
    /// The method was synthesized by a compiler
    pub is_compiler_generated: bool,
}

impl MethodDescriptor {
    /// Create an instance method without parameters
    pub fn new(name: &str, declaring: &TypeRc, return_type: &TypeRc, access: MemberAccess) -> Self {
        MethodDescriptor {
            token: Token::default(),
            name: name.to_string(),
            declaring: declaring.clone(),
            access,
            modifiers: MethodModifiers::HIDE_BY_SIG,
            params: Vec::new(),
            return_type: return_type.clone(),
            readonly_ref: false,
            generic_params: Vec::new(),
            is_explicit_impl: false,
            is_compiler_generated: false,
        }
    }

    /// Append a parameter
    #[must_use]
    pub fn with_param(mut self, param: ParameterDescriptor) -> Self {
        self.params.push(param);
        self
    }

    /// Append a generic parameter
    #[must_use]
    pub fn with_generic_param(mut self, param: GenericParameter) -> Self {
        self.generic_params.push(param);
        self
    }

    /// Add method modifiers
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: MethodModifiers) -> Self {
        self.modifiers |= modifiers;
        self
    }

    /// Is the method static
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(MethodModifiers::STATIC)
    }

    /// Is the method an accessor, operator or constructor
    #[must_use]
    pub fn is_special_name(&self) -> bool {
        self.modifiers
            .intersects(MethodModifiers::SPECIAL_NAME | MethodModifiers::RTSPECIAL_NAME)
    }

    /// Does the method return a reference
    #[must_use]
    pub fn returns_by_ref(&self) -> bool {
        self.return_type.is_by_ref
    }

    /// Is the method generic
    #[must_use]
    pub fn is_generic(&self) -> bool {
        !self.generic_params.is_empty()
    }

    /// Do both methods have the same signature: name, parameter types in order, generic arity
    ///
    /// Return types and passing modes beyond the by-ref marker do not take part, mirroring
    /// how the runtime decides that one method hides another.
    #[must_use]
    pub fn same_signature(&self, other: &MethodDescriptor) -> bool {
        self.name == other.name
            && self.generic_params.len() == other.generic_params.len()
            && self.params.len() == other.params.len()
            && self.params.iter().zip(&other.params).all(|(left, right)| {
                left.mode.is_by_ref() == right.mode.is_by_ref()
                    && left.param_type.same_type(&right.param_type)
            })
    }
}

/// A member of a type, as reported by a metadata query
#[derive(Debug, Clone)]
pub enum MemberDescriptor {
    /// A property
    Property(PropertyRc),
    /// A field
    Field(FieldRc),
    /// A method (including accessors, operators and constructors)
    Method(MethodRc),
}

impl MemberDescriptor {
    /// The member's token
    #[must_use]
    pub fn token(&self) -> Token {
        match self {
            MemberDescriptor::Property(property) => property.token,
            MemberDescriptor::Field(field) => field.token,
            MemberDescriptor::Method(method) => method.token,
        }
    }

    /// The member's name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            MemberDescriptor::Property(property) => &property.name,
            MemberDescriptor::Field(field) => &field.name,
            MemberDescriptor::Method(method) => &method.name,
        }
    }

    /// The type declaring the member
    #[must_use]
    pub fn declaring(&self) -> &TypeRc {
        match self {
            MemberDescriptor::Property(property) => &property.declaring,
            MemberDescriptor::Field(field) => &field.declaring,
            MemberDescriptor::Method(method) => &method.declaring,
        }
    }

    /// The member's access level (most visible accessor for properties)
    #[must_use]
    pub fn access(&self) -> MemberAccess {
        match self {
            MemberDescriptor::Property(property) => property.access(),
            MemberDescriptor::Field(field) => field.access,
            MemberDescriptor::Method(method) => method.access,
        }
    }

    /// Does the member belong to the type rather than an instance
    #[must_use]
    pub fn is_static(&self) -> bool {
        match self {
            MemberDescriptor::Property(property) => property.is_static,
            MemberDescriptor::Field(field) => field.is_static(),
            MemberDescriptor::Method(method) => method.is_static(),
        }
    }

    /// Was the member synthesized by a compiler
    ///
    /// Compilers mark their members with an attribute and, for C#, with an unspeakable
    /// `<...>` name; either is enough.
    #[must_use]
    pub fn is_compiler_generated(&self) -> bool {
        let flagged = match self {
            MemberDescriptor::Property(property) => property.is_compiler_generated,
            MemberDescriptor::Field(field) => field.is_compiler_generated,
            MemberDescriptor::Method(method) => method.is_compiler_generated,
        };
        flagged || self.name().starts_with('<')
    }
}
