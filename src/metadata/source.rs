//! Where type and member descriptors come from.
//!
//! The generator never reads assemblies itself. It consumes a [`MetadataSource`], which answers
//! four questions: which types exist, which members a type has, how a type maps interface
//! methods onto its own methods, and whether one type is assignable to another.
//!
//! [`MemoryMetadata`] is a concurrent in-memory implementation of that trait. Consumers that
//! already hold decoded metadata (a metadata reader, a test, a benchmark) register their
//! descriptors with it and hand it to the generator.
//!
//! # Thread Safety
//!
//! [`MemoryMetadata`] follows the usual registry layout: a lock-free `SkipMap` keyed by token
//! for the types, `DashMap` indices for the relations between them, append-only `boxcar`
//! vectors for member lists and atomic counters for token allocation. Registration and
//! queries may run concurrently from any number of threads.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use dotfacade::metadata::{
//!     members::{FieldDescriptor, MemberAccess},
//!     source::{BindingMask, MemoryMetadata, MetadataSource},
//!     types::{TypeFlavor, TypeRef},
//! };
//!
//! let metadata = MemoryMetadata::new("Sample");
//! let foo = metadata.define(TypeRef::class("Ns", "Foo"))?;
//! let int = Arc::new(TypeRef::primitive(TypeFlavor::I4));
//! metadata.add_field(FieldDescriptor::new("count", &foo, &int, MemberAccess::Private))?;
//!
//! let members = metadata.list_members(&foo, BindingMask::all());
//! assert_eq!(members.len(), 1);
//! assert!(members[0].token().value() != 0);
//! # Ok::<(), dotfacade::Error>(())
//! ```

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

use bitflags::bitflags;
use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;

use crate::{
    metadata::{
        members::{
            FieldDescriptor, FieldRc, MemberAccess, MemberDescriptor, MethodDescriptor,
            MethodRc, PropertyDescriptor, PropertyRc,
        },
        token::{TableKind, Token},
        types::{TypeFlavor, TypeRc, TypeRef},
    },
    Error, Result,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Which members a member query reports
    pub struct BindingMask: u32 {
        /// Members whose access level is public
        const PUBLIC = 0x0001;
        /// Members with any other access level
        const NON_PUBLIC = 0x0002;
        /// Members belonging to an instance
        const INSTANCE = 0x0004;
        /// Members belonging to the type
        const STATIC = 0x0008;
        /// Also report members of base types (base-private members are never reported)
        const INHERITED = 0x0010;
    }
}

impl BindingMask {
    /// Does a member pass the access and staticness filters
    #[must_use]
    pub fn admits(&self, member: &MemberDescriptor) -> bool {
        let access = if member.access().is_public() {
            BindingMask::PUBLIC
        } else {
            BindingMask::NON_PUBLIC
        };
        let placement = if member.is_static() {
            BindingMask::STATIC
        } else {
            BindingMask::INSTANCE
        };

        self.contains(access | placement)
    }
}

/// One interface method slot and the method that implements it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceMapping {
    /// The interface method
    pub interface_method: Token,
    /// The implementing method on the mapped type
    pub target_method: Token,
    /// Is the implementing method public
    pub target_is_public: bool,
}

/// How a type implements its interfaces, keyed by method token
#[derive(Debug, Clone, Default)]
pub struct InterfaceMap {
    /// All slot mappings of all implemented interfaces
    pub mappings: Vec<InterfaceMapping>,
}

impl InterfaceMap {
    /// Is `method` a non-public implementation of some interface slot
    ///
    /// This is what distinguishes an explicit interface implementation from an ordinary
    /// private method: only the former appears as a target in the map.
    #[must_use]
    pub fn is_hidden_target(&self, method: Token) -> bool {
        !method.is_null()
            && self
                .mappings
                .iter()
                .any(|mapping| mapping.target_method == method && !mapping.target_is_public)
    }

    /// Is the map empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// The metadata queries the generator depends on
///
/// Implementations must be deterministic: identical metadata must produce identical answers
/// in identical order, otherwise generated output is not stable across runs.
pub trait MetadataSource: Send + Sync {
    /// All candidate types, in discovery order
    fn types(&self) -> Vec<TypeRc>;

    /// The members of `ty` admitted by `mask`, in discovery order
    ///
    /// Own members come first; with [`BindingMask::INHERITED`] the base chain follows, most
    /// derived base first. Every member reports its declaring type.
    fn list_members(&self, ty: &TypeRef, mask: BindingMask) -> Vec<MemberDescriptor>;

    /// The interface mapping of `ty`
    fn interface_map(&self, ty: &TypeRef) -> InterfaceMap;

    /// Can a value of `candidate` be assigned to a location of type `target`
    fn is_assignable_to(&self, candidate: &TypeRef, target: &TypeRef) -> bool;
}

/// Concurrent in-memory metadata registry
pub struct MemoryMetadata {
    /// The compiled unit all defined types default to
    assembly: String,
    /// Registered types, keyed by token
    types: SkipMap<Token, TypeRc>,
    /// Members per declaring type, in registration order
    members: DashMap<Token, Arc<boxcar::Vec<MemberDescriptor>>>,
    /// Direct base type per type
    bases: DashMap<Token, TypeRc>,
    /// Directly implemented interfaces per type
    interfaces: DashMap<Token, Vec<TypeRc>>,
    /// Interface slot mappings per type
    interface_maps: DashMap<Token, Vec<InterfaceMapping>>,
    next_type: AtomicU32,
    next_field: AtomicU32,
    next_method: AtomicU32,
    next_property: AtomicU32,
}

impl MemoryMetadata {
    /// Create an empty registry
    ///
    /// ## Arguments
    /// * `assembly` - Name of the compiled unit that types without an assembly belong to
    #[must_use]
    pub fn new(assembly: &str) -> Self {
        MemoryMetadata {
            assembly: assembly.to_string(),
            types: SkipMap::new(),
            members: DashMap::new(),
            bases: DashMap::new(),
            interfaces: DashMap::new(),
            interface_maps: DashMap::new(),
            next_type: AtomicU32::new(1),
            next_field: AtomicU32::new(1),
            next_method: AtomicU32::new(1),
            next_property: AtomicU32::new(1),
        }
    }

    /// The compiled unit this registry describes
    #[must_use]
    pub fn assembly(&self) -> &str {
        &self.assembly
    }

    fn next_token(counter: &AtomicU32, table: u8) -> Token {
        Token::from_parts(table, counter.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a type, allocating a `TypeDef` token if it has none
    ///
    /// Types without an assembly are assigned to this registry's compiled unit.
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] if a type with the same token is already registered.
    pub fn define(&self, mut new_type: TypeRef) -> Result<TypeRc> {
        if new_type.token.is_null() {
            new_type.token = Self::next_token(&self.next_type, TableKind::TYPE_DEF);
        }
        if new_type.assembly.is_empty() {
            new_type.assembly.clone_from(&self.assembly);
        }
        if self.types.contains_key(&new_type.token) {
            return Err(malformed_error!(
                "Type token {} registered twice ({})",
                new_type.token,
                new_type.fullname()
            ));
        }

        let new_type = Arc::new(new_type);
        self.types.insert(new_type.token, new_type.clone());
        Ok(new_type)
    }

    /// Look up a registered type
    #[must_use]
    pub fn get(&self, token: &Token) -> Option<TypeRc> {
        self.types.get(token).map(|entry| entry.value().clone())
    }

    /// Number of registered types
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if no types are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn require(&self, token: Token) -> Result<()> {
        if self.types.contains_key(&token) {
            Ok(())
        } else {
            Err(Error::TypeNotFound(token))
        }
    }

    /// Register a member under its declaring type, allocating tokens where missing
    ///
    /// Property accessors without a token get a `MethodDef` token.
    ///
    /// # Errors
    /// Returns [`Error::TypeNotFound`] if the declaring type is not registered.
    pub fn add_member(&self, member: MemberDescriptor) -> Result<MemberDescriptor> {
        let declaring = member.declaring().token;
        self.require(declaring)?;

        let member = match member {
            MemberDescriptor::Property(property) => {
                let mut property = Arc::unwrap_or_clone(property);
                if property.token.is_null() {
                    property.token = Self::next_token(&self.next_property, TableKind::PROPERTY);
                }
                for accessor in [&mut property.getter, &mut property.setter]
                    .into_iter()
                    .flatten()
                {
                    if accessor.token.is_null() {
                        accessor.token = Self::next_token(&self.next_method, TableKind::METHOD_DEF);
                    }
                }
                MemberDescriptor::Property(Arc::new(property))
            }
            MemberDescriptor::Field(field) => {
                let mut field = Arc::unwrap_or_clone(field);
                if field.token.is_null() {
                    field.token = Self::next_token(&self.next_field, TableKind::FIELD);
                }
                MemberDescriptor::Field(Arc::new(field))
            }
            MemberDescriptor::Method(method) => {
                let mut method = Arc::unwrap_or_clone(method);
                if method.token.is_null() {
                    method.token = Self::next_token(&self.next_method, TableKind::METHOD_DEF);
                }
                MemberDescriptor::Method(Arc::new(method))
            }
        };

        self.members
            .entry(declaring)
            .or_insert_with(|| Arc::new(boxcar::Vec::new()))
            .push(member.clone());
        Ok(member)
    }

    /// Register a property, see [`MemoryMetadata::add_member`]
    ///
    /// # Errors
    /// Returns [`Error::TypeNotFound`] if the declaring type is not registered.
    pub fn add_property(&self, property: PropertyDescriptor) -> Result<PropertyRc> {
        match self.add_member(MemberDescriptor::Property(Arc::new(property)))? {
            MemberDescriptor::Property(property) => Ok(property),
            _ => Err(malformed_error!("Property registration changed the member kind")),
        }
    }

    /// Register a field, see [`MemoryMetadata::add_member`]
    ///
    /// # Errors
    /// Returns [`Error::TypeNotFound`] if the declaring type is not registered.
    pub fn add_field(&self, field: FieldDescriptor) -> Result<FieldRc> {
        match self.add_member(MemberDescriptor::Field(Arc::new(field)))? {
            MemberDescriptor::Field(field) => Ok(field),
            _ => Err(malformed_error!("Field registration changed the member kind")),
        }
    }

    /// Register a method, see [`MemoryMetadata::add_member`]
    ///
    /// # Errors
    /// Returns [`Error::TypeNotFound`] if the declaring type is not registered.
    pub fn add_method(&self, method: MethodDescriptor) -> Result<MethodRc> {
        match self.add_member(MemberDescriptor::Method(Arc::new(method)))? {
            MemberDescriptor::Method(method) => Ok(method),
            _ => Err(malformed_error!("Method registration changed the member kind")),
        }
    }

    /// Set the direct base type of `ty`
    ///
    /// # Errors
    /// Returns [`Error::TypeNotFound`] if `ty` is not registered, or [`Error::Malformed`] if
    /// the base is `ty` itself.
    pub fn set_base(&self, ty: &TypeRef, base: &TypeRc) -> Result<()> {
        self.require(ty.token)?;
        if base.token == ty.token {
            return Err(malformed_error!("Type {} can not derive from itself", ty.fullname()));
        }

        self.bases.insert(ty.token, base.clone());
        Ok(())
    }

    /// Record that `ty` directly implements `interface`
    ///
    /// # Errors
    /// Returns [`Error::TypeNotFound`] if `ty` is not registered.
    pub fn add_interface(&self, ty: &TypeRef, interface: &TypeRc) -> Result<()> {
        self.require(ty.token)?;
        self.interfaces
            .entry(ty.token)
            .or_default()
            .push(interface.clone());
        Ok(())
    }

    /// Record that `target` implements the interface method `interface_method` on `ty`
    ///
    /// # Errors
    /// Returns [`Error::TypeNotFound`] if `ty` is not registered.
    pub fn map_interface(
        &self,
        ty: &TypeRef,
        interface_method: Token,
        target: &MethodDescriptor,
    ) -> Result<()> {
        self.require(ty.token)?;
        self.interface_maps
            .entry(ty.token)
            .or_default()
            .push(InterfaceMapping {
                interface_method,
                target_method: target.token,
                target_is_public: target.access.is_public(),
            });
        Ok(())
    }

    /// The direct base type of `ty`, if one was set
    #[must_use]
    pub fn base_of(&self, ty: &TypeRef) -> Option<TypeRc> {
        self.bases.get(&ty.token).map(|entry| entry.value().clone())
    }

    fn own_members(&self, token: Token) -> Vec<MemberDescriptor> {
        match self.members.get(&token) {
            Some(list) => list.iter().map(|(_, member)| member.clone()).collect(),
            None => Vec::new(),
        }
    }

    fn assignable(&self, candidate: &TypeRef, target: &TypeRef, seen: &mut HashSet<Token>) -> bool {
        if candidate.same_type(target)
            && (candidate.token == target.token || candidate.token.is_null() || target.token.is_null())
        {
            return true;
        }
        if !candidate.token.is_null() && !seen.insert(candidate.token) {
            return false;
        }

        if let Some(base) = self.base_of(candidate) {
            if self.assignable(&base, target, seen) {
                return true;
            }
        }

        let interfaces = self
            .interfaces
            .get(&candidate.token)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        interfaces
            .iter()
            .any(|interface| self.assignable(interface, target, seen))
    }
}

impl MetadataSource for MemoryMetadata {
    fn types(&self) -> Vec<TypeRc> {
        self.types
            .iter()
            .filter(|entry| entry.key().is_table(TableKind::TYPE_DEF))
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn list_members(&self, ty: &TypeRef, mask: BindingMask) -> Vec<MemberDescriptor> {
        let mut result: Vec<MemberDescriptor> = self
            .own_members(ty.token)
            .into_iter()
            .filter(|member| mask.admits(member))
            .collect();

        if mask.contains(BindingMask::INHERITED) {
            let mut seen = HashSet::from([ty.token]);
            let mut current = self.base_of(ty);
            while let Some(base) = current {
                if !seen.insert(base.token) {
                    break;
                }

                result.extend(self.own_members(base.token).into_iter().filter(|member| {
                    member.access() > MemberAccess::Private && mask.admits(member)
                }));
                current = self.base_of(&base);
            }
        }

        result
    }

    fn interface_map(&self, ty: &TypeRef) -> InterfaceMap {
        InterfaceMap {
            mappings: self
                .interface_maps
                .get(&ty.token)
                .map(|entry| entry.value().clone())
                .unwrap_or_default(),
        }
    }

    fn is_assignable_to(&self, candidate: &TypeRef, target: &TypeRef) -> bool {
        if target.flavor == TypeFlavor::Object && !candidate.is_by_ref {
            return true;
        }

        self.assignable(candidate, target, &mut HashSet::new())
    }
}
