//! Shared fixtures for unit tests.
//!
//! Factories for the descriptors most tests need, so that individual test modules only spell
//! out what is specific to them.

use std::sync::Arc;

use crate::metadata::{
    members::{
        FieldDescriptor, GenericParameter, MemberAccess, MemberDescriptor, MethodDescriptor,
        ParameterDescriptor, PropertyDescriptor,
    },
    source::MemoryMetadata,
    token::{TableKind, Token},
    types::{TypeFlavor, TypeRc, TypeRef},
};

pub const TEST_ASSEMBLY: &str = "Sample";

pub fn primitive(flavor: TypeFlavor) -> TypeRc {
    Arc::new(TypeRef::primitive(flavor))
}

pub fn int() -> TypeRc {
    primitive(TypeFlavor::I4)
}

pub fn string() -> TypeRc {
    primitive(TypeFlavor::String)
}

pub fn void() -> TypeRc {
    primitive(TypeFlavor::Void)
}

pub fn object() -> TypeRc {
    primitive(TypeFlavor::Object)
}

// Declared types get a TypeDef token from `rid`, so they compare and look up like registered ones
pub fn class(rid: u32, namespace: &str, name: &str) -> TypeRc {
    Arc::new(
        TypeRef::class(namespace, name)
            .with_assembly(TEST_ASSEMBLY)
            .with_token(Token::from_parts(TableKind::TYPE_DEF, rid)),
    )
}

pub fn hidden_class(rid: u32, namespace: &str, name: &str) -> TypeRc {
    Arc::new(
        TypeRef::class(namespace, name)
            .with_assembly(TEST_ASSEMBLY)
            .with_token(Token::from_parts(TableKind::TYPE_DEF, rid))
            .hidden(),
    )
}

pub fn value_type(rid: u32, namespace: &str, name: &str) -> TypeRc {
    Arc::new(
        TypeRef::value_type(namespace, name)
            .with_assembly(TEST_ASSEMBLY)
            .with_token(Token::from_parts(TableKind::TYPE_DEF, rid)),
    )
}

pub fn method_param(name: &str, index: u32) -> TypeRc {
    Arc::new(TypeRef::generic_param(name, index, true))
}

pub fn field(owner: &TypeRc, name: &str, ty: &TypeRc, access: MemberAccess) -> FieldDescriptor {
    FieldDescriptor::new(name, owner, ty, access)
}

pub fn property(owner: &TypeRc, name: &str, ty: &TypeRc, access: MemberAccess) -> PropertyDescriptor {
    PropertyDescriptor::new(name, owner, ty)
        .with_getter(access)
        .with_setter(access)
}

pub fn method(owner: &TypeRc, name: &str, params: &[(&str, &TypeRc)]) -> MethodDescriptor {
    params.iter().fold(
        MethodDescriptor::new(name, owner, &void(), MemberAccess::Public),
        |method, (param_name, param_type)| {
            method.with_param(ParameterDescriptor::new(param_name, param_type))
        },
    )
}

pub fn generic_method(owner: &TypeRc, name: &str, access: MemberAccess) -> MethodDescriptor {
    let t = method_param("T", 0);
    MethodDescriptor::new(name, owner, &t, access)
        .with_param(ParameterDescriptor::new("x", &t))
        .with_generic_param(GenericParameter::new("T", 0))
}

pub fn wrap_method(method: MethodDescriptor) -> MemberDescriptor {
    MemberDescriptor::Method(Arc::new(method))
}

/// A registry with `Ns.Base` and `Ns.Derived : Base`, both in the test assembly
pub fn base_and_derived() -> (MemoryMetadata, TypeRc, TypeRc) {
    let metadata = MemoryMetadata::new(TEST_ASSEMBLY);
    let base = metadata.define(TypeRef::class("Ns", "Base")).unwrap();
    let derived = metadata.define(TypeRef::class("Ns", "Derived")).unwrap();
    metadata.set_base(&derived, &base).unwrap();

    (metadata, base, derived)
}
