//! Selecting the members a facade exposes.
//!
//! A metadata query reports far more than a facade should carry: accessor methods that
//! already surface through their property, compiler-synthesized helpers, explicit interface
//! implementations, members inherited from other assemblies and members hidden by a more
//! derived redeclaration. [`MemberClassifier`] removes all of these and splits what is left by
//! member kind, keeping discovery order.

use crate::metadata::{
    members::{FieldRc, MemberDescriptor, MethodRc, PropertyRc},
    source::{InterfaceMap, MetadataSource},
    types::{TypeRc, TypeRef},
};

/// The generation-eligible members of one type, in discovery order
#[derive(Debug, Clone, Default)]
pub struct ClassifiedMembers {
    /// Eligible properties
    pub properties: Vec<PropertyRc>,
    /// Eligible fields
    pub fields: Vec<FieldRc>,
    /// Eligible methods
    pub methods: Vec<MethodRc>,
}

impl ClassifiedMembers {
    /// Returns true if no member is eligible
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.fields.is_empty() && self.methods.is_empty()
    }

    /// Total number of eligible members
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len() + self.fields.len() + self.methods.len()
    }

    /// Are all eligible members static (false when there are none)
    #[must_use]
    pub fn all_static(&self) -> bool {
        !self.is_empty()
            && self.properties.iter().all(|property| property.is_static)
            && self.fields.iter().all(|field| field.is_static())
            && self.methods.iter().all(|method| method.is_static())
    }
}

/// Filters raw member lists down to the members a facade exposes
pub struct MemberClassifier<'a> {
    source: &'a dyn MetadataSource,
    excluded: &'a [TypeRc],
}

impl<'a> MemberClassifier<'a> {
    /// Create a classifier
    ///
    /// ## Arguments
    /// * `source`   - Answers assignability questions
    /// * `excluded` - Members declared by these types, or types derived from them, are dropped
    pub fn new(source: &'a dyn MetadataSource, excluded: &'a [TypeRc]) -> Self {
        MemberClassifier { source, excluded }
    }

    /// Why a member is not eligible, or `None` if it is
    fn rejection(
        &self,
        ty: &TypeRef,
        member: &MemberDescriptor,
        interface_map: &InterfaceMap,
    ) -> Option<&'static str> {
        let declaring = member.declaring();

        if member.is_compiler_generated() || declaring.is_compiler_generated {
            return Some("compiler generated");
        }
        if declaring.assembly != ty.assembly {
            return Some("declared in another assembly");
        }
        if self
            .excluded
            .iter()
            .any(|excluded| self.source.is_assignable_to(declaring, excluded))
        {
            return Some("declared by an excluded type");
        }

        match member {
            MemberDescriptor::Property(property) => {
                if !property.index_parameters.is_empty() {
                    return Some("indexed property");
                }
                let explicit = property
                    .getter
                    .iter()
                    .chain(property.setter.iter())
                    .any(|accessor| interface_map.is_hidden_target(accessor.token));
                if explicit {
                    return Some("explicit interface implementation");
                }
            }
            MemberDescriptor::Method(method) => {
                if method.is_explicit_impl || interface_map.is_hidden_target(method.token) {
                    return Some("explicit interface implementation");
                }
                if method.is_special_name() {
                    return Some("special name");
                }
            }
            MemberDescriptor::Field(_) => {}
        }

        None
    }

    /// Is the member `name` of `declaring` hidden by a more derived declaration
    ///
    /// Hiding goes by name alone, so a derived property hides a base field or method of the
    /// same name.
    fn is_hidden(
        &self,
        ty: &TypeRef,
        name: &str,
        declaring: &TypeRef,
        declarations: &[(&str, &TypeRc)],
    ) -> bool {
        let hidden = declarations.iter().any(|(other_name, other_declaring)| {
            *other_name == name
                && other_declaring.token != declaring.token
                && self.source.is_assignable_to(other_declaring, declaring)
        });
        if hidden {
            tracing::debug!(
                "{}: skipping {}.{name} (hidden by a derived member)",
                ty.fullname(),
                declaring.fullname()
            );
        }
        hidden
    }

    /// Split `raw` into the eligible properties, fields and methods of `ty`
    ///
    /// ## Arguments
    /// * `ty`            - The type the facade is generated for
    /// * `raw`           - Its members as reported by the metadata source
    /// * `interface_map` - Its interface mapping, used to spot explicit implementations
    #[must_use]
    pub fn classify(
        &self,
        ty: &TypeRef,
        raw: &[MemberDescriptor],
        interface_map: &InterfaceMap,
    ) -> ClassifiedMembers {
        let mut classified = ClassifiedMembers::default();

        for member in raw {
            if let Some(reason) = self.rejection(ty, member, interface_map) {
                tracing::debug!(
                    "{}: skipping {} ({reason})",
                    ty.fullname(),
                    member.name()
                );
                continue;
            }

            match member {
                MemberDescriptor::Property(property) => classified.properties.push(property.clone()),
                MemberDescriptor::Field(field) => classified.fields.push(field.clone()),
                MemberDescriptor::Method(method) => classified.methods.push(method.clone()),
            }
        }

        // Methods only yield to properties and fields here, overloads are resolved by signature
        let data_members: Vec<(&str, &TypeRc)> = classified
            .properties
            .iter()
            .map(|property| (property.name.as_str(), &property.declaring))
            .chain(
                classified
                    .fields
                    .iter()
                    .map(|field| (field.name.as_str(), &field.declaring)),
            )
            .collect();
        let all_members: Vec<(&str, &TypeRc)> = data_members
            .iter()
            .copied()
            .chain(
                classified
                    .methods
                    .iter()
                    .map(|method| (method.name.as_str(), &method.declaring)),
            )
            .collect();

        ClassifiedMembers {
            properties: classified
                .properties
                .iter()
                .filter(|property| {
                    !self.is_hidden(ty, &property.name, &property.declaring, &all_members)
                })
                .cloned()
                .collect(),
            fields: classified
                .fields
                .iter()
                .filter(|field| !self.is_hidden(ty, &field.name, &field.declaring, &all_members))
                .cloned()
                .collect(),
            methods: classified
                .methods
                .iter()
                .filter(|method| {
                    !self.is_hidden(ty, &method.name, &method.declaring, &data_members)
                })
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::{
            members::{FieldAttributes, MemberAccess, MethodDescriptor, MethodModifiers},
            source::{BindingMask, MemoryMetadata},
            types::TypeRef,
        },
        test::{base_and_derived, field, int, method, property, string, void, TEST_ASSEMBLY},
    };

    fn classify_all(metadata: &MemoryMetadata, ty: &TypeRc, excluded: &[TypeRc]) -> ClassifiedMembers {
        let raw = metadata.list_members(ty, BindingMask::all());
        let map = metadata.interface_map(ty);
        MemberClassifier::new(metadata, excluded).classify(ty, &raw, &map)
    }

    fn names(classified: &ClassifiedMembers) -> Vec<String> {
        classified
            .properties
            .iter()
            .map(|p| p.name.clone())
            .chain(classified.fields.iter().map(|f| f.name.clone()))
            .chain(classified.methods.iter().map(|m| m.name.clone()))
            .collect()
    }

    #[test]
    fn test_drops_compiler_generated_and_special_names() {
        let metadata = MemoryMetadata::new(TEST_ASSEMBLY);
        let foo = metadata.define(TypeRef::class("Ns", "Foo")).unwrap();
        metadata
            .add_field(field(&foo, "<Count>k__BackingField", &int(), MemberAccess::Private))
            .unwrap();
        metadata
            .add_property(property(&foo, "Count", &int(), MemberAccess::Public))
            .unwrap();
        metadata
            .add_method(
                method(&foo, "get_Count", &[]).with_modifiers(MethodModifiers::SPECIAL_NAME),
            )
            .unwrap();
        metadata
            .add_method(MethodDescriptor {
                is_compiler_generated: true,
                ..method(&foo, "Helper", &[])
            })
            .unwrap();
        metadata.add_method(method(&foo, "Run", &[])).unwrap();

        let classified = classify_all(&metadata, &foo, &[]);
        assert_eq!(names(&classified), vec!["Count", "Run"]);
    }

    #[test]
    fn test_drops_foreign_assembly_members() {
        let metadata = MemoryMetadata::new(TEST_ASSEMBLY);
        let base = metadata
            .define(TypeRef::class("Other", "Base").with_assembly("OtherAssembly"))
            .unwrap();
        let foo = metadata.define(TypeRef::class("Ns", "Foo")).unwrap();
        metadata.set_base(&foo, &base).unwrap();
        metadata.add_method(method(&base, "Inherited", &[])).unwrap();
        metadata.add_method(method(&foo, "Own", &[])).unwrap();

        let classified = classify_all(&metadata, &foo, &[]);
        assert_eq!(names(&classified), vec!["Own"]);
    }

    #[test]
    fn test_drops_excluded_hierarchy() {
        let (metadata, base, derived) = base_and_derived();
        metadata.add_method(method(&base, "FromBase", &[])).unwrap();
        metadata.add_method(method(&derived, "FromDerived", &[])).unwrap();

        let classified = classify_all(&metadata, &derived, &[base.clone()]);
        // Derived is assignable to Base, so its own members go as well
        assert!(classified.is_empty());

        let unrelated = metadata.define(TypeRef::class("Ns", "Unrelated")).unwrap();
        let classified = classify_all(&metadata, &derived, &[unrelated]);
        assert_eq!(classified.len(), 2);
    }

    #[test]
    fn test_drops_explicit_interface_implementations() {
        let metadata = MemoryMetadata::new(TEST_ASSEMBLY);
        let iface = metadata.define(TypeRef::interface("Ns", "IRun")).unwrap();
        let foo = metadata.define(TypeRef::class("Ns", "Foo")).unwrap();
        let slot = metadata.add_method(method(&iface, "Run", &[])).unwrap();
        let explicit = metadata
            .add_method(MethodDescriptor {
                access: MemberAccess::Private,
                ..method(&foo, "Ns.IRun.Run", &[])
            })
            .unwrap();
        metadata.map_interface(&foo, slot.token, &explicit).unwrap();
        metadata
            .add_method(MethodDescriptor {
                is_explicit_impl: true,
                ..method(&foo, "Ns.IOther.Go", &[])
            })
            .unwrap();

        let prop_slot = metadata.add_method(method(&iface, "get_Name", &[])).unwrap();
        let name = metadata
            .add_property(property(&foo, "Ns.IRun.Name", &string(), MemberAccess::Private))
            .unwrap();
        let getter = MethodDescriptor {
            token: name.getter.unwrap().token,
            access: MemberAccess::Private,
            ..method(&foo, "Ns.IRun.get_Name", &[])
        };
        metadata.map_interface(&foo, prop_slot.token, &getter).unwrap();

        metadata
            .add_method(MethodDescriptor {
                access: MemberAccess::Private,
                ..method(&foo, "Helper", &[])
            })
            .unwrap();

        let classified = classify_all(&metadata, &foo, &[]);
        assert_eq!(names(&classified), vec!["Helper"]);
    }

    #[test]
    fn test_drops_indexed_properties() {
        let metadata = MemoryMetadata::new(TEST_ASSEMBLY);
        let foo = metadata.define(TypeRef::class("Ns", "Foo")).unwrap();
        let mut indexer = property(&foo, "Item", &string(), MemberAccess::Public);
        indexer
            .index_parameters
            .push(crate::metadata::members::ParameterDescriptor::new("i", &int()));
        metadata.add_property(indexer).unwrap();

        assert!(classify_all(&metadata, &foo, &[]).is_empty());
    }

    #[test]
    fn test_hidden_members_keep_most_derived() {
        let (metadata, base, derived) = base_and_derived();
        metadata
            .add_field(field(&derived, "value", &string(), MemberAccess::Family))
            .unwrap();
        metadata
            .add_field(field(&base, "value", &int(), MemberAccess::Family))
            .unwrap();
        metadata
            .add_property(property(&base, "Name", &string(), MemberAccess::Public))
            .unwrap();
        metadata
            .add_property(property(&derived, "Name", &string(), MemberAccess::Public))
            .unwrap();

        let classified = classify_all(&metadata, &derived, &[]);
        assert_eq!(classified.fields.len(), 1);
        assert_eq!(classified.fields[0].declaring.token, derived.token);
        assert_eq!(classified.properties.len(), 1);
        assert_eq!(classified.properties[0].declaring.token, derived.token);
    }

    #[test]
    fn test_hiding_crosses_member_kinds() {
        let (metadata, base, derived) = base_and_derived();
        metadata
            .add_property(property(&derived, "Value", &int(), MemberAccess::Public))
            .unwrap();
        metadata
            .add_field(field(&base, "Value", &int(), MemberAccess::Family))
            .unwrap();
        metadata
            .add_field(field(&derived, "Run", &int(), MemberAccess::Private))
            .unwrap();
        metadata.add_method(method(&base, "Run", &[])).unwrap();
        metadata.add_method(method(&derived, "Reset", &[])).unwrap();
        metadata
            .add_property(property(&base, "Reset", &int(), MemberAccess::Public))
            .unwrap();

        let classified = classify_all(&metadata, &derived, &[]);
        assert_eq!(names(&classified), vec!["Value", "Run", "Reset"]);
        assert_eq!(classified.properties[0].declaring.token, derived.token);
        assert_eq!(classified.fields[0].declaring.token, derived.token);
        assert_eq!(classified.methods[0].declaring.token, derived.token);
    }

    #[test]
    fn test_base_method_overloads_survive_derived_method() {
        let (metadata, base, derived) = base_and_derived();
        let int = int();
        metadata.add_method(method(&derived, "M", &[])).unwrap();
        metadata.add_method(method(&base, "M", &[("x", &int)])).unwrap();

        // Same-name methods are left to overload resolution
        let classified = classify_all(&metadata, &derived, &[]);
        assert_eq!(classified.methods.len(), 2);
    }

    #[test]
    fn test_all_static() {
        let metadata = MemoryMetadata::new(TEST_ASSEMBLY);
        let foo = metadata.define(TypeRef::class("Ns", "Util")).unwrap();
        assert!(!classify_all(&metadata, &foo, &[]).all_static());

        metadata
            .add_field(
                field(&foo, "Max", &int(), MemberAccess::Public)
                    .with_flags(FieldAttributes::LITERAL),
            )
            .unwrap();
        metadata
            .add_method(
                MethodDescriptor::new("Run", &foo, &void(), MemberAccess::Public)
                    .with_modifiers(MethodModifiers::STATIC),
            )
            .unwrap();
        assert!(classify_all(&metadata, &foo, &[]).all_static());
    }
}
