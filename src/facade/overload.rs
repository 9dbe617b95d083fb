//! Stable identity for methods that share a name.
//!
//! A facade stores one metadata lookup per method in its `__Meta` class. Overloads would
//! collide on the method name alone, so every member of an overload group gets an ordinal
//! that becomes part of its backing name (`Name_0`, `Name_1`, ...). Methods hidden by a more
//! derived redeclaration with the same signature are removed first, so a shadowed base
//! method never occupies an ordinal. An ordinal that would spell the name of another method
//! (`M_0` next to the overloads of `M`) is skipped.

use std::collections::{HashMap, HashSet};

use crate::metadata::{members::MethodRc, source::MetadataSource};

/// A surviving method and its position within its overload group
#[derive(Debug, Clone)]
pub struct OverloadEntry {
    /// The method
    pub method: MethodRc,
    /// Number within the overload group, `None` when the name is unique
    pub ordinal: Option<usize>,
}

impl OverloadEntry {
    /// The unique name of the method's backing members
    #[must_use]
    pub fn backing_name(&self) -> String {
        match self.ordinal {
            Some(ordinal) => format!("{}_{ordinal}", self.method.name),
            None => self.method.name.clone(),
        }
    }
}

/// Does a more derived method with the same signature hide `method`
///
/// The signature comparison includes the name, so `candidates` may hold every method.
fn is_shadowed(method: &MethodRc, candidates: &[MethodRc], source: &dyn MetadataSource) -> bool {
    candidates.iter().any(|other| {
        other.declaring.token != method.declaring.token
            && other.same_signature(method)
            && source.is_assignable_to(&other.declaring, &method.declaring)
    })
}

/// Remove shadowed methods and number the remaining overloads
///
/// Methods are grouped by name. Within a group, a method is dropped when another method has
/// the same signature and a different, more derived declaring type. Methods with the same
/// signature on identical or unrelated declaring types are both kept. Groups with two or more
/// survivors number them in discovery order, counting up from 0; lone survivors get no
/// ordinal. An ordinal is skipped when its backing name is already the backing name of another
/// method, so every backing name of the result is unique. The output keeps discovery order.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use dotfacade::facade::overload::disambiguate;
/// use dotfacade::metadata::{
///     members::{MemberAccess, MethodDescriptor, ParameterDescriptor},
///     source::MemoryMetadata,
///     types::{TypeFlavor, TypeRef},
/// };
///
/// let metadata = MemoryMetadata::new("Sample");
/// let foo = metadata.define(TypeRef::class("Ns", "Foo"))?;
/// let void = Arc::new(TypeRef::primitive(TypeFlavor::Void));
/// let int = Arc::new(TypeRef::primitive(TypeFlavor::I4));
///
/// let run = metadata.add_method(MethodDescriptor::new("Run", &foo, &void, MemberAccess::Public))?;
/// let run_int = metadata.add_method(
///     MethodDescriptor::new("Run", &foo, &void, MemberAccess::Public)
///         .with_param(ParameterDescriptor::new("count", &int)),
/// )?;
///
/// let entries = disambiguate(&[run, run_int], &metadata);
/// assert_eq!(entries[0].backing_name(), "Run_0");
/// assert_eq!(entries[1].backing_name(), "Run_1");
/// # Ok::<(), dotfacade::Error>(())
/// ```
#[must_use]
pub fn disambiguate(methods: &[MethodRc], source: &dyn MetadataSource) -> Vec<OverloadEntry> {
    let survivors: Vec<&MethodRc> = methods
        .iter()
        .filter(|method| {
            let shadowed = is_shadowed(method, methods, source);
            if shadowed {
                tracing::debug!(
                    "{}.{}: hidden by a derived method with the same signature",
                    method.declaring.fullname(),
                    method.name
                );
            }
            !shadowed
        })
        .collect();

    let mut entries: Vec<OverloadEntry> = survivors
        .iter()
        .map(|method| {
            let overloaded = survivors
                .iter()
                .filter(|other| other.name == method.name)
                .count()
                > 1;

            OverloadEntry {
                method: (*method).clone(),
                ordinal: overloaded.then_some(0),
            }
        })
        .collect();

    let mut taken: HashSet<String> = entries
        .iter()
        .filter(|entry| entry.ordinal.is_none())
        .map(OverloadEntry::backing_name)
        .collect();
    let mut next_ordinals: HashMap<String, usize> = HashMap::new();

    for entry in entries.iter_mut().filter(|entry| entry.ordinal.is_some()) {
        let next = next_ordinals.entry(entry.method.name.clone()).or_insert(0);
        while taken.contains(&format!("{}_{next}", entry.method.name)) {
            tracing::debug!(
                "{}: ordinal {next} skipped, {}_{next} names another method",
                entry.method.name,
                entry.method.name
            );
            *next += 1;
        }

        entry.ordinal = Some(*next);
        taken.insert(entry.backing_name());
        *next += 1;
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::{members::MemberAccess, source::MemoryMetadata, types::TypeRef},
        test::{base_and_derived, generic_method, int, method, string, TEST_ASSEMBLY},
    };

    fn summary(entries: &[OverloadEntry]) -> Vec<(String, Option<usize>)> {
        entries
            .iter()
            .map(|entry| (entry.method.name.clone(), entry.ordinal))
            .collect()
    }

    #[test]
    fn test_ordinals_follow_discovery_order() {
        let metadata = MemoryMetadata::new(TEST_ASSEMBLY);
        let foo = metadata.define(TypeRef::class("Ns", "Foo")).unwrap();
        let int = int();
        let string = string();

        let methods = vec![
            metadata.add_method(method(&foo, "M", &[])).unwrap(),
            metadata.add_method(method(&foo, "Other", &[])).unwrap(),
            metadata.add_method(method(&foo, "M", &[("a", &int)])).unwrap(),
            metadata.add_method(method(&foo, "M", &[("a", &string)])).unwrap(),
        ];

        let entries = disambiguate(&methods, &metadata);
        assert_eq!(
            summary(&entries),
            vec![
                ("M".to_string(), Some(0)),
                ("Other".to_string(), None),
                ("M".to_string(), Some(1)),
                ("M".to_string(), Some(2)),
            ]
        );
        assert_eq!(entries[3].backing_name(), "M_2");
        assert_eq!(entries[1].backing_name(), "Other");
    }

    #[test]
    fn test_ordinals_skip_names_of_other_methods() {
        let metadata = MemoryMetadata::new(TEST_ASSEMBLY);
        let foo = metadata.define(TypeRef::class("Ns", "Foo")).unwrap();
        let int = int();

        let methods = vec![
            metadata.add_method(method(&foo, "M", &[])).unwrap(),
            metadata.add_method(method(&foo, "M", &[("a", &int)])).unwrap(),
            metadata.add_method(method(&foo, "M_0", &[])).unwrap(),
            metadata.add_method(method(&foo, "M_2", &[])).unwrap(),
            metadata.add_method(method(&foo, "M_2", &[("a", &int)])).unwrap(),
        ];

        let entries = disambiguate(&methods, &metadata);
        let names: Vec<String> = entries.iter().map(OverloadEntry::backing_name).collect();
        assert_eq!(names, vec!["M_1", "M_2", "M_0", "M_2_0", "M_2_1"]);

        let unique: HashSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_derived_shadows_base() {
        let (metadata, base, derived) = base_and_derived();
        let derived_m = metadata.add_method(method(&derived, "M", &[])).unwrap();
        let base_m = metadata.add_method(method(&base, "M", &[])).unwrap();

        let entries = disambiguate(&[derived_m.clone(), base_m], &metadata);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].method.token, derived_m.token);
        assert_eq!(entries[0].ordinal, None);
    }

    #[test]
    fn test_shadowing_respects_signature() {
        let (metadata, base, derived) = base_and_derived();
        let int = int();
        let derived_m = metadata.add_method(method(&derived, "M", &[])).unwrap();
        let base_m = metadata.add_method(method(&base, "M", &[("x", &int)])).unwrap();

        let entries = disambiguate(&[derived_m, base_m], &metadata);
        assert_eq!(
            summary(&entries),
            vec![("M".to_string(), Some(0)), ("M".to_string(), Some(1))]
        );
    }

    #[test]
    fn test_generic_parameters_compare_by_position() {
        let (metadata, base, derived) = base_and_derived();
        let derived_m = metadata
            .add_method(generic_method(&derived, "Echo", MemberAccess::Public))
            .unwrap();
        let mut renamed = generic_method(&base, "Echo", MemberAccess::Public);
        renamed.generic_params[0].name = "U".to_string();
        let base_m = metadata.add_method(renamed).unwrap();

        let entries = disambiguate(&[derived_m, base_m], &metadata);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_unrelated_same_signature_kept() {
        let metadata = MemoryMetadata::new(TEST_ASSEMBLY);
        let left = metadata.define(TypeRef::class("Ns", "Left")).unwrap();
        let right = metadata.define(TypeRef::class("Ns", "Right")).unwrap();
        let first = metadata.add_method(method(&left, "M", &[])).unwrap();
        let second = metadata.add_method(method(&right, "M", &[])).unwrap();
        let same_type = metadata.add_method(method(&left, "M", &[])).unwrap();

        let entries = disambiguate(&[first, second, same_type], &metadata);
        assert_eq!(
            entries.iter().map(|e| e.ordinal).collect::<Vec<_>>(),
            vec![Some(0), Some(1), Some(2)]
        );
    }
}
