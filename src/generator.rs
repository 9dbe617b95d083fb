//! Running the facade pipeline over a whole metadata source.
//!
//! [`FacadeGenerator`] is the main entry point. For every type the [`MetadataSource`] reports
//! it checks the type's shape, classifies its members, disambiguates overloads, plans an
//! access strategy per member and emits the facade text. Types are independent, so they are
//! generated in parallel with `rayon` unless the configuration asks otherwise; results are
//! always reported in discovery order, which keeps the output stable across runs.
//!
//! Facades are named after the nesting chain of the wrapped type (`A+Node` becomes
//! `A_NodeFacade`). Should two types still end up with the same unit name, for instance because
//! every facade is emitted into one namespace, the later type in discovery order gets the first
//! free `_2`, `_3`, ... suffix.
//!
//! Failures never abort a run. A type that can not get a facade, or whose facade fails, is
//! recorded as an error [`Diagnostic`](crate::Diagnostic) in the [`GenerationReport`] and the
//! run continues with the next type.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use dotfacade::prelude::*;
//!
//! let metadata = MemoryMetadata::new("Sample");
//! let foo = metadata.define(TypeRef::class("Ns", "Foo"))?;
//! let int = Arc::new(TypeRef::primitive(TypeFlavor::I4));
//! metadata.add_field(FieldDescriptor::new("count", &foo, &int, MemberAccess::Private))?;
//!
//! let report = FacadeGenerator::new(&metadata, GeneratorConfig::default()).run();
//! assert_eq!(report.units.len(), 1);
//! assert!(report.units[0].text.contains("public int count"));
//! assert!(report.failed_types().is_empty());
//! # Ok::<(), dotfacade::Error>(())
//! ```

use std::collections::HashSet;

use rayon::prelude::*;

use crate::{
    diagnostics::Diagnostics,
    facade::{
        classify::MemberClassifier,
        config::GeneratorConfig,
        emit::{FacadeEmitter, FacadeUnit, TypePlan},
        overload::disambiguate,
        strategy::{DelegateTrampolineCompiler, StrategySelector, TrampolineCompiler},
    },
    metadata::{
        source::MetadataSource,
        types::{TypeRc, TypeRef},
    },
    Error, Result,
};

/// The facade of one type, with the diagnostics raised while generating it
#[derive(Debug, Clone)]
pub struct GeneratedFacade {
    /// The generated source
    pub unit: FacadeUnit,
    /// Warnings raised for members of this type
    pub diagnostics: Diagnostics,
}

/// Everything a generation run produced
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    /// One unit per successfully generated type, in discovery order
    pub units: Vec<FacadeUnit>,
    /// Every diagnostic of the run, grouped by type in discovery order
    pub diagnostics: Diagnostics,
}

impl GenerationReport {
    /// Qualified names of the types that produced no facade because of an error
    #[must_use]
    pub fn failed_types(&self) -> Vec<&str> {
        let mut failed: Vec<&str> = Vec::new();
        for diagnostic in self.diagnostics.errors() {
            if !failed.contains(&diagnostic.type_name.as_str()) {
                failed.push(&diagnostic.type_name);
            }
        }
        failed
    }

    /// The unit generated for the type with the given qualified name
    #[must_use]
    pub fn unit(&self, type_name: &str) -> Option<&FacadeUnit> {
        self.units.iter().find(|unit| unit.type_name == type_name)
    }
}

/// Generates access facades for the types of a metadata source
pub struct FacadeGenerator<'a> {
    source: &'a dyn MetadataSource,
    config: GeneratorConfig,
    compiler: Box<dyn TrampolineCompiler>,
}

impl<'a> FacadeGenerator<'a> {
    /// Create a generator using the [`DelegateTrampolineCompiler`]
    ///
    /// ## Arguments
    /// * `source` - Supplies types, members, interface maps and assignability
    /// * `config` - Shapes the run
    pub fn new(source: &'a dyn MetadataSource, config: GeneratorConfig) -> Self {
        FacadeGenerator {
            source,
            config,
            compiler: Box::new(DelegateTrampolineCompiler::default()),
        }
    }

    /// Replace the trampoline compiler
    #[must_use]
    pub fn with_compiler(mut self, compiler: Box<dyn TrampolineCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    /// The configuration of this generator
    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn is_excluded(&self, ty: &TypeRef) -> bool {
        self.config
            .excluded
            .iter()
            .any(|excluded| excluded.token == ty.token && excluded.same_type(ty))
    }

    /// Reject types a facade can not wrap
    fn check_shape(ty: &TypeRef) -> Result<()> {
        let reason = if !ty.is_visible {
            "not visible outside its assembly"
        } else if ty.is_generic_definition() {
            "open generic type definitions are not supported"
        } else if ty.is_compiler_generated {
            "compiler generated"
        } else {
            return Ok(());
        };

        Err(Error::UnsupportedTypeShape {
            type_name: ty.fullname(),
            reason: reason.to_string(),
        })
    }

    fn is_wrapped(&self, ty: &TypeRef) -> bool {
        !self.is_excluded(ty) && Self::check_shape(ty).is_ok()
    }

    /// The namespace a facade is emitted into, `None` for the global namespace
    fn facade_namespace(&self, ty: &TypeRef) -> Option<String> {
        self.config
            .namespace
            .clone()
            .or_else(|| Some(ty.namespace.clone()))
            .filter(|namespace| !namespace.is_empty())
    }

    fn unit_name(&self, ty: &TypeRef, facade_name: &str) -> String {
        match self.facade_namespace(ty) {
            Some(namespace) => format!("{namespace}.{facade_name}"),
            None => facade_name.to_string(),
        }
    }

    /// Assign every type a facade name whose unit name no other type of the run uses
    ///
    /// Types that are excluded or can not be wrapped keep their name and reserve nothing.
    fn facade_names(&self, types: &[TypeRc]) -> Vec<String> {
        let preferred: Vec<String> = types
            .iter()
            .map(|ty| self.config.facade_name(&ty.nested_name()))
            .collect();

        let mut reserved: HashSet<String> = types
            .iter()
            .zip(&preferred)
            .filter(|(ty, _)| self.is_wrapped(ty))
            .map(|(ty, name)| self.unit_name(ty, name))
            .collect();
        let mut assigned = HashSet::new();

        types
            .iter()
            .zip(preferred)
            .map(|(ty, name)| {
                if !self.is_wrapped(ty) || assigned.insert(self.unit_name(ty, &name)) {
                    return name;
                }

                let mut ordinal = 2;
                loop {
                    let candidate = format!("{name}_{ordinal}");
                    let unit_name = self.unit_name(ty, &candidate);
                    if reserved.insert(unit_name.clone()) {
                        assigned.insert(unit_name);
                        tracing::debug!("{}: facade renamed to {candidate}", ty.fullname());
                        return candidate;
                    }
                    ordinal += 1;
                }
            })
            .collect()
    }

    /// Generate the facade of a single type
    ///
    /// The facade is named after the type's nesting chain; name clashes with other types are
    /// only resolved by [`FacadeGenerator::run`]. Returns `Ok(None)` for excluded types.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedTypeShape`] for types that can not be wrapped,
    /// [`Error::UnsupportedLiteral`] if a parameter default has no C# spelling, and any
    /// error of the trampoline compiler other than [`Error::UnsupportedNativeCodegen`].
    pub fn generate_type(&self, ty: &TypeRc) -> Result<Option<GeneratedFacade>> {
        self.generate_as(ty, self.config.facade_name(&ty.nested_name()))
    }

    #[tracing::instrument(skip_all, fields(type_name = %ty.fullname()))]
    fn generate_as(&self, ty: &TypeRc, facade_name: String) -> Result<Option<GeneratedFacade>> {
        if self.is_excluded(ty) {
            tracing::debug!("{}: excluded", ty.fullname());
            return Ok(None);
        }
        Self::check_shape(ty)?;

        let type_name = ty.fullname();
        let diagnostics = Diagnostics::new();

        let raw = self.source.list_members(ty, self.config.binding);
        let interface_map = self.source.interface_map(ty);
        let classified = MemberClassifier::new(self.source, &self.config.excluded).classify(
            ty,
            &raw,
            &interface_map,
        );
        let overloads = disambiguate(&classified.methods, self.source);

        let selector = StrategySelector::new(self.compiler.as_ref(), &type_name, &diagnostics);
        let properties = classified
            .properties
            .iter()
            .map(|property| selector.plan_property(property))
            .collect::<Result<Vec<_>>>()?;
        let fields = classified
            .fields
            .iter()
            .map(|field| selector.plan_field(field))
            .collect::<Result<Vec<_>>>()?;
        let methods = overloads
            .iter()
            .map(|entry| selector.plan_method(entry))
            .collect::<Result<Vec<_>>>()?;

        let plan = TypePlan {
            facade_name,
            namespace: self.facade_namespace(ty),
            static_only: ty.is_static || classified.all_static(),
            properties,
            fields,
            methods,
        };

        let unit = FacadeEmitter::new(self.config.line_ending).emit(ty, &plan)?;
        tracing::debug!(
            "{type_name}: {} of {} member(s) exposed as {}",
            classified.len(),
            raw.len(),
            unit.name
        );

        Ok(Some(GeneratedFacade { unit, diagnostics }))
    }

    /// Generate the facades of every type the source reports
    ///
    /// Never fails: every type that produced no facade is reported in the returned
    /// diagnostics (an error for failures, an info entry for excluded types).
    #[must_use]
    #[tracing::instrument(skip_all, fields(parallel = self.config.parallel))]
    pub fn run(&self) -> GenerationReport {
        let types = self.source.types();
        let names = self.facade_names(&types);

        let outcomes: Vec<Result<Option<GeneratedFacade>>> = if self.config.parallel {
            types
                .par_iter()
                .zip(&names)
                .map(|(ty, name)| self.generate_as(ty, name.clone()))
                .collect()
        } else {
            types
                .iter()
                .zip(&names)
                .map(|(ty, name)| self.generate_as(ty, name.clone()))
                .collect()
        };

        let mut report = GenerationReport::default();
        for (ty, outcome) in types.iter().zip(outcomes) {
            match outcome {
                Ok(Some(generated)) => {
                    report.diagnostics.extend(&generated.diagnostics);
                    report.units.push(generated.unit);
                }
                Ok(None) => report
                    .diagnostics
                    .info(ty.fullname(), "excluded from generation"),
                Err(error) => {
                    tracing::warn!("{}: no facade generated: {error}", ty.fullname());
                    report.diagnostics.error(ty.fullname(), error.to_string());
                }
            }
        }

        tracing::info!(
            "generated {} facade(s) for {} type(s): {} failed, {} warning(s)",
            report.units.len(),
            types.len(),
            report.failed_types().len(),
            report.diagnostics.warnings().len()
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        diagnostics::Severity,
        facade::strategy::{Trampoline, TrampolineSignature},
        metadata::{
            literal::Literal,
            members::{
                FieldDescriptor, MemberAccess, MemberDescriptor, MethodDescriptor,
                ParameterDescriptor,
            },
            source::MemoryMetadata,
            types::TypeRef,
        },
        test::{int, void, TEST_ASSEMBLY},
    };

    #[test]
    fn test_shape_rejections() {
        let metadata = MemoryMetadata::new(TEST_ASSEMBLY);
        metadata.define(TypeRef::class("Ns", "Hidden").hidden()).unwrap();
        metadata.define(TypeRef::class("Ns", "Box`1").with_generic_params(1)).unwrap();
        metadata
            .define(TypeRef::class("Ns", "<>c").compiler_generated())
            .unwrap();
        metadata.define(TypeRef::class("Ns", "Fine")).unwrap();

        let report = FacadeGenerator::new(&metadata, GeneratorConfig::sequential()).run();
        assert_eq!(report.units.len(), 1);
        assert_eq!(report.failed_types(), vec!["Ns.Hidden", "Ns.Box`1", "Ns.<>c"]);
        assert!(report.unit("Ns.Fine").is_some());
    }

    #[test]
    fn test_excluded_type_reported_as_info() {
        let metadata = MemoryMetadata::new(TEST_ASSEMBLY);
        let skipped = metadata.define(TypeRef::class("Ns", "Skipped")).unwrap();
        metadata.define(TypeRef::class("Ns", "Kept")).unwrap();

        let generator = FacadeGenerator::new(&metadata, GeneratorConfig::default().exclude(&skipped));
        assert!(generator.generate_type(&skipped).unwrap().is_none());

        let report = generator.run();
        assert_eq!(report.units.len(), 1);
        assert_eq!(report.diagnostics.count_of(Severity::Info), 1);
        assert!(report.failed_types().is_empty());
    }

    #[test]
    fn test_bytes_default_fails_only_its_type() {
        let metadata = MemoryMetadata::new(TEST_ASSEMBLY);
        let broken = metadata.define(TypeRef::class("Ns", "Broken")).unwrap();
        metadata.define(TypeRef::class("Ns", "Fine")).unwrap();
        let void = void();
        metadata
            .add_method(
                MethodDescriptor::new("Load", &broken, &void, MemberAccess::Public).with_param(
                    ParameterDescriptor::new("data", &int()).with_default(Literal::Bytes(vec![0])),
                ),
            )
            .unwrap();

        let generator = FacadeGenerator::new(&metadata, GeneratorConfig::default());
        assert!(matches!(
            generator.generate_type(&broken),
            Err(Error::UnsupportedLiteral { .. })
        ));

        let report = generator.run();
        assert_eq!(report.failed_types(), vec!["Ns.Broken"]);
        assert_eq!(report.units.len(), 1);
        assert_eq!(report.units[0].type_name, "Ns.Fine");
    }

    #[test]
    fn test_namespace_override_and_suffix() {
        let metadata = MemoryMetadata::new(TEST_ASSEMBLY);
        let foo = metadata.define(TypeRef::class("Ns", "Foo")).unwrap();

        let config = GeneratorConfig {
            namespace: Some("Generated".to_string()),
            facade_suffix: "Access".to_string(),
            ..GeneratorConfig::default()
        };
        let generated = FacadeGenerator::new(&metadata, config)
            .generate_type(&foo)
            .unwrap()
            .unwrap();

        assert_eq!(generated.unit.name, "Generated.FooAccess");
        assert!(generated.unit.text.contains("namespace Generated\n"));
        assert!(generated.unit.text.contains("public sealed class FooAccess"));
        assert!(!generated.diagnostics.has_any());
    }

    #[test]
    fn test_nested_types_get_distinct_units() {
        let metadata = MemoryMetadata::new(TEST_ASSEMBLY);
        metadata.define(TypeRef::class("Ns", "A+Node")).unwrap();
        metadata.define(TypeRef::class("Ns", "B+Node")).unwrap();

        let report = FacadeGenerator::new(&metadata, GeneratorConfig::sequential()).run();
        let names: Vec<&str> = report.units.iter().map(|unit| unit.name.as_str()).collect();
        assert_eq!(names, vec!["Ns.A_NodeFacade", "Ns.B_NodeFacade"]);
    }

    #[test]
    fn test_shared_namespace_unit_names_unique() {
        let metadata = MemoryMetadata::new(TEST_ASSEMBLY);
        metadata.define(TypeRef::class("Hidden", "Foo").hidden()).unwrap();
        metadata.define(TypeRef::class("First", "Foo")).unwrap();
        metadata.define(TypeRef::class("Second", "Foo")).unwrap();
        metadata.define(TypeRef::class("Third", "Foo_2")).unwrap();

        let config = GeneratorConfig {
            namespace: Some("Generated".to_string()),
            facade_suffix: String::new(),
            ..GeneratorConfig::default()
        };
        let report = FacadeGenerator::new(&metadata, config).run();

        assert_eq!(report.unit("First.Foo").unwrap().name, "Generated.Foo");
        assert_eq!(report.unit("Second.Foo").unwrap().name, "Generated.Foo_3");
        assert_eq!(report.unit("Third.Foo_2").unwrap().name, "Generated.Foo_2");
        assert!(report
            .unit("Second.Foo")
            .unwrap()
            .text
            .contains("public sealed class Foo_3"));
        assert_eq!(report.failed_types(), vec!["Hidden.Foo"]);
    }

    struct CrashingCompiler;

    impl TrampolineCompiler for CrashingCompiler {
        fn compile(&self, _: &MemberDescriptor, _: &TrampolineSignature) -> Result<Trampoline> {
            Err(Error::Error("delegate factory unavailable".to_string()))
        }
    }

    #[test]
    fn test_custom_compiler_error_fails_its_type() {
        let metadata = MemoryMetadata::new(TEST_ASSEMBLY);
        let secretive = metadata.define(TypeRef::class("Ns", "Secretive")).unwrap();
        metadata.define(TypeRef::class("Ns", "Open")).unwrap();
        metadata
            .add_field(FieldDescriptor::new("count", &secretive, &int(), MemberAccess::Private))
            .unwrap();

        let report = FacadeGenerator::new(&metadata, GeneratorConfig::sequential())
            .with_compiler(Box::new(CrashingCompiler))
            .run();

        assert_eq!(report.failed_types(), vec!["Ns.Secretive"]);
        assert!(report.diagnostics.errors().iter().any(|diagnostic| diagnostic
            .message
            .contains("delegate factory unavailable")));
        assert!(report.unit("Ns.Open").is_some());
    }
}
