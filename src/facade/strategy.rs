//! Choosing how a facade reaches each member.
//!
//! Every facade member is implemented with one of three [`AccessStrategy`]s:
//!
//! - **Direct** - plain C# member access, for public members
//! - **Trampoline** - a delegate precompiled from the member's metadata handle, for non-public
//!   members whose signature only involves visible types
//! - **DynamicInvoke** - reflection at call time, for everything else
//!
//! The decision is data: the planning functions of [`StrategySelector`] return plans carrying
//! the chosen strategy per accessor, the trampolines that were compiled for it and the names
//! of the backing members. The emitter renders plans without deciding anything itself.
//!
//! Trampolines are produced by a [`TrampolineCompiler`]. A compiler that reports
//! [`Error::UnsupportedNativeCodegen`] makes the selector fall back to dynamic invocation
//! for that accessor and record a warning.

use std::sync::Arc;

use strum::{Display, EnumIter};

use crate::{
    diagnostics::{Diagnostic, Diagnostics, Severity},
    facade::{
        literal::{parameter_defaults, DefaultPlan},
        overload::OverloadEntry,
        render::{parameter_name, render},
    },
    metadata::{
        members::{
            FieldRc, MemberAccess, MemberDescriptor, MethodDescriptor, MethodRc, PassingMode,
            PropertyRc,
        },
        types::{TypeFlavor, TypeRc, TypeRef},
    },
    Error, Result,
};

/// How a facade member reaches the wrapped member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum AccessStrategy {
    /// Plain member access
    Direct,
    /// A precompiled delegate bound to the member
    Trampoline,
    /// Reflection at call time
    DynamicInvoke,
}

/// What a trampoline does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TrampolineKind {
    /// Reads a property or field
    Getter,
    /// Writes a property or field
    Setter,
    /// Calls a method
    Invoker,
}

/// A parameter of a trampoline delegate
#[derive(Debug, Clone)]
pub struct TrampolineParameter {
    /// Identifier, already escaped
    pub name: String,
    /// The parameter type, without by-ref marker
    pub param_type: TypeRc,
    /// How the argument is passed
    pub mode: PassingMode,
}

/// The delegate shape a trampoline must have
#[derive(Debug, Clone)]
pub struct TrampolineSignature {
    /// What the trampoline does
    pub kind: TrampolineKind,
    /// Name of the delegate type declared for it
    pub delegate: String,
    /// The instance parameter type; `None` for static members
    pub instance: Option<TypeRc>,
    /// The instance is passed by `ref` (value-type declaring types)
    pub instance_by_ref: bool,
    /// Parameters after the instance
    pub parameters: Vec<TrampolineParameter>,
    /// The return type, without by-ref marker
    pub returns: TypeRc,
    /// The trampoline returns a reference
    pub returns_by_ref: bool,
    /// The returned reference is read-only
    pub readonly_ref: bool,
    /// Reflection expression of the member the delegate is bound to
    pub handle: String,
}

/// A compiled trampoline: the expression that produces the delegate instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trampoline {
    /// Initializer of the static delegate field
    pub initializer: String,
}

/// Turns member handles into trampolines
///
/// Implementations decide how the delegate is materialized at run time. Returning
/// [`Error::UnsupportedNativeCodegen`] is the supported way to refuse a member; the selector
/// then uses dynamic invocation for it. Any other error fails the whole type.
pub trait TrampolineCompiler: Send + Sync {
    /// Produce a trampoline for `member` with the given signature
    ///
    /// # Errors
    /// [`Error::UnsupportedNativeCodegen`] if no trampoline can be produced for this member.
    fn compile(&self, member: &MemberDescriptor, signature: &TrampolineSignature)
        -> Result<Trampoline>;
}

/// Default trampoline compiler, binding delegates through a run-time factory method
///
/// The initializer is `<factory><<Delegate>>(<handle>)`; the factory receives the
/// `MethodInfo` or `FieldInfo` of the member and returns a delegate of the requested type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateTrampolineCompiler {
    /// Generic factory method creating the delegate
    pub factory: String,
    /// Can the factory bind members that return a reference
    pub supports_by_ref_returns: bool,
}

impl Default for DelegateTrampolineCompiler {
    fn default() -> Self {
        DelegateTrampolineCompiler {
            factory: "Trampoline.Create".to_string(),
            supports_by_ref_returns: true,
        }
    }
}

impl DelegateTrampolineCompiler {
    /// A compiler that refuses members returning a reference
    #[must_use]
    pub fn without_by_ref_returns() -> Self {
        DelegateTrampolineCompiler {
            supports_by_ref_returns: false,
            ..Default::default()
        }
    }
}

impl TrampolineCompiler for DelegateTrampolineCompiler {
    fn compile(
        &self,
        member: &MemberDescriptor,
        signature: &TrampolineSignature,
    ) -> Result<Trampoline> {
        if signature.returns_by_ref && !self.supports_by_ref_returns {
            return Err(Error::UnsupportedNativeCodegen {
                member: member.name().to_string(),
                reason: "by-ref returns are not supported".to_string(),
            });
        }

        Ok(Trampoline {
            initializer: format!(
                "{}<{}>({})",
                self.factory, signature.delegate, signature.handle
            ),
        })
    }
}

/// A trampoline together with the signature it was compiled for
#[derive(Debug, Clone)]
pub struct PlannedTrampoline {
    /// The delegate shape
    pub signature: TrampolineSignature,
    /// The compiled initializer
    pub trampoline: Trampoline,
}

/// Strategy of one accessor (getter, setter or method body)
#[derive(Debug, Clone)]
pub struct AccessorPlan {
    /// The chosen strategy
    pub strategy: AccessStrategy,
    /// The trampoline, present iff the strategy is [`AccessStrategy::Trampoline`]
    pub trampoline: Option<PlannedTrampoline>,
}

impl AccessorPlan {
    fn direct() -> Self {
        AccessorPlan {
            strategy: AccessStrategy::Direct,
            trampoline: None,
        }
    }

    fn dynamic() -> Self {
        AccessorPlan {
            strategy: AccessStrategy::DynamicInvoke,
            trampoline: None,
        }
    }

    /// Is the strategy dynamic invocation
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.strategy == AccessStrategy::DynamicInvoke
    }
}

/// How a property is exposed
#[derive(Debug, Clone)]
pub struct PropertyPlan {
    /// The property
    pub property: PropertyRc,
    /// Getter strategy, if the property is readable
    pub getter: Option<AccessorPlan>,
    /// Setter strategy, if the property is writable through the facade
    pub setter: Option<AccessorPlan>,
    /// The facade property returns a reference
    pub by_ref: bool,
}

/// How a field is exposed
#[derive(Debug, Clone)]
pub struct FieldPlan {
    /// The field
    pub field: FieldRc,
    /// Getter strategy
    pub getter: AccessorPlan,
    /// Setter strategy; `None` for constants and `ref` fields
    pub setter: Option<AccessorPlan>,
    /// The facade property returns a reference
    pub by_ref: bool,
}

/// How a method is exposed
#[derive(Debug, Clone)]
pub struct MethodPlan {
    /// The method
    pub method: MethodRc,
    /// Unique name of the backing members (`Name` or `Name_<ordinal>`)
    pub backing_name: String,
    /// The body strategy
    pub body: AccessorPlan,
    /// The facade method returns a reference
    pub by_ref: bool,
    /// Default values the facade method declares
    pub defaults: DefaultPlan,
}

impl PropertyPlan {
    /// Does the facade need the property's metadata lookup
    #[must_use]
    pub fn needs_lookup(&self) -> bool {
        self.getter
            .iter()
            .chain(self.setter.iter())
            .any(|accessor| accessor.strategy != AccessStrategy::Direct)
    }
}

impl FieldPlan {
    /// Does the facade need the field's metadata lookup
    #[must_use]
    pub fn needs_lookup(&self) -> bool {
        std::iter::once(&self.getter)
            .chain(self.setter.iter())
            .any(|accessor| accessor.strategy != AccessStrategy::Direct)
    }
}

impl MethodPlan {
    /// Does the facade need the method's metadata lookup
    #[must_use]
    pub fn needs_lookup(&self) -> bool {
        self.body.strategy != AccessStrategy::Direct
    }
}

/// The type without its by-ref marker
fn without_by_ref(ty: &TypeRc) -> TypeRc {
    if ty.is_by_ref {
        let mut element = (**ty).clone();
        element.is_by_ref = false;
        Arc::new(element)
    } else {
        ty.clone()
    }
}

fn void() -> TypeRc {
    Arc::new(TypeRef::primitive(TypeFlavor::Void))
}

/// Are the declaring type and every type in the member's signature visible
///
/// For generic methods the constraint types count as part of the signature.
#[must_use]
pub fn involved_types_visible(member: &MemberDescriptor) -> bool {
    match member {
        MemberDescriptor::Property(property) => {
            property.declaring.is_fully_visible() && property.property_type.is_fully_visible()
        }
        MemberDescriptor::Field(field) => {
            field.declaring.is_fully_visible() && field.field_type.is_fully_visible()
        }
        MemberDescriptor::Method(method) => method_types_visible(method),
    }
}

fn method_types_visible(method: &MethodDescriptor) -> bool {
    method.declaring.is_fully_visible()
        && method.return_type.is_fully_visible()
        && method
            .params
            .iter()
            .all(|param| param.param_type.is_fully_visible())
        && method
            .generic_params
            .iter()
            .flat_map(|param| param.constraints.iter())
            .all(|constraint| constraint.is_fully_visible())
}

/// The strategy for an accessor with the given access level
fn decide(access: MemberAccess, types_visible: bool, constant: bool) -> AccessStrategy {
    if access.is_public() {
        AccessStrategy::Direct
    } else if constant || !types_visible {
        AccessStrategy::DynamicInvoke
    } else {
        AccessStrategy::Trampoline
    }
}

/// Decides access strategies and compiles trampolines for the members of one type
pub struct StrategySelector<'a> {
    compiler: &'a dyn TrampolineCompiler,
    type_name: &'a str,
    diagnostics: &'a Diagnostics,
}

impl<'a> StrategySelector<'a> {
    /// Create a selector for the facade of `type_name`
    ///
    /// ## Arguments
    /// * `compiler`    - Produces trampolines on demand
    /// * `type_name`   - Qualified name of the facade's target type, used in diagnostics
    /// * `diagnostics` - Receives a warning for every trampoline fallback
    pub fn new(
        compiler: &'a dyn TrampolineCompiler,
        type_name: &'a str,
        diagnostics: &'a Diagnostics,
    ) -> Self {
        StrategySelector {
            compiler,
            type_name,
            diagnostics,
        }
    }

    /// The strategy of a member, ignoring trampoline availability
    ///
    /// For a property, the result is that of its most visible accessor.
    #[must_use]
    pub fn select(&self, member: &MemberDescriptor) -> AccessStrategy {
        let visible = involved_types_visible(member);
        match member {
            MemberDescriptor::Property(property) => decide(property.access(), visible, false),
            MemberDescriptor::Field(field) => decide(field.access, visible, field.is_literal()),
            MemberDescriptor::Method(method) => decide(method.access, visible, false),
        }
    }

    /// Turn a decision into an accessor plan, compiling the trampoline if one is needed
    fn realize(
        &self,
        strategy: AccessStrategy,
        member: &MemberDescriptor,
        build: impl FnOnce() -> TrampolineSignature,
    ) -> Result<AccessorPlan> {
        match strategy {
            AccessStrategy::Direct => Ok(AccessorPlan::direct()),
            AccessStrategy::DynamicInvoke => Ok(AccessorPlan::dynamic()),
            AccessStrategy::Trampoline => {
                let signature = build();
                match self.compiler.compile(member, &signature) {
                    Ok(trampoline) => Ok(AccessorPlan {
                        strategy: AccessStrategy::Trampoline,
                        trampoline: Some(PlannedTrampoline {
                            signature,
                            trampoline,
                        }),
                    }),
                    Err(Error::UnsupportedNativeCodegen { reason, .. }) => {
                        tracing::warn!(
                            "{}::{}: no {} trampoline ({reason}), using dynamic invocation",
                            self.type_name,
                            member.name(),
                            signature.kind
                        );
                        self.diagnostics.push(
                            Diagnostic::new(
                                Severity::Warning,
                                self.type_name,
                                format!(
                                    "{} trampoline unavailable ({reason}), using dynamic invocation",
                                    signature.kind
                                ),
                            )
                            .with_member(member.name()),
                        );
                        Ok(AccessorPlan::dynamic())
                    }
                    Err(err) => Err(err),
                }
            }
        }
    }

    fn instance_of(declaring: &TypeRc, is_static: bool) -> (Option<TypeRc>, bool) {
        if is_static {
            (None, false)
        } else {
            (Some(declaring.clone()), declaring.is_value_type())
        }
    }

    /// Plan the getter and setter of a property
    ///
    /// # Errors
    /// Propagates trampoline compiler errors other than [`Error::UnsupportedNativeCodegen`].
    pub fn plan_property(&self, property: &PropertyRc) -> Result<PropertyPlan> {
        let member = MemberDescriptor::Property(property.clone());
        let visible = involved_types_visible(&member);
        let name = &property.name;
        let (instance, instance_by_ref) = Self::instance_of(&property.declaring, property.is_static);

        let getter = match &property.getter {
            Some(accessor) => Some(self.realize(
                decide(accessor.access, visible, false),
                &member,
                || TrampolineSignature {
                    kind: TrampolineKind::Getter,
                    delegate: format!("{name}_GetDelegate"),
                    instance: instance.clone(),
                    instance_by_ref,
                    parameters: Vec::new(),
                    returns: without_by_ref(&property.property_type),
                    returns_by_ref: property.returns_by_ref,
                    readonly_ref: property.readonly_ref,
                    handle: format!("{name}_Property.GetGetMethod(true)"),
                },
            )?),
            None => None,
        };

        // A property returning a reference is written through that reference
        let setter = match &property.setter {
            Some(accessor) if !property.returns_by_ref => Some(self.realize(
                decide(accessor.access, visible, false),
                &member,
                || TrampolineSignature {
                    kind: TrampolineKind::Setter,
                    delegate: format!("{name}_SetDelegate"),
                    instance: instance.clone(),
                    instance_by_ref,
                    parameters: vec![TrampolineParameter {
                        name: "value".to_string(),
                        param_type: without_by_ref(&property.property_type),
                        mode: PassingMode::ByValue,
                    }],
                    returns: void(),
                    returns_by_ref: false,
                    readonly_ref: false,
                    handle: format!("{name}_Property.GetSetMethod(true)"),
                },
            )?),
            _ => None,
        };

        let by_ref = property.returns_by_ref
            && getter.as_ref().is_some_and(|getter| !getter.is_dynamic());

        tracing::debug!(
            "{}::{name}: getter {:?}, setter {:?}",
            self.type_name,
            getter.as_ref().map(|plan| plan.strategy),
            setter.as_ref().map(|plan| plan.strategy)
        );

        Ok(PropertyPlan {
            property: property.clone(),
            getter,
            setter,
            by_ref,
        })
    }

    /// Plan the getter and setter of a field
    ///
    /// Constants are read-only; non-public constants are read from their metadata. Public
    /// `readonly` fields get a direct getter, but their setter goes through a trampoline or
    /// reflection since C# rejects the assignment.
    ///
    /// # Errors
    /// Propagates trampoline compiler errors other than [`Error::UnsupportedNativeCodegen`].
    pub fn plan_field(&self, field: &FieldRc) -> Result<FieldPlan> {
        let member = MemberDescriptor::Field(field.clone());
        let visible = involved_types_visible(&member);
        let name = &field.name;
        let (instance, instance_by_ref) = Self::instance_of(&field.declaring, field.is_static());

        let getter = self.realize(
            decide(field.access, visible, field.is_literal()),
            &member,
            || TrampolineSignature {
                kind: TrampolineKind::Getter,
                delegate: format!("{name}_GetDelegate"),
                instance: instance.clone(),
                instance_by_ref,
                parameters: Vec::new(),
                returns: without_by_ref(&field.field_type),
                returns_by_ref: field.is_by_ref,
                readonly_ref: false,
                handle: format!("{name}_Field"),
            },
        )?;

        let setter = if field.is_literal() || field.is_by_ref {
            None
        } else {
            let access = if field.is_init_only() {
                MemberAccess::Private
            } else {
                field.access
            };
            Some(self.realize(decide(access, visible, false), &member, || {
                TrampolineSignature {
                    kind: TrampolineKind::Setter,
                    delegate: format!("{name}_SetDelegate"),
                    instance: instance.clone(),
                    instance_by_ref,
                    parameters: vec![TrampolineParameter {
                        name: "value".to_string(),
                        param_type: without_by_ref(&field.field_type),
                        mode: PassingMode::ByValue,
                    }],
                    returns: void(),
                    returns_by_ref: false,
                    readonly_ref: false,
                    handle: format!("{name}_Field"),
                }
            })?)
        };

        let by_ref = field.is_by_ref && !getter.is_dynamic();

        tracing::debug!(
            "{}::{name}: getter {}, setter {:?}",
            self.type_name,
            getter.strategy,
            setter.as_ref().map(|plan| plan.strategy)
        );

        Ok(FieldPlan {
            field: field.clone(),
            getter,
            setter,
            by_ref,
        })
    }

    /// Plan the body of a method
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedLiteral`] if a parameter default has no C# spelling, and
    /// propagates trampoline compiler errors other than [`Error::UnsupportedNativeCodegen`].
    pub fn plan_method(&self, entry: &OverloadEntry) -> Result<MethodPlan> {
        let method = &entry.method;
        let member = MemberDescriptor::Method(method.clone());
        let backing_name = entry.backing_name();
        let (instance, instance_by_ref) = Self::instance_of(&method.declaring, method.is_static());

        let defaults = parameter_defaults(&method.name, &method.params)?;
        for dropped in &defaults.dropped {
            self.diagnostics.push(
                Diagnostic::new(
                    Severity::Warning,
                    self.type_name,
                    format!("default value of parameter {dropped} can not be expressed and was dropped"),
                )
                .with_member(&method.name),
            );
        }

        let handle = if method.is_generic() {
            let args: Vec<String> = method
                .generic_params
                .iter()
                .map(|param| format!("typeof({})", param.name))
                .collect();
            format!("{backing_name}_Method.MakeGenericMethod({})", args.join(", "))
        } else {
            format!("{backing_name}_Method")
        };

        let body = self.realize(self.select(&member), &member, || TrampolineSignature {
            kind: TrampolineKind::Invoker,
            delegate: format!("{backing_name}_Delegate"),
            instance,
            instance_by_ref,
            parameters: method
                .params
                .iter()
                .enumerate()
                .map(|(index, param)| TrampolineParameter {
                    name: parameter_name(param, index),
                    param_type: param.param_type.clone(),
                    mode: param.mode,
                })
                .collect(),
            returns: without_by_ref(&method.return_type),
            returns_by_ref: method.returns_by_ref(),
            readonly_ref: method.readonly_ref,
            handle,
        })?;

        let by_ref = method.returns_by_ref() && !body.is_dynamic();

        tracing::debug!(
            "{}::{backing_name}: {} returning {}",
            self.type_name,
            body.strategy,
            render(&method.return_type)
        );

        Ok(MethodPlan {
            method: method.clone(),
            backing_name,
            body,
            by_ref,
            defaults,
        })
    }
}
