//! Rendering type plans as C# source.
//!
//! The emitter never decides anything: every strategy, backing name, trampoline and default
//! value arrives precomputed in a [`TypePlan`]. Its job is layout. A facade always has the
//! same shape:
//!
//! ```text
//! // <auto-generated/>
//! #nullable disable
//! using System;
//! using System.Reflection;
//!
//! namespace Ns
//! {
//!     public sealed class FooFacade
//!     {
//!         private readonly Ns.Foo __instance;
//!
//!         <properties>
//!         <fields>
//!         <methods>
//!         <constructor>
//!
//!         private static class __Meta
//!         {
//!             <lookups, delegates, trampolines, generic holders>
//!         }
//!     }
//! }
//! ```
//!
//! Text is collected in a [`SourceBuffer`] and joined once, so the line ending is applied in
//! a single place.

use strum::{Display, EnumIter};

use crate::{
    facade::{
        literal::quote,
        render::{constraint_clause, escape_identifier, needs_cast, parameter_name, render, type_handle},
        strategy::{AccessStrategy, AccessorPlan, FieldPlan, MethodPlan, PlannedTrampoline, PropertyPlan},
    },
    metadata::{
        members::{ParameterDescriptor, PassingMode},
        types::TypeRef,
    },
    Result,
};

const INDENT: &str = "    ";

/// Binding flags every metadata lookup uses
const ALL_MEMBERS: &str = "BindingFlags.Public | BindingFlags.NonPublic | BindingFlags.Instance \
                           | BindingFlags.Static | BindingFlags.DeclaredOnly";

/// Line terminator of generated text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    /// The terminator itself
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Fragment {
    Line { depth: usize, text: String },
    Blank,
}

/// Ordered, indentation-aware collection of source lines
///
/// Blank lines are collapsed: never two in a row, never directly after an opening brace and
/// never directly before a closing one. That lets callers separate blocks unconditionally.
#[derive(Debug, Default)]
pub struct SourceBuffer {
    fragments: Vec<Fragment>,
    depth: usize,
}

impl SourceBuffer {
    /// Create an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line at the current indentation
    pub fn line(&mut self, text: impl Into<String>) {
        self.fragments.push(Fragment::Line {
            depth: self.depth,
            text: text.into(),
        });
    }

    /// Append a blank separator line, unless it would be redundant
    pub fn blank(&mut self) {
        match self.fragments.last() {
            None | Some(Fragment::Blank) => {}
            Some(Fragment::Line { text, .. }) if text == "{" => {}
            Some(Fragment::Line { .. }) => self.fragments.push(Fragment::Blank),
        }
    }

    /// Append `header` followed by an opening brace, and indent
    pub fn open(&mut self, header: impl Into<String>) {
        self.line(header);
        self.line("{");
        self.depth += 1;
    }

    /// Outdent and append a closing brace
    pub fn close(&mut self) {
        if self.fragments.last() == Some(&Fragment::Blank) {
            self.fragments.pop();
        }
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    /// Current nesting depth
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Join all fragments, terminating every line with `ending`
    #[must_use]
    pub fn finish(self, ending: LineEnding) -> String {
        let terminator = ending.as_str();
        let mut text = String::new();
        for fragment in self.fragments {
            if let Fragment::Line { depth, text: line } = fragment {
                for _ in 0..depth {
                    text.push_str(INDENT);
                }
                text.push_str(&line);
            }
            text.push_str(terminator);
        }
        text
    }
}

/// Everything the emitter needs to know about one facade
#[derive(Debug, Clone)]
pub struct TypePlan {
    /// Name of the facade class
    pub facade_name: String,
    /// Namespace to emit the facade into; `None` or empty for the global namespace
    pub namespace: Option<String>,
    /// Emit a static class without instance holder and constructor
    pub static_only: bool,
    /// Property plans, in discovery order
    pub properties: Vec<PropertyPlan>,
    /// Field plans, in discovery order
    pub fields: Vec<FieldPlan>,
    /// Method plans, in discovery order
    pub methods: Vec<MethodPlan>,
}

impl TypePlan {
    /// Does any member need a metadata lookup, and therefore a `__Meta` class
    #[must_use]
    pub fn needs_meta(&self) -> bool {
        self.properties.iter().any(PropertyPlan::needs_lookup)
            || self.fields.iter().any(FieldPlan::needs_lookup)
            || self.methods.iter().any(MethodPlan::needs_lookup)
    }
}

/// The generated source of one facade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacadeUnit {
    /// Qualified name of the facade class, usable as a file stem
    pub name: String,
    /// Qualified name of the wrapped type
    pub type_name: String,
    /// The C# source
    pub text: String,
}

/// A property or field, seen as a value the facade reads and writes
struct ValueMember<'a> {
    name: &'a str,
    declaring: &'a TypeRef,
    value_type: &'a TypeRef,
    is_static: bool,
    constant: bool,
    lookup: String,
}

impl ValueMember<'_> {
    fn receiver(&self) -> String {
        if self.is_static {
            render(self.declaring)
        } else {
            "__instance".to_string()
        }
    }

    fn reflection_target(&self) -> &'static str {
        if self.is_static {
            "null"
        } else {
            "__instance"
        }
    }
}

/// The wrapped type as the facade body sees it
struct Target {
    spelled: String,
    value_type: bool,
}

fn ref_prefix(by_ref: bool, readonly: bool) -> &'static str {
    match (by_ref, readonly) {
        (true, true) => "ref readonly ",
        (true, false) => "ref ",
        (false, _) => "",
    }
}

fn static_prefix(is_static: bool) -> &'static str {
    if is_static {
        "public static "
    } else {
        "public "
    }
}

fn cast(ty: &TypeRef, expression: &str) -> String {
    if needs_cast(ty) {
        format!("({}){expression}", render(ty))
    } else {
        expression.to_string()
    }
}

fn parameter_declaration(mode: PassingMode, ty: &TypeRef, name: &str) -> String {
    match mode.keyword() {
        Some(keyword) => format!("{keyword} {} {name}", render(ty)),
        None => format!("{} {name}", render(ty)),
    }
}

fn argument(param: &ParameterDescriptor, name: &str) -> String {
    match param.mode.keyword() {
        Some(keyword) => format!("{keyword} {name}"),
        None => name.to_string(),
    }
}

fn return_statement(call: &str, returns_value: bool, by_ref: bool) -> String {
    match (returns_value, by_ref) {
        (false, _) => format!("{call};"),
        (true, true) => format!("return ref {call};"),
        (true, false) => format!("return {call};"),
    }
}

fn planned<'p>(accessor: &'p AccessorPlan, member: &str) -> Result<&'p PlannedTrampoline> {
    accessor.trampoline.as_ref().ok_or_else(|| {
        malformed_error!("{} is planned as a trampoline but none was compiled", member)
    })
}

fn trampoline_call(field: &str, planned: &PlannedTrampoline, arguments: &[String]) -> String {
    let signature = &planned.signature;
    let mut all = Vec::with_capacity(arguments.len() + 1);
    if signature.instance.is_some() {
        all.push(if signature.instance_by_ref {
            "ref __instance".to_string()
        } else {
            "__instance".to_string()
        });
    }
    all.extend(arguments.iter().cloned());

    format!("__Meta.{field}({})", all.join(", "))
}

fn delegate_declaration(planned: &PlannedTrampoline) -> String {
    let signature = &planned.signature;
    let mut parameters = Vec::with_capacity(signature.parameters.len() + 1);
    if let Some(instance) = &signature.instance {
        let modifier = if signature.instance_by_ref { "ref " } else { "" };
        parameters.push(format!("{modifier}{} __self", render(instance)));
    }
    parameters.extend(
        signature
            .parameters
            .iter()
            .map(|param| parameter_declaration(param.mode, &param.param_type, &param.name)),
    );

    format!(
        "internal delegate {}{} {}({});",
        ref_prefix(signature.returns_by_ref, signature.readonly_ref),
        render(&signature.returns),
        signature.delegate,
        parameters.join(", ")
    )
}

fn emit_trampoline(out: &mut SourceBuffer, field: &str, planned: &PlannedTrampoline) {
    out.line(delegate_declaration(planned));
    out.line(format!(
        "internal static readonly {} {field} = {};",
        planned.signature.delegate, planned.trampoline.initializer
    ));
}

fn parameter_handle(param: &ParameterDescriptor) -> String {
    let handle = type_handle(&param.param_type);
    if param.mode.is_by_ref() {
        format!("{handle}.MakeByRefType()")
    } else {
        handle
    }
}

/// Renders [`TypePlan`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct FacadeEmitter {
    line_ending: LineEnding,
}

impl FacadeEmitter {
    /// Create an emitter producing text with the given line ending
    #[must_use]
    pub fn new(line_ending: LineEnding) -> Self {
        FacadeEmitter { line_ending }
    }

    /// Render the facade of `ty`
    ///
    /// ## Arguments
    /// * `ty`   - The wrapped type
    /// * `plan` - Its fully decided members
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a plan selects the trampoline strategy without
    /// carrying a compiled trampoline.
    pub fn emit(&self, ty: &TypeRef, plan: &TypePlan) -> Result<FacadeUnit> {
        let mut out = SourceBuffer::new();
        out.line("// <auto-generated/>");
        out.line("#nullable disable");
        out.line("using System;");
        out.line("using System.Reflection;");
        out.blank();

        let namespace = plan.namespace.as_deref().filter(|namespace| !namespace.is_empty());
        if let Some(namespace) = namespace {
            out.open(format!("namespace {namespace}"));
        }

        let target = Target {
            spelled: render(ty),
            value_type: ty.is_value_type(),
        };

        let keyword = if plan.static_only { "static" } else { "sealed" };
        out.open(format!("public {keyword} class {}", plan.facade_name));

        if !plan.static_only {
            let readonly = if target.value_type { "" } else { "readonly " };
            out.line(format!("private {readonly}{} __instance;", target.spelled));
        }

        for property in &plan.properties {
            out.blank();
            Self::emit_property(&mut out, &target, property)?;
        }
        for field in &plan.fields {
            out.blank();
            Self::emit_field(&mut out, &target, field)?;
        }
        for method in &plan.methods {
            out.blank();
            Self::emit_method(&mut out, &target, method)?;
        }

        if !plan.static_only {
            out.blank();
            out.open(format!("public {}({} instance)", plan.facade_name, target.spelled));
            out.line("__instance = instance;");
            out.close();
        }

        if plan.needs_meta() {
            out.blank();
            Self::emit_meta(&mut out, plan)?;
        }

        out.close();
        if namespace.is_some() {
            out.close();
        }

        let name = match namespace {
            Some(namespace) => format!("{namespace}.{}", plan.facade_name),
            None => plan.facade_name.clone(),
        };

        Ok(FacadeUnit {
            name,
            type_name: ty.fullname(),
            text: out.finish(self.line_ending),
        })
    }

    fn emit_property(out: &mut SourceBuffer, target: &Target, plan: &PropertyPlan) -> Result<()> {
        let property = &plan.property;
        let member = ValueMember {
            name: &property.name,
            declaring: &property.declaring,
            value_type: &property.property_type,
            is_static: property.is_static,
            constant: false,
            lookup: format!("{}_Property", property.name),
        };

        Self::emit_value_member(
            out,
            target,
            &member,
            plan.getter.as_ref(),
            plan.setter.as_ref(),
            plan.by_ref,
            property.readonly_ref,
        )
    }

    fn emit_field(out: &mut SourceBuffer, target: &Target, plan: &FieldPlan) -> Result<()> {
        let field = &plan.field;
        let member = ValueMember {
            name: &field.name,
            declaring: &field.declaring,
            value_type: &field.field_type,
            is_static: field.is_static(),
            constant: field.is_literal(),
            lookup: format!("{}_Field", field.name),
        };

        Self::emit_value_member(
            out,
            target,
            &member,
            Some(&plan.getter),
            plan.setter.as_ref(),
            plan.by_ref,
            false,
        )
    }

    fn emit_value_member(
        out: &mut SourceBuffer,
        target: &Target,
        member: &ValueMember<'_>,
        getter: Option<&AccessorPlan>,
        setter: Option<&AccessorPlan>,
        by_ref: bool,
        readonly_ref: bool,
    ) -> Result<()> {
        out.open(format!(
            "{}{}{} {}",
            static_prefix(member.is_static),
            ref_prefix(by_ref, readonly_ref),
            render(member.value_type),
            escape_identifier(member.name)
        ));

        if let Some(getter) = getter {
            let expression = match getter.strategy {
                AccessStrategy::Direct => {
                    format!("{}.{}", member.receiver(), escape_identifier(member.name))
                }
                AccessStrategy::Trampoline => trampoline_call(
                    &format!("{}_Get", member.name),
                    planned(getter, member.name)?,
                    &[],
                ),
                AccessStrategy::DynamicInvoke if member.constant => cast(
                    member.value_type,
                    &format!("__Meta.{}.GetRawConstantValue()", member.lookup),
                ),
                AccessStrategy::DynamicInvoke => cast(
                    member.value_type,
                    &format!(
                        "__Meta.{}.GetValue({})",
                        member.lookup,
                        member.reflection_target()
                    ),
                ),
            };
            let modifier = if by_ref { "ref " } else { "" };
            out.line(format!("get => {modifier}{expression};"));
        }

        if let Some(setter) = setter {
            match setter.strategy {
                AccessStrategy::Direct => out.line(format!(
                    "set => {}.{} = value;",
                    member.receiver(),
                    escape_identifier(member.name)
                )),
                AccessStrategy::Trampoline => out.line(format!(
                    "set => {};",
                    trampoline_call(
                        &format!("{}_Set", member.name),
                        planned(setter, member.name)?,
                        &["value".to_string()],
                    )
                )),
                // Reflection writes into a boxed copy of a value type
                AccessStrategy::DynamicInvoke if !member.is_static && target.value_type => {
                    out.open("set");
                    out.line("object boxed = __instance;");
                    out.line(format!("__Meta.{}.SetValue(boxed, value);", member.lookup));
                    out.line(format!("__instance = ({})boxed;", target.spelled));
                    out.close();
                }
                AccessStrategy::DynamicInvoke => out.line(format!(
                    "set => __Meta.{}.SetValue({}, value);",
                    member.lookup,
                    member.reflection_target()
                )),
            }
        }

        out.close();
        Ok(())
    }

    fn emit_method(out: &mut SourceBuffer, target: &Target, plan: &MethodPlan) -> Result<()> {
        let method = &plan.method;
        let name = escape_identifier(&method.name);

        let generic_names: Vec<String> = method
            .generic_params
            .iter()
            .map(|param| escape_identifier(&param.name))
            .collect();
        let generics = if generic_names.is_empty() {
            String::new()
        } else {
            format!("<{}>", generic_names.join(", "))
        };

        let names: Vec<String> = method
            .params
            .iter()
            .enumerate()
            .map(|(index, param)| parameter_name(param, index))
            .collect();

        let declarations: Vec<String> = method
            .params
            .iter()
            .zip(&names)
            .enumerate()
            .map(|(index, (param, name))| {
                let declaration = parameter_declaration(param.mode, &param.param_type, name);
                match plan.defaults.values.get(index) {
                    Some(Some(default)) => format!("{declaration} = {default}"),
                    _ => declaration,
                }
            })
            .collect();

        let mut header = format!(
            "{}{}{} {name}{generics}({})",
            static_prefix(method.is_static()),
            ref_prefix(plan.by_ref, method.readonly_ref),
            render(&method.return_type),
            declarations.join(", ")
        );
        for clause in method.generic_params.iter().filter_map(constraint_clause) {
            header.push(' ');
            header.push_str(&clause);
        }

        out.open(header);

        let arguments: Vec<String> = method
            .params
            .iter()
            .zip(&names)
            .map(|(param, name)| argument(param, name))
            .collect();
        let returns_value = !method.return_type.is_void();

        match plan.body.strategy {
            AccessStrategy::Direct => {
                let receiver = if method.is_static() {
                    render(&method.declaring)
                } else {
                    "__instance".to_string()
                };
                let call = format!("{receiver}.{name}{generics}({})", arguments.join(", "));
                out.line(return_statement(&call, returns_value, plan.by_ref));
            }
            AccessStrategy::Trampoline => {
                let field = if method.is_generic() {
                    format!("{}_Holder{generics}.Invoke", plan.backing_name)
                } else {
                    format!("{}_Invoke", plan.backing_name)
                };
                let call = trampoline_call(&field, planned(&plan.body, &method.name)?, &arguments);
                out.line(return_statement(&call, returns_value, plan.by_ref));
            }
            AccessStrategy::DynamicInvoke => {
                Self::emit_dynamic_call(out, target, plan, &names, &generic_names);
            }
        }

        out.close();
        Ok(())
    }

    fn emit_dynamic_call(
        out: &mut SourceBuffer,
        target: &Target,
        plan: &MethodPlan,
        names: &[String],
        generic_names: &[String],
    ) {
        let method = &plan.method;

        let values: Vec<&str> = method
            .params
            .iter()
            .zip(names)
            .map(|(param, name)| {
                if param.mode == PassingMode::Out {
                    "null"
                } else {
                    name.as_str()
                }
            })
            .collect();
        if values.is_empty() {
            out.line("object[] __args = Array.Empty<object>();");
        } else {
            out.line(format!("object[] __args = new object[] {{ {} }};", values.join(", ")));
        }

        let handle = if generic_names.is_empty() {
            format!("__Meta.{}_Method", plan.backing_name)
        } else {
            let args: Vec<String> = generic_names
                .iter()
                .map(|name| format!("typeof({name})"))
                .collect();
            format!(
                "__Meta.{}_Method.MakeGenericMethod({})",
                plan.backing_name,
                args.join(", ")
            )
        };

        let boxed = !method.is_static() && target.value_type;
        let receiver = if method.is_static() {
            "null"
        } else if boxed {
            out.line("object __boxed = __instance;");
            "__boxed"
        } else {
            "__instance"
        };

        let invoke = format!("{handle}.Invoke({receiver}, __args)");
        let returns_value = !method.return_type.is_void();
        if returns_value {
            out.line(format!("object __result = {invoke};"));
        } else {
            out.line(format!("{invoke};"));
        }

        if boxed {
            out.line(format!("__instance = ({})__boxed;", target.spelled));
        }

        for (index, (param, name)) in method.params.iter().zip(names).enumerate() {
            if param.mode.writes_back() {
                out.line(format!(
                    "{name} = {};",
                    cast(&param.param_type, &format!("__args[{index}]"))
                ));
            }
        }

        if returns_value {
            out.line(format!("return {};", cast(&method.return_type, "__result")));
        }
    }

    fn emit_meta(out: &mut SourceBuffer, plan: &TypePlan) -> Result<()> {
        out.open("private static class __Meta");
        out.line(format!("internal const BindingFlags All = {ALL_MEMBERS};"));

        for property_plan in plan.properties.iter().filter(|plan| plan.needs_lookup()) {
            let property = &property_plan.property;
            out.blank();
            out.line(format!(
                "internal static readonly PropertyInfo {}_Property = {}.GetProperty({}, All);",
                property.name,
                type_handle(&property.declaring),
                quote(&property.name)
            ));
            Self::emit_accessor_trampolines(
                out,
                &property.name,
                property_plan.getter.as_ref(),
                property_plan.setter.as_ref(),
            )?;
        }

        for field_plan in plan.fields.iter().filter(|plan| plan.needs_lookup()) {
            let field = &field_plan.field;
            out.blank();
            out.line(format!(
                "internal static readonly FieldInfo {}_Field = {}.GetField({}, All);",
                field.name,
                type_handle(&field.declaring),
                quote(&field.name)
            ));
            Self::emit_accessor_trampolines(
                out,
                &field.name,
                Some(&field_plan.getter),
                field_plan.setter.as_ref(),
            )?;
        }

        for method_plan in plan.methods.iter().filter(|plan| plan.needs_lookup()) {
            out.blank();
            Self::emit_method_meta(out, method_plan)?;
        }

        out.close();
        Ok(())
    }

    fn emit_accessor_trampolines(
        out: &mut SourceBuffer,
        name: &str,
        getter: Option<&AccessorPlan>,
        setter: Option<&AccessorPlan>,
    ) -> Result<()> {
        for (accessor, suffix) in [(getter, "Get"), (setter, "Set")] {
            let Some(accessor) = accessor else {
                continue;
            };
            if accessor.strategy == AccessStrategy::Trampoline {
                emit_trampoline(out, &format!("{name}_{suffix}"), planned(accessor, name)?);
            }
        }
        Ok(())
    }

    fn emit_method_meta(out: &mut SourceBuffer, plan: &MethodPlan) -> Result<()> {
        let method = &plan.method;
        let types = if method.params.is_empty() {
            "Type.EmptyTypes".to_string()
        } else {
            let handles: Vec<String> = method.params.iter().map(parameter_handle).collect();
            format!("new Type[] {{ {} }}", handles.join(", "))
        };

        out.line(format!(
            "internal static readonly MethodInfo {}_Method = {}.GetMethod({}, {}, All, null, {types}, null);",
            plan.backing_name,
            type_handle(&method.declaring),
            quote(&method.name),
            method.generic_params.len()
        ));

        if plan.body.strategy != AccessStrategy::Trampoline {
            return Ok(());
        }

        let trampoline = planned(&plan.body, &method.name)?;
        if method.is_generic() {
            let names: Vec<String> = method
                .generic_params
                .iter()
                .map(|param| escape_identifier(&param.name))
                .collect();
            let mut header = format!(
                "internal static class {}_Holder<{}>",
                plan.backing_name,
                names.join(", ")
            );
            for clause in method.generic_params.iter().filter_map(constraint_clause) {
                header.push(' ');
                header.push_str(&clause);
            }

            out.open(header);
            emit_trampoline(out, "Invoke", trampoline);
            out.close();
        } else {
            emit_trampoline(out, &format!("{}_Invoke", plan.backing_name), trampoline);
        }

        Ok(())
    }
}
