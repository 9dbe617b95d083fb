//! Rendering type descriptors as C# source.
//!
//! [`render`] turns a [`TypeRef`] into the spelling a facade uses for it. Types a facade can not
//! name (anything not visible outside its assembly, or composed of such a type) collapse to
//! `object`; everything else is spelled with its qualified name, nested types joined with `.`
//! and generic arity markers replaced by argument lists.
//!
//! The remaining functions produce the other type-dependent fragments the emitter needs:
//! reflection expressions that resolve a type at run time ([`type_handle`]), generic
//! constraint clauses ([`constraint_clause`]) and escaped identifiers.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use dotfacade::facade::render::render;
//! use dotfacade::metadata::types::{TypeFlavor, TypeRef};
//!
//! let dict = Arc::new(TypeRef::class("System.Collections.Generic", "Dictionary`2"));
//! let int = Arc::new(TypeRef::primitive(TypeFlavor::I4));
//! let string = Arc::new(TypeRef::primitive(TypeFlavor::String));
//! let instance = TypeRef::generic_instance(&dict, vec![int, string]);
//!
//! assert_eq!(render(&instance), "System.Collections.Generic.Dictionary<int, string>");
//! ```

use crate::{
    facade::literal::quote,
    metadata::{
        members::{GenericParamAttributes, GenericParameter, ParameterDescriptor},
        types::{TypeFlavor, TypeRc, TypeRef},
    },
};

/// The spelling of a type a facade can not name
pub const PLACEHOLDER: &str = "object";

/// Reserved C# keywords; identifiers spelled like one need an `@` prefix
const KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

/// Render a type as C# source
///
/// Total and deterministic. In order of priority: non-visible types render as `object`,
/// generic parameters as their declared name, arrays as their element followed by `[]` (or
/// `[,]` and so on for higher ranks), built-in types as their keyword and everything else as
/// its qualified name with generic arguments substituted.
///
/// The by-ref marker is not rendered; `ref`/`in`/`out` modifiers belong to the declaration.
#[must_use]
pub fn render(ty: &TypeRef) -> String {
    if !ty.is_visible {
        return PLACEHOLDER.to_string();
    }

    match ty.flavor {
        TypeFlavor::GenericParameter { .. } => ty.name.clone(),
        TypeFlavor::Array { rank } => {
            let element = ty
                .element
                .as_ref()
                .map_or_else(|| PLACEHOLDER.to_string(), |element| render(element));
            format!("{element}[{}]", ",".repeat(rank.saturating_sub(1) as usize))
        }
        flavor => match flavor.keyword() {
            Some(keyword) => keyword.to_string(),
            None => substitute_generic_arity(
                &ty.fullname().replace('+', "."),
                &ty.generic_args,
                render,
            ),
        },
    }
}

/// Replace every arity marker `` `N `` in `raw` with the next `N` arguments, rendered
///
/// Markers are walked left to right; each consumes exactly its count of arguments from the
/// front of `args`. The walk never fails: a marker that asks for more arguments than remain
/// consumes whatever is left, and produces no brackets at all when nothing is left. Surplus
/// arguments are ignored. A backtick not followed by digits is kept as is.
///
/// ## Arguments
/// * `raw`    - The qualified name, nested types already joined with `.`
/// * `args`   - All generic arguments, outermost nesting level first
/// * `render` - How to spell a single argument
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use dotfacade::facade::render::{render, substitute_generic_arity};
/// use dotfacade::metadata::types::{TypeFlavor, TypeRef};
///
/// let int = Arc::new(TypeRef::primitive(TypeFlavor::I4));
/// let string = Arc::new(TypeRef::primitive(TypeFlavor::String));
///
/// let spelled = substitute_generic_arity("Ns.Outer`1.Inner`1", &[int, string], render);
/// assert_eq!(spelled, "Ns.Outer<int>.Inner<string>");
/// ```
pub fn substitute_generic_arity<F>(raw: &str, args: &[TypeRc], render: F) -> String
where
    F: Fn(&TypeRef) -> String,
{
    let mut result = String::with_capacity(raw.len() + args.len() * 8);
    let mut remaining = args;
    let mut chars = raw.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        if c != '`' {
            result.push(c);
            continue;
        }

        let start = position + c.len_utf8();
        let mut end = start;
        while let Some(&(index, digit)) = chars.peek() {
            if !digit.is_ascii_digit() {
                break;
            }
            end = index + digit.len_utf8();
            chars.next();
        }

        let Ok(arity) = raw[start..end].parse::<usize>() else {
            // Not a marker (no digits, or too many to be real)
            result.push_str(&raw[position..end]);
            continue;
        };

        let take = arity.min(remaining.len());
        let (consumed, rest) = remaining.split_at(take);
        remaining = rest;

        if !consumed.is_empty() {
            let rendered: Vec<String> = consumed.iter().map(|arg| render(arg.as_ref())).collect();
            result.push('<');
            result.push_str(&rendered.join(", "));
            result.push('>');
        }
    }

    result
}

/// Can a value be cast to this type's rendered spelling
///
/// False exactly for types that render as the universal placeholder; a cast to `object` is
/// never needed.
#[must_use]
pub fn needs_cast(ty: &TypeRef) -> bool {
    render(ty) != PLACEHOLDER
}

/// Is `name` a reserved C# keyword
#[must_use]
pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.binary_search(&name).is_ok()
}

/// Make `name` usable as a C# identifier
#[must_use]
pub fn escape_identifier(name: &str) -> String {
    if is_keyword(name) {
        format!("@{name}")
    } else {
        name.to_string()
    }
}

/// The identifier a facade uses for a parameter
///
/// Metadata may omit parameter names; those become `arg<index>`.
#[must_use]
pub fn parameter_name(param: &ParameterDescriptor, index: usize) -> String {
    if param.name.is_empty() {
        format!("arg{index}")
    } else {
        escape_identifier(&param.name)
    }
}

/// The reflection expression resolving `ty` at run time
///
/// Visible types use `typeof`; everything else is looked up by name in its assembly and
/// composed with `MakeArrayType`/`MakeGenericType`/`MakeByRefType` as needed. Method generic
/// parameters become signature placeholders, so the result can be used to select a generic
/// method overload.
#[must_use]
pub fn type_handle(ty: &TypeRef) -> String {
    if ty.is_by_ref {
        let mut element = ty.clone();
        element.is_by_ref = false;
        return format!("{}.MakeByRefType()", type_handle(&element));
    }

    match ty.flavor {
        TypeFlavor::GenericParameter {
            index,
            method: true,
        } => return format!("Type.MakeGenericMethodParameter({index})"),
        TypeFlavor::GenericParameter { .. } => return format!("typeof({})", ty.name),
        _ => {}
    }

    // `typeof` can not name method generic parameters outside the method
    if ty.is_visible && !mentions_method_parameter(ty) {
        return format!("typeof({})", render(ty));
    }

    if let Some(element) = &ty.element {
        let rank = ty.array_rank();
        return if rank <= 1 {
            format!("{}.MakeArrayType()", type_handle(element))
        } else {
            format!("{}.MakeArrayType({rank})", type_handle(element))
        };
    }

    let lookup = format!(
        "Type.GetType({}, true)",
        quote(&format!("{}, {}", ty.fullname(), ty.assembly))
    );
    if ty.generic_args.is_empty() {
        lookup
    } else {
        let args: Vec<String> = ty.generic_args.iter().map(|arg| type_handle(arg)).collect();
        format!("{lookup}.MakeGenericType({})", args.join(", "))
    }
}

fn mentions_method_parameter(ty: &TypeRef) -> bool {
    matches!(ty.flavor, TypeFlavor::GenericParameter { method: true, .. })
        || ty.generic_args.iter().any(|arg| mentions_method_parameter(arg))
        || ty
            .element
            .as_ref()
            .is_some_and(|element| mentions_method_parameter(element))
}

/// The `where` clause of a generic method parameter, if it has any constraint
///
/// Special constraints come first (`class` or `struct`), then the type constraints in
/// declaration order, then `new()`. `System.ValueType` and `new()` are implied by `struct`
/// and are not repeated.
#[must_use]
pub fn constraint_clause(param: &GenericParameter) -> Option<String> {
    let is_struct = param
        .flags
        .contains(GenericParamAttributes::NOT_NULLABLE_VALUE_TYPE_CONSTRAINT);

    let mut parts = Vec::new();
    if is_struct {
        parts.push("struct".to_string());
    } else if param
        .flags
        .contains(GenericParamAttributes::REFERENCE_TYPE_CONSTRAINT)
    {
        parts.push("class".to_string());
    }

    parts.extend(
        param
            .constraints
            .iter()
            .filter(|constraint| !(is_struct && constraint.fullname() == "System.ValueType"))
            .map(|constraint| render(constraint)),
    );

    if !is_struct
        && param
            .flags
            .contains(GenericParamAttributes::DEFAULT_CONSTRUCTOR_CONSTRAINT)
    {
        parts.push("new()".to_string());
    }

    if parts.is_empty() {
        None
    } else {
        Some(format!(
            "where {} : {}",
            escape_identifier(&param.name),
            parts.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test::{class, hidden_class, int, method_param, primitive, string};

    #[test]
    fn test_primitives_render_keywords() {
        let cases = [
            (TypeFlavor::Void, "void"),
            (TypeFlavor::Boolean, "bool"),
            (TypeFlavor::Char, "char"),
            (TypeFlavor::I1, "sbyte"),
            (TypeFlavor::U1, "byte"),
            (TypeFlavor::I2, "short"),
            (TypeFlavor::U2, "ushort"),
            (TypeFlavor::I4, "int"),
            (TypeFlavor::U4, "uint"),
            (TypeFlavor::I8, "long"),
            (TypeFlavor::U8, "ulong"),
            (TypeFlavor::R4, "float"),
            (TypeFlavor::R8, "double"),
            (TypeFlavor::I, "nint"),
            (TypeFlavor::U, "nuint"),
            (TypeFlavor::Object, "object"),
            (TypeFlavor::String, "string"),
            (TypeFlavor::Decimal, "decimal"),
        ];

        for (flavor, keyword) in cases {
            assert_eq!(render(&primitive(flavor)), keyword, "{flavor}");
        }
    }

    #[test]
    fn test_nested_generic_arity_split() {
        let outer = class(1, "Ns", "Outer`1+Inner`2");
        let bool_type = primitive(TypeFlavor::Boolean);
        let instance = TypeRef::generic_instance(&outer, vec![int(), string(), bool_type]);

        assert_eq!(render(&instance), "Ns.Outer<int>.Inner<string, bool>");
    }

    #[test]
    fn test_nested_non_generic_inner() {
        let outer = class(1, "Ns", "Outer`1+Inner");
        let instance = TypeRef::generic_instance(&outer, vec![int()]);
        assert_eq!(render(&instance), "Ns.Outer<int>.Inner");
    }

    #[test]
    fn test_arity_walk_too_few_arguments() {
        let spelled = substitute_generic_arity("A`2.B`1", &[int()], render);
        assert_eq!(spelled, "A<int>.B");

        let spelled = substitute_generic_arity("A`2", &[], render);
        assert_eq!(spelled, "A");
    }

    #[test]
    fn test_arity_walk_surplus_arguments() {
        let spelled = substitute_generic_arity("A`1", &[int(), string()], render);
        assert_eq!(spelled, "A<int>");
    }

    #[test]
    fn test_arity_walk_stray_backtick() {
        assert_eq!(substitute_generic_arity("A`", &[int()], render), "A`");
        assert_eq!(substitute_generic_arity("A`x`1", &[int()], render), "A`x<int>");
        assert_eq!(substitute_generic_arity("Plain", &[int()], render), "Plain");
    }

    #[test]
    fn test_arity_walk_multi_digit() {
        let args: Vec<TypeRc> = (0..12).map(|_| int()).collect();
        let spelled = substitute_generic_arity("Wide`12", &args, render);
        assert_eq!(spelled.matches("int").count(), 12);
        assert!(spelled.starts_with("Wide<int, "));
    }

    #[test]
    fn test_arrays() {
        let single = TypeRef::array(&int(), 1);
        assert_eq!(render(&single), "int[]");

        let cube = TypeRef::array(&string(), 3);
        assert_eq!(render(&cube), "string[,,]");

        let jagged = TypeRef::array(&Arc::new(single), 1);
        assert_eq!(render(&jagged), "int[][]");
    }

    #[test]
    fn test_hidden_types_collapse() {
        let secret = hidden_class(1, "Ns", "Secret");
        assert_eq!(render(&secret), "object");
        assert_eq!(render(&TypeRef::array(&secret, 1)), "object");

        let list = class(2, "System.Collections.Generic", "List`1");
        let instance = TypeRef::generic_instance(&list, vec![secret.clone()]);
        assert_eq!(render(&instance), "object");

        assert!(!needs_cast(&secret));
        assert!(!needs_cast(&primitive(TypeFlavor::Object)));
        assert!(needs_cast(&int()));
    }

    #[test]
    fn test_generic_parameter_and_nested_name() {
        assert_eq!(render(&method_param("TKey", 0)), "TKey");
        assert_eq!(render(&class(1, "Ns", "Outer+Inner")), "Ns.Outer.Inner");
        assert_eq!(render(&class(1, "", "Global")), "Global");
    }

    #[test]
    fn test_escape_identifier() {
        assert_eq!(escape_identifier("class"), "@class");
        assert_eq!(escape_identifier("value"), "value");
        assert_eq!(escape_identifier("object"), "@object");

        let mut sorted = KEYWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, KEYWORDS, "keyword table must stay sorted");
    }

    #[test]
    fn test_parameter_name() {
        let unnamed = ParameterDescriptor::new("", &int());
        assert_eq!(parameter_name(&unnamed, 2), "arg2");

        let keyword = ParameterDescriptor::new("in", &int());
        assert_eq!(parameter_name(&keyword, 0), "@in");
    }

    #[test]
    fn test_type_handle() {
        assert_eq!(type_handle(&int()), "typeof(int)");
        assert_eq!(
            type_handle(&method_param("T", 1)),
            "Type.MakeGenericMethodParameter(1)"
        );
        assert_eq!(
            type_handle(&TypeRef::by_ref(&int())),
            "typeof(int).MakeByRefType()"
        );
        assert_eq!(
            type_handle(&TypeRef::array(&method_param("T", 0), 1)),
            "Type.MakeGenericMethodParameter(0).MakeArrayType()"
        );

        let secret = hidden_class(1, "Ns", "Outer+Secret");
        assert_eq!(
            type_handle(&secret),
            "Type.GetType(\"Ns.Outer+Secret, Sample\", true)"
        );
        assert_eq!(
            type_handle(&TypeRef::array(&secret, 2)),
            "Type.GetType(\"Ns.Outer+Secret, Sample\", true).MakeArrayType(2)"
        );

        let list = class(2, "System.Collections.Generic", "List`1");
        let instance = TypeRef::generic_instance(&list, vec![secret]);
        assert_eq!(
            type_handle(&instance),
            "Type.GetType(\"System.Collections.Generic.List`1, Sample\", true)\
             .MakeGenericType(Type.GetType(\"Ns.Outer+Secret, Sample\", true))"
        );
    }

    #[test]
    fn test_constraint_clause() {
        assert_eq!(constraint_clause(&GenericParameter::new("T", 0)), None);

        let equatable = class(1, "System", "IEquatable`1");
        let t = method_param("T", 0);
        let constraint = Arc::new(TypeRef::generic_instance(&equatable, vec![t]));
        let param = GenericParameter::new("T", 0).with_constraint(&constraint);
        assert_eq!(
            constraint_clause(&param).as_deref(),
            Some("where T : System.IEquatable<T>")
        );

        let reference = GenericParameter::new("T", 0).with_flags(
            GenericParamAttributes::REFERENCE_TYPE_CONSTRAINT
                | GenericParamAttributes::DEFAULT_CONSTRUCTOR_CONSTRAINT,
        );
        assert_eq!(
            constraint_clause(&reference).as_deref(),
            Some("where T : class, new()")
        );

        let value_type = class(3, "System", "ValueType");
        let structure = GenericParameter::new("T", 0)
            .with_flags(
                GenericParamAttributes::NOT_NULLABLE_VALUE_TYPE_CONSTRAINT
                    | GenericParamAttributes::DEFAULT_CONSTRUCTOR_CONSTRAINT,
            )
            .with_constraint(&value_type);
        assert_eq!(
            constraint_clause(&structure).as_deref(),
            Some("where T : struct")
        );
    }
}
