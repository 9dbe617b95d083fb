//! C# spellings of default parameter values.
//!
//! A facade method repeats the default values of the wrapped method so callers can omit the
//! same arguments. Every [`Literal`] kind except raw bytes has a spelling; enum-typed
//! parameters get their value spelled as named constants.

use crate::{
    facade::render::{needs_cast, parameter_name, render},
    metadata::{
        literal::Literal,
        members::{ParameterDescriptor, PassingMode},
        types::{TypeFlavor, TypeRef},
    },
    Error, Result,
};

/// Quote and escape `value` as a C# string literal
#[must_use]
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        push_escaped(&mut quoted, c, '"');
    }
    quoted.push('"');
    quoted
}

fn push_escaped(out: &mut String, c: char, delimiter: char) {
    match c {
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\0' => out.push_str("\\0"),
        c if c == delimiter => {
            out.push('\\');
            out.push(c);
        }
        c if c.is_control() => out.push_str(&format!("\\u{:04x}", u32::from(c))),
        c => out.push(c),
    }
}

fn render_char(unit: u16) -> String {
    match char::from_u32(u32::from(unit)) {
        Some(c) => {
            let mut quoted = String::from("'");
            push_escaped(&mut quoted, c, '\'');
            quoted.push('\'');
            quoted
        }
        // Lone surrogate
        None => format!("'\\u{unit:04x}'"),
    }
}

fn render_float(spelled: &str, keyword: &str, suffix: char) -> String {
    match spelled {
        "NaN" => format!("{keyword}.NaN"),
        "inf" => format!("{keyword}.PositiveInfinity"),
        "-inf" => format!("{keyword}.NegativeInfinity"),
        finite => format!("{finite}{suffix}"),
    }
}

/// Spell an enum value with the enum's named constants
///
/// An exact match is used as is. Otherwise the value is decomposed into named flags, largest
/// first, and the chosen names are joined with `|` in ascending order. If no name matches or
/// bits are left over, the value is cast instead.
#[must_use]
pub fn render_enum(ty: &TypeRef, value: i64) -> String {
    let cast = if value < 0 {
        format!("({value})")
    } else {
        value.to_string()
    };
    spell_enum(ty, value, &cast)
}

/// Spell a value of an enum with an `ulong` underlying type
///
/// Named constants are matched on the bit pattern, like [`render_enum`], but a cast keeps the
/// unsigned value: `(E)(-1)` is not a valid constant conversion to an `ulong` enum.
#[must_use]
pub fn render_unsigned_enum(ty: &TypeRef, value: u64) -> String {
    #[allow(clippy::cast_possible_wrap)]
    let bits = value as i64;
    spell_enum(ty, bits, &value.to_string())
}

fn spell_enum(ty: &TypeRef, value: i64, cast: &str) -> String {
    let type_name = render(ty);

    if let Some(exact) = ty.enum_values.iter().find(|named| named.value == value) {
        return format!("{type_name}.{}", exact.name);
    }

    let mut flags: Vec<_> = ty
        .enum_values
        .iter()
        .filter(|named| named.value != 0)
        .collect();
    flags.sort_by(|left, right| right.value.cmp(&left.value));

    let mut remaining = value;
    let mut chosen = Vec::new();
    for named in flags {
        if value & named.value == named.value && remaining & named.value != 0 {
            remaining &= !named.value;
            chosen.push(named);
        }
    }

    if remaining != 0 || chosen.is_empty() {
        return format!("({type_name}){cast}");
    }

    chosen.sort_by_key(|named| named.value);
    chosen
        .iter()
        .map(|named| format!("{type_name}.{}", named.name))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Spell `literal` as the default value of a parameter of type `ty`
///
/// ## Arguments
/// * `literal` - The default value
/// * `ty`      - The parameter type, deciding `null` vs. `default` and enum spelling
/// * `member`  - Member and parameter name, for the error message
///
/// # Errors
/// Returns [`Error::UnsupportedLiteral`] for [`Literal::Bytes`], which has no spelling.
pub fn render_default(literal: &Literal, ty: &TypeRef, member: &str) -> Result<String> {
    if ty.flavor == TypeFlavor::Enum {
        if let Literal::U8(value) = literal {
            return Ok(render_unsigned_enum(ty, *value));
        }
        if let Some(value) = literal.as_i64() {
            return Ok(render_enum(ty, value));
        }
    }

    Ok(match literal {
        Literal::Null if ty.is_value_type() => "default".to_string(),
        Literal::Null => "null".to_string(),
        Literal::Boolean(value) => value.to_string(),
        Literal::Char(unit) => render_char(*unit),
        Literal::I1(value) => value.to_string(),
        Literal::U1(value) => value.to_string(),
        Literal::I2(value) => value.to_string(),
        Literal::U2(value) => value.to_string(),
        Literal::I4(value) => value.to_string(),
        Literal::U4(value) => format!("{value}U"),
        Literal::I8(value) => format!("{value}L"),
        Literal::U8(value) => format!("{value}UL"),
        Literal::R4(value) => render_float(&format!("{value:?}"), "float", 'f'),
        Literal::R8(value) => render_float(&format!("{value:?}"), "double", 'd'),
        Literal::String(value) => quote(value),
        Literal::Bytes(_) => {
            return Err(Error::UnsupportedLiteral {
                member: member.to_string(),
                kind: literal.kind().to_string(),
            })
        }
    })
}

/// Default values of one parameter list, as the facade declares them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultPlan {
    /// Spelled default per parameter; `None` for required parameters
    pub values: Vec<Option<String>>,
    /// Parameters whose default could not be expressed and was dropped
    pub dropped: Vec<String>,
}

/// Decide which parameters keep their default value
///
/// Only the trailing run of by-value and `in` parameters with an expressible default keeps
/// one; C# requires optional parameters to come last. A non-null default on a parameter whose
/// type renders as `object` can not be expressed: it is dropped (and reported) and ends the
/// run.
///
/// # Errors
/// Returns [`Error::UnsupportedLiteral`] if any parameter carries a [`Literal::Bytes`]
/// default, whether or not it would end up in the trailing run.
pub fn parameter_defaults(member: &str, params: &[ParameterDescriptor]) -> Result<DefaultPlan> {
    if let Some((index, param)) = params
        .iter()
        .enumerate()
        .find(|(_, param)| matches!(param.default, Some(Literal::Bytes(_))))
    {
        return Err(Error::UnsupportedLiteral {
            member: format!("{member}({})", parameter_name(param, index)),
            kind: "bytes".to_string(),
        });
    }

    let mut plan = DefaultPlan {
        values: vec![None; params.len()],
        dropped: Vec::new(),
    };

    for (index, param) in params.iter().enumerate().rev() {
        let Some(default) = &param.default else {
            break;
        };
        if !matches!(param.mode, PassingMode::ByValue | PassingMode::In) {
            break;
        }
        if *default != Literal::Null && !needs_cast(&param.param_type) {
            plan.dropped.push(parameter_name(param, index));
            break;
        }

        let name = format!("{member}({})", parameter_name(param, index));
        plan.values[index] = Some(render_default(default, &param.param_type, &name)?);
    }

    Ok(plan)
}
