use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Failures are always scoped to the smallest unit possible. The generation driver converts
/// an error raised while generating one type into a [`crate::Diagnostic`] and continues with
/// the remaining types, so none of these variants ever aborts a whole run.
///
/// # Error Categories
///
/// ## Generation Errors
/// - [`Error::UnsupportedTypeShape`] - The target type can not get a facade at all
/// - [`Error::UnsupportedLiteral`] - A default parameter value has no C# spelling
/// - [`Error::UnsupportedNativeCodegen`] - A trampoline could not be produced
///
/// ## Metadata Errors
/// - [`Error::TypeNotFound`] - A token did not resolve in the metadata registry
/// - [`Error::Malformed`] - A descriptor handed to the registry is inconsistent
///
/// # Examples
///
/// ```rust
/// use dotfacade::Error;
///
/// fn describe(err: &Error) -> &'static str {
///     match err {
///         Error::UnsupportedTypeShape { .. } => "type skipped",
///         Error::UnsupportedLiteral { .. } => "unit failed",
///         Error::UnsupportedNativeCodegen { .. } => "fell back to dynamic invocation",
///         _ => "other",
///     }
/// }
/// # let _ = describe;
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The type itself can not be wrapped by a facade.
    ///
    /// Raised for types that are not visible outside their assembly, open generic type
    /// definitions and compiler-synthesized types. The type is skipped; generation continues
    /// for every other discovered type.
    #[error("Unsupported type shape - {type_name}: {reason}")]
    UnsupportedTypeShape {
        /// The qualified name of the rejected type
        type_name: String,
        /// Why the type was rejected
        reason: String,
    },

    /// A default parameter value has a kind the literal renderer can not express.
    ///
    /// Fatal to the enclosing type's facade only.
    #[error("Unsupported literal on {member} - {kind}")]
    UnsupportedLiteral {
        /// The member (and parameter) carrying the literal
        member: String,
        /// The literal kind that could not be rendered
        kind: String,
    },

    /// The trampoline compiler could not produce a callable for a member.
    ///
    /// The strategy selector treats this as a request to retry the member with dynamic
    /// invocation; it never reaches the caller of [`crate::FacadeGenerator::run`].
    #[error("Unsupported native codegen for {member} - {reason}")]
    UnsupportedNativeCodegen {
        /// The member the trampoline was requested for
        member: String,
        /// Why the compiler refused
        reason: String,
    },

    /// Failed to find a type in the metadata registry.
    ///
    /// The associated [`Token`] identifies which type was not found.
    #[error("Failed to find type in metadata - {0}")]
    TypeNotFound(Token),

    /// A descriptor is inconsistent and could not be registered.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Failure reported by a caller-supplied component, such as a custom
    /// [`crate::facade::strategy::TrampolineCompiler`] that can not build a delegate for a
    /// reason other than [`Error::UnsupportedNativeCodegen`].
    ///
    /// The generator never builds this variant. When a compiler returns it, the error fails the
    /// type being generated and is reported as an error diagnostic for that type.
    #[error("{0}")]
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_macro_records_location() {
        let err = malformed_error!("bad descriptor {}", 7);
        match err {
            Error::Malformed {
                message,
                file,
                line,
            } => {
                assert_eq!(message, "bad descriptor 7");
                assert!(file.ends_with("error.rs"));
                assert!(line > 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_display_messages() {
        let err = Error::UnsupportedTypeShape {
            type_name: "Ns.Hidden".to_string(),
            reason: "type is not visible".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported type shape - Ns.Hidden: type is not visible"
        );

        let err = Error::TypeNotFound(Token::new(0x0200_0001));
        assert_eq!(err.to_string(), "Failed to find type in metadata - 0x02000001");
    }
}
