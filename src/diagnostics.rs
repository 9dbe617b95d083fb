//! Diagnostics collected while generating facades.
//!
//! Generation never aborts a run. Whatever is skipped or degraded along the way (a type that
//! can not get a facade, a trampoline that fell back to dynamic invocation, a default value
//! that could not be expressed) is reported as a [`Diagnostic`] instead.
//!
//! The [`Diagnostics`] container uses `boxcar::Vec` for lock-free appends, so the per-type
//! pipeline stages can report through a shared reference.
//!
//! # Example
//!
//! ```rust
//! use dotfacade::{Diagnostic, Diagnostics, Severity};
//!
//! let diagnostics = Diagnostics::new();
//! diagnostics.push(
//!     Diagnostic::new(Severity::Warning, "Ns.Foo", "trampoline unavailable")
//!         .with_member("Count"),
//! );
//!
//! assert!(diagnostics.has_warnings());
//! assert!(!diagnostics.has_errors());
//! assert_eq!(
//!     diagnostics.iter().next().map(ToString::to_string).as_deref(),
//!     Some("[WARN] Ns.Foo::Count: trampoline unavailable")
//! );
//! ```

use std::fmt::{self, Write};

use strum::{Display, EnumIter};

/// Severity level of a diagnostic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Severity {
    /// Informational message, nothing was lost (e.g. an excluded type was skipped).
    #[strum(serialize = "INFO")]
    Info,

    /// Something was degraded but the facade was still produced.
    #[strum(serialize = "WARN")]
    Warning,

    /// A type produced no facade.
    #[strum(serialize = "ERROR")]
    Error,
}

/// A single diagnostic entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level of this diagnostic.
    pub severity: Severity,

    /// Qualified name of the type the diagnostic belongs to.
    pub type_name: String,

    /// The member the diagnostic belongs to, if it is member-specific.
    pub member: Option<String>,

    /// Human-readable description of the issue.
    pub message: String,
}

impl Diagnostic {
    /// Creates a new type-level diagnostic.
    ///
    /// # Arguments
    ///
    /// * `severity` - Severity level of the diagnostic
    /// * `type_name` - Qualified name of the affected type
    /// * `message` - Human-readable description
    pub fn new(severity: Severity, type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            type_name: type_name.into(),
            member: None,
            message: message.into(),
        }
    }

    /// Narrows the diagnostic to a member of the type.
    #[must_use]
    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.member = Some(member.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.type_name)?;

        if let Some(member) = &self.member {
            write!(f, "::{member}")?;
        }

        write!(f, ": {}", self.message)
    }
}

/// Thread-safe container for collecting diagnostic entries.
#[derive(Debug)]
pub struct Diagnostics {
    entries: boxcar::Vec<Diagnostic>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Diagnostics {
    fn clone(&self) -> Self {
        let copy = Diagnostics::new();
        for entry in self.iter() {
            copy.push(entry.clone());
        }
        copy
    }
}

impl Diagnostics {
    /// Creates a new empty diagnostics container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: boxcar::Vec::new(),
        }
    }

    /// Adds an informational diagnostic for a type.
    pub fn info(&self, type_name: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::new(Severity::Info, type_name, message));
    }

    /// Adds a warning diagnostic for a type.
    pub fn warning(&self, type_name: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::new(Severity::Warning, type_name, message));
    }

    /// Adds an error diagnostic for a type.
    pub fn error(&self, type_name: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::new(Severity::Error, type_name, message));
    }

    /// Adds a diagnostic entry directly.
    pub fn push(&self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Appends all entries of `other`, keeping their order.
    pub fn extend(&self, other: &Diagnostics) {
        for entry in other.iter() {
            self.push(entry.clone());
        }
    }

    /// Returns true if any diagnostics have been collected.
    pub fn has_any(&self) -> bool {
        self.entries.count() > 0
    }

    /// Returns true if any error-level diagnostics have been collected.
    pub fn has_errors(&self) -> bool {
        self.iter().any(|d| d.severity == Severity::Error)
    }

    /// Returns true if any warning-level diagnostics have been collected.
    pub fn has_warnings(&self) -> bool {
        self.iter().any(|d| d.severity == Severity::Warning)
    }

    /// Returns the total number of diagnostics.
    pub fn count(&self) -> usize {
        self.entries.count()
    }

    /// Returns the number of diagnostics with the given severity.
    pub fn count_of(&self, severity: Severity) -> usize {
        self.iter().filter(|d| d.severity == severity).count()
    }

    /// Returns an iterator over all diagnostics, in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().map(|(_, d)| d)
    }

    /// Returns all errors as a vector.
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.iter().filter(|d| d.severity == Severity::Error).collect()
    }

    /// Returns all warnings as a vector.
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.iter().filter(|d| d.severity == Severity::Warning).collect()
    }

    /// Returns the diagnostics of one type.
    pub fn for_type(&self, type_name: &str) -> Vec<&Diagnostic> {
        self.iter().filter(|d| d.type_name == type_name).collect()
    }

    /// Formats a summary of all diagnostics for display.
    pub fn summary(&self) -> String {
        let mut output = String::new();

        let _ = writeln!(
            output,
            "Diagnostics: {} error(s), {} warning(s), {} info(s)",
            self.count_of(Severity::Error),
            self.count_of(Severity::Warning),
            self.count_of(Severity::Info)
        );

        for diag in self.iter() {
            let _ = writeln!(output, "  {diag}");
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::new(Severity::Error, "Ns.Hidden", "type is not visible");
        assert_eq!(diag.to_string(), "[ERROR] Ns.Hidden: type is not visible");

        let diag = Diagnostic::new(Severity::Info, "Ns.Foo", "excluded").with_member("Bar");
        assert_eq!(diag.member.as_deref(), Some("Bar"));
        assert_eq!(diag.to_string(), "[INFO] Ns.Foo::Bar: excluded");
    }

    #[test]
    fn test_counts_and_filters() {
        let diagnostics = Diagnostics::new();
        assert!(!diagnostics.has_any());

        diagnostics.info("Ns.A", "skipped");
        diagnostics.warning("Ns.B", "fallback");
        diagnostics.error("Ns.B", "failed");

        assert_eq!(diagnostics.count(), 3);
        assert_eq!(diagnostics.count_of(Severity::Warning), 1);
        assert_eq!(diagnostics.errors().len(), 1);
        assert_eq!(diagnostics.warnings().len(), 1);
        assert_eq!(diagnostics.for_type("Ns.B").len(), 2);

        let summary = diagnostics.summary();
        assert!(summary.contains("1 error(s), 1 warning(s), 1 info(s)"));
        assert!(summary.contains("[WARN] Ns.B: fallback"));
    }

    #[test]
    fn test_extend_and_clone_keep_order() {
        let first = Diagnostics::new();
        first.info("Ns.A", "one");
        let second = Diagnostics::new();
        second.info("Ns.B", "two");

        first.extend(&second);
        let copy = first.clone();
        let names: Vec<_> = copy.iter().map(|d| d.type_name.as_str()).collect();
        assert_eq!(names, vec!["Ns.A", "Ns.B"]);
    }

    #[test]
    fn test_concurrent_push() {
        let diagnostics = Arc::new(Diagnostics::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = Arc::clone(&diagnostics);
                thread::spawn(move || {
                    for j in 0..25 {
                        shared.warning(format!("Ns.T{i}"), format!("entry {j}"));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(diagnostics.count(), 100);
    }
}
