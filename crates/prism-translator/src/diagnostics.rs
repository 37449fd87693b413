use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// What the message is about, e.g. `"qualifier sequence"` or the offending token.
    pub token: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
        };
        if self.token.is_empty() {
            write!(f, "{level}: {}", self.message)
        } else {
            write!(f, "{level}: '{}' : {}", self.token, self.message)
        }
    }
}

/// Info-log sink for user-facing compile diagnostics.
///
/// Recording a diagnostic never interrupts the caller; compilation keeps going so that one
/// attempt reports as much as possible.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, token: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Error, token.into(), message.into());
    }

    pub fn warning(&mut self, token: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Warning, token.into(), message.into());
    }

    fn push(&mut self, severity: Severity, token: String, message: String) {
        tracing::debug!(?severity, %token, %message, "shader diagnostic");
        self.entries.push(Diagnostic {
            severity,
            token,
            message,
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Renders all entries as an info log, one per line.
    pub fn info_log(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        out
    }
}
