// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info = 0b001,
    Warning = 0b010,
    Error = 0b100,
}

impl Severity {
    const fn bit(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

impl Diagnostic {
    pub fn new(severity: Severity, summary: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            details: details.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn info(summary: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(Severity::Info, summary, details)
    }

    pub fn warning(summary: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(Severity::Warning, summary, details)
    }

    pub fn error(summary: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(Severity::Error, summary, details)
    }

    /// Error diagnostic whose details are the display form of `err`.
    pub fn from_error(summary: impl Into<String>, err: &dyn std::error::Error) -> Self {
        Self::error(summary, err.to_string())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.details.is_empty() {
            write!(f, "{}: {}", self.severity, self.summary)
        } else {
            write!(f, "{}: {}: {}", self.severity, self.summary, self.details)
        }
    }
}

/// Ordered, thread-safe collection of diagnostics.
///
/// The severities seen so far are OR-ed into a bitmask so that
/// [`Diagnostics::has_errors`] and [`Diagnostics::has_warnings`] never take
/// the lock.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: RwLock<Vec<Diagnostic>>,
    mask: AtomicU8,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, diagnostic: Diagnostic) {
        let bit = diagnostic.severity.bit();
        self.entries.write().push(diagnostic);
        self.mask.fetch_or(bit, Ordering::Release);
    }

    pub fn info(&self, summary: impl Into<String>, details: impl Into<String>) {
        self.push(Diagnostic::info(summary, details));
    }

    pub fn warning(&self, summary: impl Into<String>, details: impl Into<String>) {
        self.push(Diagnostic::warning(summary, details));
    }

    pub fn error(&self, summary: impl Into<String>, details: impl Into<String>) {
        self.push(Diagnostic::error(summary, details));
    }

    /// Move all entries of `other` into this collection, preserving order.
    pub fn append(&self, other: Diagnostics) {
        let entries = other.into_vec();
        if entries.is_empty() {
            return;
        }
        let bits = entries.iter().fold(0, |b, d| b | d.severity.bit());
        self.entries.write().extend(entries);
        self.mask.fetch_or(bits, Ordering::Release);
    }

    pub fn has_errors(&self) -> bool {
        self.mask.load(Ordering::Acquire) & Severity::Error.bit() != 0
    }

    pub fn has_warnings(&self) -> bool {
        self.mask.load(Ordering::Acquire) & Severity::Warning.bit() != 0
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .read()
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Copy of the entries collected so far.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries.read().clone()
    }

    /// Remove and return all entries, resetting the severity mask.
    pub fn drain(&self) -> Vec<Diagnostic> {
        let mut entries = self.entries.write();
        self.mask.store(0, Ordering::Release);
        std::mem::take(&mut *entries)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries.into_inner()
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(entries: Vec<Diagnostic>) -> Self {
        let bits = entries.iter().fold(0, |b, d| b | d.severity.bit());
        Self {
            entries: RwLock::new(entries),
            mask: AtomicU8::new(bits),
        }
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}
