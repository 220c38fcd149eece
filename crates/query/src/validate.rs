//! Field validation for ShelfDB
//!
//! Two orthogonal validator families protect the backing store:
//!
//! - **Forbidden fields**: store control operators (`$where`) and internal
//!   bookkeeping names must never be caller-supplied, whether as document
//!   fields or filter clauses.
//! - **Key format**: field names must fit a character-class policy that
//!   varies by operation, because a name saved into a document is permanent
//!   structure while a filter name legitimately carries `$` operators and
//!   dotted paths.
//!
//! Validators run as a flat ordered list. Each returns every violation it
//! finds (never fail-fast), the chain unions the findings and raises once,
//! so a caller sees all bad names in a single error. Forbidden-field
//! findings take precedence: a document smuggling `$where` is rejected for
//! that even when its other names are also malformed.

use shelf_core::fields::{is_forbidden_operator, is_internal_field};
use shelf_core::{Document, Error, Result, Value};

/// Operation context selecting the accepted character class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationContext {
    /// Document save: alphanumeric plus `-`/`_`; names become permanent
    /// document structure, and marker-wrapped names are refused outright
    Save,
    /// Filter expression: additionally allows `$` (query operators) and
    /// `.` (dotted paths)
    Filter,
    /// Update fragment: additionally allows `.` (dotted paths), not `$`
    Update,
}

impl ValidationContext {
    /// Whether `c` is legal in a field name under this context
    fn allows(&self, c: char) -> bool {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            return true;
        }
        match self {
            ValidationContext::Save => false,
            ValidationContext::Filter => c == '$' || c == '.',
            ValidationContext::Update => c == '.',
        }
    }

    /// Collect every reason `name` is unacceptable in this context
    fn name_violates(&self, name: &str) -> bool {
        if name.is_empty() {
            return true;
        }
        if !name.chars().all(|c| self.allows(c)) {
            return true;
        }
        // Saved names become structure; the bookkeeping convention is
        // reserved for the translator
        if matches!(self, ValidationContext::Save) && is_internal_field(name) {
            return true;
        }
        false
    }
}

/// A single validator in the chain
#[derive(Debug, Clone)]
pub enum Validator {
    /// Scan for store control operators and internal bookkeeping names
    ForbiddenFields {
        /// Descend into nested objects and array elements
        recursive: bool,
    },
    /// Enforce the field-name character-class policy
    KeyFormat {
        /// Operation context selecting the accepted characters
        context: ValidationContext,
    },
}

impl Validator {
    /// Run this validator over a document, returning every offending name
    pub fn run(&self, doc: &Document) -> Vec<String> {
        let mut found = Vec::new();
        match self {
            Validator::ForbiddenFields { recursive } => {
                scan_forbidden(doc, *recursive, &mut found)
            }
            Validator::KeyFormat { context } => scan_key_format(doc, *context, &mut found),
        }
        found
    }
}

fn scan_forbidden(doc: &Document, recursive: bool, found: &mut Vec<String>) {
    for (name, value) in doc {
        if is_forbidden_operator(name) || is_internal_field(name) {
            push_unique(found, name);
        }
        if recursive {
            scan_forbidden_value(value, found);
        }
    }
}

fn scan_forbidden_value(value: &Value, found: &mut Vec<String>) {
    match value {
        Value::Object(obj) => {
            for (name, nested) in obj {
                if is_forbidden_operator(name) || is_internal_field(name) {
                    push_unique(found, name);
                }
                scan_forbidden_value(nested, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                scan_forbidden_value(item, found);
            }
        }
        _ => {}
    }
}

fn scan_key_format(doc: &Document, context: ValidationContext, found: &mut Vec<String>) {
    for (name, value) in doc {
        if context.name_violates(name) {
            push_unique(found, name);
        }
        scan_key_format_value(value, context, found);
    }
}

fn scan_key_format_value(value: &Value, context: ValidationContext, found: &mut Vec<String>) {
    match value {
        Value::Object(obj) => {
            for (name, nested) in obj {
                if context.name_violates(name) {
                    push_unique(found, name);
                }
                scan_key_format_value(nested, context, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                scan_key_format_value(item, context, found);
            }
        }
        _ => {}
    }
}

fn push_unique(found: &mut Vec<String>, name: &str) {
    if !found.iter().any(|n| n == name) {
        found.push(name.to_string());
    }
}

/// An ordered list of validators run in sequence
///
/// Findings are unioned per family and raised once; forbidden-field
/// findings win over key-format findings.
#[derive(Debug, Clone)]
pub struct ValidationChain {
    validators: Vec<Validator>,
}

impl ValidationChain {
    /// Build a chain from explicit validators
    pub fn new(validators: Vec<Validator>) -> Self {
        Self { validators }
    }

    /// Chain applied to documents being saved
    pub fn for_save() -> Self {
        Self::new(vec![
            Validator::ForbiddenFields { recursive: true },
            Validator::KeyFormat {
                context: ValidationContext::Save,
            },
        ])
    }

    /// Chain applied to filter expressions
    pub fn for_filter() -> Self {
        Self::new(vec![
            Validator::ForbiddenFields { recursive: true },
            Validator::KeyFormat {
                context: ValidationContext::Filter,
            },
        ])
    }

    /// Chain applied to update fragments
    pub fn for_update() -> Self {
        Self::new(vec![
            Validator::ForbiddenFields { recursive: true },
            Validator::KeyFormat {
                context: ValidationContext::Update,
            },
        ])
    }

    /// Run every validator and raise the unioned findings once
    pub fn check(&self, doc: &Document) -> Result<()> {
        let mut forbidden = Vec::new();
        let mut bad_names = Vec::new();
        for validator in &self.validators {
            let found = validator.run(doc);
            match validator {
                Validator::ForbiddenFields { .. } => {
                    for name in found {
                        push_unique(&mut forbidden, &name);
                    }
                }
                Validator::KeyFormat { .. } => {
                    for name in found {
                        push_unique(&mut bad_names, &name);
                    }
                }
            }
        }
        if !forbidden.is_empty() {
            return Err(Error::InvalidDocument { fields: forbidden });
        }
        if !bad_names.is_empty() {
            return Err(Error::InvalidKeyFormat { names: bad_names });
        }
        Ok(())
    }
}
