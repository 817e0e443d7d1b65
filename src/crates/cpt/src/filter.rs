//! Search predicate composition
//!
//! Filters are validated one by one and turned into clauses joined with
//! `AND`. Pattern and class name are bound after validation. Time bounds and
//! the JSON selector are operator-trusted fragments embedded as written.

use crate::db::{Bind, Statement};
use crate::error::{CptError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Dotted identifier such as `org.foo.wf.MyWorkflow`
const CLASS_NAME_PATTERN: &str = r"^\w+(?:\.\w+)*$";
/// Anything free of quotes and LIKE wildcards
const LIKE_PATTERN: &str = r#"^[^"'%]+$"#;

fn class_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CLASS_NAME_PATTERN).expect("valid class name pattern"))
}

fn like_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(LIKE_PATTERN).expect("valid like pattern"))
}

/// Accept an exception search pattern
pub fn validate_pattern(pattern: &str) -> Result<&str> {
    if like_regex().is_match(pattern) {
        Ok(pattern)
    } else {
        Err(CptError::validation(format!("Invalid exception-pattern: {}", pattern)))
    }
}

/// Accept a fully qualified workflow class name
pub fn validate_class_name(class_name: &str) -> Result<&str> {
    if class_name_regex().is_match(class_name) {
        Ok(class_name)
    } else {
        Err(CptError::validation(format!(
            "Invalid workflow-classname: {}",
            class_name
        )))
    }
}

/// Single-quoted SQL literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Clauses joined with `AND`, with the values of their placeholders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<String>,
    binds: Vec<Bind>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value and return its placeholder
    pub fn bind(&mut self, value: impl Into<Bind>) -> String {
        self.binds.push(value.into());
        format!("${}", self.binds.len())
    }

    pub fn and(&mut self, clause: impl Into<String>) -> &mut Self {
        self.clauses.push(clause.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Append every clause to `base`, which must already end in a condition
    pub fn extend(self, base: Statement) -> Statement {
        let mut sql = base.sql().to_string();
        for clause in &self.clauses {
            sql.push_str(" AND ");
            sql.push_str(clause);
        }

        let binds = base.binds().iter().cloned().chain(self.binds);
        binds.fold(Statement::new(sql), |statement, bind| statement.bind(bind))
    }
}

/// Optional filters of the broken-instance search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrokenFilter {
    pub exception_pattern: Option<String>,
    pub error_time_start: Option<String>,
    pub error_time_end: Option<String>,
    pub workflow_class: Option<String>,
}

impl BrokenFilter {
    /// Validate every filter and compose the predicate over `e` (error) and `i` (instance)
    pub fn compose(&self) -> Result<Predicate> {
        let mut predicate = Predicate::new();

        if let Some(pattern) = present(&self.exception_pattern) {
            let placeholder = predicate.bind(validate_pattern(pattern)?);
            predicate.and(format!("e.exception LIKE '%' || {} || '%'", placeholder));
        }

        if let Some(class_name) = present(&self.workflow_class) {
            let placeholder = predicate.bind(validate_class_name(class_name)?);
            predicate.and(format!("i.classname = {}", placeholder));
        }

        if let Some(start) = present(&self.error_time_start) {
            predicate.and(format!("e.error_ts >= {}", quote_literal(start)));
        }

        if let Some(end) = present(&self.error_time_end) {
            predicate.and(format!("e.error_ts <= {}", quote_literal(end)));
        }

        Ok(predicate)
    }
}

/// Parenthesised JSON selector, which must not be blank
pub fn json_selector_clause(selector: &str) -> Result<String> {
    if selector.trim().is_empty() {
        return Err(CptError::validation("Flag --json-selector is mandatory"));
    }
    Ok(format!("({})", selector))
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
