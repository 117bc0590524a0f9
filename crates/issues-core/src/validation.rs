//! Validation helpers.
//!
//! These routines enforce input constraints and return structured
//! validation errors without touching storage.

use crate::error::{IssuesError, ValidationError};
use crate::query::{IssuePatch, NewIssue};

fn check_title(title: &str, errors: &mut Vec<ValidationError>) {
    if title.trim().is_empty() {
        errors.push(ValidationError::new("title", "cannot be blank"));
    }
}

fn check_labels(labels: &[String], errors: &mut Vec<ValidationError>) {
    for name in labels {
        if let Err(err) = LabelValidator::validate_name(name) {
            errors.push(err);
        }
    }
}

fn finish(errors: Vec<ValidationError>) -> Result<(), IssuesError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(IssuesError::from_validation_errors(errors))
    }
}

/// Validates issue inputs.
pub struct IssueValidator;

impl IssueValidator {
    /// Validate a create request, reporting every problem found.
    ///
    /// # Errors
    ///
    /// Returns a validation error listing each rule that was violated.
    pub fn validate_new(new: &NewIssue) -> Result<(), IssuesError> {
        let mut errors = Vec::new();
        check_title(&new.title, &mut errors);
        check_labels(&new.labels, &mut errors);
        finish(errors)
    }

    /// Validate the supplied fields of a patch.
    ///
    /// # Errors
    ///
    /// Returns a validation error listing each rule that was violated.
    pub fn validate_patch(patch: &IssuePatch) -> Result<(), IssuesError> {
        let mut errors = Vec::new();
        if let Some(title) = &patch.title {
            check_title(title, &mut errors);
        }
        if let Some(labels) = &patch.labels {
            check_labels(labels, &mut errors);
        }
        finish(errors)
    }
}

/// Validates comment inputs.
pub struct CommentValidator;

impl CommentValidator {
    /// # Errors
    ///
    /// Returns a validation error if the body is blank.
    pub fn validate_body(body: &str) -> Result<(), IssuesError> {
        if body.trim().is_empty() {
            return finish(vec![ValidationError::new("body", "cannot be blank")]);
        }
        Ok(())
    }
}

/// Validates label names.
pub struct LabelValidator;

impl LabelValidator {
    /// Check a label name. Names are compared case-sensitively and may
    /// contain spaces, but not commas since list filters are comma separated.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the name is unusable.
    pub fn validate_name(name: &str) -> Result<(), ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::new("labels", "label name cannot be blank"));
        }
        if name.contains(',') {
            return Err(ValidationError::new(
                "labels",
                format!("label '{name}' cannot contain a comma"),
            ));
        }
        Ok(())
    }
}
