//! Diagnostics shared by the config layer and the build orchestrator

use crate::id::ProjectId;
use serde::Serialize;
use std::fmt;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Error,
    Warning,
    Message,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Message => write!(f, "message"),
        }
    }
}

/// A single reportable message, optionally attributed to a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectId>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(category: Category, message: impl Into<String>) -> Self {
        Self {
            category,
            project: None,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Category::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Category::Warning, message)
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self::new(Category::Message, message)
    }

    /// Attribute the diagnostic to a project
    pub fn with_project(mut self, project: ProjectId) -> Self {
        self.project = Some(project);
        self
    }

    pub fn is_error(&self) -> bool {
        self.category == Category::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.category, &self.project) {
            (Category::Message, _) => write!(f, "{}", self.message),
            (category, Some(project)) => write!(f, "{}: {}: {}", category, project, self.message),
            (category, None) => write!(f, "{}: {}", category, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_plain_error() {
        let diagnostic = Diagnostic::error("something broke");
        assert_eq!(diagnostic.to_string(), "error: something broke");
        assert!(diagnostic.is_error());
    }

    #[test]
    fn test_display_message_has_no_prefix() {
        let diagnostic = Diagnostic::message("Building project 'a'...");
        assert_eq!(diagnostic.to_string(), "Building project 'a'...");
        assert!(!diagnostic.is_error());
    }

    #[test]
    fn test_display_with_project() {
        let project = ProjectId::from_config_path("/repo/a/keel.toml");
        let diagnostic = Diagnostic::warning("careful").with_project(project);
        assert_eq!(diagnostic.to_string(), "warning: /repo/a/keel.toml: careful");
    }
}
