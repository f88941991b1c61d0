//! Terminal outcomes of the dispatch pipeline.

use axum::http::StatusCode;

/// Backend a forward is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Default dynamic backend for the deployment stage.
    Dynamic,
    /// Rendering-capable backend: the mini backend when configured, the
    /// dynamic backend otherwise.
    Rendering,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Dynamic => "dynamic",
            Target::Rendering => "rendering",
        }
    }
}

/// What the pipeline decided to do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Liveness check answer.
    Health,
    Redirect {
        status: StatusCode,
        location: String,
        /// Stage that produced the redirect, for logs and metrics.
        reason: &'static str,
    },
    Forward { target: Target },
    /// Serve a file from the asset store.
    Serve {
        logical_path: String,
        content_type: &'static str,
    },
    /// Empty body with the given content type.
    Blank { content_type: &'static str },
}

impl Action {
    /// Short label used in metrics and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Health => "health",
            Action::Redirect { .. } => "redirect",
            Action::Forward { target } => match target {
                Target::Dynamic => "forward_dynamic",
                Target::Rendering => "forward_rendering",
            },
            Action::Serve { .. } => "serve",
            Action::Blank { .. } => "blank",
        }
    }

    pub(crate) fn permanent(location: impl Into<String>, reason: &'static str) -> Self {
        Action::Redirect {
            status: StatusCode::MOVED_PERMANENTLY,
            location: location.into(),
            reason,
        }
    }

    pub(crate) fn temporary(location: impl Into<String>, reason: &'static str) -> Self {
        Action::Redirect {
            status: StatusCode::TEMPORARY_REDIRECT,
            location: location.into(),
            reason,
        }
    }
}
