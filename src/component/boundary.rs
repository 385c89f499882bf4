//! Render failures and the boundary that turns them into fallback output.

use std::rc::Rc;

use thiserror::Error;
use tracing::error;

use crate::dom::DomError;
use crate::reactive::{Cleanup, Emitter};
use crate::render::{Html, View};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("template of `{component}` failed: {message}")]
    Template { component: String, message: String },

    #[error(transparent)]
    Dom(#[from] DomError),
}

impl RenderError {
    pub fn template(component: &str, message: impl Into<String>) -> Self {
        RenderError::Template {
            component: component.to_string(),
            message: message.into(),
        }
    }
}

/// One caught failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFailure {
    pub component: String,
    pub error: RenderError,
}

type Fallback = Rc<dyn Fn(&RenderFailure) -> View>;

/// Catches template and paint failures: logs them, tells subscribers, and
/// supplies the view painted instead.
#[derive(Clone)]
pub struct ErrorBoundary {
    fallback: Fallback,
    failures: Emitter<RenderFailure>,
}

impl Default for ErrorBoundary {
    fn default() -> Self {
        Self::new(default_fallback)
    }
}

impl ErrorBoundary {
    pub fn new(fallback: impl Fn(&RenderFailure) -> View + 'static) -> Self {
        Self {
            fallback: Rc::new(fallback),
            failures: Emitter::new(),
        }
    }

    pub fn catch(&self, component: &str, error: RenderError) -> View {
        error!(component, %error, "render failed, showing fallback");
        let failure = RenderFailure {
            component: component.to_string(),
            error,
        };
        self.failures.emit(&failure);
        (self.fallback)(&failure)
    }

    pub fn subscribe(&self, listener: impl Fn(&RenderFailure) + 'static) -> Cleanup {
        self.failures.subscribe(listener)
    }
}

fn default_fallback(failure: &RenderFailure) -> View {
    let mut html = Html::new();
    html.push_raw("<div class=\"error-boundary\" role=\"alert\"")
        .push_attr("data-component", &failure.component)
        .push_raw("><p>Something went wrong.</p></div>");
    html.into()
}
