use maud::{Markup, Render, html};

use super::RouteError;
use crate::templating::components::ErrorDisplay;

pub const UNKNOWN_ERROR_HEADING: &str = "An Unknown Error Occurred";

/// What the error boundary decided to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundaryOutput {
    Display { status: u16, status_text: String },
    UnknownHeading,
}

impl BoundaryOutput {
    pub fn status(&self) -> u16 {
        match self {
            BoundaryOutput::Display { status, .. } => *status,
            BoundaryOutput::UnknownHeading => 500,
        }
    }
}

impl Render for BoundaryOutput {
    fn render(&self) -> Markup {
        match self {
            BoundaryOutput::Display {
                status,
                status_text,
            } => ErrorDisplay {
                status: *status,
                status_text,
            }
            .render(),
            BoundaryOutput::UnknownHeading => html! {
                h1 { (UNKNOWN_ERROR_HEADING) }
            },
        }
    }
}

/// Turns whatever failed the route into something to show. Never fails itself.
pub struct ErrorBoundary;

impl ErrorBoundary {
    pub fn classify(error: &RouteError) -> BoundaryOutput {
        match error {
            RouteError::Response(response) => BoundaryOutput::Display {
                status: response.status,
                status_text: response.status_text.clone(),
            },
            RouteError::Failure { message, trace } => BoundaryOutput::Display {
                status: 500,
                status_text: format!("Message: {}. Stack: {}", message, trace),
            },
            RouteError::Unknown => BoundaryOutput::UnknownHeading,
        }
    }

    pub fn render(error: &RouteError) -> Markup {
        Self::classify(error).render()
    }
}
