use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::GENERATOR;

const STYLE: &str = include_str!("style.css");

/// Can be used to create a generator tag in the output HTML. See [`GENERATOR`](crate::GENERATOR).
pub fn generator() -> Markup {
    html! {
        meta name="generator" content=(GENERATOR);
    }
}

/// Wraps `body` in a full HTML document.
///
/// `stylesheet` is linked after the built-in styles, so it can override them.
pub fn layout(title: &str, stylesheet: Option<&str>, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                (generator())
                title { (title) }
                style { (PreEscaped(STYLE)) }
                @if let Some(href) = stylesheet {
                    link rel="stylesheet" type="text/css" href=(href);
                }
            }
            body {
                (body)
            }
        }
    }
}
