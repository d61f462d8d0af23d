use maud::{Markup, PreEscaped, Render, html};

use crate::content::{MarkdownHeading, RenderedContent};

/// Placeholder shown until the document viewer is mounted.
pub struct Skeleton;

impl Render for Skeleton {
    fn render(&self) -> Markup {
        html! {
            div.skeleton aria-busy="true" aria-label="Loading" {
                div.skeleton-line.title {}
                @for width in [100, 92, 96, 70] {
                    div.skeleton-line style=(format!("width: {width}%")) {}
                }
            }
        }
    }
}

pub struct TableOfContents<'a> {
    pub headings: &'a [MarkdownHeading],
}

impl Render for TableOfContents<'_> {
    fn render(&self) -> Markup {
        // The page title is already the first h1, only list the sections below it
        let entries = self
            .headings
            .iter()
            .filter(|heading| (2..=3).contains(&heading.level));

        html! {
            nav.toc aria-label="Table of contents" {
                ul {
                    @for heading in entries {
                        li data-level=(heading.level) {
                            a href=(format!("#{}", heading.id)) { (heading.title) }
                        }
                    }
                }
            }
        }
    }
}

/// Shows a rendered document with its table of contents.
pub struct DocViewer<'a> {
    pub content: &'a RenderedContent,
}

impl Render for DocViewer<'_> {
    fn render(&self) -> Markup {
        html! {
            div.doc-layout {
                (TableOfContents { headings: &self.content.headings })
                article.doc data-slug=(self.content.slug) {
                    (PreEscaped(&self.content.html))
                }
            }
        }
    }
}

/// Status and status text of a failed request.
pub struct ErrorDisplay<'a> {
    pub status: u16,
    pub status_text: &'a str,
}

impl Render for ErrorDisplay<'_> {
    fn render(&self) -> Markup {
        html! {
            section.error {
                h1 { (self.status) }
                p { (self.status_text) }
                a href="/" { "Go back home" }
            }
        }
    }
}
