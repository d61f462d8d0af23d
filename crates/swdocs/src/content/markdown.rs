use std::borrow::Cow;
use std::collections::BTreeMap;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::highlight::{CodeBlock, resolve_theme};
use super::{ContentFormat, Document, escape_attribute, slugger::Slugger};
use crate::errors::ConvertError;

/// Theme used for code blocks when none is configured.
pub const DEFAULT_THEME: &str = "base16-ocean.dark";

/// Represents a Markdown heading.
///
/// Used by the document viewer to build the table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownHeading {
    pub title: String,
    pub id: String,
    pub level: u8,
}

/// YAML frontmatter of a document. Unknown keys are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// The displayable form of a [`Document`], produced fresh for every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedContent {
    pub slug: String,
    pub html: String,
    pub frontmatter: Frontmatter,
    pub headings: Vec<MarkdownHeading>,
}

impl RenderedContent {
    /// Title from the frontmatter, or else the first top-level heading.
    pub fn title(&self) -> Option<&str> {
        self.frontmatter.title.as_deref().or_else(|| {
            self.headings
                .iter()
                .find(|heading| heading.level == 1)
                .map(|heading| heading.title.as_str())
        })
    }
}

#[derive(Debug)]
struct InternalHeadingEvent {
    start: usize,
    end: usize,
    id: Option<String>,
    level: u8,
}

/// Converts Markdown and MDX documents to HTML.
///
/// ## Example
/// ```rs
/// use swdocs::content::{ContentFormat, Document, MarkdownConverter};
///
/// let doc = Document::new("intro", "sw", ContentFormat::Markdown, "# Hello, world!");
/// let rendered = MarkdownConverter::default().convert(&doc)?;
/// assert_eq!(rendered.title(), Some("Hello, world!"));
/// ```
#[derive(Debug, Clone)]
pub struct MarkdownConverter {
    theme: String,
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        Self::new(DEFAULT_THEME)
    }
}

impl MarkdownConverter {
    pub fn new(theme: impl Into<String>) -> Self {
        Self {
            theme: theme.into(),
        }
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn convert(&self, doc: &Document) -> Result<RenderedContent, ConvertError> {
        let theme = resolve_theme(&self.theme)?;

        let source = match doc.format {
            ContentFormat::Mdx => Cow::Owned(strip_mdx_esm(&doc.raw_content)),
            ContentFormat::Markdown => Cow::Borrowed(doc.raw_content.as_str()),
        };

        let mut options = Options::empty();
        options.insert(
            Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
                | Options::ENABLE_HEADING_ATTRIBUTES
                | Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_FOOTNOTES,
        );

        let mut frontmatter = String::new();
        let mut in_frontmatter = false;
        let mut code_block: Option<CodeBlock> = None;
        let mut code_block_content = String::new();
        let mut events = Vec::new();

        // First pass: pull out frontmatter and highlight code blocks
        for event in Parser::new_ext(&source, options) {
            match event {
                Event::Start(Tag::MetadataBlock(_)) => in_frontmatter = true,
                Event::End(TagEnd::MetadataBlock(_)) => in_frontmatter = false,
                Event::Text(ref text) => {
                    if in_frontmatter {
                        frontmatter.push_str(text);
                    } else if code_block.is_some() {
                        code_block_content.push_str(text);
                    } else {
                        events.push(event);
                    }
                }
                Event::Start(Tag::CodeBlock(ref kind)) => {
                    let fence = match kind {
                        CodeBlockKind::Fenced(fence) => fence.as_ref(),
                        CodeBlockKind::Indented => "",
                    };
                    let (block, begin) = CodeBlock::new(fence);
                    code_block = Some(block);
                    events.push(Event::Html(begin.into()));
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some(block) = code_block.take() {
                        let html = block.highlight(&code_block_content, &theme).map_err(
                            |source| ConvertError::Highlight {
                                slug: doc.slug.clone(),
                                source,
                            },
                        )?;
                        events.push(Event::Html(html.into()));
                    }
                    code_block_content.clear();
                    events.push(Event::Html("</code></pre>\n".into()));
                }
                _ => events.push(event),
            }
        }

        let frontmatter = parse_frontmatter(&frontmatter).map_err(|source| {
            ConvertError::Frontmatter {
                slug: doc.slug.clone(),
                source,
            }
        })?;

        // Second pass: give every heading an id and remember it for the table of contents
        let found_headings = find_headings(&events);
        let mut slugger = Slugger::new();
        for id in found_headings.iter().filter_map(|heading| heading.id.as_deref()) {
            slugger.reserve(id);
        }

        let mut headings = Vec::new();
        for heading in found_headings {
            let title = get_text_from_events(&events[heading.start + 1..heading.end])
                .trim()
                .to_string();
            let id = heading.id.unwrap_or_else(|| slugger.slugify(&title));

            events[heading.start] = Event::Html(
                format!("<h{} id=\"{}\">", heading.level, escape_attribute(&id)).into(),
            );
            events[heading.end] = Event::Html(format!("</h{}>\n", heading.level).into());

            headings.push(MarkdownHeading {
                title,
                id,
                level: heading.level,
            });
        }

        let mut html = String::new();
        pulldown_cmark::html::push_html(&mut html, events.into_iter());

        debug!(name: "convert", "converted `{}` ({} headings)", doc.slug, headings.len());

        Ok(RenderedContent {
            slug: doc.slug.clone(),
            html,
            frontmatter,
            headings,
        })
    }
}

fn parse_frontmatter(raw: &str) -> Result<Frontmatter, serde_yaml::Error> {
    if raw.trim().is_empty() {
        return Ok(Frontmatter::default());
    }

    serde_yaml::from_str(raw)
}

/// Remove top-level ESM blocks (`import`/`export`) from MDX source.
///
/// An ESM block runs until the next blank line. Fenced code is left untouched.
pub fn strip_mdx_esm(source: &str) -> String {
    let mut output = String::with_capacity(source.len());
    let mut fence: Option<(char, usize)> = None;
    let mut in_esm = false;

    for line in source.split_inclusive('\n') {
        if let Some((marker, length)) = fence {
            // A fence is only closed by a bare run of its own character, at least as long as the opening one
            if let Some((closing, closing_length)) = fence_marker(line)
                && closing == marker
                && closing_length >= length
                && line.trim_start().trim_start_matches(marker).trim().is_empty()
            {
                fence = None;
            }
            output.push_str(line);
            continue;
        }

        if in_esm {
            if line.trim().is_empty() {
                in_esm = false;
                output.push_str(line);
            }
            continue;
        }

        if line.starts_with("import ") || line.starts_with("export ") {
            in_esm = true;
            continue;
        }

        fence = fence_marker(line);
        output.push_str(line);
    }

    output
}

/// The character and length of the code fence `line` starts with, if any.
fn fence_marker(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start();
    let marker = trimmed.chars().next().filter(|c| matches!(c, '`' | '~'))?;
    let length = trimmed.chars().take_while(|c| *c == marker).count();

    (length >= 3).then_some((marker, length))
}

fn get_text_from_events(parser_slice: &[Event]) -> String {
    let mut title = String::new();

    for event in parser_slice.iter() {
        match event {
            Event::Text(text) | Event::Code(text) => title += text,
            _ => continue,
        }
    }

    title
}

fn find_headings(events: &[Event]) -> Vec<InternalHeadingEvent> {
    let mut heading_refs: Vec<InternalHeadingEvent> = vec![];

    for (i, event) in events.iter().enumerate() {
        match event {
            Event::Start(Tag::Heading { level, id, .. }) => {
                heading_refs.push(InternalHeadingEvent {
                    start: i,
                    end: 0,
                    id: id.as_ref().map(|id| id.to_string()),
                    level: *level as u8,
                });
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(last) = heading_refs.last_mut() {
                    last.end = i;
                }
            }
            _ => (),
        }
    }

    heading_refs
}
