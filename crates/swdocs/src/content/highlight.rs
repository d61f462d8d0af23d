use std::borrow::Cow;
use std::sync::OnceLock;
use syntect::{
    Error,
    easy::HighlightLines,
    highlighting::{Theme, ThemeSet},
    html::{IncludeBackground, styled_line_to_highlighted_html},
    parsing::SyntaxSet,
    util::LinesWithEndings,
};

use super::escape_attribute;
use crate::errors::ConvertError;

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();

fn get_syntax_set() -> &'static SyntaxSet {
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn get_theme_set() -> &'static ThemeSet {
    THEME_SET.get_or_init(ThemeSet::load_defaults)
}

/// Resolve a theme by name among syntect's defaults, or else as a path to a `.tmTheme` file.
pub fn resolve_theme(theme: &str) -> Result<Cow<'static, Theme>, ConvertError> {
    if let Some(found) = get_theme_set().themes.get(theme) {
        return Ok(Cow::Borrowed(found));
    }

    ThemeSet::get_theme(theme)
        .map(Cow::Owned)
        .map_err(|_| ConvertError::UnknownTheme {
            theme: theme.to_string(),
        })
}

fn opening_html(language: Option<&str>) -> String {
    let attrs = match language {
        Some(lang) if !lang.is_empty() => format!(" data-language=\"{}\"", escape_attribute(lang)),
        _ => String::new(),
    };

    format!("<pre{attrs}><code{attrs}>")
}

pub struct CodeBlockMeta {
    pub language: String,
}

impl CodeBlockMeta {
    pub fn new_from_string(fence: &str) -> Self {
        // Only the language matters for now, e.g. ```rs title="main.rs" gives "rs"
        let language = fence.split_whitespace().next().unwrap_or_default().to_string();
        Self { language }
    }
}

pub struct CodeBlock {
    pub meta: CodeBlockMeta,
}

impl CodeBlock {
    pub fn new(fence: &str) -> (Self, String) {
        let meta = CodeBlockMeta::new_from_string(fence);
        let opening_html = opening_html(Some(&meta.language));

        (Self { meta }, opening_html)
    }

    pub fn highlight(&self, content: &str, theme: &Theme) -> Result<String, Error> {
        let ss = get_syntax_set();

        let syntax = ss
            .find_syntax_by_token(&self.meta.language)
            .or_else(|| ss.find_syntax_by_name(&self.meta.language))
            .or_else(|| ss.find_syntax_by_extension(&self.meta.language))
            .or_else(|| ss.find_syntax_by_first_line(content))
            .unwrap_or_else(|| ss.find_syntax_plain_text());

        let mut h = HighlightLines::new(syntax, theme);

        let mut highlighted = String::new();
        for line in LinesWithEndings::from(content) {
            let regions = h.highlight_line(line, ss)?;
            let html = styled_line_to_highlighted_html(&regions, IncludeBackground::No)?;
            highlighted.push_str(&html);
        }

        Ok(highlighted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fence_info_keeps_only_language() {
        let (block, opening) = CodeBlock::new("rust title=\"main.rs\"");
        assert_eq!(block.meta.language, "rust");
        assert_eq!(
            opening,
            "<pre data-language=\"rust\"><code data-language=\"rust\">"
        );
    }

    #[test]
    fn unknown_theme_is_an_error() {
        assert!(matches!(
            resolve_theme("definitely-not-a-theme"),
            Err(ConvertError::UnknownTheme { .. })
        ));
    }

    #[test]
    fn highlights_known_language() {
        let theme = resolve_theme("base16-ocean.dark").unwrap();
        let (block, _) = CodeBlock::new("rust");
        let html = block.highlight("fn main() {}\n", &theme).unwrap();
        assert!(html.contains("<span"));
        assert!(html.contains("main"));
    }
}
