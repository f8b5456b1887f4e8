//! Markdown processing using pulldown-cmark.

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};

use crate::embed::render_shortcode;

const EMBED_TAG: &str = "embed";

/// Link schemes allowed through; relative destinations always are.
const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Replacement for rejected link and image destinations.
const BLOCKED_DESTINATION: &str = "#";

/// Markdown to HTML converter with embed shortcode support.
///
/// Raw HTML in the source is escaped rather than passed through, and link or
/// image destinations with a scheme other than http, https or mailto are
/// replaced, so the output can be trusted by templates.
#[derive(Debug, Clone)]
pub struct MarkdownProcessor {
    options: Options,
}

impl Default for MarkdownProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownProcessor {
    /// Create a processor with tables, footnotes, strikethrough and task lists.
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        Self { options }
    }

    /// Render a markdown body to HTML.
    pub fn render(&self, body: &str) -> String {
        let events = Parser::new_ext(body, self.options).map(sanitize);
        let events = expand_embeds(events);

        let mut out = String::with_capacity(body.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        out
    }
}

/// Turn raw HTML into text and neutralize unsafe destinations.
fn sanitize(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_destination(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_destination(dest_url),
            title,
            id,
        }),
        other => other,
    }
}

fn safe_destination(dest: CowStr<'_>) -> CowStr<'_> {
    if is_safe_destination(&dest) {
        dest
    } else {
        CowStr::Borrowed(BLOCKED_DESTINATION)
    }
}

/// Whether a destination is relative or uses an allowed scheme.
///
/// Whitespace and control characters are dropped from the scheme before
/// matching (`java\tscript:` is `javascript:`).
fn is_safe_destination(dest: &str) -> bool {
    let Some(colon) = dest.find(':') else {
        return true;
    };
    let prefix = &dest[..colon];
    if prefix.contains(['/', '?', '#']) {
        return true;
    }

    let scheme: String = prefix
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    ALLOWED_SCHEMES.contains(&scheme.as_str())
}

fn is_embed_block(kind: &CodeBlockKind<'_>) -> bool {
    match kind {
        CodeBlockKind::Fenced(info) => info.split_whitespace().next() == Some(EMBED_TAG),
        CodeBlockKind::Indented => false,
    }
}

/// Replace renderable `embed` code blocks with their iframe markup.
///
/// Blocks that fail to render are passed through untouched.
fn expand_embeds<'a>(events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut out = Vec::new();
    let mut pending: Option<Vec<Event<'a>>> = None;

    for event in events {
        match pending.as_mut() {
            None => {
                if matches!(&event, Event::Start(Tag::CodeBlock(kind)) if is_embed_block(kind)) {
                    pending = Some(vec![event]);
                } else {
                    out.push(event);
                }
            }
            Some(buffer) => {
                let closes = matches!(event, Event::End(TagEnd::CodeBlock));
                buffer.push(event);
                if closes {
                    let buffer = pending.take().unwrap_or_default();
                    flush_embed(buffer, &mut out);
                }
            }
        }
    }

    if let Some(buffer) = pending {
        out.extend(buffer);
    }
    out
}

fn flush_embed<'a>(buffer: Vec<Event<'a>>, out: &mut Vec<Event<'a>>) {
    let source: String = buffer
        .iter()
        .filter_map(|event| match event {
            Event::Text(text) => Some(text.as_ref()),
            _ => None,
        })
        .collect();

    match render_shortcode(&source) {
        Some(markup) => out.push(Event::Html(CowStr::from(markup))),
        None => out.extend(buffer),
    }
}
