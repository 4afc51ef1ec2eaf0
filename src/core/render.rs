use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd, TextMergeStream};

use crate::core::reasoning::{segment, ReasoningSegment, Segment};

const REASONING_SUMMARY: &str = "Thinking";

fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
}

/// Render markdown to HTML, treating single newlines as line breaks the way
/// chat transcripts are usually written.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, markdown_options()).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });
    let mut out = String::with_capacity(markdown.len() + markdown.len() / 2);
    html::push_html(&mut out, parser);
    out
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// The displayable form of an assistant response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedView {
    pub html: String,
    pub reasoning: Vec<ReasoningSegment>,
}

impl RenderedView {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Segment `raw` and render it.
    pub fn render(raw: &str) -> Self {
        Self::from_segments(&segment(raw))
    }

    /// Render plain markdown with no reasoning extraction, e.g. an inline error.
    pub fn from_markdown(markdown: &str) -> Self {
        Self {
            html: markdown_to_html(markdown),
            reasoning: Vec::new(),
        }
    }

    /// Render the text around reasoning blocks as one markdown document so
    /// constructs that span a block (fences, lists, link definitions) survive.
    pub fn from_segments(segments: &[Segment]) -> Self {
        let boundary = Boundary::for_segments(segments);
        let mut markdown = String::new();
        let mut disclosures = Vec::new();
        let mut reasoning = Vec::new();

        for segment in segments {
            match segment {
                Segment::Text(text) => markdown.push_str(text),
                Segment::Reasoning(block) => {
                    markdown.push_str(&boundary.marker(disclosures.len()));
                    disclosures.push(disclosure_html(block));
                    reasoning.push(block.clone());
                }
            }
        }

        let html = if disclosures.is_empty() {
            markdown_to_html(&markdown)
        } else {
            splice_disclosures(&markdown, &boundary, &disclosures)
        };
        Self { html, reasoning }
    }

    pub fn is_empty(&self) -> bool {
        self.html.is_empty()
    }

    /// Wrap the rendered body in a minimal standalone HTML document.
    pub fn to_document(&self, title: &str, lang: &str) -> String {
        format!(
            "<!DOCTYPE html>\n<html lang=\"{}\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
            escape_attribute(lang),
            escape_attribute(title),
            self.html
        )
    }
}

fn disclosure_html(block: &ReasoningSegment) -> String {
    format!(
        "<details class=\"reasoning\" data-reasoning-id=\"{}\">\n<summary>{}</summary>\n{}</details>\n",
        block.id,
        REASONING_SUMMARY,
        markdown_to_html(&block.text)
    )
}

const BOUNDARY_PREFIX: &str = "OLLACHATREASONING";
const BOUNDARY_END: &str = "END";

/// Placeholder token standing in for a reasoning block while the surrounding
/// markdown is parsed. Letters and digits only, so the parser passes it
/// through untouched in every context.
struct Boundary {
    prefix: String,
}

enum Piece<'a> {
    Literal(&'a str),
    Block(usize),
}

impl Boundary {
    /// Pick a prefix that never occurs in the text segments.
    fn for_segments(segments: &[Segment]) -> Self {
        let mut prefix = BOUNDARY_PREFIX.to_string();
        while segments
            .iter()
            .any(|segment| matches!(segment, Segment::Text(text) if text.contains(&prefix)))
        {
            prefix.push('X');
        }
        Self { prefix }
    }

    fn marker(&self, index: usize) -> String {
        format!("{}{index}{BOUNDARY_END}", self.prefix)
    }

    fn split<'a>(&self, text: &'a str) -> Vec<Piece<'a>> {
        let mut pieces = Vec::new();
        let mut rest = text;
        while let Some(start) = rest.find(&self.prefix) {
            let after = &rest[start + self.prefix.len()..];
            let digits = after.bytes().take_while(u8::is_ascii_digit).count();
            let index = after[..digits]
                .parse::<usize>()
                .ok()
                .filter(|_| after[digits..].starts_with(BOUNDARY_END));
            let Some(index) = index else {
                let end = start + self.prefix.len();
                pieces.push(Piece::Literal(&rest[..end]));
                rest = &rest[end..];
                continue;
            };
            if start > 0 {
                pieces.push(Piece::Literal(&rest[..start]));
            }
            pieces.push(Piece::Block(index));
            rest = &after[digits + BOUNDARY_END.len()..];
        }
        if !rest.is_empty() {
            pieces.push(Piece::Literal(rest));
        }
        pieces
    }
}

/// Parse `markdown` once and replace each boundary marker with its
/// disclosure at the event level.
///
/// A marker sitting directly in a paragraph closes the paragraph around the
/// disclosure; anywhere else (code, list text, inline markup) the disclosure
/// is emitted in place.
fn splice_disclosures(markdown: &str, boundary: &Boundary, disclosures: &[String]) -> String {
    let disclosure = |index: usize| -> CowStr<'static> {
        disclosures
            .get(index)
            .cloned()
            .unwrap_or_default()
            .into()
    };

    let mut events: Vec<Event> = Vec::new();
    let mut in_paragraph: Vec<bool> = Vec::new();
    let mut reopened = false;

    for event in TextMergeStream::new(Parser::new_ext(markdown, markdown_options())) {
        match event {
            Event::Start(tag) => {
                in_paragraph.push(matches!(tag, Tag::Paragraph));
                reopened = false;
                events.push(Event::Start(tag));
            }
            Event::End(tag) => {
                in_paragraph.pop();
                reopened = false;
                if matches!(tag, TagEnd::Paragraph)
                    && matches!(events.last(), Some(Event::Start(Tag::Paragraph)))
                {
                    events.pop();
                } else {
                    events.push(Event::End(tag));
                }
            }
            Event::SoftBreak | Event::HardBreak if reopened => {}
            Event::Text(text) => {
                let direct = in_paragraph.last() == Some(&true);
                for piece in boundary.split(&text) {
                    match piece {
                        Piece::Literal(literal) => {
                            let literal = if reopened { literal.trim_start() } else { literal };
                            if literal.is_empty() {
                                continue;
                            }
                            reopened = false;
                            events.push(Event::Text(literal.to_string().into()));
                        }
                        Piece::Block(index) if direct => {
                            while matches!(events.last(), Some(Event::SoftBreak | Event::HardBreak)) {
                                events.pop();
                            }
                            if matches!(events.last(), Some(Event::Start(Tag::Paragraph))) {
                                events.pop();
                            } else {
                                events.push(Event::End(TagEnd::Paragraph));
                            }
                            events.push(Event::Html(disclosure(index)));
                            events.push(Event::Start(Tag::Paragraph));
                            reopened = true;
                        }
                        Piece::Block(index) => events.push(Event::Html(disclosure(index))),
                    }
                }
            }
            Event::Code(code) => {
                reopened = false;
                for piece in boundary.split(&code) {
                    match piece {
                        Piece::Literal(literal) => {
                            events.push(Event::Code(literal.to_string().into()))
                        }
                        Piece::Block(index) => events.push(Event::Html(disclosure(index))),
                    }
                }
            }
            Event::Html(raw) | Event::InlineHtml(raw) => {
                reopened = false;
                let mut spliced = String::with_capacity(raw.len());
                for piece in boundary.split(&raw) {
                    match piece {
                        Piece::Literal(literal) => spliced.push_str(literal),
                        Piece::Block(index) => spliced.push_str(&disclosure(index)),
                    }
                }
                events.push(Event::Html(spliced.into()));
            }
            other => {
                reopened = false;
                events.push(other);
            }
        }
    }

    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(
        &mut out,
        events.into_iter().map(|event| match event {
            Event::SoftBreak => Event::HardBreak,
            other => other,
        }),
    );
    out
}
