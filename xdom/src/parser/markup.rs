use pulldown_cmark::{Event, HeadingLevel, Options, Parser as CmarkParser, Tag, TagEnd};

use crate::block::{self, Block, Format, MacroInvocation};
use crate::parser::error::ParseError;
use crate::parser::macro_call::read_macro;
use crate::syntax::Syntax;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse markup into top-level blocks.
///
/// A macro call that starts a line and ends its line is a standalone (block)
/// invocation; any other macro call is inline within its paragraph.
pub fn parse_markup(
    source: &str,
    file_id: usize,
    syntax: &Syntax,
) -> Result<Vec<Block>, Vec<ParseError>> {
    let mut state = ParseState::new(syntax);
    let segments = split_macros(source, file_id, syntax, &mut state.inline, &mut state.errors);
    for segment in segments {
        match segment {
            Segment::Markup(text) => state.parse_markdown(&text),
            Segment::Macro(invocation) => state.top.push(Block::MacroInvocation(invocation)),
        }
    }
    state.finalize()
}

// ---------------------------------------------------------------------------
// Macro segmentation
// ---------------------------------------------------------------------------

enum Segment {
    /// Markdown with every inline call replaced by a placeholder.
    Markup(String),
    Macro(MacroInvocation),
}

/// An inline call cut out of the markdown before it is handed to pulldown-cmark.
struct InlineCall {
    invocation: Option<MacroInvocation>,
    /// The call as written, for placeholders that land in code.
    source: String,
}

const PLACEHOLDER_START: char = '\u{E000}';
const PLACEHOLDER_END: char = '\u{E001}';
const PLACEHOLDER_DIGIT_BASE: u32 = 0xE010;

/// Private-use characters encoding `index`. pulldown-cmark treats them as
/// ordinary word characters, so they never split a paragraph or a run of
/// emphasis.
fn placeholder(index: usize) -> String {
    let mut out = String::new();
    out.push(PLACEHOLDER_START);
    for digit in index.to_string().chars() {
        let value = digit.to_digit(10).unwrap_or(0);
        if let Some(c) = char::from_u32(PLACEHOLDER_DIGIT_BASE + value) {
            out.push(c);
        }
    }
    out.push(PLACEHOLDER_END);
    out
}

/// Read a placeholder at the start of `text`: (call index, bytes consumed).
fn read_placeholder(text: &str) -> Option<(usize, usize)> {
    let rest = text.strip_prefix(PLACEHOLDER_START)?;
    let end = rest.find(PLACEHOLDER_END)?;
    let mut index = 0usize;
    for c in rest[..end].chars() {
        let digit = (c as u32).checked_sub(PLACEHOLDER_DIGIT_BASE)?;
        if digit > 9 {
            return None;
        }
        index = index.checked_mul(10)?.checked_add(digit as usize)?;
    }
    Some((
        index,
        PLACEHOLDER_START.len_utf8() + end + PLACEHOLDER_END.len_utf8(),
    ))
}

fn line_end(source: &str, from: usize) -> usize {
    source[from..]
        .find('\n')
        .map(|i| from + i + 1)
        .unwrap_or(source.len())
}

/// Cut macro calls out of the raw source.
///
/// Standalone calls become their own segments. Inline calls are read from the
/// raw text, so their content may hold markdown or blank lines and their spans
/// are exact source offsets; the markdown keeps a placeholder in their place.
/// Fenced code and backtick code spans are copied through untouched.
fn split_macros(
    source: &str,
    file_id: usize,
    syntax: &Syntax,
    inline: &mut Vec<InlineCall>,
    errors: &mut Vec<ParseError>,
) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut markup = String::new();
    let mut pos = 0;
    let mut at_line_start = true;
    let mut in_fence = false;

    while pos < source.len() {
        let end = line_end(source, pos);

        if at_line_start {
            let line = &source[pos..end];
            let trimmed = line.trim_start();

            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_fence = !in_fence;
            }
            if in_fence || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                markup.push_str(line);
                pos = end;
                continue;
            }

            if trimmed.starts_with("{{") {
                let macro_start = pos + (line.len() - trimmed.len());
                match read_macro(&source[macro_start..], file_id) {
                    Ok(Some(parsed)) => {
                        let macro_end = macro_start + parsed.len;
                        let rest_end = line_end(source, macro_end);
                        if source[macro_end..rest_end].trim().is_empty() {
                            if !markup.is_empty() {
                                segments.push(Segment::Markup(std::mem::take(&mut markup)));
                            }
                            segments.push(Segment::Macro(
                                MacroInvocation::new(parsed.call, syntax.clone())
                                    .with_span(macro_start..macro_end),
                            ));
                            pos = rest_end;
                            continue;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        errors.push(err.offset_by(macro_start));
                        // Skip the offending line so the error is reported once.
                        pos = end;
                        continue;
                    }
                }
            }
            at_line_start = false;
        }

        let Some(i) = source[pos..end].find(['{', '`']) else {
            markup.push_str(&source[pos..end]);
            pos = end;
            at_line_start = true;
            continue;
        };
        let at = pos + i;
        markup.push_str(&source[pos..at]);

        if source[at..].starts_with('`') {
            let run = source[at..].len() - source[at..].trim_start_matches('`').len();
            let close = find_backtick_run(&source[at + run..end], run)
                .map(|j| at + run + j + run)
                .unwrap_or(at + run);
            markup.push_str(&source[at..close]);
            pos = close;
        } else if source[at..].starts_with("{{") {
            match read_macro(&source[at..], file_id) {
                Ok(Some(parsed)) => {
                    let call_end = at + parsed.len;
                    markup.push_str(&placeholder(inline.len()));
                    inline.push(InlineCall {
                        invocation: Some(
                            MacroInvocation::new(parsed.call, syntax.clone())
                                .with_span(at..call_end),
                        ),
                        source: source[at..call_end].to_string(),
                    });
                    pos = call_end;
                }
                Ok(None) => {
                    markup.push_str("{{");
                    pos = at + 2;
                }
                Err(err) => {
                    errors.push(err.offset_by(at));
                    markup.push_str(&source[at..end]);
                    pos = end;
                    at_line_start = true;
                }
            }
        } else {
            markup.push('{');
            pos = at + 1;
        }
    }

    if !markup.is_empty() {
        segments.push(Segment::Markup(markup));
    }
    segments
}

/// Offset of the first run of exactly `len` backticks in `text`.
fn find_backtick_run(text: &str, len: usize) -> Option<usize> {
    let mut search = 0;
    while let Some(i) = text[search..].find('`') {
        let at = search + i;
        let run = text[at..].len() - text[at..].trim_start_matches('`').len();
        if run == len {
            return Some(at);
        }
        search = at + run;
    }
    None
}

// ---------------------------------------------------------------------------
// Markdown events → blocks
// ---------------------------------------------------------------------------

struct ParseState<'s> {
    syntax: &'s Syntax,
    /// Open containers, innermost last.
    stack: Vec<Frame>,
    top: Vec<Block>,
    /// Inline calls, indexed by their placeholder.
    inline: Vec<InlineCall>,
    /// Consecutive text events not yet split into words.
    pending_text: Option<String>,
    /// Text of the code block being read, if one is open.
    code: Option<String>,
    errors: Vec<ParseError>,
}

struct Frame {
    kind: FrameKind,
    children: Vec<Block>,
}

enum FrameKind {
    Paragraph,
    Heading(u8),
    Quotation,
    List(bool),
    ListItem,
    Format(Format),
    Link(String),
    Group,
}

impl<'s> ParseState<'s> {
    fn new(syntax: &'s Syntax) -> Self {
        ParseState {
            syntax,
            stack: Vec::new(),
            top: Vec::new(),
            inline: Vec::new(),
            pending_text: None,
            code: None,
            errors: Vec::new(),
        }
    }

    fn parse_markdown(&mut self, text: &str) {
        let options = Options::ENABLE_STRIKETHROUGH;
        for event in CmarkParser::new_ext(text, options) {
            self.process_event(event);
        }
        self.flush_text();
        // Unbalanced events cannot come out of pulldown-cmark, but never lose content.
        while !self.stack.is_empty() {
            self.close_frame();
        }
    }

    fn process_event(&mut self, event: Event<'_>) {
        if self.code.is_some() {
            match event {
                Event::Text(text) => {
                    let text = self.restore(&text);
                    if let Some(code) = self.code.as_mut() {
                        code.push_str(&text);
                    }
                }
                Event::End(TagEnd::CodeBlock) => {
                    let content = self.code.take().unwrap_or_default();
                    self.push(Block::Verbatim {
                        content: content.trim_end_matches('\n').to_string(),
                        inline: false,
                    });
                }
                _ => {}
            }
            return;
        }

        if let Event::Text(text) = &event {
            match self.pending_text.as_mut() {
                Some(pending) => pending.push_str(text),
                None => self.pending_text = Some(text.to_string()),
            }
            return;
        }
        self.flush_text();

        match event {
            Event::Start(tag) => self.open_tag(tag),
            Event::End(TagEnd::CodeBlock) => {}
            Event::End(_) => self.close_frame(),
            Event::Code(code) => {
                let content = self.restore(&code);
                self.push(Block::Verbatim {
                    content,
                    inline: true,
                });
            }
            Event::InlineHtml(html) | Event::Html(html) => self.push_text(&html),
            Event::SoftBreak | Event::HardBreak => self.push(Block::NewLine),
            Event::Rule => self.push(Block::HorizontalLine),
            _ => {}
        }
    }

    fn open_tag(&mut self, tag: Tag<'_>) {
        let kind = match tag {
            Tag::Paragraph => FrameKind::Paragraph,
            Tag::Heading { level, .. } => FrameKind::Heading(heading_level_to_u8(level)),
            Tag::BlockQuote(_) => FrameKind::Quotation,
            Tag::List(start) => FrameKind::List(start.is_some()),
            Tag::Item => FrameKind::ListItem,
            Tag::Emphasis => FrameKind::Format(Format::Italic),
            Tag::Strong => FrameKind::Format(Format::Bold),
            Tag::Strikethrough => FrameKind::Format(Format::Strikethrough),
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                FrameKind::Link(self.restore(&dest_url))
            }
            Tag::CodeBlock(_) => {
                self.code = Some(String::new());
                return;
            }
            _ => FrameKind::Group,
        };
        self.stack.push(Frame {
            kind,
            children: Vec::new(),
        });
    }

    fn close_frame(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let children = frame.children;
        let block = match frame.kind {
            FrameKind::Paragraph => Block::Paragraph(children),
            FrameKind::Heading(level) => Block::Heading { level, children },
            FrameKind::Quotation => Block::Quotation(children),
            FrameKind::List(ordered) => Block::List {
                ordered,
                items: children,
            },
            FrameKind::ListItem => Block::ListItem(children),
            FrameKind::Format(format) => Block::Format { format, children },
            FrameKind::Link(reference) => Block::Link {
                reference,
                children,
            },
            FrameKind::Group => Block::Group(children),
        };
        self.push(block);
    }

    fn push(&mut self, block: Block) {
        match self.stack.last_mut() {
            Some(frame) => frame.children.push(block),
            None => self.top.push(block),
        }
    }

    fn flush_text(&mut self) {
        if let Some(text) = self.pending_text.take() {
            self.push_text(&text);
        }
    }

    /// Split text into words, turning placeholders back into inline invocations.
    fn push_text(&mut self, text: &str) {
        let mut rest = text;
        while let Some(i) = rest.find(PLACEHOLDER_START) {
            for word in block::words(&rest[..i]) {
                self.push(word);
            }
            match read_placeholder(&rest[i..]) {
                Some((index, len)) => {
                    let invocation = self
                        .inline
                        .get_mut(index)
                        .and_then(|call| call.invocation.take());
                    if let Some(invocation) = invocation {
                        self.push(Block::MacroInvocation(invocation));
                    }
                    rest = &rest[i + len..];
                }
                None => {
                    self.push(Block::Word(PLACEHOLDER_START.to_string()));
                    rest = &rest[i + PLACEHOLDER_START.len_utf8()..];
                }
            }
        }
        for word in block::words(rest) {
            self.push(word);
        }
    }

    /// Put the written form of every call back, for text that is not parsed further.
    fn restore(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(i) = rest.find(PLACEHOLDER_START) {
            out.push_str(&rest[..i]);
            match read_placeholder(&rest[i..]) {
                Some((index, len)) => {
                    if let Some(call) = self.inline.get_mut(index) {
                        call.invocation = None;
                        out.push_str(&call.source);
                    }
                    rest = &rest[i + len..];
                }
                None => {
                    out.push(PLACEHOLDER_START);
                    rest = &rest[i + PLACEHOLDER_START.len_utf8()..];
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn finalize(self) -> Result<Vec<Block>, Vec<ParseError>> {
        if self.errors.is_empty() {
            Ok(self.top)
        } else {
            Err(self.errors)
        }
    }
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
