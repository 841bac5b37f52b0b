// Markdown rendering for assistant replies
//
// Uses pulldown-cmark to parse markdown and convert to styled ratatui Lines.
// Supports: headings, bold, italic, inline code, fenced code blocks, lists,
// blockquotes, horizontal rules, links.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

/// A segment of parsed markdown with semantic meaning
#[derive(Debug, Clone)]
pub enum StyledSegment {
    /// Regular text
    Text(String),
    /// Inline code: `like this`
    InlineCode(String),
    /// Fenced code block
    CodeBlock { code: String },
    /// Soft break (single newline in source)
    SoftBreak,
    /// Hard break (explicit line break)
    HardBreak,
    /// End of paragraph (adds blank line for spacing)
    ParagraphEnd,
    /// Heading with level
    Heading { level: u8, text: String },
    /// List item marker (bullet or number)
    ListItemStart {
        ordered: bool,
        number: u32,
        depth: usize,
    },
    /// End of list item
    ListItemEnd,
    /// Bold text: **like this**
    Bold(String),
    /// Italic text: *like this*
    Italic(String),
    /// Start of blockquote (> prefix)
    BlockQuoteStart,
    /// End of blockquote
    BlockQuoteEnd,
    /// Horizontal rule (---)
    Rule,
    /// Link: [text](url)
    Link { text: String, url: String },
}

/// Parse markdown into styled segments
pub fn parse_markdown(markdown: &str) -> Vec<StyledSegment> {
    let mut segments = Vec::new();
    let mut in_code_block = false;
    let mut in_heading: Option<u8> = None;
    let mut code_block_content = String::new();
    let mut heading_content = String::new();
    // List tracking: stack of (ordered, current_number) for nested lists
    let mut list_stack: Vec<(bool, u32)> = Vec::new();

    let mut in_bold = false;
    let mut in_italic = false;
    let mut bold_content = String::new();
    let mut italic_content = String::new();

    let mut in_link = false;
    let mut link_url = String::new();
    let mut link_text = String::new();

    let options = Options::ENABLE_STRIKETHROUGH;

    for event in Parser::new_ext(markdown, options) {
        match event {
            Event::Code(code) => {
                if in_heading.is_some() {
                    heading_content.push_str(&code);
                } else {
                    segments.push(StyledSegment::InlineCode(code.to_string()));
                }
            }

            Event::Start(Tag::Heading { level, .. }) => {
                in_heading = Some(match level {
                    HeadingLevel::H1 => 1,
                    HeadingLevel::H2 => 2,
                    HeadingLevel::H3 => 3,
                    HeadingLevel::H4 => 4,
                    HeadingLevel::H5 => 5,
                    HeadingLevel::H6 => 6,
                });
                heading_content.clear();
            }

            Event::End(TagEnd::Heading(_)) => {
                if let Some(level) = in_heading.take() {
                    segments.push(StyledSegment::Heading {
                        level,
                        text: heading_content.clone(),
                    });
                }
                heading_content.clear();
            }

            Event::Start(Tag::CodeBlock(_kind)) => {
                in_code_block = true;
                code_block_content.clear();
            }

            Event::Text(text) if in_code_block => {
                code_block_content.push_str(&text);
            }

            Event::Text(text) if in_heading.is_some() => {
                heading_content.push_str(&text);
            }

            Event::Text(text) if in_link => {
                link_text.push_str(&text);
            }

            Event::Text(text) if in_bold => {
                bold_content.push_str(&text);
            }

            Event::Text(text) if in_italic => {
                italic_content.push_str(&text);
            }

            Event::Text(text) => {
                segments.push(StyledSegment::Text(text.to_string()));
            }

            Event::End(TagEnd::CodeBlock) => {
                segments.push(StyledSegment::CodeBlock {
                    code: code_block_content.clone(),
                });
                in_code_block = false;
                code_block_content.clear();
            }

            Event::End(TagEnd::Paragraph) => {
                segments.push(StyledSegment::ParagraphEnd);
            }

            Event::SoftBreak => {
                if in_heading.is_some() {
                    heading_content.push(' ');
                } else {
                    segments.push(StyledSegment::SoftBreak);
                }
            }
            Event::HardBreak => {
                segments.push(StyledSegment::HardBreak);
            }

            Event::Start(Tag::List(first_number)) => {
                let ordered = first_number.is_some();
                let start = first_number.unwrap_or(1) as u32;
                list_stack.push((ordered, start));
            }

            Event::End(TagEnd::List(_)) => {
                list_stack.pop();
                if list_stack.is_empty() {
                    segments.push(StyledSegment::ParagraphEnd);
                }
            }

            Event::Start(Tag::Item) => {
                let depth = list_stack.len();
                if let Some((ordered, ref mut number)) = list_stack.last_mut() {
                    segments.push(StyledSegment::ListItemStart {
                        ordered: *ordered,
                        number: *number,
                        depth,
                    });
                    *number += 1;
                }
            }

            Event::End(TagEnd::Item) => {
                segments.push(StyledSegment::ListItemEnd);
            }

            Event::Start(Tag::Strong) => {
                in_bold = true;
                bold_content.clear();
            }

            Event::End(TagEnd::Strong) => {
                if !bold_content.is_empty() {
                    segments.push(StyledSegment::Bold(bold_content.clone()));
                }
                bold_content.clear();
                in_bold = false;
            }

            Event::Start(Tag::Emphasis) => {
                in_italic = true;
                italic_content.clear();
            }

            Event::End(TagEnd::Emphasis) => {
                if !italic_content.is_empty() {
                    segments.push(StyledSegment::Italic(italic_content.clone()));
                }
                italic_content.clear();
                in_italic = false;
            }

            Event::Start(Tag::BlockQuote) => {
                segments.push(StyledSegment::BlockQuoteStart);
            }

            Event::End(TagEnd::BlockQuote) => {
                segments.push(StyledSegment::BlockQuoteEnd);
            }

            Event::Rule => {
                segments.push(StyledSegment::Rule);
            }

            Event::Start(Tag::Link { dest_url, .. }) => {
                in_link = true;
                link_url = dest_url.to_string();
                link_text.clear();
            }

            Event::End(TagEnd::Link) => {
                segments.push(StyledSegment::Link {
                    text: link_text.clone(),
                    url: link_url.clone(),
                });
                link_text.clear();
                link_url.clear();
                in_link = false;
            }

            _ => {}
        }
    }

    segments
}

/// Wrap text to fit within width, breaking at word boundaries
/// Preserves leading/trailing whitespace to maintain spacing between segments
///
/// Uses unicode display width for correct handling of emojis, CJK, etc.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let leading_space = text.starts_with(char::is_whitespace);
    let trailing_space = text.ends_with(char::is_whitespace);

    let mut result = Vec::new();
    let mut current_line = String::new();
    let mut current_width = 0usize;

    if leading_space {
        current_line.push(' ');
        current_width = 1;
    }

    for word in text.split_whitespace() {
        let word_width = word.width();
        if current_line.is_empty() || (current_width == 1 && leading_space && result.is_empty()) {
            current_line.push_str(word);
            current_width += word_width;
        } else if current_width + 1 + word_width <= width {
            current_line.push(' ');
            current_line.push_str(word);
            current_width += 1 + word_width;
        } else {
            result.push(current_line);
            current_line = word.to_string();
            current_width = word_width;
        }
    }

    if trailing_space && !current_line.is_empty() {
        current_line.push(' ');
    }

    if !current_line.is_empty() {
        result.push(current_line);
    }

    // Handle whitespace-only input
    if result.is_empty() && !text.is_empty() {
        result.push(text.to_string());
    }

    result
}

/// Convert parsed segments to ratatui Lines for rendering
///
/// Width parameter controls text wrapping for proper scroll calculation.
pub fn segments_to_lines(segments: &[StyledSegment], width: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current_spans: Vec<Span<'static>> = Vec::new();
    let mut current_width: usize = 0;

    let flush_line = |lines: &mut Vec<Line<'static>>, spans: &mut Vec<Span<'static>>| {
        if !spans.is_empty() {
            lines.push(Line::from(std::mem::take(spans)));
        }
    };

    for segment in segments {
        match segment {
            StyledSegment::Text(text) => {
                let parts: Vec<&str> = text.split('\n').collect();
                for (i, part) in parts.iter().enumerate() {
                    if !part.is_empty() {
                        let wrapped = wrap_text(part, width);

                        for (j, wrapped_line) in wrapped.iter().enumerate() {
                            let line_width = wrapped_line.width();
                            let needs_new_line =
                                current_width > 0 && current_width + line_width > width;

                            if j > 0 || needs_new_line {
                                flush_line(&mut lines, &mut current_spans);
                                current_width = 0;
                            }

                            current_spans.push(Span::raw(wrapped_line.clone()));
                            current_width += line_width;
                        }
                    }
                    if i < parts.len() - 1 {
                        flush_line(&mut lines, &mut current_spans);
                        current_width = 0;
                    }
                }
            }

            StyledSegment::InlineCode(code) => {
                current_spans.push(Span::styled(
                    code.clone(),
                    Style::default().fg(Color::Yellow),
                ));
                current_width += code.width();
            }

            StyledSegment::CodeBlock { code } => {
                flush_line(&mut lines, &mut current_spans);
                current_width = 0;

                for line in code.lines() {
                    lines.push(Line::from(Span::styled(
                        format!("  {}", line),
                        Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
                    )));
                }
            }

            StyledSegment::SoftBreak => {
                current_spans.push(Span::raw(" "));
                current_width += 1;
            }

            StyledSegment::HardBreak => {
                flush_line(&mut lines, &mut current_spans);
                current_width = 0;
            }

            StyledSegment::ParagraphEnd => {
                flush_line(&mut lines, &mut current_spans);
                lines.push(Line::from(""));
                current_width = 0;
            }

            StyledSegment::Heading { level, text } => {
                flush_line(&mut lines, &mut current_spans);
                current_width = 0;

                let style = match level {
                    1 => Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD),
                    2 => Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                    _ => Style::default()
                        .fg(Color::Blue)
                        .add_modifier(Modifier::BOLD),
                };
                lines.push(Line::from(Span::styled(text.clone(), style)));
            }

            StyledSegment::ListItemStart {
                ordered,
                number,
                depth,
            } => {
                flush_line(&mut lines, &mut current_spans);

                // Indent based on depth (2 spaces per level, depth starts at 1)
                let indent = "  ".repeat(depth.saturating_sub(1));
                let marker = if *ordered {
                    format!("{}{}. ", indent, number)
                } else {
                    format!("{}• ", indent)
                };
                current_width = marker.width();
                current_spans.push(Span::styled(marker, Style::default().fg(Color::DarkGray)));
            }

            StyledSegment::ListItemEnd => {
                flush_line(&mut lines, &mut current_spans);
                current_width = 0;
            }

            StyledSegment::Bold(text) => {
                current_spans.push(Span::styled(
                    text.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ));
                current_width += text.width();
            }

            StyledSegment::Italic(text) => {
                current_spans.push(Span::styled(
                    text.clone(),
                    Style::default().add_modifier(Modifier::ITALIC),
                ));
                current_width += text.width();
            }

            StyledSegment::BlockQuoteStart => {
                flush_line(&mut lines, &mut current_spans);
                current_spans.push(Span::styled(
                    "│ ".to_string(),
                    Style::default().fg(Color::DarkGray),
                ));
                current_width = 2;
            }

            StyledSegment::BlockQuoteEnd => {
                flush_line(&mut lines, &mut current_spans);
                lines.push(Line::from(""));
                current_width = 0;
            }

            StyledSegment::Rule => {
                flush_line(&mut lines, &mut current_spans);
                let rule_width = width.saturating_sub(4).max(10);
                let rule = "─".repeat(rule_width);
                lines.push(Line::from(Span::styled(
                    rule,
                    Style::default().fg(Color::DarkGray),
                )));
                current_width = 0;
            }

            StyledSegment::Link { text, url } => {
                let display = if text.is_empty() || text == url {
                    url.clone()
                } else {
                    format!("{} ({})", text, url)
                };
                current_spans.push(Span::styled(
                    display.clone(),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::UNDERLINED),
                ));
                current_width += display.width();
            }
        }
    }

    if !current_spans.is_empty() {
        lines.push(Line::from(current_spans));
    }

    lines
}

/// Strip control characters that can cause TUI rendering artifacts
///
/// Removes carriage returns, backspaces, ANSI escape sequences, and other
/// ASCII control characters (except tab and newline).
fn sanitize_for_tui(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            // Skip ANSI escape sequences entirely
            '\x1b' => {
                if chars.peek() == Some(&'[') {
                    chars.next(); // consume '['
                    while let Some(&next) = chars.peek() {
                        chars.next();
                        if next.is_ascii_alphabetic() {
                            break;
                        }
                    }
                }
            }
            '\r' | '\x08' | '\x7f' => {}
            c if c.is_ascii_control() && c != '\t' && c != '\n' => {}
            _ => result.push(ch),
        }
    }

    result
}

/// High-level: parse markdown and convert directly to Lines
pub fn render_markdown(markdown: &str, width: usize) -> Vec<Line<'static>> {
    let sanitized = sanitize_for_tui(markdown);
    let segments = parse_markdown(&sanitized);
    segments_to_lines(&segments, width)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_parse_inline_code() {
        let md = "Check the `contacts` table";
        let segments = parse_markdown(md);

        assert!(matches!(segments[0], StyledSegment::Text(_)));
        assert!(matches!(segments[1], StyledSegment::InlineCode(_)));
        assert!(matches!(segments[2], StyledSegment::Text(_)));
    }

    #[test]
    fn test_parse_code_block() {
        let md = "```\nlead: Acme Corp\n```";
        let segments = parse_markdown(md);

        assert!(matches!(&segments[0], StyledSegment::CodeBlock { .. }));
    }

    #[test]
    fn test_render_produces_lines() {
        let md = "Hello `world`\n\nNew paragraph";
        let lines = render_markdown(md, 80);

        assert!(!lines.is_empty());
    }

    #[test]
    fn test_list_rendering() {
        let md = "Your top deals:\n\n1. Acme expansion\n2. Globex renewal";
        let lines = render_markdown(md, 80);

        let all_text: String = lines.iter().map(|l| line_text(l) + "\n").collect();
        assert!(all_text.contains("1. Acme expansion"));
        assert!(all_text.contains("2. Globex renewal"));
    }

    #[test]
    fn test_hard_break_parsing() {
        // Two trailing spaces before newline should create a hard break
        let md = "**Lead:** Acme Corp  \n**Stage:** Qualified";
        let segments = parse_markdown(md);

        let hard_break_count = segments
            .iter()
            .filter(|s| matches!(s, StyledSegment::HardBreak))
            .count();
        assert!(hard_break_count >= 1);
    }

    #[test]
    fn test_long_text_wraps() {
        let md = "word ".repeat(40);
        let lines = render_markdown(&md, 20);

        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line_text(line).len() <= 21);
        }
    }

    #[test]
    fn test_sanitize_strips_ansi() {
        let md = "plain \x1b[31mred\x1b[0m text\r";
        let lines = render_markdown(md, 80);

        let all_text: String = lines.iter().map(line_text).collect();
        assert!(all_text.contains("plain red text"));
        assert!(!all_text.contains('\x1b'));
        assert!(!all_text.contains('\r'));
    }
}
