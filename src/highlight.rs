//! Hit highlighting over stored document markup.
//!
//! Spans carry character offsets into the raw markup, as produced by the
//! term index. The highlighter wraps every span in a highlight element:
//! anchor spans get the hit style and a sequential id (`hit0`, `hit1`, ...)
//! for step-through navigation, context spans get the context style and no
//! id.
//!
//! Existing inline markup is respected:
//!
//! - a span nested inside inline elements splits them: they are closed
//!   before the highlight and reopened after it;
//! - a span that coincides with the content of an inline element wraps that
//!   element instead of nesting inside it;
//! - a span that crosses a tag is highlighted per text fragment, with the id
//!   on the first fragment only.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::search::types::TermMatchResult;

/// Configuration for highlight markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Name of the highlight element (e.g. "hi").
    pub element: String,
    /// Attribute carrying the highlight style.
    pub style_attribute: String,
    /// Style of anchor hits.
    pub hit_style: String,
    /// Style of context hits.
    pub context_style: String,
    /// Prefix of hit ids.
    pub id_prefix: String,
    /// Elements split around a nested highlight.
    pub inline_elements: Vec<String>,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        HighlightConfig {
            element: "hi".to_string(),
            style_attribute: "rend".to_string(),
            hit_style: "hit".to_string(),
            context_style: "context".to_string(),
            id_prefix: "hit".to_string(),
            inline_elements: ["hi", "b", "i", "em", "strong", "span"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl HighlightConfig {
    /// Create a new highlight configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the highlight element name.
    pub fn element<S: Into<String>>(mut self, element: S) -> Self {
        self.element = element.into();
        self
    }

    /// Set the style attribute name.
    pub fn style_attribute<S: Into<String>>(mut self, attribute: S) -> Self {
        self.style_attribute = attribute.into();
        self
    }

    /// Set the id prefix.
    pub fn id_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    /// Set the inline element names.
    pub fn inline_elements(mut self, elements: Vec<String>) -> Self {
        self.inline_elements = elements;
        self
    }

    /// Build the opening tag for a style, with an optional hit number.
    pub fn opening_tag(&self, style: &str, hit: Option<usize>) -> String {
        match hit {
            Some(n) => format!(
                "<{} {}=\"{}\" id=\"{}{}\">",
                self.element, self.style_attribute, style, self.id_prefix, n
            ),
            None => format!("<{} {}=\"{}\">", self.element, self.style_attribute, style),
        }
    }

    /// Build the closing tag.
    pub fn closing_tag(&self) -> String {
        format!("</{}>", self.element)
    }

    /// Whether an element is split around nested highlights.
    pub fn is_inline(&self, name: &str) -> bool {
        self.inline_elements.iter().any(|e| e == name)
    }

    /// Check that the configuration produces well-formed markup.
    pub fn validate(&self) -> Result<()> {
        let is_name = |s: &str| {
            !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || "-_:".contains(c))
        };
        if !is_name(&self.element) {
            return Err(SearchError::config(format!(
                "invalid highlight element '{}'",
                self.element
            )));
        }
        if !is_name(&self.style_attribute) {
            return Err(SearchError::config(format!(
                "invalid style attribute '{}'",
                self.style_attribute
            )));
        }
        Ok(())
    }
}

/// One region of a document to highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightSpan {
    /// Character offset of the first highlighted character.
    pub start_offset: usize,
    /// Character offset one past the last highlighted character.
    pub end_offset: usize,
    /// Anchor hit (numbered) rather than context.
    pub is_first_term: bool,
}

impl HighlightSpan {
    pub fn new(start_offset: usize, end_offset: usize, is_first_term: bool) -> Self {
        HighlightSpan {
            start_offset,
            end_offset,
            is_first_term,
        }
    }
}

/// Sorted, de-duplicated spans of one document of a match.
pub fn spans_for_document<M>(hit: &M, document_index: usize) -> Vec<HighlightSpan>
where
    M: TermMatchResult + ?Sized,
{
    let mut spans: Vec<HighlightSpan> = hit
        .documents()
        .get(&document_index)
        .map(|positions| {
            positions
                .values()
                .map(|p| HighlightSpan::new(p.start_offset, p.end_offset, p.is_first_term))
                .collect()
        })
        .unwrap_or_default();
    spans.sort_by_key(|s| (s.start_offset, s.end_offset, !s.is_first_term));
    spans.dedup_by_key(|s| (s.start_offset, s.end_offset));
    spans
}

/// Result of highlighting one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightedDocument {
    pub markup: String,
    /// Number of anchor hits inserted.
    pub hit_count: usize,
}

/// Inserts highlight markup into documents.
#[derive(Debug, Clone, Default)]
pub struct Highlighter {
    config: HighlightConfig,
}

impl Highlighter {
    pub fn new(config: HighlightConfig) -> Self {
        Highlighter { config }
    }

    pub fn config(&self) -> &HighlightConfig {
        &self.config
    }

    /// Highlight `spans` in `markup`.
    ///
    /// All spans are validated before any output is produced. Spans that
    /// overlap an earlier span are skipped and not counted.
    pub fn highlight(&self, markup: &str, spans: &[HighlightSpan]) -> Result<HighlightedDocument> {
        let document = Markup::parse(markup);
        for span in spans {
            document.validate(span)?;
        }

        let mut ordered = spans.to_vec();
        ordered.sort_by_key(|s| (s.start_offset, s.end_offset, !s.is_first_term));

        let mut writer = Writer::new(&document, &self.config);
        let mut hit_count = 0;
        let mut last_end = 0;
        for span in &ordered {
            if span.start_offset < last_end {
                log::warn!(
                    "Skipping highlight {}..{}: overlaps the previous span ending at {last_end}",
                    span.start_offset,
                    span.end_offset
                );
                continue;
            }
            let hit = span.is_first_term.then_some(hit_count);
            if writer.span(span, hit) && span.is_first_term {
                hit_count += 1;
            }
            last_end = span.end_offset;
        }

        let markup = writer.finish();
        log::debug!("Inserted {hit_count} hits for {} spans", spans.len());
        Ok(HighlightedDocument { markup, hit_count })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Open,
    Close,
    Empty,
    /// Comments, declarations, processing instructions.
    Other,
}

#[derive(Debug, Clone)]
struct Tag {
    /// Character offset of `<`.
    start: usize,
    /// Character offset one past `>`.
    end: usize,
    kind: TagKind,
    name: String,
    /// Matching open or close tag.
    partner: Option<usize>,
}

/// Markup split into tags, addressed by character offset.
struct Markup<'a> {
    text: &'a str,
    /// Byte offset of every character, plus the total length.
    boundaries: Vec<usize>,
    tags: Vec<Tag>,
}

impl<'a> Markup<'a> {
    fn parse(text: &'a str) -> Self {
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(b, _)| b)
            .chain(std::iter::once(text.len()))
            .collect();
        let chars: Vec<char> = text.chars().collect();

        let mut tags: Vec<Tag> = Vec::new();
        let mut open: Vec<usize> = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            if chars[i] != '<' {
                i += 1;
                continue;
            }
            // An unterminated tag runs to the end of the input.
            let (end, inner_end) = match chars[i..].iter().position(|&c| c == '>') {
                Some(len) => (i + len + 1, i + len),
                None => (chars.len(), chars.len()),
            };
            let inner: String = chars[i + 1..inner_end].iter().collect();
            let (kind, name) = if end == chars.len() && inner_end == end {
                (TagKind::Other, String::new())
            } else {
                classify(&inner)
            };

            let index = tags.len();
            tags.push(Tag {
                start: i,
                end,
                kind,
                name,
                partner: None,
            });
            match kind {
                TagKind::Open => open.push(index),
                TagKind::Close => {
                    let name = &tags[index].name;
                    if let Some(pos) = open.iter().rposition(|&o| &tags[o].name == name) {
                        let o = open[pos];
                        open.truncate(pos);
                        tags[o].partner = Some(index);
                        tags[index].partner = Some(o);
                    }
                }
                TagKind::Empty | TagKind::Other => {}
            }
            i = end;
        }

        Markup {
            text,
            boundaries,
            tags,
        }
    }

    fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }

    fn slice(&self, from: usize, to: usize) -> &'a str {
        &self.text[self.boundaries[from]..self.boundaries[to]]
    }

    fn inside_tag(&self, offset: usize) -> bool {
        let i = self.tags.partition_point(|t| t.start < offset);
        i > 0 && offset < self.tags[i - 1].end
    }

    fn validate(&self, span: &HighlightSpan) -> Result<()> {
        if span.start_offset >= span.end_offset {
            return Err(SearchError::highlight(format!(
                "empty span {}..{}",
                span.start_offset, span.end_offset
            )));
        }
        if span.end_offset > self.char_len() {
            return Err(SearchError::highlight(format!(
                "span {}..{} is beyond the document ({} characters)",
                span.start_offset,
                span.end_offset,
                self.char_len()
            )));
        }
        for offset in [span.start_offset, span.end_offset] {
            if self.inside_tag(offset) {
                return Err(SearchError::highlight(format!("offset {offset} falls inside a tag")));
            }
        }
        Ok(())
    }
}

fn classify(inner: &str) -> (TagKind, String) {
    let element_name = |s: &str| {
        s.trim_start()
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or_default()
            .to_string()
    };
    if let Some(rest) = inner.strip_prefix('/') {
        (TagKind::Close, element_name(rest))
    } else if inner.starts_with('!') || inner.starts_with('?') {
        (TagKind::Other, String::new())
    } else if inner.ends_with('/') {
        (TagKind::Empty, element_name(inner))
    } else {
        (TagKind::Open, element_name(inner))
    }
}

/// An element open in the output.
struct OpenElement {
    tag: usize,
    /// Byte offset of its opening tag in the output.
    out_pos: usize,
}

/// Streams markup to the output, inserting highlights.
struct Writer<'a> {
    document: &'a Markup<'a>,
    config: &'a HighlightConfig,
    out: String,
    stack: Vec<OpenElement>,
    /// Inline elements closed for a highlight and not yet reopened.
    pending: Vec<usize>,
    next_tag: usize,
    cursor: usize,
}

impl<'a> Writer<'a> {
    fn new(document: &'a Markup<'a>, config: &'a HighlightConfig) -> Self {
        Writer {
            document,
            config,
            out: String::with_capacity(document.text.len() + 64),
            stack: Vec::new(),
            pending: Vec::new(),
            next_tag: 0,
            cursor: 0,
        }
    }

    fn finish(mut self) -> String {
        self.copy_to(self.document.char_len());
        self.reopen();
        self.out
    }

    /// Next unconsumed tag, if it starts before `limit`.
    fn tag_before(&self, limit: usize) -> Option<usize> {
        let tag = self.document.tags.get(self.next_tag)?;
        (tag.start < limit).then_some(self.next_tag)
    }

    /// Copy markup up to `end` unchanged.
    fn copy_to(&mut self, end: usize) {
        while self.cursor < end {
            match self.tag_before(end) {
                Some(i) => {
                    let start = self.document.tags[i].start;
                    self.text(self.cursor, start);
                    self.tag(i);
                }
                None => {
                    self.text(self.cursor, end);
                    self.cursor = end;
                }
            }
        }
    }

    fn text(&mut self, from: usize, to: usize) {
        if from < to {
            self.reopen();
            self.out.push_str(self.document.slice(from, to));
        }
    }

    fn tag(&mut self, i: usize) {
        let document = self.document;
        let tag = &document.tags[i];
        self.next_tag = i + 1;
        self.cursor = tag.end;

        if tag.kind == TagKind::Close {
            // closing an element that was split right before it: drop both
            if self
                .pending
                .last()
                .is_some_and(|&p| document.tags[p].name == tag.name)
            {
                self.pending.pop();
                return;
            }
        }

        self.reopen();
        let out_pos = self.out.len();
        self.out.push_str(document.slice(tag.start, tag.end));
        match tag.kind {
            TagKind::Open => self.stack.push(OpenElement { tag: i, out_pos }),
            TagKind::Close => {
                if let Some(pos) = self
                    .stack
                    .iter()
                    .rposition(|e| document.tags[e.tag].name == tag.name)
                {
                    self.stack.truncate(pos);
                }
            }
            TagKind::Empty | TagKind::Other => {}
        }
    }

    fn reopen(&mut self) {
        let document = self.document;
        for i in std::mem::take(&mut self.pending) {
            let tag = &document.tags[i];
            let out_pos = self.out.len();
            self.out.push_str(document.slice(tag.start, tag.end));
            self.stack.push(OpenElement { tag: i, out_pos });
        }
    }

    fn opening(&self, hit: Option<usize>) -> String {
        match hit {
            Some(_) => self.config.opening_tag(&self.config.hit_style, hit),
            None => self.config.opening_tag(&self.config.context_style, None),
        }
    }

    /// Emit one span. Returns false if it contained no text.
    fn span(&mut self, span: &HighlightSpan, hit: Option<usize>) -> bool {
        let (start, end) = (span.start_offset, span.end_offset);
        self.copy_to(start);
        self.reopen();

        if self.tag_before(end).is_some() {
            return self.fragments(end, hit, span.is_first_term);
        }

        let open = self.opening(hit);
        let close = self.config.closing_tag();
        if let Some(close_tag) = self.coinciding_element(start, end) {
            let out_pos = self.stack.last().map_or(self.out.len(), |e| e.out_pos);
            self.out.insert_str(out_pos, &open);
            self.out.push_str(self.document.slice(start, end));
            self.cursor = end;
            self.copy_to(self.document.tags[close_tag].end);
            self.out.push_str(&close);
            return true;
        }

        let closed = self.split_inline();
        self.out.push_str(&open);
        self.out.push_str(self.document.slice(start, end));
        self.out.push_str(&close);
        self.pending = closed;
        self.cursor = end;
        true
    }

    /// Close tag of the innermost element whose content is exactly `start..end`.
    fn coinciding_element(&self, start: usize, end: usize) -> Option<usize> {
        let top = self.stack.last()?;
        let tag = &self.document.tags[top.tag];
        if tag.end != start || !self.config.is_inline(&tag.name) {
            return None;
        }
        let close = tag.partner?;
        (self.document.tags[close].start == end).then_some(close)
    }

    /// Close the inline elements at the top of the stack, innermost first.
    /// Returns them in opening order.
    fn split_inline(&mut self) -> Vec<usize> {
        let document = self.document;
        let mut closed = Vec::new();
        while let Some(top) = self.stack.last() {
            let tag = &document.tags[top.tag];
            if !self.config.is_inline(&tag.name) {
                break;
            }
            let opening = document.slice(tag.start, tag.end);
            if self.out.len() == top.out_pos + opening.len() {
                // nothing inside yet: drop the opening tag
                self.out.truncate(top.out_pos);
            } else {
                self.out.push_str("</");
                self.out.push_str(&tag.name);
                self.out.push('>');
            }
            closed.push(top.tag);
            self.stack.pop();
        }
        closed.reverse();
        closed
    }

    /// Highlight each text fragment of a span that crosses tags.
    fn fragments(&mut self, end: usize, hit: Option<usize>, is_first_term: bool) -> bool {
        let close = self.config.closing_tag();
        let mut emitted = false;
        while self.cursor < end {
            let text_end = self
                .tag_before(end)
                .map_or(end, |i| self.document.tags[i].start);
            if text_end > self.cursor {
                self.reopen();
                let open = if emitted {
                    let style = if is_first_term {
                        &self.config.hit_style
                    } else {
                        &self.config.context_style
                    };
                    self.config.opening_tag(style, None)
                } else {
                    self.opening(hit)
                };
                self.out.push_str(&open);
                self.out.push_str(self.document.slice(self.cursor, text_end));
                self.out.push_str(&close);
                emitted = true;
            }
            match self.tag_before(end) {
                Some(i) => self.tag(i),
                None => self.cursor = end,
            }
        }
        emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    use crate::search::types::{MultiTermMatch, TermPosition};

    fn hl() -> Highlighter {
        Highlighter::new(HighlightConfig::default())
    }

    fn strip_highlights(markup: &str) -> String {
        Regex::new(r#"</?hi( rend="(hit|context)"( id="hit\d+")?)?>"#)
            .unwrap()
            .replace_all(markup, "")
            .into_owned()
    }

    fn strip_tags(markup: &str) -> String {
        Regex::new("<[^>]*>").unwrap().replace_all(markup, "").into_owned()
    }

    #[test]
    fn test_plain_text() {
        let text = "evaṃ me sutaṃ ekaṃ samayaṃ";
        let spans = [
            HighlightSpan::new(0, 4, true),
            HighlightSpan::new(5, 7, false),
            HighlightSpan::new(8, 13, true),
        ];
        let result = hl().highlight(text, &spans).unwrap();
        assert_eq!(
            result.markup,
            "<hi rend=\"hit\" id=\"hit0\">evaṃ</hi> <hi rend=\"context\">me</hi> \
             <hi rend=\"hit\" id=\"hit1\">sutaṃ</hi> ekaṃ samayaṃ"
        );
        assert_eq!(result.hit_count, 2);
    }

    #[test]
    fn test_numbering_follows_document_order() {
        let text = "a b c d";
        // given out of order
        let spans = [
            HighlightSpan::new(6, 7, true),
            HighlightSpan::new(0, 1, true),
            HighlightSpan::new(4, 5, true),
        ];
        let result = hl().highlight(text, &spans).unwrap();
        let ids: Vec<&str> = Regex::new(r#"id="(hit\d+)">(\w)"#)
            .unwrap()
            .captures_iter(&result.markup)
            .map(|c| c.get(2).unwrap().as_str())
            .collect();
        assert_eq!(ids, vec!["a", "c", "d"]);
        assert!(result.markup.contains("id=\"hit0\">a"));
        assert!(result.markup.contains("id=\"hit2\">d"));
        assert_eq!(result.hit_count, 3);
    }

    #[test]
    fn test_round_trip_without_inline_markup() {
        let markup = "<p rend=\"bodytext\">evaṃ me sutaṃ</p>";
        // <p rend="bodytext"> is 19 characters
        let spans = [
            HighlightSpan::new(19, 23, true),
            HighlightSpan::new(24, 26, false),
            HighlightSpan::new(27, 32, true),
        ];
        let result = hl().highlight(markup, &spans).unwrap();
        assert_eq!(result.markup.matches("<hi ").count(), 3);
        assert_eq!(strip_highlights(&result.markup), markup);
    }

    #[test]
    fn test_nested_span_splits_element() {
        let markup = "<p>evaṃ <b>me sutaṃ</b> ekaṃ</p>";

        let result = hl().highlight(markup, &[HighlightSpan::new(11, 13, true)]).unwrap();
        assert_eq!(
            result.markup,
            "<p>evaṃ <hi rend=\"hit\" id=\"hit0\">me</hi><b> sutaṃ</b> ekaṃ</p>"
        );

        let result = hl().highlight(markup, &[HighlightSpan::new(14, 19, true)]).unwrap();
        assert_eq!(
            result.markup,
            "<p>evaṃ <b>me </b><hi rend=\"hit\" id=\"hit0\">sutaṃ</hi> ekaṃ</p>"
        );
        assert_eq!(strip_tags(&result.markup), strip_tags(markup));
    }

    #[test]
    fn test_split_inside_middle_of_element() {
        let markup = "<b>a b c</b>";
        let result = hl().highlight(markup, &[HighlightSpan::new(5, 6, false)]).unwrap();
        assert_eq!(result.markup, "<b>a </b><hi rend=\"context\">b</hi><b> c</b>");
        assert_eq!(result.hit_count, 0);
    }

    #[test]
    fn test_coinciding_element_is_wrapped() {
        let markup = "<p>evaṃ <b>me</b> sutaṃ</p>";
        let result = hl().highlight(markup, &[HighlightSpan::new(11, 13, true)]).unwrap();
        assert_eq!(
            result.markup,
            "<p>evaṃ <hi rend=\"hit\" id=\"hit0\"><b>me</b></hi> sutaṃ</p>"
        );
        assert_eq!(strip_highlights(&result.markup), markup);
    }

    #[test]
    fn test_straddling_span_is_highlighted_per_fragment() {
        let markup = "sa<b>cca</b> x";
        let result = hl().highlight(markup, &[HighlightSpan::new(0, 8, true)]).unwrap();
        assert_eq!(
            result.markup,
            "<hi rend=\"hit\" id=\"hit0\">sa</hi><b><hi rend=\"hit\">cca</hi></b> x"
        );
        assert_eq!(result.hit_count, 1);
        assert_eq!(strip_highlights(&result.markup), markup);
    }

    #[test]
    fn test_overlapping_span_is_skipped() {
        let result = hl()
            .highlight(
                "abcdefgh",
                &[HighlightSpan::new(0, 4, true), HighlightSpan::new(2, 6, true)],
            )
            .unwrap();
        assert_eq!(result.markup, "<hi rend=\"hit\" id=\"hit0\">abcd</hi>efgh");
        assert_eq!(result.hit_count, 1);
    }

    #[test]
    fn test_invalid_offsets() {
        let markup = "<p>sacca</p>";
        let err = hl().highlight(markup, &[HighlightSpan::new(1, 5, true)]).unwrap_err();
        assert!(matches!(err, SearchError::Highlight(_)));

        let err = hl().highlight(markup, &[HighlightSpan::new(3, 40, true)]).unwrap_err();
        assert!(matches!(err, SearchError::Highlight(_)));

        let err = hl().highlight(markup, &[HighlightSpan::new(4, 4, true)]).unwrap_err();
        assert!(matches!(err, SearchError::Highlight(_)));
    }

    #[test]
    fn test_no_spans_returns_markup_unchanged() {
        let markup = "<p>a <b>b</b><pb n=\"3\"/> c</p>";
        let result = hl().highlight(markup, &[]).unwrap();
        assert_eq!(result.markup, markup);
        assert_eq!(result.hit_count, 0);
    }

    #[test]
    fn test_spans_for_document() {
        let tp = |position: u32, is_first_term: bool, start: usize, end: usize| TermPosition {
            word_index: 0,
            position,
            position_index: 0,
            is_first_term,
            start_offset: start,
            end_offset: end,
            word: String::new(),
        };
        let mut hit = MultiTermMatch::new(vec!["evaṃ".into(), "sutaṃ".into()]);
        hit.add_alignment(0, tp(3, true, 20, 24), vec![tp(1, false, 5, 10)]);
        hit.add_alignment(0, tp(1, true, 5, 10), vec![tp(3, false, 20, 24)]);

        let spans = spans_for_document(&hit, 0);
        assert_eq!(
            spans,
            vec![HighlightSpan::new(5, 10, true), HighlightSpan::new(20, 24, true)]
        );
        assert!(spans_for_document(&hit, 7).is_empty());
    }

    #[test]
    fn test_custom_config() {
        let config = HighlightConfig::new().element("span").style_attribute("class").id_prefix("m");
        assert_eq!(config.opening_tag("hit", Some(4)), "<span class=\"hit\" id=\"m4\">");
        assert_eq!(config.closing_tag(), "</span>");
        assert!(config.validate().is_ok());
        assert!(HighlightConfig::new().element("").validate().is_err());
    }
}
