//! DocTags parsing: tag stream → [`DocTagsDocument`].
//!
//! The grammar is flat and marker-heavy rather than deeply nested, so the
//! parser is a hand-rolled lexer plus a single-pass builder. It is lenient
//! where the model is sloppy (unknown tags, stray location tokens, text in
//! odd places are skipped with a warning) and strict where structure matters
//! (mismatched closing tags, a missing `<doctag>` wrapper).
//!
//! Streams cut at the token cap are the one policy decision: under
//! [`TruncationPolicy::Strict`] they are rejected; under
//! [`TruncationPolicy::Salvage`] open elements are closed at end of input and
//! the partial document is returned with its `truncated` flag set.

use crate::config::TruncationPolicy;
use crate::doctags::{BoundingBox, DocItem, DocTagsDocument, Table, TableCell};
use crate::error::Page2DocError;
use tracing::warn;

/// Parse a DocTags stream into a structured document.
pub fn parse_doctags(
    stream: &str,
    policy: TruncationPolicy,
) -> Result<DocTagsDocument, Page2DocError> {
    let stream = match policy {
        TruncationPolicy::Salvage => clip_trailing_partial_tag(stream),
        TruncationPolicy::Strict => stream,
    };
    if stream.trim().is_empty() {
        return Err(Page2DocError::Parse("empty DocTags stream".into()));
    }
    let lexemes = lex(stream)?;
    Parser {
        lexemes,
        pos: 0,
        policy,
        truncated: false,
    }
    .parse()
}

/// Drop a partial tag left dangling at end of input: a token-cap cut can
/// land in the middle of a tag, leaving a trailing `<…` with no closing
/// `>`. Salvage clips it so the rest of the stream still lexes; the parser
/// then marks the document truncated at end of input as usual.
fn clip_trailing_partial_tag(stream: &str) -> &str {
    match stream.rfind('<') {
        Some(pos) if !stream[pos..].contains('>') => &stream[..pos],
        _ => stream,
    }
}

// ── Lexer ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Lexeme<'a> {
    Open(&'a str),
    Close(&'a str),
    Loc(u32),
    Text(&'a str),
}

fn lex(input: &str) -> Result<Vec<Lexeme<'_>>, Page2DocError> {
    let mut out = Vec::new();
    let mut i = 0;

    while i < input.len() {
        match input[i..].find('<') {
            Some(rel) => {
                let open = i + rel;
                if open > i {
                    out.push(Lexeme::Text(&input[i..open]));
                }
                let close = input[open..]
                    .find('>')
                    .map(|r| open + r)
                    .ok_or_else(|| Page2DocError::Parse("unterminated tag".into()))?;
                let name = &input[open + 1..close];
                if name.is_empty() {
                    return Err(Page2DocError::Parse("empty tag".into()));
                }
                if let Some(stripped) = name.strip_prefix('/') {
                    out.push(Lexeme::Close(stripped));
                } else if let Some(num) = name.strip_prefix("loc_") {
                    match num.parse::<u32>() {
                        Ok(v) => out.push(Lexeme::Loc(v)),
                        Err(_) => out.push(Lexeme::Open(name)),
                    }
                } else {
                    out.push(Lexeme::Open(name));
                }
                i = close + 1;
            }
            None => {
                out.push(Lexeme::Text(&input[i..]));
                break;
            }
        }
    }

    Ok(out)
}

// ── Parser ───────────────────────────────────────────────────────────────

struct Parser<'a> {
    lexemes: Vec<Lexeme<'a>>,
    pos: usize,
    policy: TruncationPolicy,
    truncated: bool,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Lexeme<'a>> {
        self.lexemes.get(self.pos)
    }

    fn next(&mut self) -> Option<Lexeme<'a>> {
        let lx = self.lexemes.get(self.pos).cloned();
        if lx.is_some() {
            self.pos += 1;
        }
        lx
    }

    /// End-of-input inside the document body: truncation per policy.
    fn handle_eof(&mut self) -> Result<(), Page2DocError> {
        match self.policy {
            TruncationPolicy::Strict => Err(Page2DocError::Parse(
                "stream truncated before </doctag>".into(),
            )),
            TruncationPolicy::Salvage => {
                self.truncated = true;
                Ok(())
            }
        }
    }

    fn parse(mut self) -> Result<DocTagsDocument, Page2DocError> {
        // Skip leading whitespace, then require the wrapper.
        while matches!(self.peek(), Some(Lexeme::Text(t)) if t.trim().is_empty()) {
            self.pos += 1;
        }
        match self.next() {
            Some(Lexeme::Open("doctag")) => {}
            _ => {
                return Err(Page2DocError::Parse(
                    "output does not start with <doctag>".into(),
                ))
            }
        }

        let mut items = Vec::new();

        loop {
            match self.next() {
                None => {
                    self.handle_eof()?;
                    break;
                }
                Some(Lexeme::Close("doctag")) => break,
                Some(Lexeme::Close(other)) => {
                    return Err(Page2DocError::Parse(format!(
                        "unexpected closing tag </{other}>"
                    )));
                }
                Some(Lexeme::Loc(_)) => {}
                Some(Lexeme::Text(t)) => {
                    if !t.trim().is_empty() {
                        warn!("Skipping stray text outside any element: {:?}", t.trim());
                    }
                }
                Some(Lexeme::Open(tag)) => {
                    if let Some(item) = self.parse_element(tag, &mut items)? {
                        items.push(item);
                    }
                }
            }
        }

        Ok(DocTagsDocument {
            items,
            truncated: self.truncated,
        })
    }

    /// Parse one opened element. Returns `None` for unknown tags.
    fn parse_element(
        &mut self,
        tag: &'a str,
        items: &mut Vec<DocItem>,
    ) -> Result<Option<DocItem>, Page2DocError> {
        let item = match tag {
            "title" => DocItem::Title(self.inline_text(tag)?),
            "text" | "paragraph" => DocItem::Text(self.inline_text(tag)?),
            "caption" => DocItem::Caption(self.inline_text(tag)?),
            "footnote" => DocItem::Footnote(self.inline_text(tag)?),
            "code" => DocItem::Code(self.inline_text(tag)?),
            "formula" => DocItem::Formula(self.inline_text(tag)?),
            "page_header" => DocItem::PageHeader(self.inline_text(tag)?),
            "page_footer" => DocItem::PageFooter(self.inline_text(tag)?),
            "unordered_list" => self.list(tag, false)?,
            "ordered_list" => self.list(tag, true)?,
            "otsl" => {
                let (table, caption) = self.table(tag)?;
                if let Some(c) = caption {
                    items.push(DocItem::Table(table));
                    return Ok(Some(DocItem::Caption(c)));
                }
                DocItem::Table(table)
            }
            "picture" => self.picture(tag)?,
            _ if tag.starts_with("section_header_level_") => {
                let level = tag["section_header_level_".len()..]
                    .parse::<u8>()
                    .unwrap_or(1)
                    .clamp(1, 6);
                DocItem::SectionHeader {
                    level,
                    text: self.inline_text(tag)?,
                }
            }
            other => {
                warn!("Skipping unknown DocTags element <{}>", other);
                self.skip_unknown(other);
                return Ok(None);
            }
        };
        Ok(Some(item))
    }

    /// Collect the text content of a simple element up to its closing tag.
    /// Location tokens and unknown inline markers are dropped.
    fn inline_text(&mut self, tag: &str) -> Result<String, Page2DocError> {
        let mut text = String::new();
        loop {
            match self.next() {
                None => {
                    self.handle_eof()?;
                    return Ok(text.trim().to_string());
                }
                Some(Lexeme::Close(t)) if t == tag => return Ok(text.trim().to_string()),
                Some(Lexeme::Close(other)) => {
                    return Err(Page2DocError::Parse(format!(
                        "mismatched closing tag </{other}> inside <{tag}>"
                    )));
                }
                Some(Lexeme::Loc(_)) => {}
                Some(Lexeme::Open(inner)) => {
                    warn!("Skipping inline marker <{}> inside <{}>", inner, tag);
                }
                Some(Lexeme::Text(t)) => text.push_str(t),
            }
        }
    }

    /// Parse `<unordered_list>`/`<ordered_list>` bodies of `<list_item>`s.
    fn list(&mut self, tag: &'a str, ordered: bool) -> Result<DocItem, Page2DocError> {
        let mut entries = Vec::new();
        loop {
            match self.next() {
                None => {
                    self.handle_eof()?;
                    break;
                }
                Some(Lexeme::Close(t)) if t == tag => break,
                Some(Lexeme::Close(other)) => {
                    return Err(Page2DocError::Parse(format!(
                        "mismatched closing tag </{other}> inside <{tag}>"
                    )));
                }
                Some(Lexeme::Open("list_item")) => {
                    let entry = self.inline_text("list_item")?;
                    if !entry.is_empty() {
                        entries.push(entry);
                    }
                }
                Some(Lexeme::Loc(_)) => {}
                Some(Lexeme::Text(t)) => {
                    if !t.trim().is_empty() {
                        warn!("Skipping stray text inside <{}>: {:?}", tag, t.trim());
                    }
                }
                Some(Lexeme::Open(other)) => {
                    warn!("Skipping unknown marker <{}> inside <{}>", other, tag);
                }
            }
        }
        Ok(DocItem::List {
            ordered,
            items: entries,
        })
    }

    /// Parse an `<otsl>` table.
    ///
    /// OTSL cells are unclosed markers: `<fcel>`/`<ched>`/`<rhed>` start a
    /// cell whose text runs to the next marker, `<ecel>` is an empty cell,
    /// span continuations (`<lcel>`/`<ucel>`/`<xcel>`) render as empty cells,
    /// and `<nl>` ends a row.
    fn table(&mut self, tag: &'a str) -> Result<(Table, Option<String>), Page2DocError> {
        let mut rows: Vec<Vec<TableCell>> = Vec::new();
        let mut row: Vec<TableCell> = Vec::new();
        let mut cell: Option<TableCell> = None;
        let mut caption = None;

        fn flush_cell(row: &mut Vec<TableCell>, cell: &mut Option<TableCell>) {
            if let Some(mut c) = cell.take() {
                c.text = c.text.trim().to_string();
                row.push(c);
            }
        }

        loop {
            match self.next() {
                None => {
                    self.handle_eof()?;
                    break;
                }
                Some(Lexeme::Close(t)) if t == tag => break,
                Some(Lexeme::Close(other)) => {
                    return Err(Page2DocError::Parse(format!(
                        "mismatched closing tag </{other}> inside <{tag}>"
                    )));
                }
                Some(Lexeme::Open("fcel")) => {
                    flush_cell(&mut row, &mut cell);
                    cell = Some(TableCell {
                        text: String::new(),
                        header: false,
                    });
                }
                Some(Lexeme::Open("ched")) | Some(Lexeme::Open("rhed")) => {
                    flush_cell(&mut row, &mut cell);
                    cell = Some(TableCell {
                        text: String::new(),
                        header: true,
                    });
                }
                Some(Lexeme::Open("ecel"))
                | Some(Lexeme::Open("lcel"))
                | Some(Lexeme::Open("ucel"))
                | Some(Lexeme::Open("xcel")) => {
                    flush_cell(&mut row, &mut cell);
                    row.push(TableCell {
                        text: String::new(),
                        header: false,
                    });
                }
                Some(Lexeme::Open("nl")) => {
                    flush_cell(&mut row, &mut cell);
                    if !row.is_empty() {
                        rows.push(std::mem::take(&mut row));
                    }
                }
                Some(Lexeme::Open("caption")) => {
                    let c = self.inline_text("caption")?;
                    if !c.is_empty() {
                        caption = Some(c);
                    }
                }
                Some(Lexeme::Loc(_)) => {}
                Some(Lexeme::Text(t)) => match cell.as_mut() {
                    Some(c) => c.text.push_str(t),
                    None => {
                        if !t.trim().is_empty() {
                            warn!("Skipping text outside any table cell: {:?}", t.trim());
                        }
                    }
                },
                Some(Lexeme::Open(other)) => {
                    warn!("Skipping unknown marker <{}> inside <{}>", other, tag);
                }
            }
        }

        flush_cell(&mut row, &mut cell);
        if !row.is_empty() {
            rows.push(row);
        }
        Ok((Table { rows }, caption))
    }

    /// Parse a `<picture>` element: the first four location tokens form the
    /// crop box; an optional nested `<caption>` is kept; classification
    /// markers are ignored.
    fn picture(&mut self, tag: &'a str) -> Result<DocItem, Page2DocError> {
        let mut locs: Vec<u32> = Vec::new();
        let mut caption = None;

        loop {
            match self.next() {
                None => {
                    self.handle_eof()?;
                    break;
                }
                Some(Lexeme::Close(t)) if t == tag => break,
                Some(Lexeme::Close(other)) => {
                    return Err(Page2DocError::Parse(format!(
                        "mismatched closing tag </{other}> inside <{tag}>"
                    )));
                }
                Some(Lexeme::Loc(v)) => locs.push(v),
                Some(Lexeme::Open("caption")) => {
                    let c = self.inline_text("caption")?;
                    if !c.is_empty() {
                        caption = Some(c);
                    }
                }
                Some(Lexeme::Text(t)) => {
                    if !t.trim().is_empty() {
                        warn!("Skipping stray text inside <picture>: {:?}", t.trim());
                    }
                }
                Some(Lexeme::Open(other)) => {
                    // Classification markers (<chart>, <logo>, …) are standalone.
                    warn!("Ignoring picture classification marker <{}>", other);
                }
            }
        }

        let bbox = (locs.len() >= 4).then(|| BoundingBox {
            left: locs[0],
            top: locs[1],
            right: locs[2],
            bottom: locs[3],
        });
        Ok(DocItem::Picture { bbox, caption })
    }

    /// Skip an unknown element: jump past its matching close tag when one
    /// exists, otherwise treat the open tag as a standalone marker.
    fn skip_unknown(&mut self, tag: &str) {
        let mut i = self.pos;
        while let Some(lx) = self.lexemes.get(i) {
            if matches!(lx, Lexeme::Close(t) if *t == tag) {
                self.pos = i + 1;
                return;
            }
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: TruncationPolicy = TruncationPolicy::Strict;

    #[test]
    fn parses_simple_text_blocks() {
        let doc = parse_doctags(
            "<doctag><text>Hello</text><text>World</text></doctag>",
            POLICY,
        )
        .unwrap();
        assert_eq!(
            doc.items,
            vec![DocItem::Text("Hello".into()), DocItem::Text("World".into())]
        );
        assert!(!doc.truncated);
    }

    #[test]
    fn strips_location_tokens_from_text() {
        let doc = parse_doctags(
            "<doctag><text><loc_10><loc_20><loc_400><loc_30>Located</text></doctag>",
            POLICY,
        )
        .unwrap();
        assert_eq!(doc.items, vec![DocItem::Text("Located".into())]);
    }

    #[test]
    fn parses_title_and_section_headers() {
        let doc = parse_doctags(
            "<doctag><title>Paper</title><section_header_level_1>Intro</section_header_level_1></doctag>",
            POLICY,
        )
        .unwrap();
        assert_eq!(
            doc.items,
            vec![
                DocItem::Title("Paper".into()),
                DocItem::SectionHeader {
                    level: 1,
                    text: "Intro".into()
                },
            ]
        );
    }

    #[test]
    fn parses_lists() {
        let doc = parse_doctags(
            "<doctag><unordered_list><list_item>a</list_item><list_item>b</list_item></unordered_list></doctag>",
            POLICY,
        )
        .unwrap();
        assert_eq!(
            doc.items,
            vec![DocItem::List {
                ordered: false,
                items: vec!["a".into(), "b".into()]
            }]
        );
    }

    #[test]
    fn parses_otsl_table() {
        let doc = parse_doctags(
            "<doctag><otsl><ched>H1<ched>H2<nl><fcel>1<fcel>2<nl><fcel>3<ecel><nl></otsl></doctag>",
            POLICY,
        )
        .unwrap();
        let DocItem::Table(table) = &doc.items[0] else {
            panic!("expected table, got {:?}", doc.items);
        };
        assert_eq!(table.rows.len(), 3);
        assert!(table.rows[0][0].header);
        assert_eq!(table.rows[0][1].text, "H2");
        assert_eq!(table.rows[1][0].text, "1");
        assert_eq!(table.rows[2][1].text, "");
    }

    #[test]
    fn parses_picture_with_bbox_and_caption() {
        let doc = parse_doctags(
            "<doctag><picture><loc_10><loc_20><loc_300><loc_400><caption>Fig 1</caption></picture></doctag>",
            POLICY,
        )
        .unwrap();
        assert_eq!(
            doc.items,
            vec![DocItem::Picture {
                bbox: Some(BoundingBox {
                    left: 10,
                    top: 20,
                    right: 300,
                    bottom: 400
                }),
                caption: Some("Fig 1".into()),
            }]
        );
    }

    #[test]
    fn rejects_empty_stream() {
        let err = parse_doctags("   ", POLICY).unwrap_err();
        assert!(err.to_string().contains("empty DocTags stream"));
    }

    #[test]
    fn rejects_missing_wrapper() {
        let err = parse_doctags("<text>loose</text>", POLICY).unwrap_err();
        assert!(err.to_string().contains("does not start with <doctag>"));
    }

    #[test]
    fn rejects_mismatched_close() {
        let err = parse_doctags("<doctag><text>x</title></doctag>", POLICY).unwrap_err();
        assert!(err.to_string().contains("mismatched closing tag"));
    }

    #[test]
    fn rejects_unterminated_tag() {
        let err = parse_doctags("<doctag><text>x</text><pic", POLICY).unwrap_err();
        assert!(err.to_string().contains("unterminated tag"));
    }

    #[test]
    fn strict_rejects_truncated_stream() {
        let err = parse_doctags(
            "<doctag><text>cut off mid",
            TruncationPolicy::Strict,
        )
        .unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn salvage_recovers_truncated_stream() {
        let doc = parse_doctags(
            "<doctag><text>complete</text><text>cut off mid",
            TruncationPolicy::Salvage,
        )
        .unwrap();
        assert!(doc.truncated);
        assert_eq!(
            doc.items,
            vec![
                DocItem::Text("complete".into()),
                DocItem::Text("cut off mid".into())
            ]
        );
    }

    #[test]
    fn salvage_recovers_stream_cut_mid_tag() {
        // A cap cut can land inside a tag; the dangling partial is dropped.
        let doc = parse_doctags(
            "<doctag><text>kept</text><pictu",
            TruncationPolicy::Salvage,
        )
        .unwrap();
        assert!(doc.truncated);
        assert_eq!(doc.items, vec![DocItem::Text("kept".into())]);
    }

    #[test]
    fn strict_rejects_stream_cut_mid_tag() {
        let err = parse_doctags(
            "<doctag><text>kept</text><pictu",
            TruncationPolicy::Strict,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unterminated tag"));
    }

    #[test]
    fn salvage_of_only_a_partial_tag_is_empty_stream() {
        let err = parse_doctags("<docta", TruncationPolicy::Salvage).unwrap_err();
        assert!(err.to_string().contains("empty DocTags stream"));
    }

    #[test]
    fn salvage_keeps_complete_document_with_trailing_partial_tag() {
        // The closing marker arrived; a partial tag riding the same fragment
        // is trailing garbage, not truncation.
        let doc = parse_doctags(
            "<doctag><text>x</text></doctag><pic",
            TruncationPolicy::Salvage,
        )
        .unwrap();
        assert!(!doc.truncated);
        assert_eq!(doc.items, vec![DocItem::Text("x".into())]);
    }

    #[test]
    fn salvage_recovers_truncated_table() {
        let doc = parse_doctags(
            "<doctag><otsl><ched>A<nl><fcel>1",
            TruncationPolicy::Salvage,
        )
        .unwrap();
        assert!(doc.truncated);
        let DocItem::Table(table) = &doc.items[0] else {
            panic!("expected table");
        };
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][0].text, "1");
    }

    #[test]
    fn unknown_elements_are_skipped() {
        let doc = parse_doctags(
            "<doctag><watermark>ignore me</watermark><text>kept</text></doctag>",
            POLICY,
        )
        .unwrap();
        assert_eq!(doc.items, vec![DocItem::Text("kept".into())]);
    }

    #[test]
    fn trailing_content_after_closing_marker_is_ignored() {
        let doc = parse_doctags("<doctag><text>x</text></doctag> trailing", POLICY).unwrap();
        assert_eq!(doc.items, vec![DocItem::Text("x".into())]);
    }

    #[test]
    fn page_furniture_is_parsed() {
        let doc = parse_doctags(
            "<doctag><page_header>Running head</page_header><text>body</text><page_footer>3</page_footer></doctag>",
            POLICY,
        )
        .unwrap();
        assert_eq!(doc.items.len(), 3);
        assert_eq!(doc.items[0], DocItem::PageHeader("Running head".into()));
        assert_eq!(doc.items[2], DocItem::PageFooter("3".into()));
    }
}
