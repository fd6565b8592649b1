//! Rendering a [`DocTagsDocument`] to Markdown and self-contained HTML.
//!
//! Both exporters walk the item list in reading order. Page furniture
//! (headers/footers) is dropped from structural output; the plain-text
//! projection in [`crate::doctags::text`] keeps it instead.
//!
//! The HTML export is a single self-contained file: picture regions are
//! cropped out of the page raster and inlined as base64 PNG data URIs, so
//! there are no external references to resolve.

use crate::doctags::{DocItem, DocTagsDocument, Table};
use crate::pipeline::encode;
use image::DynamicImage;
use std::fmt::Write as _;

/// Render the document as Markdown, blocks separated by blank lines.
pub fn to_markdown(doc: &DocTagsDocument) -> String {
    let mut blocks: Vec<String> = Vec::new();

    for item in &doc.items {
        match item {
            DocItem::Title(text) => blocks.push(format!("# {text}")),
            DocItem::SectionHeader { level, text } => {
                // Title owns level 1, so section headers start at ##.
                let depth = usize::from((*level).clamp(1, 5)) + 1;
                blocks.push(format!("{} {}", "#".repeat(depth), text));
            }
            DocItem::Text(text) | DocItem::Caption(text) | DocItem::Footnote(text) => {
                blocks.push(text.clone());
            }
            DocItem::Code(code) => blocks.push(format!("```\n{code}\n```")),
            DocItem::Formula(formula) => blocks.push(format!("$${formula}$$")),
            DocItem::List { ordered, items } => {
                let mut out = String::new();
                for (i, entry) in items.iter().enumerate() {
                    if i > 0 {
                        out.push('\n');
                    }
                    if *ordered {
                        let _ = write!(out, "{}. {}", i + 1, entry);
                    } else {
                        let _ = write!(out, "- {entry}");
                    }
                }
                if !out.is_empty() {
                    blocks.push(out);
                }
            }
            DocItem::Table(table) => {
                if let Some(md) = table_to_markdown(table) {
                    blocks.push(md);
                }
            }
            DocItem::Picture { caption, .. } => {
                blocks.push("<!-- image -->".to_string());
                if let Some(c) = caption {
                    blocks.push(c.clone());
                }
            }
            DocItem::PageHeader(_) | DocItem::PageFooter(_) => {}
        }
    }

    let mut out = blocks.join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Render a table as a GitHub-flavoured pipe table. Ragged rows are padded
/// to the widest row; the separator follows the first row.
fn table_to_markdown(table: &Table) -> Option<String> {
    let width = table.rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return None;
    }

    let mut out = String::new();
    for (i, row) in table.rows.iter().enumerate() {
        out.push('|');
        for col in 0..width {
            let text = row.get(col).map(|c| c.text.as_str()).unwrap_or("");
            let _ = write!(out, " {} |", escape_pipes(text));
        }
        out.push('\n');
        if i == 0 {
            out.push('|');
            for _ in 0..width {
                out.push_str("---|");
            }
            out.push('\n');
        }
    }
    out.truncate(out.trim_end().len());
    Some(out)
}

fn escape_pipes(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Render the document as a complete standalone HTML page.
///
/// Pictures with a crop box are cut from `page` and embedded inline; a
/// picture without one embeds the full page.
pub fn to_html(doc: &DocTagsDocument, page: &DynamicImage) -> Result<String, image::ImageError> {
    let mut body = String::new();

    for item in &doc.items {
        match item {
            DocItem::Title(text) => {
                let _ = writeln!(body, "<h1>{}</h1>", html_escape(text));
            }
            DocItem::SectionHeader { level, text } => {
                let depth = (*level).clamp(1, 5) + 1;
                let _ = writeln!(body, "<h{depth}>{}</h{depth}>", html_escape(text));
            }
            DocItem::Text(text) | DocItem::Caption(text) | DocItem::Footnote(text) => {
                let _ = writeln!(body, "<p>{}</p>", html_escape(text));
            }
            DocItem::Code(code) => {
                let _ = writeln!(body, "<pre><code>{}</code></pre>", html_escape(code));
            }
            DocItem::Formula(formula) => {
                let _ = writeln!(body, "<p><code>{}</code></p>", html_escape(formula));
            }
            DocItem::List { ordered, items } => {
                let tag = if *ordered { "ol" } else { "ul" };
                let _ = writeln!(body, "<{tag}>");
                for entry in items {
                    let _ = writeln!(body, "<li>{}</li>", html_escape(entry));
                }
                let _ = writeln!(body, "</{tag}>");
            }
            DocItem::Table(table) => table_to_html(table, &mut body),
            DocItem::Picture { bbox, caption } => {
                let crop = match bbox {
                    Some(b) => {
                        let (x, y, w, h) = b.to_pixel_rect(page.width(), page.height());
                        if w == 0 || h == 0 {
                            None
                        } else {
                            Some(page.crop_imm(x, y, w, h))
                        }
                    }
                    None => Some(page.clone()),
                };
                let _ = writeln!(body, "<figure>");
                if let Some(crop) = crop {
                    let uri = encode::encode_png_data_uri(&crop)?;
                    let _ = writeln!(body, "<img src=\"{uri}\" alt=\"picture\">");
                }
                if let Some(c) = caption {
                    let _ = writeln!(body, "<figcaption>{}</figcaption>", html_escape(c));
                }
                let _ = writeln!(body, "</figure>");
            }
            DocItem::PageHeader(_) | DocItem::PageFooter(_) => {}
        }
    }

    Ok(format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Converted Page</title>\n</head>\n<body>\n{body}</body>\n</html>\n"
    ))
}

fn table_to_html(table: &Table, body: &mut String) {
    let width = table.rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return;
    }
    let _ = writeln!(body, "<table>");
    for row in &table.rows {
        let _ = writeln!(body, "<tr>");
        for col in 0..width {
            let (text, header) = row
                .get(col)
                .map(|c| (c.text.as_str(), c.header))
                .unwrap_or(("", false));
            let tag = if header { "th" } else { "td" };
            let _ = writeln!(body, "<{tag}>{}</{tag}>", html_escape(text));
        }
        let _ = writeln!(body, "</tr>");
    }
    let _ = writeln!(body, "</table>");
}

fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doctags::{BoundingBox, TableCell};
    use image::{Rgba, RgbaImage};

    fn doc(items: Vec<DocItem>) -> DocTagsDocument {
        DocTagsDocument {
            items,
            truncated: false,
        }
    }

    fn page() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 80, Rgba([200, 10, 10, 255])))
    }

    #[test]
    fn markdown_headings() {
        let md = to_markdown(&doc(vec![
            DocItem::Title("Paper".into()),
            DocItem::SectionHeader {
                level: 1,
                text: "Intro".into(),
            },
            DocItem::Text("Body.".into()),
        ]));
        assert_eq!(md, "# Paper\n\n## Intro\n\nBody.\n");
    }

    #[test]
    fn markdown_lists() {
        let md = to_markdown(&doc(vec![DocItem::List {
            ordered: true,
            items: vec!["first".into(), "second".into()],
        }]));
        assert_eq!(md, "1. first\n2. second\n");
    }

    #[test]
    fn markdown_table_with_separator_and_padding() {
        let table = Table {
            rows: vec![
                vec![
                    TableCell {
                        text: "A".into(),
                        header: true,
                    },
                    TableCell {
                        text: "B".into(),
                        header: true,
                    },
                ],
                vec![TableCell {
                    text: "1|2".into(),
                    header: false,
                }],
            ],
        };
        let md = to_markdown(&doc(vec![DocItem::Table(table)]));
        assert_eq!(md, "| A | B |\n|---|---|\n| 1\\|2 |  |\n");
    }

    #[test]
    fn markdown_picture_placeholder_and_caption() {
        let md = to_markdown(&doc(vec![DocItem::Picture {
            bbox: None,
            caption: Some("Fig 1".into()),
        }]));
        assert_eq!(md, "<!-- image -->\n\nFig 1\n");
    }

    #[test]
    fn markdown_skips_page_furniture() {
        let md = to_markdown(&doc(vec![
            DocItem::PageHeader("Running head".into()),
            DocItem::Text("kept".into()),
            DocItem::PageFooter("3".into()),
        ]));
        assert_eq!(md, "kept\n");
    }

    #[test]
    fn markdown_code_and_formula() {
        let md = to_markdown(&doc(vec![
            DocItem::Code("let x = 1;".into()),
            DocItem::Formula("E = mc^2".into()),
        ]));
        assert_eq!(md, "```\nlet x = 1;\n```\n\n$$E = mc^2$$\n");
    }

    #[test]
    fn empty_document_renders_empty_markdown() {
        assert_eq!(to_markdown(&doc(vec![])), "");
    }

    #[test]
    fn html_is_self_contained() {
        let html = to_html(
            &doc(vec![
                DocItem::Title("T".into()),
                DocItem::Picture {
                    bbox: Some(BoundingBox {
                        left: 0,
                        top: 0,
                        right: 250,
                        bottom: 250,
                    }),
                    caption: Some("crop".into()),
                },
            ]),
            &page(),
        )
        .unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h1>T</h1>"));
        assert!(html.contains("data:image/png;base64,"));
        assert!(html.contains("<figcaption>crop</figcaption>"));
        assert!(!html.contains("http://"));
    }

    #[test]
    fn html_escapes_content() {
        let html = to_html(&doc(vec![DocItem::Text("a < b & \"c\"".into())]), &page()).unwrap();
        assert!(html.contains("<p>a &lt; b &amp; &quot;c&quot;</p>"));
    }

    #[test]
    fn html_table_uses_th_for_headers() {
        let table = Table {
            rows: vec![
                vec![TableCell {
                    text: "H".into(),
                    header: true,
                }],
                vec![TableCell {
                    text: "v".into(),
                    header: false,
                }],
            ],
        };
        let html = to_html(&doc(vec![DocItem::Table(table)]), &page()).unwrap();
        assert!(html.contains("<th>H</th>"));
        assert!(html.contains("<td>v</td>"));
    }

    #[test]
    fn html_degenerate_crop_box_omits_img() {
        let html = to_html(
            &doc(vec![DocItem::Picture {
                bbox: Some(BoundingBox {
                    left: 10,
                    top: 10,
                    right: 10,
                    bottom: 10,
                }),
                caption: None,
            }]),
            &page(),
        )
        .unwrap();
        assert!(html.contains("<figure>"));
        assert!(!html.contains("<img"));
    }
}
