//! DocTags: the tagged intermediate representation and its document model.
//!
//! DocTags is the compact markup vocabulary the vision model emits token by
//! token: a `<doctag>…</doctag>` wrapper around block elements (`<text>`,
//! `<title>`, `<section_header_level_N>`, lists, `<otsl>` tables,
//! `<picture>`, page furniture, …) interleaved with `<loc_N>` location
//! tokens on a 0..=499 grid.
//!
//! [`parse`] turns a tag stream plus policy into a [`DocTagsDocument`];
//! [`export`] renders the document to Markdown and self-contained HTML;
//! [`text`] is the independent plain-text projection over the raw stream.

pub mod export;
pub mod parse;
pub mod text;

/// Marker opening a DocTags stream.
pub const OPENING_MARKER: &str = "<doctag>";

/// Marker signalling the model has finished the tagged representation.
pub const CLOSING_MARKER: &str = "</doctag>";

/// Side length of the normalised location grid used by `<loc_N>` tokens.
pub const LOC_GRID: u32 = 500;

/// A structured in-memory document reconstructed from a tag stream.
#[derive(Debug, Clone, PartialEq)]
pub struct DocTagsDocument {
    pub items: Vec<DocItem>,
    /// True when the stream ended before the closing marker and the parser
    /// salvaged a partial document.
    pub truncated: bool,
}

impl DocTagsDocument {
    /// Render the document as Markdown.
    pub fn to_markdown(&self) -> String {
        export::to_markdown(self)
    }

    /// Render the document as self-contained HTML, embedding picture regions
    /// cropped from `page` as inline base64 PNG data URIs.
    pub fn to_html(&self, page: &image::DynamicImage) -> Result<String, image::ImageError> {
        export::to_html(self, page)
    }
}

/// One block-level element of the page, in reading order.
#[derive(Debug, Clone, PartialEq)]
pub enum DocItem {
    Title(String),
    SectionHeader { level: u8, text: String },
    Text(String),
    Caption(String),
    Footnote(String),
    Code(String),
    Formula(String),
    List { ordered: bool, items: Vec<String> },
    Table(Table),
    Picture { bbox: Option<BoundingBox>, caption: Option<String> },
    /// Page furniture: kept in the model but excluded from structural
    /// exports.
    PageHeader(String),
    PageFooter(String),
}

/// A table reconstructed from OTSL cell tokens.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    /// Rows in reading order; ragged rows are padded at export time.
    pub rows: Vec<Vec<TableCell>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub text: String,
    /// True for `<ched>`/`<rhed>` header cells.
    pub header: bool,
}

/// A region on the normalised `<loc_N>` grid (left, top, right, bottom).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl BoundingBox {
    /// Scale the grid box to pixel coordinates `(x, y, width, height)` for a
    /// page of the given size. Degenerate boxes collapse to zero size.
    pub fn to_pixel_rect(&self, page_width: u32, page_height: u32) -> (u32, u32, u32, u32) {
        let scale = |v: u32, dim: u32| -> u32 {
            ((u64::from(v.min(LOC_GRID)) * u64::from(dim)) / u64::from(LOC_GRID)) as u32
        };
        let x0 = scale(self.left, page_width);
        let y0 = scale(self.top, page_height);
        let x1 = scale(self.right, page_width).max(x0);
        let y1 = scale(self.bottom, page_height).max(y0);
        (x0, y0, x1 - x0, y1 - y0)
    }
}
