//! PDF export of the project brief.
//!
//! Layout is computed first (lines wrapped by measured width, then placed on
//! fixed-height pages) and drawn with printpdf. Text uses an embedded TrueType
//! font when one is configured; otherwise the built-in Helvetica, which only
//! encodes WinAnsi, and text outside it is rejected instead of dropped. Files
//! are written to a temp path and renamed into place, so a failed export
//! leaves nothing behind.

use std::path::{Path, PathBuf};

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument};
use tracing::{info, warn};
use uuid::Uuid;

use super::ProjectBrief;
use crate::error::BriefError;

pub const BRIEF_FILE_NAME: &str = "project-brief.pdf";

/// A4 portrait.
pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;
/// Height of content slice per page.
pub const PAGE_HEIGHT_MM: f32 = 295.0;
pub const MARGIN_MM: f32 = 18.0;
/// Usable line width between the margins.
pub const CONTENT_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;

const MM_PER_PT: f32 = 25.4 / 72.0;

/// Helvetica advance widths for `' '..='~'`, in 1/1000 em.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // digits
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// Width assumed for non-ASCII Latin and other narrow scripts.
const NARROW_FALLBACK: u16 = 778;
/// Width assumed for CJK and other full-width glyphs.
const WIDE: u16 = 1000;
/// Headroom for embedded fonts, whose Latin glyphs run wider than Helvetica.
const EXTERNAL_WIDTH_SCALE: f32 = 1.15;

/// WinAnsi code points outside Latin-1 (0x80..0x9F).
const WIN_ANSI_EXTRAS: [char; 27] = [
    '\u{20AC}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{017D}', '\u{2018}',
    '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}', '\u{02DC}',
    '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{017E}', '\u{0178}',
];

/// Font used to draw the brief.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BriefFont {
    /// printpdf's built-in Helvetica.
    #[default]
    Builtin,
    /// A TrueType file embedded into each PDF.
    External(PathBuf),
}

impl BriefFont {
    /// Estimated width of `text` at `size_pt`, in mm.
    pub fn text_width_mm(&self, text: &str, size_pt: f32) -> f32 {
        let units: u32 = text.chars().map(|ch| u32::from(glyph_width(ch))).sum();
        let scale = match self {
            Self::Builtin => 1.0,
            Self::External(_) => EXTERNAL_WIDTH_SCALE,
        };
        units as f32 / 1000.0 * size_pt * MM_PER_PT * scale
    }
}

fn glyph_width(ch: char) -> u16 {
    match ch {
        ' '..='~' => HELVETICA_ASCII[ch as usize - 0x20],
        _ if is_wide(ch) => WIDE,
        _ => NARROW_FALLBACK,
    }
}

fn is_wide(ch: char) -> bool {
    matches!(
        ch as u32,
        0x1100..=0x115F
            | 0x2E80..=0xA4CF
            | 0xAC00..=0xD7A3
            | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F
            | 0xFF00..=0xFF60
            | 0xFFE0..=0xFFE6
            | 0x1F300..=0x1FAFF
            | 0x20000..=0x3FFFD
    )
}

fn encodable_in_win_ansi(ch: char) -> bool {
    matches!(ch, ' '..='~' | '\u{A0}'..='\u{FF}') || WIN_ANSI_EXTRAS.contains(&ch)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Title,
    Heading,
    Body,
}

impl LineStyle {
    fn size_pt(&self) -> f32 {
        match self {
            Self::Title => 22.0,
            Self::Heading => 14.0,
            Self::Body => 11.0,
        }
    }

    /// Vertical space the line occupies, in mm.
    fn advance_mm(&self) -> f32 {
        match self {
            Self::Title => 14.0,
            Self::Heading => 9.0,
            Self::Body => 5.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutLine {
    pub text: String,
    pub style: LineStyle,
}

/// A line placed on a page, `top_mm` measured from the top edge.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub style: LineStyle,
    pub top_mm: f32,
}

/// Flatten the brief into styled lines wrapped to the content width.
pub fn layout(brief: &ProjectBrief, font: &BriefFont) -> Vec<LayoutLine> {
    let mut lines = wrapped("Project Brief", LineStyle::Title, font);
    for header in brief.header_lines() {
        lines.extend(wrapped(&header, LineStyle::Body, font));
    }
    for section in &brief.sections {
        lines.push(LayoutLine {
            text: String::new(),
            style: LineStyle::Body,
        });
        lines.extend(wrapped(section.title, LineStyle::Heading, font));
        lines.extend(wrapped(&section.body, LineStyle::Body, font));
    }
    lines
}

fn wrapped(text: &str, style: LineStyle, font: &BriefFont) -> Vec<LayoutLine> {
    let size = style.size_pt();
    wrap(text, CONTENT_WIDTH_MM, |s| font.text_width_mm(s, size))
        .into_iter()
        .map(|text| LayoutLine { text, style })
        .collect()
}

/// Greedy word wrap against `max_width` as reported by `measure`. Words wider
/// than a line are split at the last character that still fits.
pub fn wrap(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut out = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if measure(&candidate) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            let mut rest = word;
            while measure(rest) > max_width {
                let cut = split_point(rest, max_width, &measure);
                out.push(rest[..cut].to_string());
                rest = &rest[cut..];
            }
            current = rest.to_string();
        }
        if !current.is_empty() {
            out.push(current);
        }
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

/// Byte index ending the longest prefix of `word` that fits. Always at least
/// one character, so splitting makes progress.
fn split_point(word: &str, max_width: f32, measure: &impl Fn(&str) -> f32) -> usize {
    let mut cut = word.chars().next().map_or(word.len(), char::len_utf8);
    for (idx, ch) in word.char_indices().skip(1) {
        let end = idx + ch.len_utf8();
        if measure(&word[..end]) > max_width {
            break;
        }
        cut = end;
    }
    cut
}

/// Place lines top-down, starting a new page whenever the next line would
/// cross the bottom margin of the current slice.
pub fn paginate(lines: &[LayoutLine]) -> Vec<Vec<PlacedLine>> {
    let bottom = PAGE_HEIGHT_MM - MARGIN_MM;
    let mut pages: Vec<Vec<PlacedLine>> = vec![Vec::new()];
    let mut cursor = MARGIN_MM;

    for line in lines {
        let advance = line.style.advance_mm();
        if cursor + advance > bottom && pages.last().is_some_and(|p| !p.is_empty()) {
            pages.push(Vec::new());
            cursor = MARGIN_MM;
        }
        cursor += advance;
        if let Some(page) = pages.last_mut() {
            page.push(PlacedLine {
                text: line.text.clone(),
                style: line.style,
                top_mm: cursor,
            });
        }
    }
    pages
}

/// Characters the built-in font cannot encode, in first-seen order.
fn unsupported_chars(lines: &[LayoutLine]) -> String {
    let mut seen = String::new();
    for ch in lines.iter().flat_map(|l| l.text.chars()) {
        if !encodable_in_win_ansi(ch) && !seen.contains(ch) {
            seen.push(ch);
        }
    }
    seen
}

fn render_error(e: impl std::fmt::Display) -> BriefError {
    BriefError::Render(e.to_string())
}

/// Render the brief to PDF bytes.
pub fn render_pdf(brief: &ProjectBrief, font: &BriefFont) -> Result<Vec<u8>, BriefError> {
    let lines = layout(brief, font);
    if *font == BriefFont::Builtin {
        let chars = unsupported_chars(&lines);
        if !chars.is_empty() {
            return Err(BriefError::UnsupportedText { chars });
        }
    }
    let pages = paginate(&lines);

    let (doc, first_page, first_layer) = PdfDocument::new(
        "Project Brief",
        Mm(PAGE_WIDTH_MM),
        Mm(A4_HEIGHT_MM),
        "Layer 1",
    );
    let (regular, bold): (IndirectFontRef, IndirectFontRef) = match font {
        BriefFont::Builtin => (
            doc.add_builtin_font(BuiltinFont::Helvetica)
                .map_err(render_error)?,
            doc.add_builtin_font(BuiltinFont::HelveticaBold)
                .map_err(render_error)?,
        ),
        BriefFont::External(path) => {
            let data = std::fs::read(path)?;
            let face = doc
                .add_external_font(data.as_slice())
                .map_err(render_error)?;
            (face.clone(), face)
        }
    };

    let mut targets = vec![(first_page, first_layer)];
    for _ in 1..pages.len() {
        targets.push(doc.add_page(Mm(PAGE_WIDTH_MM), Mm(A4_HEIGHT_MM), "Layer 1"));
    }

    for (page, (page_idx, layer_idx)) in pages.iter().zip(targets) {
        let layer = doc.get_page(page_idx).get_layer(layer_idx);
        for line in page.iter().filter(|l| !l.text.is_empty()) {
            let face = match line.style {
                LineStyle::Body => &regular,
                LineStyle::Title | LineStyle::Heading => &bold,
            };
            layer.use_text(
                line.text.clone(),
                line.style.size_pt(),
                Mm(MARGIN_MM),
                Mm(A4_HEIGHT_MM - line.top_mm),
                face,
            );
        }
    }

    doc.save_to_bytes().map_err(render_error)
}

/// Write already-rendered PDF bytes to `dir/project-brief.pdf`.
pub async fn save_pdf(bytes: &[u8], dir: &Path) -> Result<PathBuf, BriefError> {
    tokio::fs::create_dir_all(dir).await?;
    let target = dir.join(BRIEF_FILE_NAME);
    let tmp = dir.join(format!(".{BRIEF_FILE_NAME}.{}.tmp", Uuid::new_v4()));

    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
            warn!(path = %tmp.display(), error = %cleanup, "Failed to remove partial brief");
        }
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&tmp, &target).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }

    info!(path = %target.display(), size = bytes.len(), "Project brief exported");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brief::BriefSection;
    use crate::conversation::ConversationRecord;
    use crate::intake::sample_form;

    fn brief_with_body(body: &str) -> ProjectBrief {
        let mut brief = ProjectBrief::build(&sample_form(), &ConversationRecord::default());
        brief.sections[0] = BriefSection {
            title: "Target Audience",
            body: body.to_string(),
        };
        brief
    }

    fn chars(s: &str) -> f32 {
        s.chars().count() as f32
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap("aaa bbb ccc ddd", 7.0, chars);
        assert_eq!(lines, vec!["aaa bbb", "ccc ddd"]);
    }

    #[test]
    fn wrap_splits_long_words() {
        let lines = wrap("abcdefghij", 4.0, chars);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn wrap_keeps_paragraphs() {
        let lines = wrap("one\ntwo", 20.0, chars);
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn wrap_splits_multibyte_words_on_char_boundaries() {
        let lines = wrap("你好世界", 2.0, chars);
        assert_eq!(lines, vec!["你好", "世界"]);
    }

    #[test]
    fn wide_glyph_lines_stay_inside_the_page() {
        let font = BriefFont::Builtin;
        let body = "W".repeat(90);
        assert!(font.text_width_mm(&body, 11.0) > CONTENT_WIDTH_MM);

        let lines = layout(&brief_with_body(&body), &font);
        let body_lines: Vec<_> = lines.iter().filter(|l| l.text.starts_with('W')).collect();
        assert!(body_lines.len() > 1);
        for line in lines {
            assert!(font.text_width_mm(&line.text, line.style.size_pt()) <= CONTENT_WIDTH_MM);
        }
    }

    #[test]
    fn short_brief_fits_one_page() {
        let brief = brief_with_body("Patients booking cleanings");
        let pages = paginate(&layout(&brief, &BriefFont::Builtin));
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0][0].text, "Project Brief");
    }

    #[test]
    fn long_brief_spills_onto_more_pages() {
        let body = "word ".repeat(2000);
        let brief = brief_with_body(&body);
        let pages = paginate(&layout(&brief, &BriefFont::Builtin));
        assert!(pages.len() > 1);
        for page in &pages {
            assert!(!page.is_empty());
            for line in page {
                assert!(line.top_mm <= PAGE_HEIGHT_MM - MARGIN_MM);
            }
        }
    }

    #[test]
    fn render_produces_pdf_bytes() {
        let brief = brief_with_body("Patients booking cafés for €20");
        let bytes = render_pdf(&brief, &BriefFont::Builtin).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn builtin_font_rejects_text_it_cannot_encode() {
        let brief = brief_with_body("Zażółć 你好 €uro café");
        let err = render_pdf(&brief, &BriefFont::Builtin).unwrap_err();
        match err {
            BriefError::UnsupportedText { chars } => assert_eq!(chars, "żłć你好"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_external_font_is_an_io_error() {
        let brief = brief_with_body("Zażółć");
        let font = BriefFont::External(PathBuf::from("/nonexistent/brief-font.ttf"));
        let err = render_pdf(&brief, &font).unwrap_err();
        assert!(matches!(err, BriefError::Io(_)));
    }

    #[test]
    fn external_font_renders_unicode() {
        let path = PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf");
        if !path.exists() {
            return;
        }
        let brief = brief_with_body("Zażółć gęślą jaźń");
        let bytes = render_pdf(&brief, &BriefFont::External(path)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn save_writes_named_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = render_pdf(&brief_with_body("Patients"), &BriefFont::Builtin).unwrap();
        let path = save_pdf(&bytes, dir.path()).await.unwrap();

        assert_eq!(path.file_name().unwrap(), BRIEF_FILE_NAME);
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![BRIEF_FILE_NAME.to_string()]);
    }
}
