//! PDF page text and word extraction using lopdf.

use std::collections::HashMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace, warn};

use super::fonts::{parse_cid_widths, parse_differences, parse_to_unicode, PageFont};
use super::words::{number, page_text, PageFrame, WordCollector};
use super::{looks_like_pdf, PdfProcessor, PdfType, Result};
use crate::error::PdfError;
use crate::models::config::PdfConfig;
use crate::models::document::Word;

/// US Letter, used when a page tree carries no MediaBox.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Glyph width of the standard Courier faces.
const COURIER_WIDTH: f64 = 600.0;

/// CIDFont width when `/DW` is absent.
const DEFAULT_CID_WIDTH: f64 = 1000.0;

/// PDF content extractor using lopdf.
pub struct PdfExtractor {
    document: Option<Document>,
    decrypt_empty_password: bool,
    default_glyph_width: f64,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self::with_config(&PdfConfig::default())
    }

    /// Create an extractor with explicit PDF settings.
    pub fn with_config(config: &PdfConfig) -> Self {
        Self {
            document: None,
            decrypt_empty_password: config.decrypt_empty_password,
            default_glyph_width: config.default_glyph_width,
        }
    }

    fn document(&self) -> Result<&Document> {
        self.document
            .as_ref()
            .ok_or(PdfError::Parse("No document loaded".to_string()))
    }

    fn page_id(&self, doc: &Document, page: u32) -> Result<ObjectId> {
        doc.get_pages()
            .get(&page)
            .copied()
            .ok_or(PdfError::InvalidPage(page))
    }

    /// Look up a page attribute, walking up the page tree for inherited ones.
    fn find_inherited<'d>(&self, doc: &'d Document, node_id: ObjectId, key: &[u8]) -> Option<&'d Object> {
        let mut current = Some(node_id);
        // Bounded walk; malformed trees can contain cycles
        for _ in 0..32 {
            let node = doc.get_object(current?).ok()?;
            let Object::Dictionary(dict) = node else {
                return None;
            };
            if let Ok(value) = dict.get(key) {
                return doc.dereference(value).ok().map(|(_, obj)| obj);
            }
            current = match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => Some(*parent_id),
                _ => None,
            };
        }
        None
    }

    /// Get resources dictionary for a page, handling inheritance.
    fn get_page_resources<'d>(&self, doc: &'d Document, page_id: ObjectId) -> Option<&'d Dictionary> {
        match self.find_inherited(doc, page_id, b"Resources")? {
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    fn page_frame(&self, doc: &Document, page_id: ObjectId) -> PageFrame {
        let values: Vec<f64> = self
            .find_inherited(doc, page_id, b"MediaBox")
            .and_then(|obj| obj.as_array().ok())
            .map(|arr| {
                arr.iter()
                    .filter_map(|o| doc.dereference(o).ok().and_then(|(_, o)| number(o)))
                    .collect()
            })
            .unwrap_or_default();

        let [llx, lly, urx, ury] = match values[..] {
            [a, b, c, d] => [a, b, c, d],
            _ => {
                warn!("Page {:?} has no usable MediaBox, assuming Letter", page_id);
                DEFAULT_MEDIA_BOX
            }
        };
        PageFrame::from_media_box(llx, lly, urx, ury)
    }

    fn page_fonts(&self, doc: &Document, page_id: ObjectId) -> HashMap<Vec<u8>, PageFont> {
        let mut fonts = HashMap::new();

        let Some(resources) = self.get_page_resources(doc, page_id) else {
            return fonts;
        };
        if let Some(Object::Dictionary(font_dict)) = resolved(doc, resources, b"Font") {
            for (name, font_ref) in font_dict.iter() {
                if let Ok((_, Object::Dictionary(font))) = doc.dereference(font_ref) {
                    fonts.insert(name.clone(), self.page_font(doc, font));
                }
            }
        }

        trace!("Resolved {} fonts for page {:?}", fonts.len(), page_id);
        fonts
    }

    fn page_font(&self, doc: &Document, font: &Dictionary) -> PageFont {
        let subtype = resolved(doc, font, b"Subtype").and_then(|o| o.as_name().ok());
        let mut page_font = if subtype == Some(b"Type0".as_slice()) {
            self.composite_font(doc, font)
        } else {
            self.simple_font(doc, font)
        };

        if let Some(Object::Stream(stream)) = resolved(doc, font, b"ToUnicode") {
            let data = match stream.decompressed_content() {
                Ok(d) => d,
                Err(_) => stream.content.clone(),
            };
            page_font.to_unicode = parse_to_unicode(&data);
        }

        if let Some(Object::Dictionary(encoding)) = resolved(doc, font, b"Encoding") {
            if let Some(Object::Array(items)) = resolved(doc, encoding, b"Differences") {
                page_font.differences = parse_differences(items);
            }
        }

        page_font
    }

    fn simple_font(&self, doc: &Document, font: &Dictionary) -> PageFont {
        let first_char = resolved(doc, font, b"FirstChar")
            .and_then(number)
            .map(|v| v.max(0.0) as u32)
            .unwrap_or(0);

        let widths: Vec<f64> = resolved(doc, font, b"Widths")
            .and_then(|o| o.as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|o| {
                        doc.dereference(o)
                            .ok()
                            .and_then(|(_, o)| number(o))
                            .unwrap_or(0.0)
                    })
                    .collect()
            })
            .unwrap_or_default();

        let missing_width = resolved(doc, font, b"FontDescriptor")
            .and_then(|o| o.as_dict().ok())
            .and_then(|d| resolved(doc, d, b"MissingWidth"))
            .and_then(number)
            .filter(|w| *w > 0.0)
            .unwrap_or_else(|| {
                let is_courier = resolved(doc, font, b"BaseFont")
                    .and_then(|o| o.as_name().ok())
                    .map(|n| String::from_utf8_lossy(n).contains("Courier"))
                    .unwrap_or(false);
                if is_courier {
                    COURIER_WIDTH
                } else {
                    self.default_glyph_width
                }
            });

        PageFont::simple(missing_width).with_widths(first_char, &widths)
    }

    /// Type0 font: two-byte codes, widths from the descendant CIDFont.
    fn composite_font(&self, doc: &Document, font: &Dictionary) -> PageFont {
        let descendant = resolved(doc, font, b"DescendantFonts")
            .and_then(|o| o.as_array().ok())
            .and_then(|arr| arr.first())
            .and_then(|o| doc.dereference(o).ok())
            .and_then(|(_, o)| o.as_dict().ok());
        let Some(cid_font) = descendant else {
            warn!("Type0 font without a descendant CIDFont");
            return PageFont::composite(DEFAULT_CID_WIDTH);
        };

        let dw = resolved(doc, cid_font, b"DW")
            .and_then(number)
            .filter(|w| *w > 0.0)
            .unwrap_or(DEFAULT_CID_WIDTH);
        let mut page_font = PageFont::composite(dw);

        if let Some(Object::Array(items)) = resolved(doc, cid_font, b"W") {
            let items: Vec<Object> = items
                .iter()
                .map(|o| doc.dereference(o).map(|(_, o)| o.clone()).unwrap_or_else(|_| o.clone()))
                .collect();
            page_font.widths = parse_cid_widths(&items);
        }

        page_font
    }

    /// Walk the page content and collect its words.
    fn page_words(&self, doc: &Document, page_id: ObjectId) -> std::result::Result<Vec<Word>, String> {
        let data = doc.get_page_content(page_id).map_err(|e| e.to_string())?;
        let content = Content::decode(&data).map_err(|e| e.to_string())?;

        let fonts = self.page_fonts(doc, page_id);
        let frame = self.page_frame(doc, page_id);
        Ok(WordCollector::new(&fonts, self.default_glyph_width, frame).collect(&content.operations))
    }

    fn page_has_images(&self, doc: &Document, page_id: ObjectId) -> bool {
        let Some(resources) = self.get_page_resources(doc, page_id) else {
            return false;
        };
        let Ok(xobjects) = resources.get(b"XObject") else {
            return false;
        };
        let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) else {
            return false;
        };

        xobj_dict.iter().any(|(_name, obj_ref)| {
            matches!(
                doc.dereference(obj_ref),
                Ok((_, Object::Stream(stream)))
                    if stream.dict.get(b"Subtype").and_then(|s| s.as_name()).ok() == Some(b"Image".as_slice())
            )
        })
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        if !looks_like_pdf(data) {
            return Err(PdfError::NotPdf("missing %PDF- header".to_string()));
        }

        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if !self.decrypt_empty_password || doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_numbers(&self) -> Vec<u32> {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().keys().copied().collect())
            .unwrap_or_default()
    }

    fn analyze(&self) -> PdfType {
        let Ok(doc) = self.document() else {
            return PdfType::Empty;
        };

        let mut has_text = false;
        let mut has_images = false;
        for (page, page_id) in doc.get_pages() {
            has_text |= self
                .extract_page_text(page)
                .map(|t| !t.trim().is_empty())
                .unwrap_or(false);
            has_images |= self.page_has_images(doc, page_id);
        }

        let pdf_type = PdfType::from_flags(has_text, has_images);
        debug!("PDF analysis: has_text={}, has_images={} -> {:?}", has_text, has_images, pdf_type);
        pdf_type
    }

    fn extract_page_text(&self, page: u32) -> Result<String> {
        let doc = self.document()?;
        let page_id = self.page_id(doc, page)?;

        let words = self
            .page_words(doc, page_id)
            .map_err(PdfError::TextExtraction)?;
        Ok(page_text(&words))
    }

    fn extract_page_words(&self, page: u32) -> Result<Vec<Word>> {
        let doc = self.document()?;
        let page_id = self.page_id(doc, page)?;

        let words = self
            .page_words(doc, page_id)
            .map_err(PdfError::WordExtraction)?;
        debug!("Extracted {} words from page {}", words.len(), page);
        Ok(words)
    }
}

/// Dictionary entry with references followed.
fn resolved<'d>(doc: &'d Document, dict: &'d Dictionary, key: &[u8]) -> Option<&'d Object> {
    let value = dict.get(key).ok()?;
    doc.dereference(value).ok().map(|(_, obj)| obj)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_extractor_new() {
        let extractor = PdfExtractor::new();
        assert!(extractor.document.is_none());
        assert_eq!(extractor.page_count(), 0);
        assert_eq!(extractor.analyze(), PdfType::Empty);
    }

    #[test]
    fn test_rejects_non_pdf_bytes() {
        let mut extractor = PdfExtractor::new();
        assert!(matches!(
            extractor.load(b"hello world"),
            Err(PdfError::NotPdf(_))
        ));
    }

    #[test]
    fn test_rejects_truncated_pdf() {
        let mut extractor = PdfExtractor::new();
        assert!(extractor.load(b"%PDF-1.7\n1 0 obj").is_err());
        assert!(extractor.document.is_none());
    }

    #[test]
    fn test_unloaded_page_access_fails() {
        let extractor = PdfExtractor::new();
        assert!(extractor.extract_page_text(1).is_err());
        assert!(extractor.extract_page_words(1).is_err());
    }
}
