//! Positioned word extraction from a decoded page content stream.
//!
//! Walks the text operators of one page, tracks the text and graphics state,
//! and groups shown glyphs into whitespace-delimited words with page-space
//! bounding boxes (origin at the top-left corner, y growing downward).

use std::borrow::Cow;
use std::collections::HashMap;

use lopdf::content::Operation;
use lopdf::Object;
use tracing::trace;

use super::fonts::PageFont;
use crate::models::document::{BoundingBox, Word};

/// Horizontal gap (points) that splits two glyphs into separate words.
const X_TOLERANCE: f64 = 3.0;

/// Vertical drift (points) that splits two glyphs into separate words.
const Y_TOLERANCE: f64 = 3.0;

/// A 2D affine transform `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }
}

/// Page geometry from the MediaBox.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    pub left: f64,
    pub top: f64,
}

impl PageFrame {
    /// Frame for a `[llx lly urx ury]` media box.
    pub fn from_media_box(llx: f64, lly: f64, urx: f64, ury: f64) -> Self {
        Self {
            left: llx.min(urx),
            top: lly.max(ury),
        }
    }
}

#[derive(Debug, Clone)]
struct TextState {
    font: Option<Vec<u8>>,
    size: f64,
    char_space: f64,
    word_space: f64,
    scale: f64,
    leading: f64,
    rise: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_space: 0.0,
            word_space: 0.0,
            scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

/// Collects words from a page's content operations.
pub struct WordCollector<'a> {
    fonts: &'a HashMap<Vec<u8>, PageFont>,
    fallback: PageFont,
    frame: PageFrame,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
    tm: Matrix,
    tlm: Matrix,
    words: Vec<Word>,
    pending: Option<Word>,
}

impl<'a> WordCollector<'a> {
    pub fn new(fonts: &'a HashMap<Vec<u8>, PageFont>, default_width: f64, frame: PageFrame) -> Self {
        Self {
            fonts,
            fallback: PageFont::simple(default_width),
            frame,
            state: GraphicsState {
                ctm: Matrix::identity(),
                text: TextState::default(),
            },
            saved: Vec::new(),
            tm: Matrix::identity(),
            tlm: Matrix::identity(),
            words: Vec::new(),
            pending: None,
        }
    }

    /// Run every operation and return the words in content order.
    pub fn collect(mut self, operations: &[Operation]) -> Vec<Word> {
        for op in operations {
            self.execute(op);
        }
        self.flush();
        self.words
    }

    fn execute(&mut self, op: &Operation) {
        let nums = || numbers(&op.operands);
        match op.operator.as_str() {
            "q" => self.saved.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.saved.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let [a, b, c, d, e, f] = nums()[..] {
                    self.state.ctm = Matrix::new(a, b, c, d, e, f).multiply(&self.state.ctm);
                }
            }
            "BT" => {
                self.tm = Matrix::identity();
                self.tlm = Matrix::identity();
            }
            "Tf" => {
                if let [Object::Name(name), size] = &op.operands[..] {
                    self.state.text.font = Some(name.clone());
                    self.state.text.size = number(size).unwrap_or(0.0);
                }
            }
            "Tc" => self.set_text_param(nums(), |t, v| t.char_space = v),
            "Tw" => self.set_text_param(nums(), |t, v| t.word_space = v),
            "Tz" => self.set_text_param(nums(), |t, v| t.scale = v / 100.0),
            "TL" => self.set_text_param(nums(), |t, v| t.leading = v),
            "Ts" => self.set_text_param(nums(), |t, v| t.rise = v),
            "Td" => {
                if let [tx, ty] = nums()[..] {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let [tx, ty] = nums()[..] {
                    self.state.text.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let [a, b, c, d, e, f] = nums()[..] {
                    self.tm = Matrix::new(a, b, c, d, e, f);
                    self.tlm = self.tm;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    self.show(bytes);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                if let [aw, ac, Object::String(bytes, _)] = &op.operands[..] {
                    self.state.text.word_space = number(aw).unwrap_or(0.0);
                    self.state.text.char_space = number(ac).unwrap_or(0.0);
                    self.next_line();
                    self.show(bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.show(bytes),
                            other => {
                                if let Some(adjust) = number(other) {
                                    let text = &self.state.text;
                                    let tx = -adjust / 1000.0 * text.size * text.scale;
                                    self.tm = Matrix::translation(tx, 0.0).multiply(&self.tm);
                                }
                            }
                        }
                    }
                }
            }
            "Do" => trace!("Skipping XObject {:?}", op.operands.first()),
            _ => {}
        }
    }

    fn set_text_param(&mut self, values: Vec<f64>, set: impl FnOnce(&mut TextState, f64)) {
        if let Some(v) = values.first() {
            set(&mut self.state.text, *v);
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.tlm = Matrix::translation(tx, ty).multiply(&self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        let leading = self.state.text.leading;
        self.move_line(0.0, -leading);
    }

    fn show(&mut self, bytes: &[u8]) {
        let fonts = self.fonts;
        let font: Cow<'a, PageFont> = match self.state.text.font.as_ref().and_then(|name| fonts.get(name)) {
            Some(font) => Cow::Borrowed(font),
            None => Cow::Owned(self.fallback.clone()),
        };

        for code in font.codes(bytes) {
            let glyph_width = font.advance(code) / 1000.0 * self.state.text.size;

            match font.decode(code) {
                Some(text) if text.chars().all(|c| c.is_whitespace() || c.is_control()) => self.flush(),
                Some(text) => {
                    let bbox = self.glyph_box(glyph_width * self.state.text.scale);
                    self.push_glyph(&text, bbox);
                }
                None => trace!("No Unicode mapping for code {:#06x}", code),
            }

            let text = &self.state.text;
            let mut tx = glyph_width + text.char_space;
            if font.is_word_space(code) {
                tx += text.word_space;
            }
            tx *= text.scale;
            self.tm = Matrix::translation(tx, 0.0).multiply(&self.tm);
        }
    }

    fn glyph_box(&self, width: f64) -> BoundingBox {
        let text = &self.state.text;
        let to_user = self.tm.multiply(&self.state.ctm);
        let corners = [
            to_user.apply(0.0, text.rise),
            to_user.apply(width, text.rise),
            to_user.apply(0.0, text.rise + text.size),
            to_user.apply(width, text.rise + text.size),
        ];

        let min_x = corners.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let min_y = corners.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let max_y = corners.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

        BoundingBox::new(
            min_x - self.frame.left,
            max_x - self.frame.left,
            self.frame.top - max_y,
            self.frame.top - min_y,
        )
    }

    fn push_glyph(&mut self, glyph: &str, bbox: BoundingBox) {
        if let Some(word) = &mut self.pending {
            let gap = bbox.x0 - word.bbox.x1;
            let drift = (bbox.top - word.bbox.top).abs();
            if gap <= X_TOLERANCE && gap >= -X_TOLERANCE - word.bbox.width() && drift <= Y_TOLERANCE {
                word.text.push_str(glyph);
                word.bbox = word.bbox.union(&bbox);
                return;
            }
        }
        self.flush();
        self.pending = Some(Word::new(glyph, bbox));
    }

    fn flush(&mut self) {
        if let Some(word) = self.pending.take() {
            trace!("Word {:?} at {:?}", word.text, word.bbox);
            self.words.push(word);
        }
    }
}

/// Page text rebuilt from words: spaces within a line, a newline where the
/// baseline moves.
pub fn page_text(words: &[Word]) -> String {
    let mut text = String::new();
    let mut last_top: Option<f64> = None;

    for word in words {
        if let Some(top) = last_top {
            let new_line = (word.bbox.top - top).abs() > Y_TOLERANCE;
            text.push(if new_line { '\n' } else { ' ' });
        }
        text.push_str(&word.text);
        last_top = Some(word.bbox.top);
    }

    text
}

/// Numeric value of an integer or real operand.
pub fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn numbers(operands: &[Object]) -> Vec<f64> {
    operands.iter().filter_map(number).collect()
}
