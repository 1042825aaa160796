//! Font resources: glyph widths and character code decoding.
//!
//! Simple fonts use one byte per code; composite (Type0) fonts use two.
//! Codes are decoded through the font's ToUnicode CMap when present, then
//! through its `/Differences` glyph names, and finally as Latin-1 for
//! simple fonts.

use std::collections::HashMap;

use lazy_static::lazy_static;
use lopdf::Object;
use regex::Regex;
use tracing::trace;

use super::words::number;

/// Character code to Unicode text.
pub type ToUnicode = HashMap<u32, String>;

/// Upper bound on the codes a single `bfrange` entry may expand to.
const MAX_RANGE: u32 = 0xFFFF;

lazy_static! {
    static ref BFCHAR: Regex = Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>").unwrap();
    static ref BFRANGE_SEQ: Regex =
        Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>").unwrap();
    static ref BFRANGE_ARRAY: Regex =
        Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>\s*\[((?:\s*<[0-9A-Fa-f]+>)*)\s*\]").unwrap();
    static ref HEX: Regex = Regex::new(r"<([0-9A-Fa-f]+)>").unwrap();
}

/// Decoding and metrics for one font resource.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFont {
    /// Codes are two bytes wide (composite fonts).
    pub two_byte: bool,
    /// Advance widths by code, in 1/1000 text space units.
    pub widths: HashMap<u32, f64>,
    /// Width of codes missing from `widths`.
    pub missing_width: f64,
    pub to_unicode: ToUnicode,
    /// Overrides from the encoding's `/Differences` array.
    pub differences: HashMap<u32, char>,
}

impl PageFont {
    /// A one-byte font where every glyph has the same width.
    pub fn simple(missing_width: f64) -> Self {
        Self {
            two_byte: false,
            widths: HashMap::new(),
            missing_width,
            to_unicode: ToUnicode::new(),
            differences: HashMap::new(),
        }
    }

    /// A two-byte composite font with default width `dw`.
    pub fn composite(dw: f64) -> Self {
        Self {
            two_byte: true,
            ..Self::simple(dw)
        }
    }

    /// Set widths from a `/FirstChar` + `/Widths` pair.
    pub fn with_widths(mut self, first_char: u32, widths: &[f64]) -> Self {
        for (i, w) in widths.iter().enumerate() {
            self.widths.insert(first_char + i as u32, *w);
        }
        self
    }

    /// Split a shown string into character codes.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|pair| match pair {
                    [hi, lo] => (*hi as u32) << 8 | *lo as u32,
                    [single] => *single as u32,
                    _ => 0,
                })
                .collect()
        } else {
            bytes.iter().map(|b| *b as u32).collect()
        }
    }

    pub fn advance(&self, code: u32) -> f64 {
        self.widths
            .get(&code)
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(self.missing_width)
    }

    /// Unicode text for `code`, if the font says what it is.
    pub fn decode(&self, code: u32) -> Option<String> {
        if let Some(text) = self.to_unicode.get(&code) {
            return Some(text.clone());
        }
        if let Some(ch) = self.differences.get(&code) {
            return Some(ch.to_string());
        }
        if self.two_byte {
            return None;
        }
        u8::try_from(code).ok().map(|b| (b as char).to_string())
    }

    /// Word spacing (`Tw`) only applies to the single-byte code 32.
    pub fn is_word_space(&self, code: u32) -> bool {
        !self.two_byte && code == 32
    }
}

/// Parse a ToUnicode CMap stream (`bfchar` and `bfrange` sections).
pub fn parse_to_unicode(data: &[u8]) -> ToUnicode {
    let content = String::from_utf8_lossy(data);
    let mut map = ToUnicode::new();

    for section in sections(&content, "beginbfchar", "endbfchar") {
        for caps in BFCHAR.captures_iter(section) {
            if let (Some(src), Some(dst)) = (parse_code(&caps[1]), utf16_hex(&caps[2])) {
                map.insert(src, dst);
            }
        }
    }

    for section in sections(&content, "beginbfrange", "endbfrange") {
        // Array entries first so their hex strings are not read as ranges
        let mut rest = section.to_string();
        for caps in BFRANGE_ARRAY.captures_iter(section) {
            let (Some(lo), Some(hi)) = (parse_code(&caps[1]), parse_code(&caps[2])) else {
                continue;
            };
            let targets = HEX.captures_iter(&caps[3]).filter_map(|c| utf16_hex(&c[1]));
            for (code, text) in (lo..=hi.min(lo.saturating_add(MAX_RANGE))).zip(targets) {
                map.insert(code, text);
            }
            rest = rest.replacen(&caps[0], " ", 1);
        }

        for caps in BFRANGE_SEQ.captures_iter(&rest) {
            let (Some(lo), Some(hi), Some(start)) =
                (parse_code(&caps[1]), parse_code(&caps[2]), parse_code(&caps[3]))
            else {
                continue;
            };
            for offset in 0..=hi.saturating_sub(lo).min(MAX_RANGE) {
                if let Some(ch) = char::from_u32(start + offset) {
                    map.insert(lo + offset, ch.to_string());
                }
            }
        }
    }

    trace!("ToUnicode CMap with {} entries", map.len());
    map
}

/// Parse a CIDFont `/W` array: `c [w1 w2 ...]` and `c_first c_last w` forms.
pub fn parse_cid_widths(items: &[Object]) -> HashMap<u32, f64> {
    let mut widths = HashMap::new();
    let mut i = 0;

    while i < items.len() {
        let Some(first) = number(&items[i]).map(|v| v.max(0.0) as u32) else {
            i += 1;
            continue;
        };
        match items.get(i + 1) {
            Some(Object::Array(list)) => {
                for (offset, w) in list.iter().filter_map(number).enumerate() {
                    widths.insert(first + offset as u32, w);
                }
                i += 2;
            }
            Some(last) => {
                let last = number(last).map(|v| v.max(0.0) as u32).unwrap_or(first);
                if let Some(w) = items.get(i + 2).and_then(number) {
                    for code in first..=last.min(first.saturating_add(MAX_RANGE)) {
                        widths.insert(code, w);
                    }
                }
                i += 3;
            }
            None => break,
        }
    }

    widths
}

/// Parse an encoding `/Differences` array: a code followed by glyph names.
pub fn parse_differences(items: &[Object]) -> HashMap<u32, char> {
    let mut differences = HashMap::new();
    let mut code = 0u32;

    for item in items {
        match item {
            Object::Name(name) => {
                if let Some(ch) = glyph_char(&String::from_utf8_lossy(name)) {
                    differences.insert(code, ch);
                }
                code += 1;
            }
            other => {
                if let Some(start) = number(other) {
                    code = start.max(0.0) as u32;
                }
            }
        }
    }

    differences
}

/// Character for an Adobe glyph name.
///
/// Covers the names that spell codes (letters, digits and their
/// punctuation) plus `uniXXXX`.
pub fn glyph_char(name: &str) -> Option<char> {
    let mut chars = name.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        if ch.is_ascii_alphabetic() {
            return Some(ch);
        }
    }

    if let Some(hex) = name.strip_prefix("uni") {
        if hex.len() == 4 {
            return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
        }
    }

    let ch = match name {
        "zero" => '0',
        "one" => '1',
        "two" => '2',
        "three" => '3',
        "four" => '4',
        "five" => '5',
        "six" => '6',
        "seven" => '7',
        "eight" => '8',
        "nine" => '9',
        "space" | "nbspace" => ' ',
        "period" => '.',
        "comma" => ',',
        "colon" => ':',
        "semicolon" => ';',
        "hyphen" | "minus" => '-',
        "endash" => '\u{2013}',
        "slash" => '/',
        "parenleft" => '(',
        "parenright" => ')',
        "bracketleft" => '[',
        "bracketright" => ']',
        _ => return None,
    };
    Some(ch)
}

fn sections<'a>(content: &'a str, begin: &str, end: &str) -> Vec<&'a str> {
    let mut found = Vec::new();
    let mut remaining = content;

    while let Some(start) = remaining.find(begin) {
        let after = &remaining[start + begin.len()..];
        let Some(stop) = after.find(end) else {
            break;
        };
        found.push(&after[..stop]);
        remaining = &after[stop + end.len()..];
    }

    found
}

fn parse_code(hex: &str) -> Option<u32> {
    u32::from_str_radix(hex, 16).ok()
}

/// Decode a UTF-16BE hex string.
fn utf16_hex(hex: &str) -> Option<String> {
    if hex.len() <= 2 {
        return parse_code(hex).and_then(char::from_u32).map(String::from);
    }

    let units: Vec<u16> = hex
        .as_bytes()
        .chunks(4)
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .filter_map(|unit| u16::from_str_radix(unit, 16).ok())
        .collect();
    let text = String::from_utf16_lossy(&units);
    (!text.is_empty()).then_some(text)
}
