//! Plain-text extraction for uploaded legal documents.
//!
//! DOCX is read straight from `word/document.xml`, PDF goes through
//! `pdf-extract`. RTF and legacy `.doc` have no parser in our stack, so they
//! get a control-word stripper and a text-run scan respectively. RTF hex
//! escapes decode through the document's `\ansicpg` code page.

use std::io::{Cursor, Read};

use anyhow::{anyhow, Context, Result};
use encoding_rs::{
    Encoding, BIG5, EUC_KR, GBK, MACINTOSH, SHIFT_JIS, WINDOWS_1250, WINDOWS_1251, WINDOWS_1252,
    WINDOWS_1253, WINDOWS_1254, WINDOWS_1255, WINDOWS_1256, WINDOWS_1257, WINDOWS_1258,
    WINDOWS_874,
};
use quick_xml::{events::Event, Reader as XmlReader};
use unicode_normalization::UnicodeNormalization;
use zip::ZipArchive;

/// Minimum run length kept when scanning binary `.doc` files
const DOC_MIN_RUN: usize = 20;

/// Upload formats accepted by the law library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Doc,
    Docx,
    Pdf,
    Txt,
    Rtf,
}

impl DocumentFormat {
    pub const ALLOWED_EXTENSIONS: &'static [&'static str] = &[".doc", ".docx", ".pdf", ".txt", ".rtf"];

    /// Format from a file name's extension (case-insensitive)
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, ext) = file_name.rsplit_once('.')?;
        match ext.to_lowercase().as_str() {
            "doc" => Some(DocumentFormat::Doc),
            "docx" => Some(DocumentFormat::Docx),
            "pdf" => Some(DocumentFormat::Pdf),
            "txt" => Some(DocumentFormat::Txt),
            "rtf" => Some(DocumentFormat::Rtf),
            _ => None,
        }
    }
}

/// Extract the text of a document. The result is trimmed.
pub fn extract_text(format: DocumentFormat, bytes: &[u8]) -> Result<String> {
    let text = match format {
        DocumentFormat::Docx => extract_docx_text(bytes)?,
        DocumentFormat::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| anyhow!("failed to extract PDF text: {}", e))?,
        DocumentFormat::Txt => String::from_utf8_lossy(bytes)
            .trim_start_matches('\u{feff}')
            .to_string(),
        DocumentFormat::Rtf => extract_rtf_text(&String::from_utf8_lossy(bytes)),
        DocumentFormat::Doc => extract_doc_text(bytes),
    };

    Ok(text.trim().to_string())
}

fn extract_docx_text(bytes: &[u8]) -> Result<String> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).context("failed to open DOCX archive")?;

    let mut document = archive
        .by_name("word/document.xml")
        .context("missing word/document.xml in DOCX")?;

    let mut xml = String::new();
    document
        .read_to_string(&mut xml)
        .context("failed to read DOCX XML")?;

    let mut reader = XmlReader::from_str(&xml);
    let mut buf = Vec::new();
    let mut output = String::new();
    let mut in_text_node = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                if e.name().as_ref() == b"w:t" {
                    in_text_node = true;
                }
            }
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"w:tab" => output.push('\t'),
                b"w:br" | b"w:cr" => output.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text_node {
                    let value = e.unescape().map_err(|err| anyhow!(err))?.into_owned();
                    output.push_str(&value);
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:t" => in_text_node = false,
                b"w:p" => output.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => return Err(anyhow!("failed to parse DOCX XML: {}", err)),
            _ => {}
        }
        buf.clear();
    }

    Ok(output)
}

/// Control words whose group holds no body text
const RTF_SKIP_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "header",
    "footer",
    "listtable",
    "listoverridetable",
    "generator",
];

/// Text sink that buffers `\'hh` bytes until the next character so
/// multi-byte and combining code pages decode as a run.
struct RtfText {
    output: String,
    bytes: Vec<u8>,
    encoding: &'static Encoding,
}

impl RtfText {
    fn new() -> Self {
        Self {
            output: String::new(),
            bytes: Vec::new(),
            encoding: WINDOWS_1252,
        }
    }

    fn push(&mut self, c: char) {
        self.flush();
        self.output.push(c);
    }

    fn push_byte(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    fn flush(&mut self) {
        if self.bytes.is_empty() {
            return;
        }
        let (decoded, _) = self.encoding.decode_without_bom_handling(&self.bytes);
        self.output.push_str(&decoded);
        self.bytes.clear();
    }

    /// cp1258 spells tones as combining marks; recompose them
    fn finish(mut self) -> String {
        self.flush();
        self.output.nfc().collect()
    }
}

/// Encoding for an `\ansicpgN` code page
fn encoding_for_codepage(codepage: i32) -> Option<&'static Encoding> {
    let encoding = match codepage {
        874 => WINDOWS_874,
        932 => SHIFT_JIS,
        936 => GBK,
        949 => EUC_KR,
        950 => BIG5,
        1250 => WINDOWS_1250,
        1251 => WINDOWS_1251,
        1252 => WINDOWS_1252,
        1253 => WINDOWS_1253,
        1254 => WINDOWS_1254,
        1255 => WINDOWS_1255,
        1256 => WINDOWS_1256,
        1257 => WINDOWS_1257,
        1258 => WINDOWS_1258,
        10000 => MACINTOSH,
        _ => return None,
    };
    Some(encoding)
}

fn extract_rtf_text(rtf: &str) -> String {
    let chars: Vec<char> = rtf.chars().collect();
    let mut text = RtfText::new();
    // One entry per open group: true when the group is skipped
    let mut skip_stack: Vec<bool> = vec![false];
    let mut pending_fallback = 0usize;
    let mut i = 0;

    let skipping = |stack: &Vec<bool>| stack.last().copied().unwrap_or(false);

    while i < chars.len() {
        let c = chars[i];
        match c {
            '{' => {
                let inherited = skipping(&skip_stack);
                skip_stack.push(inherited);
                i += 1;
            }
            '}' => {
                if skip_stack.len() > 1 {
                    skip_stack.pop();
                }
                i += 1;
            }
            '\\' => {
                let next = chars.get(i + 1).copied();
                match next {
                    Some(escaped @ ('\\' | '{' | '}')) => {
                        if !skipping(&skip_stack) && !consume_fallback(&mut pending_fallback) {
                            text.push(escaped);
                        }
                        i += 2;
                    }
                    Some('*') => {
                        if let Some(top) = skip_stack.last_mut() {
                            *top = true;
                        }
                        i += 2;
                    }
                    Some('\'') => {
                        let hex: String = chars.iter().skip(i + 2).take(2).collect();
                        if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                            if !skipping(&skip_stack) && !consume_fallback(&mut pending_fallback) {
                                text.push_byte(byte);
                            }
                        }
                        i += 4;
                    }
                    Some(ch) if ch.is_ascii_alphabetic() => {
                        let start = i + 1;
                        let mut end = start;
                        while end < chars.len() && chars[end].is_ascii_alphabetic() {
                            end += 1;
                        }
                        let word: String = chars[start..end].iter().collect();

                        let param_start = end;
                        if end < chars.len() && chars[end] == '-' {
                            end += 1;
                        }
                        while end < chars.len() && chars[end].is_ascii_digit() {
                            end += 1;
                        }
                        let param: Option<i32> = chars[param_start..end]
                            .iter()
                            .collect::<String>()
                            .parse()
                            .ok();

                        // A single space delimits the control word
                        if end < chars.len() && chars[end] == ' ' {
                            end += 1;
                        }
                        i = end;

                        if word == "ansicpg" {
                            if let Some(encoding) = param.and_then(encoding_for_codepage) {
                                text.flush();
                                text.encoding = encoding;
                            }
                            continue;
                        }
                        if RTF_SKIP_DESTINATIONS.contains(&word.as_str()) {
                            if let Some(top) = skip_stack.last_mut() {
                                *top = true;
                            }
                            continue;
                        }
                        if skipping(&skip_stack) {
                            continue;
                        }

                        match word.as_str() {
                            "par" | "line" => text.push('\n'),
                            "tab" => text.push('\t'),
                            "u" => {
                                if let Some(code) = param {
                                    let code = if code < 0 { code + 65536 } else { code };
                                    if let Some(ch) = char::from_u32(code as u32) {
                                        text.push(ch);
                                    }
                                    pending_fallback = 1;
                                }
                            }
                            _ => {}
                        }
                    }
                    _ => {
                        i += 2;
                    }
                }
            }
            '\r' | '\n' => {
                i += 1;
            }
            _ => {
                if !skipping(&skip_stack) && !consume_fallback(&mut pending_fallback) {
                    text.push(c);
                }
                i += 1;
            }
        }
    }

    text.finish()
}

/// After `\uN` the next visible character is an ANSI fallback to drop
fn consume_fallback(pending: &mut usize) -> bool {
    if *pending > 0 {
        *pending -= 1;
        true
    } else {
        false
    }
}

/// Word 97-2003 keeps body text as UTF-16LE runs inside the binary; keep the
/// long text-like runs.
fn extract_doc_text(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));

    let mut runs: Vec<String> = Vec::new();
    let mut current = String::new();
    for decoded in char::decode_utf16(units) {
        match decoded {
            Ok(c) if is_text_char(c) => current.push(if c == '\r' { '\n' } else { c }),
            _ => flush_run(&mut current, &mut runs),
        }
    }
    flush_run(&mut current, &mut runs);

    if runs.is_empty() {
        // 8-bit fallback for documents saved without Unicode text
        for &byte in bytes {
            let c = char::from(byte);
            if byte.is_ascii() && is_text_char(c) {
                current.push(if c == '\r' { '\n' } else { c });
            } else {
                flush_run(&mut current, &mut runs);
            }
        }
        flush_run(&mut current, &mut runs);
    }

    runs.join("\n")
}

fn is_text_char(c: char) -> bool {
    c.is_alphanumeric()
        || c == ' '
        || c == '\r'
        || c == '\n'
        || c == '\t'
        || ".,;:!?()[]\"'/-–%§".contains(c)
}

fn flush_run(current: &mut String, runs: &mut Vec<String>) {
    let trimmed = current.trim();
    if trimmed.chars().count() >= DOC_MIN_RUN && trimmed.chars().any(|c| c.is_alphabetic()) {
        runs.push(trimmed.to_string());
    }
    current.clear();
}
