// Robust decoding of Python source files

use crate::error::Result;
use encoding_rs::Encoding;
use std::path::Path;
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decoded text of one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub text: String,
    /// Encoding actually used to decode, as declared when a declaration won
    pub encoding: String,
    /// Invalid bytes were replaced
    pub used_fallback: bool,
}

impl SourceText {
    /// Read and decode a file
    ///
    /// Only I/O errors fail; undecodable bytes never do.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let source = Self::decode(&bytes);
        if source.used_fallback {
            debug!(path = %path.display(), encoding = %source.encoding, "lossy decode");
        }
        Ok(source)
    }

    /// Decode raw bytes
    ///
    /// A UTF-8 BOM wins. Otherwise a `coding:` declaration on one of the
    /// first two lines is honored when the codec is known and the bytes are
    /// valid in it. Anything else is read as UTF-8, replacing invalid
    /// sequences as a last resort.
    pub fn decode(bytes: &[u8]) -> Self {
        if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
            if let Ok(text) = std::str::from_utf8(rest) {
                return Self {
                    text: text.to_string(),
                    encoding: "utf-8-sig".to_string(),
                    used_fallback: false,
                };
            }
        }

        if let Some(declared) = declared_encoding(bytes) {
            match lookup_encoding(&declared) {
                Some(encoding) => {
                    if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
                        return Self {
                            text: text.into_owned(),
                            encoding: declared,
                            used_fallback: false,
                        };
                    }
                    debug!(encoding = %declared, "bytes invalid in declared encoding");
                }
                None => debug!(encoding = %declared, "unknown declared encoding"),
            }
        }

        match std::str::from_utf8(bytes) {
            Ok(text) => Self {
                text: text.to_string(),
                encoding: "utf-8".to_string(),
                used_fallback: false,
            },
            Err(_) => Self {
                text: String::from_utf8_lossy(bytes).into_owned(),
                encoding: "utf-8".to_string(),
                used_fallback: true,
            },
        }
    }
}

/// Encoding named by a PEP 263 comment on the first two lines
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    for line in bytes.split(|&b| b == b'\n').take(2) {
        let line = String::from_utf8_lossy(line);
        let trimmed = line.trim_start();
        if !trimmed.starts_with('#') {
            continue;
        }
        let Some(idx) = trimmed.find("coding") else {
            continue;
        };
        let rest = &trimmed[idx + "coding".len()..];
        let Some(rest) = rest.strip_prefix([':', '=']) else {
            continue;
        };
        let name: String = rest
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            .collect();
        if !name.is_empty() {
            return Some(name.to_ascii_lowercase());
        }
    }
    None
}

/// Resolve a Python codec name through the WHATWG label table
///
/// Python spells some labels differently (`latin-1`, `iso_8859_5`), so the
/// name is retried with separators normalized and then removed.
fn lookup_encoding(name: &str) -> Option<&'static Encoding> {
    let candidates = [
        name.to_string(),
        name.replace('_', "-"),
        name.replace(['_', '-'], ""),
    ];
    candidates
        .iter()
        .find_map(|label| Encoding::for_label(label.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_plain_utf8() {
        let source = SourceText::decode("class Café: pass\n".as_bytes());
        assert_eq!(source.text, "class Café: pass\n");
        assert_eq!(source.encoding, "utf-8");
        assert!(!source.used_fallback);
    }

    #[test]
    fn test_bom_stripped() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"import os\n");
        let source = SourceText::decode(&bytes);
        assert_eq!(source.text, "import os\n");
        assert_eq!(source.encoding, "utf-8-sig");
    }

    #[test]
    fn test_latin1_declaration() {
        let bytes = b"# -*- coding: latin-1 -*-\nname = '\xe9'\n";
        let source = SourceText::decode(bytes);
        assert_eq!(source.encoding, "latin-1");
        assert!(source.text.contains("'é'"));
        assert!(!source.used_fallback);
    }

    #[test]
    fn test_declaration_on_second_line() {
        let bytes = b"#!/usr/bin/env python\n# vim: set fileencoding=iso-8859-1 :\nx = '\xe9'\n";
        let source = SourceText::decode(bytes);
        assert_eq!(source.encoding, "iso-8859-1");
        assert!(source.text.contains("'é'"));
    }

    #[test]
    fn test_cp1251_declaration() {
        let mut bytes = b"# -*- coding: cp1251 -*-\n# ".to_vec();
        bytes.extend_from_slice(&[0xCF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2]);
        bytes.extend_from_slice(b"\nclass Greeting:\n    pass\n");

        let source = SourceText::decode(&bytes);
        assert_eq!(source.encoding, "cp1251");
        assert!(!source.used_fallback);
        assert!(source.text.contains("# Привет"));
    }

    #[test]
    fn test_cp1252_punctuation() {
        let source = SourceText::decode(b"# coding: cp1252\nquote = '\x93hi\x94'\n");
        assert_eq!(source.encoding, "cp1252");
        assert!(source.text.contains("'\u{201c}hi\u{201d}'"));
    }

    #[test]
    fn test_unknown_declaration_falls_back_to_utf8() {
        let source = SourceText::decode("# coding: klingon\nx = 'é'\n".as_bytes());
        assert_eq!(source.encoding, "utf-8");
        assert!(!source.used_fallback);
        assert!(source.text.contains("'é'"));
    }

    #[test]
    fn test_lookup_encoding_python_spellings() {
        assert_eq!(lookup_encoding("latin-1"), Some(encoding_rs::WINDOWS_1252));
        assert_eq!(lookup_encoding("iso_8859_5"), Some(encoding_rs::ISO_8859_5));
        assert_eq!(lookup_encoding("cp1251"), Some(encoding_rs::WINDOWS_1251));
        assert!(lookup_encoding("klingon").is_none());
    }

    #[test]
    fn test_declaration_on_third_line_ignored() {
        let bytes = b"\n\n# coding: latin-1\nx = '\xe9'\n";
        let source = SourceText::decode(bytes);
        assert_eq!(source.encoding, "utf-8");
        assert!(source.used_fallback);
    }

    #[test]
    fn test_invalid_utf8_falls_back() {
        let source = SourceText::decode(b"x = '\xff\xfe'\n");
        assert!(source.used_fallback);
        assert!(source.text.starts_with("x = '"));
    }

    #[test]
    fn test_declared_encoding_parsing() {
        assert_eq!(declared_encoding(b"# coding=utf-8\n"), Some("utf-8".to_string()));
        assert_eq!(declared_encoding(b"x = 1\n"), None);
    }

    #[test]
    fn test_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "def f():\n    pass\n").unwrap();
        let source = SourceText::load(file.path()).unwrap();
        assert!(source.text.starts_with("def f()"));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(SourceText::load(Path::new("/nonexistent/file.py")).is_err());
    }
}
