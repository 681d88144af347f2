//! Properties file format
//!
//! Reads the classic `key=value` line format: `#` and `!` comments, `=`, `:`
//! or whitespace separators, backslash line continuation and `\uXXXX`
//! escapes. Writes a single header comment followed by one sorted
//! `key=value` line per entry.

use crate::ConfigMap;
use std::io::{self, BufRead, Write};

#[derive(Debug, thiserror::Error)]
pub enum PropertiesError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{c}')
}

/// Read properties from a buffered reader, line by line.
///
/// Lines end with `\n`, `\r\n` or a lone `\r`.
pub fn read<R: BufRead>(mut reader: R) -> Result<ConfigMap, PropertiesError> {
    let mut parser = LineParser::default();
    let mut buf = Vec::new();
    let mut number = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let chunk = std::str::from_utf8(&buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        for line in split_terminators(chunk) {
            number += 1;
            parser.feed(line, number)?;
        }
    }

    parser.finish()
}

/// Natural lines of a chunk ending in `\n` or at end of input.
fn split_terminators(chunk: &str) -> impl Iterator<Item = &str> {
    let body = chunk.strip_suffix('\n').unwrap_or(chunk);
    let body = body.strip_suffix('\r').unwrap_or(body);
    body.split('\r')
}

#[derive(Default)]
struct LineParser {
    map: ConfigMap,
    logical: String,
    start_line: usize,
    continuing: bool,
}

impl LineParser {
    fn feed(&mut self, line: &str, number: usize) -> Result<(), PropertiesError> {
        let trimmed = line.trim_start_matches(is_blank);

        if !self.continuing {
            if trimmed.is_empty() || trimmed.starts_with(['#', '!']) {
                return Ok(());
            }
            self.start_line = number;
        }

        let (content, continues) = strip_continuation(trimmed);
        self.logical.push_str(content);
        self.continuing = continues;
        if continues {
            return Ok(());
        }

        insert_entry(&mut self.map, &self.logical, self.start_line)?;
        self.logical.clear();
        Ok(())
    }

    fn finish(mut self) -> Result<ConfigMap, PropertiesError> {
        // Continuation on the last line of the input
        if self.continuing {
            insert_entry(&mut self.map, &self.logical, self.start_line)?;
        }
        Ok(self.map)
    }
}

/// Parse properties held in memory.
pub fn from_str(content: &str) -> Result<ConfigMap, PropertiesError> {
    read(content.as_bytes())
}

/// Write `map` with a `#header` comment line, keys in sorted order.
pub fn write<W: Write>(mut writer: W, map: &ConfigMap, header: &str) -> io::Result<()> {
    for line in header.lines() {
        writeln!(writer, "#{line}")?;
    }
    for (key, value) in map.iter() {
        writeln!(writer, "{}={}", escape(key, true), escape(value, false))?;
    }
    writer.flush()
}

/// Render `map` to a string, see [`write`].
pub fn to_string(map: &ConfigMap, header: &str) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail
    let _ = write(&mut buf, map, header);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Drop the continuation backslash, if the line ends with an odd number of them.
fn strip_continuation(line: &str) -> (&str, bool) {
    let trailing = line.chars().rev().take_while(|&c| c == '\\').count();
    if trailing % 2 == 1 {
        (&line[..line.len() - 1], true)
    } else {
        (line, false)
    }
}

fn insert_entry(map: &mut ConfigMap, logical: &str, line: usize) -> Result<(), PropertiesError> {
    let chars: Vec<char> = logical.chars().collect();
    let len = chars.len();

    let mut key_end = len;
    let mut value_start = len;
    let mut has_separator = false;
    let mut i = 0;
    while i < len {
        match chars[i] {
            '\\' => {
                i += 2;
                continue;
            }
            '=' | ':' => {
                key_end = i;
                value_start = i + 1;
                has_separator = true;
                break;
            }
            c if is_blank(c) => {
                key_end = i;
                value_start = i + 1;
                break;
            }
            _ => i += 1,
        }
    }

    while value_start < len && is_blank(chars[value_start]) {
        value_start += 1;
    }
    if !has_separator && value_start < len && matches!(chars[value_start], '=' | ':') {
        value_start += 1;
        while value_start < len && is_blank(chars[value_start]) {
            value_start += 1;
        }
    }

    let malformed = |reason: String| PropertiesError::Malformed { line, reason };
    let key = unescape(&chars[..key_end]).map_err(malformed)?;
    let value = unescape(&chars[value_start..]).map_err(malformed)?;
    map.insert(key, value);
    Ok(())
}

fn unescape(chars: &[char]) -> Result<String, String> {
    let mut out = String::with_capacity(chars.len());
    let mut iter = chars.iter().copied().peekable();

    while let Some(c) = iter.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match iter.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let unit = read_hex4(&mut iter)?;
                let code = if (0xD800..0xDC00).contains(&unit) {
                    // High surrogate, the low half must follow as another escape
                    if iter.next() != Some('\\') || iter.next() != Some('u') {
                        return Err("unpaired surrogate in \\uxxxx encoding".to_string());
                    }
                    let low = read_hex4(&mut iter)?;
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err("unpaired surrogate in \\uxxxx encoding".to_string());
                    }
                    0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00)
                } else {
                    unit
                };
                let decoded = char::from_u32(code)
                    .ok_or_else(|| format!("invalid code point U+{code:04X}"))?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

fn read_hex4(iter: &mut impl Iterator<Item = char>) -> Result<u32, String> {
    let mut value = 0;
    for _ in 0..4 {
        let digit = iter
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| "malformed \\uxxxx encoding".to_string())?;
        value = (value << 4) | digit;
    }
    Ok(value)
}

fn escape(text: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.chars().enumerate() {
        match c {
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{c}' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out
}
