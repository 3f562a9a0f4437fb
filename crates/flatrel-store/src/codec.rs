//! Delimited text codec for backing files.
//!
//! One record per line, fields in schema order, no header. Fields containing
//! the delimiter, a quote or a line break are wrapped in double quotes with
//! embedded quotes doubled, so a quoted field may span physical lines.
//! Lines with no content are skipped on read and do not count as rows.

use crate::error::{StoreError, StoreResult};

/// One decoded record with the physical line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// 1-based line number of the first character of the record.
    pub line: usize,
    /// Unescaped field texts.
    pub fields: Vec<String>,
}

/// Encodes one record as a line, including the trailing newline.
pub fn encode_record<S: AsRef<str>>(fields: &[S], delimiter: char) -> String {
    let mut out = String::new();
    if let [only] = fields {
        if only.as_ref().is_empty() {
            // a lone empty field would otherwise read back as a blank line
            out.push_str("\"\"\n");
            return out;
        }
    }
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(delimiter);
        }
        out.push_str(&escape_field(field.as_ref(), delimiter));
    }
    out.push('\n');
    out
}

/// Encodes many records into one buffer.
pub fn encode_records<S: AsRef<str>>(records: &[Vec<S>], delimiter: char) -> String {
    records
        .iter()
        .map(|fields| encode_record(fields, delimiter))
        .collect()
}

fn escape_field(value: &str, delimiter: char) -> String {
    if value.contains(delimiter) || value.contains(['"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Decodes the full content of a backing file.
///
/// `schema` only labels errors. An unterminated quoted field fails the whole
/// decode.
pub fn decode_records(content: &str, delimiter: char, schema: &str) -> StoreResult<Vec<RawRecord>> {
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut line = 1;
    let mut record_line = 1;

    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() && !quoted => {
                in_quotes = true;
                quoted = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                flush(&mut records, &mut fields, quoted, record_line);
                quoted = false;
                line += 1;
                record_line = line;
            }
            c if c == delimiter => {
                fields.push(std::mem::take(&mut field));
                quoted = false;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(StoreError::MalformedRow {
            schema: schema.to_string(),
            line: record_line,
            reason: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !fields.is_empty() || quoted {
        fields.push(field);
        flush(&mut records, &mut fields, quoted, record_line);
    }

    Ok(records)
}

fn flush(records: &mut Vec<RawRecord>, fields: &mut Vec<String>, quoted: bool, line: usize) {
    let blank = fields.len() == 1 && fields[0].is_empty() && !quoted;
    let fields = std::mem::take(fields);
    if !blank {
        records.push(RawRecord { line, fields });
    }
}
