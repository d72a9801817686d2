//! A small, tolerant `multipart/form-data` decoder.
//!
//! The body is split on `--<boundary>`; the preamble before the first
//! delimiter and the closing `--` segment after the last one are dropped.
//! Every remaining segment is `headers CRLF CRLF content CRLF`.
//!
//! ```text
//! --XyZ\r\n
//! Content-Disposition: form-data; name="files"; filename="a.epub"\r\n
//! Content-Type: application/epub+zip\r\n
//! \r\n
//! <bytes>\r\n
//! --XyZ\r\n
//! Content-Disposition: form-data; name="metadata_0"\r\n
//! \r\n
//! {"title":"A"}\r\n
//! --XyZ--\r\n
//! ```
//!
//! Malformed parts (no header/body separator, no usable disposition) are
//! skipped, not fatal. Only a body in which the boundary never appears is
//! rejected.

use tracing::debug;

use crate::error::IngestError;

const HEADER_END: &[u8] = b"\r\n\r\n";
const CRLF: &[u8] = b"\r\n";

/// One decoded part of a form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// A part carrying a non-empty `filename`.
    File {
        field_name: String,
        filename: String,
        content: Vec<u8>,
    },
    /// A plain form field.
    Field { field_name: String, content: Vec<u8> },
}

impl Part {
    pub fn field_name(&self) -> &str {
        match self {
            Part::File { field_name, .. } | Part::Field { field_name, .. } => field_name,
        }
    }

    pub fn filename(&self) -> Option<&str> {
        match self {
            Part::File { filename, .. } => Some(filename),
            Part::Field { .. } => None,
        }
    }

    pub fn content(&self) -> &[u8] {
        match self {
            Part::File { content, .. } | Part::Field { content, .. } => content,
        }
    }

    pub fn into_content(self) -> Vec<u8> {
        match self {
            Part::File { content, .. } | Part::Field { content, .. } => content,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Part::File { .. })
    }
}

/// Extract the `boundary` parameter of a `multipart/form-data` Content-Type.
///
/// ```
/// use ingest::boundary_from_content_type;
///
/// let b = boundary_from_content_type("multipart/form-data; boundary=\"abc 123\"").unwrap();
/// assert_eq!(b, "abc 123");
/// assert!(boundary_from_content_type("application/json").is_err());
/// ```
pub fn boundary_from_content_type(content_type: &str) -> Result<String, IngestError> {
    let mut params = split_params(content_type).into_iter();
    let media_type = params.next().unwrap_or_default();
    if !media_type.eq_ignore_ascii_case("multipart/form-data") {
        return Err(IngestError::MalformedRequest(format!(
            "expected multipart/form-data, got {media_type:?}"
        )));
    }
    params
        .filter_map(|param| parse_param(&param))
        .find(|(key, _)| key == "boundary")
        .map(|(_, value)| value)
        .filter(|boundary| !boundary.is_empty())
        .ok_or_else(|| {
            IngestError::MalformedRequest("Content-Type has no boundary parameter".into())
        })
}

/// Decode `body` into its parts.
///
/// Fails with [`IngestError::MalformedRequest`] only when the boundary is
/// empty or never delimits a single part.
pub fn parse(body: &[u8], boundary: &str) -> Result<Vec<Part>, IngestError> {
    if boundary.is_empty() {
        return Err(IngestError::MalformedRequest("empty multipart boundary".into()));
    }
    let delimiter = format!("--{boundary}");
    let segments = split_on(body, delimiter.as_bytes());
    if segments.len() < 3 {
        return Err(IngestError::MalformedRequest(
            "multipart boundary not found in body".into(),
        ));
    }

    let inner = &segments[1..segments.len() - 1];
    let mut parts = Vec::with_capacity(inner.len());
    for (position, segment) in inner.iter().enumerate() {
        match parse_segment(segment) {
            Some(part) => parts.push(part),
            None => debug!(position, len = segment.len(), "multipart_part_skipped"),
        }
    }
    Ok(parts)
}

fn parse_segment(segment: &[u8]) -> Option<Part> {
    let split = find(segment, HEADER_END)?;
    let headers = String::from_utf8_lossy(&segment[..split]);
    let mut content = &segment[split + HEADER_END.len()..];
    if content.ends_with(CRLF) {
        content = &content[..content.len() - CRLF.len()];
    }

    let disposition = headers.split("\r\n").find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("content-disposition")
            .then_some(value)
    })?;

    let mut field_name = None;
    let mut filename = None;
    for (key, value) in split_params(disposition)
        .iter()
        .skip(1)
        .filter_map(|param| parse_param(param))
    {
        match key.as_str() {
            "name" if field_name.is_none() => field_name = Some(value),
            "filename" if filename.is_none() => filename = Some(value),
            _ => {}
        }
    }

    match (field_name, filename) {
        (field_name, Some(filename)) if !filename.is_empty() => Some(Part::File {
            field_name: field_name.unwrap_or_default(),
            filename,
            content: content.to_vec(),
        }),
        (Some(field_name), _) => Some(Part::Field {
            field_name,
            content: content.to_vec(),
        }),
        _ => None,
    }
}

/// Split a header value on `;`, ignoring separators inside double quotes.
fn split_params(value: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in value.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            ';' if !quoted => params.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    params.push(current.trim().to_string());
    params
}

/// `key=value` or `key="value"`; keys are lowercased.
fn parse_param(param: &str) -> Option<(String, String)> {
    let (key, value) = param.split_once('=')?;
    let key = key.trim().to_ascii_lowercase();
    let value = value.trim();
    let value = match value.strip_prefix('"') {
        Some(rest) => rest.split('"').next().unwrap_or(rest),
        None => value,
    };
    Some((key, value.to_string()))
}

fn split_on<'a>(haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut segments = Vec::new();
    let mut rest = haystack;
    while let Some(pos) = find(rest, needle) {
        segments.push(&rest[..pos]);
        rest = &rest[pos + needle.len()..];
    }
    segments.push(rest);
    segments
}

/// Position of the first occurrence of `needle` in `haystack`.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    let (&first, tail) = needle.split_first()?;
    let mut offset = 0;
    while offset + needle.len() <= haystack.len() {
        let candidate = haystack[offset..=haystack.len() - needle.len()]
            .iter()
            .position(|&b| b == first)?;
        let start = offset + candidate;
        if haystack[start + 1..start + needle.len()] == *tail {
            return Some(start);
        }
        offset = start + 1;
    }
    None
}
