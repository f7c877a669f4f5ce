//! Tag reference parsing and IOI compilation.
//!
//! A Logix tag reference like `Program:Main.Motor[2].Status.3` is parsed
//! into a [`ParsedTag`] and compiled into the CIP Internal Object Identifier
//! byte sequence the Message Router resolves. The compiler is pure: the only
//! context it consumes is the declared data type of the base tag, which
//! changes how BOOL arrays backed by DWORD storage address their elements.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{LogixError, Result};
use crate::types::codes;

lazy_static! {
    /// One path segment: a name with an optional bracketed index list.
    static ref SEGMENT_RE: Regex =
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)(?:\[([0-9, \t]+)\])?$").unwrap();
    /// A terminal bit-index segment.
    static ref BIT_RE: Regex = Regex::new(r"^[0-9]+$").unwrap();
}

/// One member access within a tag reference, with its own indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub indices: Vec<u32>,
}

/// A tag reference decomposed into its structural parts.
///
/// # Examples
///
/// ```
/// use logix_eip::tag_path::ParsedTag;
///
/// let tag = ParsedTag::parse("Program:Main.Motor[2].Status.3").unwrap();
/// assert_eq!(tag.program_name.as_deref(), Some("Program:Main"));
/// assert_eq!(tag.base_tag, "Motor");
/// assert_eq!(tag.array_indices, vec![2]);
/// assert_eq!(tag.members[0].name, "Status");
/// assert_eq!(tag.bit_index, Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTag {
    /// Name of the first (controller- or program-scoped) symbol.
    pub base_tag: String,
    /// Indices attached to the base tag, up to three dimensions.
    pub array_indices: Vec<u32>,
    /// Full `Program:<Name>` prefix when the tag is program-scoped.
    pub program_name: Option<String>,
    /// Member accesses after the base tag.
    pub members: Vec<Member>,
    /// Terminal bit number for bit-of-word references.
    pub bit_index: Option<u8>,
}

impl ParsedTag {
    /// Parses a textual tag reference.
    ///
    /// Segments are separated by `.`; a leading `Program:<name>` segment
    /// (case-insensitive on the keyword) scopes the tag; each segment may
    /// carry one bracket suffix of up to three comma-separated decimal
    /// indices; a terminal pure-decimal segment is a bit index in `0..=63`.
    pub fn parse(name: &str) -> Result<Self> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(LogixError::TagPath("empty tag name".to_string()));
        }

        let mut segments: Vec<&str> = trimmed.split('.').collect();
        let mut program_name = None;
        let has_program_prefix = segments[0]
            .get(..8)
            .map_or(false, |prefix| prefix.eq_ignore_ascii_case("Program:"));
        if has_program_prefix {
            program_name = Some(segments.remove(0).to_string());
            if segments.is_empty() {
                return Err(LogixError::TagPath(format!(
                    "'{}' names a program but no tag",
                    trimmed
                )));
            }
        }

        // A terminal pure-decimal segment addresses a bit of the preceding
        // word, never a member.
        let mut bit_index = None;
        if segments.len() > 1 && BIT_RE.is_match(segments[segments.len() - 1]) {
            let last = segments.pop().unwrap();
            let bit: u8 = last
                .parse()
                .map_err(|_| LogixError::TagPath(format!("bit index '{}' out of range", last)))?;
            if bit > 63 {
                return Err(LogixError::TagPath(format!(
                    "bit index {} out of range (0-63)",
                    bit
                )));
            }
            bit_index = Some(bit);
        }

        let (base_tag, array_indices) = parse_segment(segments[0])?;
        let mut members = Vec::with_capacity(segments.len() - 1);
        for segment in &segments[1..] {
            let (name, indices) = parse_segment(segment)?;
            members.push(Member { name, indices });
        }

        Ok(ParsedTag {
            base_tag,
            array_indices,
            program_name,
            members,
            bit_index,
        })
    }

    /// Compiles this reference into its IOI byte sequence.
    ///
    /// `base_type` is the declared CIP type of the base tag when known. When
    /// it is DWORD the base tag is the backing storage of a BOOL array: only
    /// the first index is emitted, divided by 32, and the caller resolves
    /// the remaining bit position.
    pub fn encode_ioi(&self, base_type: Option<u8>) -> Vec<u8> {
        let mut ioi = Vec::new();

        if let Some(program) = &self.program_name {
            push_symbolic(&mut ioi, program);
        }
        push_symbolic(&mut ioi, &self.base_tag);

        if base_type == Some(codes::DWORD) {
            if let Some(&first) = self.array_indices.first() {
                push_element(&mut ioi, first / 32);
            }
        } else {
            for &index in &self.array_indices {
                push_element(&mut ioi, index);
            }
        }

        for member in &self.members {
            push_symbolic(&mut ioi, &member.name);
            for &index in &member.indices {
                push_element(&mut ioi, index);
            }
        }

        ioi
    }

    /// The reference without its program prefix and bit suffix, useful as a
    /// cache key for the base symbol's declared type.
    pub fn base_key(&self) -> String {
        match &self.program_name {
            Some(program) => format!("{}.{}", program, self.base_tag),
            None => self.base_tag.clone(),
        }
    }
}

fn parse_segment(segment: &str) -> Result<(String, Vec<u32>)> {
    let captures = SEGMENT_RE
        .captures(segment)
        .ok_or_else(|| LogixError::TagPath(format!("invalid tag segment '{}'", segment)))?;
    let name = captures[1].to_string();
    let mut indices = Vec::new();
    if let Some(list) = captures.get(2) {
        for part in list.as_str().split(',') {
            let index: u32 = part.trim().parse().map_err(|_| {
                LogixError::TagPath(format!("invalid array index '{}'", part.trim()))
            })?;
            indices.push(index);
        }
        if indices.len() > 3 {
            return Err(LogixError::TagPath(format!(
                "too many dimensions in '{}'",
                segment
            )));
        }
    }
    Ok((name, indices))
}

/// Appends an ANSI extended symbolic segment: 0x91, length, ASCII name, and
/// a zero pad byte when the name length is odd.
fn push_symbolic(ioi: &mut Vec<u8>, name: &str) {
    let bytes = name.as_bytes();
    ioi.push(0x91);
    ioi.push(bytes.len() as u8);
    ioi.extend_from_slice(bytes);
    if bytes.len() % 2 != 0 {
        ioi.push(0x00);
    }
}

/// Appends the smallest element segment that holds `index`.
fn push_element(ioi: &mut Vec<u8>, index: u32) {
    if index < 256 {
        ioi.push(0x28);
        ioi.push(index as u8);
    } else if index < 65536 {
        ioi.push(0x29);
        ioi.push(0x00);
        ioi.extend_from_slice(&(index as u16).to_le_bytes());
    } else {
        ioi.push(0x2A);
        ioi.push(0x00);
        ioi.extend_from_slice(&index.to_le_bytes());
    }
}

/// Bit position of BOOL-array element `i` within its backing DWORD.
pub fn bit_within_dword(index: u32) -> u8 {
    (index % 32) as u8
}
