//! Line-oriented dictionary file parser
//!
//! Grammar (one definition per line, `#` starts a comment):
//!
//! ```text
//! ATTRIBUTE    <name> <code> <type> [flag,...]
//! VALUE        <attribute-name> <value-name> <number>
//! VENDOR       <name> <id> [format=<t>,<l>]
//! BEGIN-VENDOR <name>
//! END-VENDOR   <name>
//! $INCLUDE     <path>
//! ```
//!
//! Attribute codes may use the dotted form `t.s`: with `t` in 241-246 it
//! defines an RFC 6929 extended attribute; with `t` naming the code of a
//! previously-defined `tlv` attribute it defines a TLV sub-attribute.

use super::{AttrKey, DataType, Dictionary, Vendor};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fatal dictionary load failure, pinned to its source line
#[derive(Error, Debug)]
#[error("{file}:{line}: {kind}")]
pub struct ParseError {
    pub file: String,
    pub line: u32,
    pub kind: ParseErrorKind,
}

/// What went wrong on the offending line
#[derive(Error, Debug)]
pub enum ParseErrorKind {
    #[error("unknown keyword `{0}`")]
    UnknownKeyword(String),
    #[error("unknown attribute type `{0}`")]
    UnknownType(String),
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    #[error("duplicate definition of `{0}`")]
    Duplicate(String),
    #[error("VALUE references unknown attribute `{0}`")]
    UnknownAttribute(String),
    #[error("unknown vendor `{0}`")]
    UnknownVendor(String),
    #[error("END-VENDOR `{0}` does not match the current scope")]
    VendorMismatch(String),
    #[error("unknown attribute flag `{0}`")]
    UnknownFlag(String),
    #[error("invalid vendor format `{0}`")]
    InvalidFormat(String),
    #[error("sub-attribute parent {0} is not a tlv attribute")]
    NotTlvParent(u32),
    #[error("recursive $INCLUDE of `{0}`")]
    IncludeCycle(String),
    #[error("$INCLUDE is not available when parsing from a string")]
    IncludeUnsupported,
    #[error("in included file: {0}")]
    Included(Box<ParseError>),
    #[error("missing field")]
    MissingField,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

struct ParseState {
    current_vendor: Option<u32>,
    include_stack: Vec<PathBuf>,
}

pub(super) fn parse_file(dict: &mut Dictionary, path: &Path) -> Result<(), ParseError> {
    let mut state = ParseState {
        current_vendor: None,
        include_stack: Vec::new(),
    };
    read_one_file(dict, path, &mut state)
}

pub(super) fn parse_str(dict: &mut Dictionary, source: &str, text: &str) -> Result<(), ParseError> {
    let mut state = ParseState {
        current_vendor: None,
        include_stack: Vec::new(),
    };
    for (number, line) in text.lines().enumerate() {
        parse_line(dict, line, None, &mut state).map_err(|kind| ParseError {
            file: source.to_owned(),
            line: number as u32 + 1,
            kind,
        })?;
    }
    Ok(())
}

fn read_one_file(dict: &mut Dictionary, path: &Path, state: &mut ParseState) -> Result<(), ParseError> {
    let display = path.display().to_string();
    let canonical = path.canonicalize().map_err(|e| ParseError {
        file: display.clone(),
        line: 0,
        kind: ParseErrorKind::Io(e),
    })?;
    if state.include_stack.contains(&canonical) {
        return Err(ParseError {
            file: display,
            line: 0,
            kind: ParseErrorKind::IncludeCycle(canonical.display().to_string()),
        });
    }

    let text = std::fs::read_to_string(path).map_err(|e| ParseError {
        file: display.clone(),
        line: 0,
        kind: ParseErrorKind::Io(e),
    })?;
    let base_dir = path.parent().map(Path::to_path_buf);

    state.include_stack.push(canonical);
    for (number, line) in text.lines().enumerate() {
        let result = parse_line(dict, line, base_dir.as_deref(), state);
        if let Err(kind) = result {
            state.include_stack.pop();
            return Err(ParseError {
                file: display,
                line: number as u32 + 1,
                kind,
            });
        }
    }
    state.include_stack.pop();
    Ok(())
}

fn parse_line(
    dict: &mut Dictionary,
    line: &str,
    base_dir: Option<&Path>,
    state: &mut ParseState,
) -> Result<(), ParseErrorKind> {
    let line = match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    };
    let mut fields = line.split_whitespace();
    let keyword = match fields.next() {
        Some(k) => k,
        None => return Ok(()),
    };
    match keyword {
        "ATTRIBUTE" => parse_attribute(dict, fields, state),
        "VALUE" => parse_value(dict, fields, state),
        "VENDOR" => parse_vendor(dict, fields),
        "BEGIN-VENDOR" => {
            let name = fields.next().ok_or(ParseErrorKind::MissingField)?;
            let vendor = dict
                .vendor_by_name(name)
                .ok_or_else(|| ParseErrorKind::UnknownVendor(name.to_owned()))?;
            state.current_vendor = Some(vendor.id);
            Ok(())
        }
        "END-VENDOR" => {
            let name = fields.next().ok_or(ParseErrorKind::MissingField)?;
            let expected = dict.vendor_by_name(name).map(|v| v.id);
            if expected.is_none() || expected != state.current_vendor {
                return Err(ParseErrorKind::VendorMismatch(name.to_owned()));
            }
            state.current_vendor = None;
            Ok(())
        }
        "$INCLUDE" => {
            let target = fields.next().ok_or(ParseErrorKind::MissingField)?;
            let base = base_dir.ok_or(ParseErrorKind::IncludeUnsupported)?;
            let included = base.join(target);
            read_one_file(dict, &included, state).map_err(|e| match e.kind {
                // Keep cycle reports flat; anything else retains the nested
                // file/line location.
                ParseErrorKind::IncludeCycle(p) => ParseErrorKind::IncludeCycle(p),
                _ => ParseErrorKind::Included(Box::new(e)),
            })
        }
        other => Err(ParseErrorKind::UnknownKeyword(other.to_owned())),
    }
}

fn parse_attribute<'a, I: Iterator<Item = &'a str>>(
    dict: &mut Dictionary,
    mut fields: I,
    state: &ParseState,
) -> Result<(), ParseErrorKind> {
    let name = fields.next().ok_or(ParseErrorKind::MissingField)?;
    let code = fields.next().ok_or(ParseErrorKind::MissingField)?;
    let type_keyword = fields.next().ok_or(ParseErrorKind::MissingField)?;
    let data_type = DataType::from_keyword(type_keyword)
        .ok_or_else(|| ParseErrorKind::UnknownType(type_keyword.to_owned()))?;

    let key = parse_attr_code(dict, code, state.current_vendor)?;

    let mut has_tag = false;
    let mut encrypt = 0u8;
    if let Some(flags) = fields.next() {
        for flag in flags.split(',') {
            match flag {
                "has_tag" => has_tag = true,
                _ if flag.starts_with("encrypt=") => {
                    encrypt = parse_number(&flag[8..])? as u8;
                    if encrypt > 3 {
                        return Err(ParseErrorKind::UnknownFlag(flag.to_owned()));
                    }
                }
                other => return Err(ParseErrorKind::UnknownFlag(other.to_owned())),
            }
        }
    }

    let def = Dictionary::new_attribute_def(name.to_owned(), key, data_type, has_tag, encrypt);
    dict.insert_attribute(def)
}

/// Resolve the code field, including the dotted `t.s` forms
fn parse_attr_code(
    dict: &Dictionary,
    code: &str,
    vendor: Option<u32>,
) -> Result<AttrKey, ParseErrorKind> {
    if let Some((parent, sub)) = code.split_once('.') {
        let parent = parse_number(parent)?;
        let sub = parse_number(sub)?;
        if vendor.is_none() && (241..=246).contains(&parent) {
            return Ok(AttrKey {
                vendor: None,
                parent: Some(parent),
                code: sub,
            });
        }
        let parent_key = AttrKey {
            vendor,
            parent: None,
            code: parent,
        };
        match dict.find_by_code(parent_key) {
            Some(def) if def.data_type == DataType::Tlv => Ok(AttrKey {
                vendor,
                parent: Some(parent),
                code: sub,
            }),
            _ => Err(ParseErrorKind::NotTlvParent(parent)),
        }
    } else {
        Ok(AttrKey {
            vendor,
            parent: None,
            code: parse_number(code)?,
        })
    }
}

fn parse_value<'a, I: Iterator<Item = &'a str>>(
    dict: &mut Dictionary,
    mut fields: I,
    state: &ParseState,
) -> Result<(), ParseErrorKind> {
    let attribute = fields.next().ok_or(ParseErrorKind::MissingField)?;
    let value_name = fields.next().ok_or(ParseErrorKind::MissingField)?;
    let number = parse_number(fields.next().ok_or(ParseErrorKind::MissingField)?)?;
    dict.insert_value(state.current_vendor, attribute, value_name, number)
}

fn parse_vendor<'a, I: Iterator<Item = &'a str>>(
    dict: &mut Dictionary,
    mut fields: I,
) -> Result<(), ParseErrorKind> {
    let name = fields.next().ok_or(ParseErrorKind::MissingField)?;
    let id = parse_number(fields.next().ok_or(ParseErrorKind::MissingField)?)?;

    let (mut type_width, mut length_width) = Vendor::DEFAULT_FORMAT;
    if let Some(option) = fields.next() {
        let spec = option
            .strip_prefix("format=")
            .ok_or_else(|| ParseErrorKind::InvalidFormat(option.to_owned()))?;
        let (t, l) = spec
            .split_once(',')
            .ok_or_else(|| ParseErrorKind::InvalidFormat(option.to_owned()))?;
        type_width = parse_number(t)? as u8;
        length_width = parse_number(l)? as u8;
        if !matches!(type_width, 1 | 2 | 4) || length_width > 2 {
            return Err(ParseErrorKind::InvalidFormat(option.to_owned()));
        }
    }

    dict.insert_vendor(Vendor {
        name: name.to_owned(),
        id,
        type_width,
        length_width,
    })
}

fn parse_number(text: &str) -> Result<u32, ParseErrorKind> {
    let parsed = match text.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| ParseErrorKind::InvalidNumber(text.to_owned()))
}
