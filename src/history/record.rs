//! Parsed history records.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::date::{DecodedDate, decode_date};
use super::registry::{DescriptorKind, RecordDescriptor};

/// A decoded scalar from a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    Int(i64),
    Text(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// Decoded fields keyed by name.
pub type Fields = BTreeMap<&'static str, FieldValue>;

/// Borrowed view of one framed record, handed to decode functions.
#[derive(Debug, Clone, Copy)]
pub struct RecordView<'a> {
    pub head: &'a [u8],
    pub date: &'a [u8],
    pub body: &'a [u8],
    pub decoded_date: &'a DecodedDate,
}

impl RecordView<'_> {
    pub fn head_byte(&self, index: usize) -> Option<u8> {
        self.head.get(index).copied()
    }

    pub fn date_byte(&self, index: usize) -> Option<u8> {
        self.date.get(index).copied()
    }

    /// Big-endian 16-bit value from two head bytes.
    pub fn head_u16(&self, index: usize) -> Option<u16> {
        let pair = self.head.get(index..index + 2)?;
        Some(u16::from_be_bytes([pair[0], pair[1]]))
    }
}

/// One history record, framed and decoded. Never modified after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedRecord {
    opcode: u8,
    name: &'static str,
    kind: DescriptorKind,
    head: Vec<u8>,
    date: Vec<u8>,
    body: Vec<u8>,
    decoded_date: DecodedDate,
    fields: Fields,
}

impl ParsedRecord {
    /// Split a complete record into segments and decode it.
    ///
    /// `bytes` must hold exactly `head_length` + date + body bytes for `descriptor`.
    pub(crate) fn from_bytes(
        descriptor: &RecordDescriptor,
        mut bytes: Vec<u8>,
        head_length: usize,
    ) -> Self {
        debug_assert_eq!(bytes.len(), descriptor.total_length(head_length));

        let mut date = bytes.split_off(head_length.min(bytes.len()));
        let body = date.split_off(descriptor.date_length.min(date.len()));
        let head = bytes;

        let decoded_date = decode_date(descriptor.date_encoding, &date);
        if let DecodedDate::NotADate(tuple) = decoded_date {
            tracing::debug!(
                opcode = descriptor.opcode,
                "{} carries an invalid date {}",
                descriptor.name,
                tuple
            );
        }

        let fields = match descriptor.decode {
            Some(decode) => decode(&RecordView {
                head: &head,
                date: &date,
                body: &body,
                decoded_date: &decoded_date,
            }),
            None => Fields::new(),
        };

        Self {
            opcode: descriptor.opcode,
            name: descriptor.name,
            kind: descriptor.kind,
            head,
            date,
            body,
            decoded_date,
            fields,
        }
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_known(&self) -> bool {
        self.kind == DescriptorKind::Known
    }

    pub fn head(&self) -> &[u8] {
        &self.head
    }

    pub fn date_bytes(&self) -> &[u8] {
        &self.date
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn date(&self) -> &DecodedDate {
        &self.decoded_date
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Bytes this record occupied on the page.
    pub fn len(&self) -> usize {
        self.head.len() + self.date.len() + self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Head, date and body concatenated as they appeared on the page.
    pub fn raw(&self) -> Vec<u8> {
        [self.head.as_slice(), self.date.as_slice(), self.body.as_slice()].concat()
    }
}

impl fmt::Display for ParsedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} head[{}], body[{}] op[{:#04x}]",
            self.name,
            self.decoded_date,
            self.head.len(),
            self.body.len(),
            self.opcode
        )
    }
}
