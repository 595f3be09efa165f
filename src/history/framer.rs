//! Record framing over a sequential byte stream.
//!
//! A record is read in a fixed order: the rest of the head, then the date, then
//! the body. The number of bytes taken from the stream always equals the
//! descriptor's declared total, whatever the bytes contain, because that is the
//! only thing keeping the next record aligned.

use std::io::{Cursor, Read};
use tracing::{debug, trace, warn};

use super::record::ParsedRecord;
use super::registry::{HeadLength, lookup};
use crate::{PumpError, Result};

/// Read up to `target` total bytes into `buf`. Returns whether `target` was reached.
fn fill<R: Read>(reader: &mut R, buf: &mut Vec<u8>, target: usize) -> Result<bool> {
    let Some(missing) = target.checked_sub(buf.len()) else {
        return Ok(true);
    };
    if missing == 0 {
        return Ok(true);
    }
    let read = reader
        .by_ref()
        .take(missing as u64)
        .read_to_end(buf)
        .map_err(|e| PumpError::parse_error("history stream", e.to_string()))?;
    Ok(read == missing)
}

/// Frame one record.
///
/// `head` holds the bytes of this record already taken from the stream (at
/// least the opcode, usually). When it is empty the opcode is read first.
///
/// # Errors
///
/// - [`PumpError::TruncatedRecord`] when the stream ends inside the record
/// - [`PumpError::OversizedHead`] when `head` is longer than the record's head
pub fn frame<R: Read>(reader: &mut R, head: &[u8], larger: bool) -> Result<ParsedRecord> {
    let mut buf = head.to_vec();
    if !fill(reader, &mut buf, 1)? {
        return Err(PumpError::TruncatedRecord { opcode: 0, expected: 1, available: 0 });
    }

    let opcode = buf[0];
    let descriptor = lookup(opcode, larger);
    if !descriptor.is_known() {
        debug!("Unknown opcode {:#04x}, using fallback framing", opcode);
    }

    let head_length = match descriptor.head {
        HeadLength::Fixed(n) => usize::from(n),
        HeadLength::Prefixed { .. } => {
            fill(reader, &mut buf, 2)?;
            descriptor.head.resolve(buf.get(1).copied())
        }
    };

    if head.len() > head_length {
        return Err(PumpError::OversizedHead { opcode, declared: head_length, supplied: head.len() });
    }

    let total = descriptor.total_length(head_length);
    if !fill(reader, &mut buf, total)? {
        return Err(PumpError::TruncatedRecord { opcode, expected: total, available: buf.len() });
    }

    trace!(
        "Framed {} ({:#04x}): head={} date={} body={}",
        descriptor.name, opcode, head_length, descriptor.date_length, descriptor.body_length
    );

    Ok(ParsedRecord::from_bytes(&descriptor, buf, head_length))
}

/// Records recovered from one history page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryPage {
    pub records: Vec<ParsedRecord>,
    /// Bytes at the end of the page that did not form a complete record.
    pub remainder: Vec<u8>,
}

impl HistoryPage {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records whose date did not decode to a calendar timestamp.
    pub fn undated(&self) -> impl Iterator<Item = &ParsedRecord> {
        self.records.iter().filter(|r| !r.date().is_valid())
    }
}

/// Walk a whole page, one record after another, until the data runs out.
///
/// A record with a bad date is kept (its date marked undecodable) and the walk
/// continues. A page that ends inside a record keeps the partial bytes in
/// [`HistoryPage::remainder`].
pub fn parse_page(data: &[u8], larger: bool) -> HistoryPage {
    let mut cursor = Cursor::new(data);
    let mut page = HistoryPage::default();

    loop {
        let start = cursor.position() as usize;
        if start >= data.len() {
            break;
        }

        match frame(&mut cursor, &[], larger) {
            Ok(record) => page.records.push(record),
            Err(e) => {
                warn!("History page ends inside a record at offset {}: {}", start, e);
                page.remainder = data[start..].to_vec();
                break;
            }
        }
    }

    debug!(
        "Parsed {} records ({} undated, {} trailing bytes)",
        page.records.len(),
        page.undated().count(),
        page.remainder.len()
    );
    page
}
