//! History page decoding.
//!
//! A history page is a run of records with no delimiters. Each record starts with
//! an opcode byte; the [`registry`] says how many head, date and body bytes follow.
//!
//! ```text
//! page:    | op head.. | date (5) | body.. | op head.. | date (5) | ...
//!            ^ registry lookup decides every length
//! ```
//!
//! ## Usage Example
//!
//! ```rust
//! use pumplink::history::{parse_page, FieldValue};
//!
//! let page = parse_page(&[0x34, 0xc8, 0xeb, 0x02, 0x0b, 0x07, 0x0c], false);
//! let record = &page.records[0];
//! assert_eq!(record.name(), "LowReservoir");
//! assert_eq!(record.field("amount"), Some(&FieldValue::Float(20.0)));
//! ```

pub mod date;
pub mod decode;
pub mod framer;
pub mod record;
pub mod registry;

pub use date::{DateEncoding, DateTuple, DecodedDate, parse_date, parse_midnight, parse_strict, unmask_date};
pub use decode::decode_remote_id;
pub use framer::{HistoryPage, frame, parse_page};
pub use record::{FieldValue, Fields, ParsedRecord, RecordView};
pub use registry::{RecordDescriptor, describe, is_known, lookup};
