//! History log codec and command session for insulin pumps.
//!
//! pumplink turns the raw bytes of a pump history page into typed records and
//! drives the bounded transmit, settle and download cycle that fetches those
//! pages over a radio stick.
//!
//! # Features
//!
//! - **Record framing**: a static opcode registry with larger-model overrides
//!   and a fallback for opcodes it does not know, so a page walk never loses
//!   alignment
//! - **Date codec**: packed five byte and midnight-only timestamps, with
//!   undecodable dates reported per record instead of aborting the page
//! - **Sessions**: bounded transmit and download retries over any [`Transport`]
//!
//! # Quick Start
//!
//! ```rust
//! use pumplink::history::parse_page;
//!
//! let page = parse_page(&[0x34, 0xc8, 0xeb, 0x02, 0x0b, 0x07, 0x0c], false);
//! let record = &page.records[0];
//! assert_eq!(record.name(), "LowReservoir");
//! assert_eq!(record.field("amount").and_then(|v| v.as_f64()), Some(20.0));
//! assert_eq!(record.date().to_string(), "2012-12-07T11:02:43");
//! ```

pub mod config;
mod error;
pub mod history;
pub mod logging;
pub mod session;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod transport;

pub use config::{PumpConfig, SessionConfig};
pub use error::*;
pub use history::{HistoryPage, ParsedRecord, parse_page};
pub use session::{Command, CommandType, ExecutionReport, Pump, Session, SessionState};
pub use transport::{StatsReport, Transport};
