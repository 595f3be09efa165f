//! Opcode registry for history records.
//!
//! History pages carry no record delimiters; the only way to stay aligned is to
//! know, for every opcode, how many head, date and body bytes follow it. This
//! module holds that table. Larger pump models (x23 and up) widen a few records,
//! so descriptors are resolved per `(opcode, larger)` pair and never modified
//! afterwards.
//!
//! Unregistered opcodes resolve to a fallback descriptor with a two byte head
//! and nothing else, which keeps the cursor moving deterministically.

use serde::Serialize;
use std::fmt;

use super::date::{DateEncoding, FULL_DATE_LEN, MIDNIGHT_DATE_LEN};
use super::decode;
use super::record::{Fields, RecordView};

/// Field extraction hook for a known opcode.
pub type DecodeFn = fn(&RecordView<'_>) -> Fields;

/// Head length of a record, including the opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HeadLength {
    Fixed(u8),
    /// Length carried in head byte 1, never shorter than `min`.
    Prefixed { min: u8 },
}

impl HeadLength {
    /// Head length once the length byte (if any) is known.
    pub fn resolve(self, length_byte: Option<u8>) -> usize {
        match self {
            HeadLength::Fixed(n) => n.into(),
            HeadLength::Prefixed { min } => length_byte.unwrap_or(min).max(min).into(),
        }
    }
}

impl fmt::Display for HeadLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeadLength::Fixed(n) => write!(f, "{}", n),
            HeadLength::Prefixed { min } => write!(f, "head[1]>={}", min),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DescriptorKind {
    Known,
    Fallback,
}

/// Framing and decoding rules for one opcode.
#[derive(Clone, Copy, Serialize)]
pub struct RecordDescriptor {
    pub opcode: u8,
    pub name: &'static str,
    pub kind: DescriptorKind,
    pub head: HeadLength,
    pub date_encoding: DateEncoding,
    pub date_length: usize,
    pub body_length: usize,
    #[serde(skip)]
    pub decode: Option<DecodeFn>,
}

impl RecordDescriptor {
    /// A known record with the common shape: two byte head, full date, no body.
    const fn known(opcode: u8, name: &'static str) -> Self {
        Self {
            opcode,
            name,
            kind: DescriptorKind::Known,
            head: HeadLength::Fixed(2),
            date_encoding: DateEncoding::Full,
            date_length: FULL_DATE_LEN,
            body_length: 0,
            decode: None,
        }
    }

    const fn head(mut self, length: u8) -> Self {
        self.head = HeadLength::Fixed(length);
        self
    }

    const fn prefixed_head(mut self, min: u8) -> Self {
        self.head = HeadLength::Prefixed { min };
        self
    }

    const fn midnight(mut self) -> Self {
        self.date_encoding = DateEncoding::Midnight;
        self.date_length = MIDNIGHT_DATE_LEN;
        self
    }

    const fn no_date(mut self) -> Self {
        self.date_encoding = DateEncoding::None;
        self.date_length = 0;
        self
    }

    const fn body(mut self, length: usize) -> Self {
        self.body_length = length;
        self
    }

    const fn decoder(mut self, decode: DecodeFn) -> Self {
        self.decode = Some(decode);
        self
    }

    /// Descriptor used for opcodes missing from the registry.
    pub const fn fallback(opcode: u8) -> Self {
        Self {
            opcode,
            name: "Unknown",
            kind: DescriptorKind::Fallback,
            head: HeadLength::Fixed(2),
            date_encoding: DateEncoding::None,
            date_length: 0,
            body_length: 0,
            decode: None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.kind == DescriptorKind::Known
    }

    /// Total record length for a given head length.
    pub fn total_length(&self, head_length: usize) -> usize {
        head_length + self.date_length + self.body_length
    }

    /// Total record length when the head length does not depend on the data.
    pub fn fixed_length(&self) -> Option<usize> {
        match self.head {
            HeadLength::Fixed(n) => Some(self.total_length(n.into())),
            HeadLength::Prefixed { .. } => None,
        }
    }
}

impl fmt::Debug for RecordDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordDescriptor")
            .field("opcode", &format_args!("{:#04x}", self.opcode))
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("head", &self.head)
            .field("date_encoding", &self.date_encoding)
            .field("date_length", &self.date_length)
            .field("body_length", &self.body_length)
            .field("decode", &self.decode.is_some())
            .finish()
    }
}

impl PartialEq for RecordDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.opcode == other.opcode
            && self.name == other.name
            && self.kind == other.kind
            && self.head == other.head
            && self.date_encoding == other.date_encoding
            && self.date_length == other.date_length
            && self.body_length == other.body_length
    }
}

impl fmt::Display for RecordDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "op[{:#04x}] {} head[{}] date[{}] body[{}]",
            self.opcode, self.name, self.head, self.date_length, self.body_length
        )
    }
}

type Rd = RecordDescriptor;

static RECORDS: &[RecordDescriptor] = &[
    Rd::known(0x01, "Bolus").head(4).decoder(decode::bolus),
    Rd::known(0x03, "Prime").head(5).decoder(decode::prime),
    Rd::known(0x06, "NoDelivery").head(4),
    Rd::known(0x07, "ResultTotals").head(5).midnight(),
    Rd::known(0x08, "ChangeBasalProfile").body(44),
    Rd::known(0x0a, "CalBGForPH").decoder(decode::cal_bg_for_ph),
    Rd::known(0x0b, "AlarmSensor").head(3),
    Rd::known(0x0c, "ClearAlarm"),
    Rd::known(0x14, "SelectBasalProfile"),
    Rd::known(0x16, "TempBasalDuration").decoder(decode::temp_basal_duration),
    Rd::known(0x17, "ChangeTime"),
    Rd::known(0x18, "NewTimeSet"),
    Rd::known(0x19, "LowBattery"),
    Rd::known(0x1a, "Battery"),
    Rd::known(0x1e, "PumpSuspend"),
    Rd::known(0x1f, "PumpResume"),
    Rd::known(0x21, "Rewind"),
    Rd::known(0x26, "EnableDisableRemote").body(14),
    Rd::known(0x27, "ChangeRemoteId"),
    Rd::known(0x33, "TempBasal").body(1).decoder(decode::temp_basal),
    Rd::known(0x34, "LowReservoir").decoder(decode::low_reservoir),
    Rd::known(0x3f, "BgReceived").body(3),
    Rd::known(0x50, "SensorSettings").body(34),
    Rd::known(0x54, "CarbSettings").body(57),
    Rd::known(0x5b, "BolusWizard").body(13),
    Rd::known(0x5c, "UnabsorbedInsulin").prefixed_head(2).no_date(),
    Rd::known(0x63, "ChangeUtility"),
    Rd::known(0x64, "ChangeTimeDisplay"),
    Rd::known(0x69, "ChangeBolusReminder").body(2),
    Rd::known(0x6c, "OldResultTotals").body(38),
    Rd::known(0x6d, "Model522ResultTotals").head(1).midnight().body(40),
    Rd::known(0x6e, "Model722ResultTotals").head(1).midnight().body(48),
    Rd::known(0x7b, "BasalProfileStart").body(3),
    Rd::known(0xa8, "ChangeSensorSetup").head(10),
];

/// Overrides for larger pump models. Only entries that differ are listed.
static LARGER_RECORDS: &[RecordDescriptor] = &[
    Rd::known(0x01, "Bolus").head(8).decoder(decode::bolus_larger),
    Rd::known(0x07, "ResultTotals").head(5).midnight().body(3),
    Rd::known(0x5b, "BolusWizard").body(15),
];

/// Resolve the descriptor for an opcode.
///
/// Larger-model overrides win, then the common table, then the fallback.
pub fn lookup(opcode: u8, larger: bool) -> RecordDescriptor {
    let larger_match = larger
        .then(|| LARGER_RECORDS.iter().find(|d| d.opcode == opcode))
        .flatten();

    larger_match
        .or_else(|| RECORDS.iter().find(|d| d.opcode == opcode))
        .copied()
        .unwrap_or(RecordDescriptor::fallback(opcode))
}

/// Whether an opcode has a registered descriptor.
pub fn is_known(opcode: u8) -> bool {
    RECORDS.iter().any(|d| d.opcode == opcode)
}

/// All registered descriptors for one model size, in opcode order.
pub fn descriptors(larger: bool) -> Vec<RecordDescriptor> {
    RECORDS.iter().map(|d| lookup(d.opcode, larger)).collect()
}

/// One line per registered `(opcode, variant)` describing its framing.
pub fn describe() -> Vec<String> {
    let mut out: Vec<String> = RECORDS.iter().map(|d| d.to_string()).collect();
    out.extend(LARGER_RECORDS.iter().map(|d| format!("{} (larger)", d)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcodes_are_unique_and_sorted() {
        for table in [RECORDS, LARGER_RECORDS] {
            for pair in table.windows(2) {
                assert!(pair[0].opcode < pair[1].opcode, "{:#04x} out of order", pair[1].opcode);
            }
        }
        for larger in LARGER_RECORDS {
            assert!(is_known(larger.opcode), "override {:#04x} has no base record", larger.opcode);
        }
    }

    #[test]
    fn larger_overrides_resolve_per_variant() {
        assert_eq!(lookup(0x01, false).fixed_length(), Some(4 + 5));
        assert_eq!(lookup(0x01, true).fixed_length(), Some(8 + 5));
        assert_eq!(lookup(0x07, false).body_length, 0);
        assert_eq!(lookup(0x07, true).body_length, 3);
        assert_eq!(lookup(0x5b, false).body_length, 13);
        assert_eq!(lookup(0x5b, true).body_length, 15);

        // No override: both variants agree.
        assert_eq!(lookup(0x33, false), lookup(0x33, true));
    }

    #[test]
    fn unknown_opcodes_fall_back() {
        let descriptor = lookup(0xff, false);
        assert_eq!(descriptor.kind, DescriptorKind::Fallback);
        assert_eq!(descriptor.opcode, 0xff);
        assert_eq!(descriptor.fixed_length(), Some(2));
        assert!(!is_known(0xff));
        assert_eq!(lookup(0xff, true), descriptor);
    }

    #[test]
    fn daily_totals_use_midnight_dates() {
        for opcode in [0x07, 0x6d, 0x6e] {
            let descriptor = lookup(opcode, false);
            assert_eq!(descriptor.date_encoding, DateEncoding::Midnight);
            assert_eq!(descriptor.date_length, MIDNIGHT_DATE_LEN);
        }
        assert_eq!(lookup(0x6d, false).fixed_length(), Some(1 + 2 + 40));
    }

    #[test]
    fn prefixed_head_resolves_from_length_byte() {
        let head = lookup(0x5c, false).head;
        assert_eq!(head.resolve(Some(0x0c)), 12);
        assert_eq!(head.resolve(Some(0)), 2);
        assert_eq!(head.resolve(None), 2);
        assert_eq!(lookup(0x5c, false).fixed_length(), None);
    }

    #[test]
    fn describe_lists_every_variant() {
        let lines = describe();
        assert_eq!(lines.len(), RECORDS.len() + LARGER_RECORDS.len());
        assert!(lines.contains(&"op[0x34] LowReservoir head[2] date[5] body[0]".to_string()));
        assert!(lines.contains(&"op[0x01] Bolus head[8] date[5] body[0] (larger)".to_string()));
        assert!(lines.iter().any(|l| l.contains("head[head[1]>=2]")));
    }

    #[test]
    fn decoders_registered_for_scaled_records() {
        for opcode in [0x01, 0x03, 0x0a, 0x16, 0x33, 0x34] {
            assert!(lookup(opcode, false).decode.is_some(), "{:#04x} has no decoder", opcode);
        }
        assert!(lookup(0x01, true).decode.is_some());
    }
}
