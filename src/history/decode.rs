//! Field decoders for known history records.
//!
//! Each decoder reads only the head, date and body of its own record. Missing
//! bytes leave the field out instead of failing, so a short record still frames
//! and prints.
//!
//! Insulin amounts are stored in tenths of a unit on older models and in
//! fortieths (big-endian pairs) on larger ones; basal rates are always fortieths
//! and durations are counted in half hours.

use super::record::{FieldValue, Fields, RecordView};

const TENTHS: f64 = 10.0;
const FORTIETHS: f64 = 40.0;
const HALF_HOUR_MIN: i64 = 30;

fn tenths(byte: u8) -> FieldValue {
    FieldValue::Float(f64::from(byte) / TENTHS)
}

fn fortieths(value: u16) -> FieldValue {
    FieldValue::Float(f64::from(value) / FORTIETHS)
}

fn half_hours(count: u8) -> i64 {
    i64::from(count) * HALF_HOUR_MIN
}

fn bolus_kind(duration_min: i64) -> FieldValue {
    let kind = if duration_min > 0 { "square" } else { "normal" };
    FieldValue::Text(kind.to_string())
}

/// Bolus (0x01) on smaller models.
pub fn bolus(record: &RecordView<'_>) -> Fields {
    let mut fields = Fields::new();
    if let Some(programmed) = record.head_byte(1) {
        fields.insert("programmed", tenths(programmed));
    }
    if let Some(amount) = record.head_byte(2) {
        fields.insert("amount", tenths(amount));
    }
    if let Some(duration) = record.head_byte(3).map(half_hours) {
        fields.insert("duration_min", FieldValue::Int(duration));
        fields.insert("kind", bolus_kind(duration));
    }
    fields
}

/// Bolus (0x01) on larger models.
pub fn bolus_larger(record: &RecordView<'_>) -> Fields {
    let mut fields = Fields::new();
    if let Some(programmed) = record.head_u16(1) {
        fields.insert("programmed", fortieths(programmed));
    }
    if let Some(amount) = record.head_u16(3) {
        fields.insert("amount", fortieths(amount));
    }
    if let Some(unabsorbed) = record.head_u16(5) {
        fields.insert("unabsorbed", fortieths(unabsorbed));
    }
    if let Some(duration) = record.head_byte(7).map(half_hours) {
        fields.insert("duration_min", FieldValue::Int(duration));
        fields.insert("kind", bolus_kind(duration));
    }
    fields
}

/// Prime (0x03). A zero fixed amount means a manual prime.
pub fn prime(record: &RecordView<'_>) -> Fields {
    let mut fields = Fields::new();
    if let Some(fixed) = record.head_byte(2) {
        fields.insert("fixed", tenths(fixed));
        let kind = if fixed == 0 { "manual" } else { "fixed" };
        fields.insert("kind", FieldValue::Text(kind.to_string()));
    }
    if let Some(amount) = record.head_byte(4) {
        fields.insert("amount", tenths(amount));
    }
    fields
}

/// Calibration BG (0x0A). The ninth bit of the reading lives in the year byte.
pub fn cal_bg_for_ph(record: &RecordView<'_>) -> Fields {
    let mut fields = Fields::new();
    if let (Some(low), Some(year)) = (record.head_byte(1), record.date_byte(4)) {
        let high = i64::from(year & 0x80) << 1;
        fields.insert("amount", FieldValue::Int(high | i64::from(low)));
    }
    fields
}

/// Temp basal rate (0x33), units per hour.
pub fn temp_basal(record: &RecordView<'_>) -> Fields {
    let mut fields = Fields::new();
    if let Some(rate) = record.head_byte(1) {
        fields.insert("rate", FieldValue::Float(f64::from(rate) / FORTIETHS));
    }
    fields
}

/// Temp basal duration (0x16), minutes.
pub fn temp_basal_duration(record: &RecordView<'_>) -> Fields {
    let mut fields = Fields::new();
    if let Some(duration) = record.head_byte(1) {
        fields.insert("duration_min", FieldValue::Int(half_hours(duration)));
    }
    fields
}

/// Low reservoir warning (0x34), units remaining.
pub fn low_reservoir(record: &RecordView<'_>) -> Fields {
    let mut fields = Fields::new();
    if let Some(amount) = record.head_byte(1) {
        fields.insert("amount", tenths(amount));
    }
    fields
}

/// Decimal form of a 3-byte remote control id.
///
/// ```rust
/// use pumplink::history::decode_remote_id;
///
/// assert_eq!(decode_remote_id([0x01, 0xe2, 0x40]), "123456");
/// ```
pub fn decode_remote_id(id: [u8; 3]) -> String {
    let value = u32::from_be_bytes([0, id[0], id[1], id[2]]);
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::DecodedDate;

    fn view<'a>(head: &'a [u8], date: &'a [u8]) -> RecordView<'a> {
        RecordView { head, date, body: &[], decoded_date: &DecodedDate::Absent }
    }

    fn float(fields: &Fields, name: &str) -> f64 {
        fields.get(name).and_then(FieldValue::as_f64).unwrap()
    }

    #[test]
    fn remote_ids() {
        assert_eq!(decode_remote_id([0x01, 0xe2, 0x40]), "123456");
        assert_eq!(decode_remote_id([0x03, 0x42, 0x2a]), "213546");
        assert_eq!(decode_remote_id([0x0c, 0x89, 0x92]), "821650");
    }

    #[test]
    fn temp_basal_rate_in_fortieths() {
        let fields = temp_basal(&view(&[0x33, 40], &[]));
        assert_eq!(float(&fields, "rate"), 1.0);
    }

    #[test]
    fn temp_basal_duration_in_half_hours() {
        let fields = temp_basal_duration(&view(&[0x16, 4], &[]));
        assert_eq!(fields["duration_min"], FieldValue::Int(120));
    }

    #[test]
    fn low_reservoir_in_tenths() {
        let fields = low_reservoir(&view(&[0x34, 0xc8], &[]));
        assert_eq!(float(&fields, "amount"), 20.0);
    }

    #[test]
    fn bolus_small_model() {
        let fields = bolus(&view(&[0x01, 0x1f, 0x1f, 0x00], &[]));
        assert_eq!(float(&fields, "programmed"), 3.1);
        assert_eq!(float(&fields, "amount"), 3.1);
        assert_eq!(fields["duration_min"], FieldValue::Int(0));
        assert_eq!(fields["kind"].as_str(), Some("normal"));

        let square = bolus(&view(&[0x01, 0x14, 0x0a, 0x02], &[]));
        assert_eq!(square["duration_min"], FieldValue::Int(60));
        assert_eq!(square["kind"].as_str(), Some("square"));
    }

    #[test]
    fn bolus_larger_model() {
        let head = [0x01, 0x00, 0x7c, 0x00, 0x7c, 0x00, 0x28, 0x00];
        let fields = bolus_larger(&view(&head, &[]));
        assert_eq!(float(&fields, "programmed"), 3.1);
        assert_eq!(float(&fields, "amount"), 3.1);
        assert_eq!(float(&fields, "unabsorbed"), 1.0);
        assert_eq!(fields["kind"].as_str(), Some("normal"));
    }

    #[test]
    fn prime_kinds() {
        let manual = prime(&view(&[0x03, 0x00, 0x00, 0x00, 0x2a], &[]));
        assert_eq!(manual["kind"].as_str(), Some("manual"));
        assert_eq!(float(&manual, "amount"), 4.2);

        let fixed = prime(&view(&[0x03, 0x00, 0x05, 0x00, 0x05], &[]));
        assert_eq!(fixed["kind"].as_str(), Some("fixed"));
        assert_eq!(float(&fixed, "fixed"), 0.5);
    }

    #[test]
    fn calibration_reading_uses_year_high_bit() {
        let fields = cal_bg_for_ph(&view(&[0x0a, 0x0c], &[0x8b, 0xc3, 0x28, 0x0c, 0x8c]));
        assert_eq!(fields["amount"], FieldValue::Int(268));

        let low = cal_bg_for_ph(&view(&[0x0a, 0x64], &[0x8b, 0xc3, 0x28, 0x0c, 0x0c]));
        assert_eq!(low["amount"], FieldValue::Int(100));
    }

    #[test]
    fn short_records_leave_fields_out() {
        assert!(temp_basal(&view(&[0x33], &[])).is_empty());
        assert!(cal_bg_for_ph(&view(&[0x0a, 0x0c], &[0x8b])).is_empty());

        let partial = bolus_larger(&view(&[0x01, 0x00, 0x28], &[]));
        assert_eq!(float(&partial, "programmed"), 1.0);
        assert!(!partial.contains_key("amount"));
    }
}
