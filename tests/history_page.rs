//! Walks whole history pages the way a downloaded page arrives.

use pumplink::history::{DecodedDate, FieldValue, describe, is_known, lookup, parse_page};

const DATE: [u8; 5] = [0x6f, 0xd7, 0x08, 0x01, 0x06];

fn record(head: &[u8], date: &[u8], body: &[u8]) -> Vec<u8> {
    [head, date, body].concat()
}

fn float(value: Option<&FieldValue>) -> Option<f64> {
    value.and_then(FieldValue::as_f64)
}

#[test]
fn smaller_model_page() -> anyhow::Result<()> {
    let mut data = Vec::new();
    data.extend(record(&[0x01, 0x1f, 0x1f, 0x00], &DATE, &[]));
    data.extend(record(&[0x33, 0x28], &DATE, &[0x00]));
    data.extend(record(&[0x16, 0x04], &DATE, &[]));
    data.extend(record(&[0x0a, 0x0c], &[0x8b, 0xc3, 0x28, 0x0c, 0x8c], &[]));
    data.extend(record(&[0x34, 0xc8], &[0xeb, 0x02, 0x0b, 0x07, 0x0c], &[]));
    data.extend([0xee, 0x42]);
    data.extend(record(&[0x5c, 0x05, 0x10, 0x20, 0x30], &[], &[]));
    data.extend(record(&[0x21, 0x00], &DATE, &[]));

    let page = parse_page(&data, false);
    let names: Vec<_> = page.records.iter().map(|r| r.name()).collect();
    assert_eq!(
        names,
        [
            "Bolus",
            "TempBasal",
            "TempBasalDuration",
            "CalBGForPH",
            "LowReservoir",
            "Unknown",
            "UnabsorbedInsulin",
            "Rewind",
        ]
    );
    assert!(page.remainder.is_empty());
    assert_eq!(page.records.iter().map(|r| r.len()).sum::<usize>(), data.len());

    let bolus = &page.records[0];
    assert_eq!(float(bolus.field("amount")), Some(3.1));
    assert_eq!(bolus.field("kind").and_then(FieldValue::as_str), Some("normal"));
    assert_eq!(bolus.date().to_string(), "2006-07-01T08:23:47");

    assert_eq!(float(page.records[1].field("rate")), Some(1.0));
    assert_eq!(page.records[2].field("duration_min").and_then(FieldValue::as_i64), Some(120));
    assert_eq!(page.records[3].field("amount").and_then(FieldValue::as_i64), Some(268));
    assert_eq!(
        page.records[4].to_string(),
        "LowReservoir 2012-12-07T11:02:43 head[2], body[0] op[0x34]"
    );

    let unknown = &page.records[5];
    assert!(!unknown.is_known());
    assert_eq!(unknown.raw(), vec![0xee, 0x42]);
    assert_eq!(*unknown.date(), DecodedDate::Absent);

    assert_eq!(page.records[6].head().len(), 5);
    assert_eq!(page.undated().count(), 2);

    let yaml = serde_yaml_ng::to_string(&page.records[4])?;
    assert!(yaml.contains("LowReservoir"));
    Ok(())
}

#[test]
fn larger_model_page() {
    let mut data = Vec::new();
    data.extend(record(&[0x01, 0x00, 0x7c, 0x00, 0x7c, 0x00, 0x28, 0x00], &DATE, &[]));
    data.extend(record(&[0x07, 0x00, 0x00, 0x00, 0x00], &[0xc6, 0x0c], &[0x00, 0x00, 0x00]));
    data.extend(record(&[0x34, 0x32], &DATE, &[]));

    let page = parse_page(&data, true);
    assert_eq!(page.len(), 3);
    assert!(page.remainder.is_empty());

    let bolus = &page.records[0];
    assert_eq!(bolus.head().len(), 8);
    assert_eq!(float(bolus.field("programmed")), Some(3.1));
    assert_eq!(float(bolus.field("unabsorbed")), Some(1.0));

    let totals = &page.records[1];
    assert_eq!(totals.name(), "ResultTotals");
    assert_eq!(totals.body().len(), 3);
    assert_eq!(totals.date().to_string(), "2012-12-07T00:00:00");

    assert_eq!(float(page.records[2].field("amount")), Some(5.0));
}

#[test]
fn same_bytes_frame_differently_per_model() {
    let mut data = record(&[0x01, 0x00, 0x7c, 0x00, 0x7c, 0x00, 0x28, 0x00], &DATE, &[]);
    data.extend(record(&[0x34, 0x32], &DATE, &[]));

    let larger = parse_page(&data, true);
    let smaller = parse_page(&data, false);

    assert_eq!(larger.len(), 2);
    assert_eq!(smaller.records[0].head().len(), 4);
    assert_ne!(larger.records, smaller.records);
}

#[test]
fn page_cut_inside_a_record_keeps_the_tail() {
    let mut data = record(&[0x34, 0xc8], &[0xeb, 0x02, 0x0b, 0x07, 0x0c], &[]);
    data.extend([0x08, 0x00, 0x6f, 0xd7]);

    let page = parse_page(&data, false);
    assert_eq!(page.len(), 1);
    assert_eq!(page.remainder, vec![0x08, 0x00, 0x6f, 0xd7]);
}

#[test]
fn bad_dates_do_not_stop_the_walk() {
    let mut data = record(&[0x33, 0x28], &[0x00; 5], &[0x00]);
    data.extend(record(&[0x34, 0xc8], &[0xeb, 0x02, 0x0b, 0x07, 0x0c], &[]));

    let page = parse_page(&data, false);
    assert_eq!(page.len(), 2);
    assert!(matches!(page.records[0].date(), DecodedDate::NotADate(_)));
    assert_eq!(float(page.records[0].field("rate")), Some(1.0));
    assert!(page.records[1].date().is_valid());
}

#[test]
fn registry_listing() {
    assert!(is_known(0x34));
    assert!(!is_known(0xee));
    assert_eq!(lookup(0x01, true).to_string(), "op[0x01] Bolus head[8] date[5] body[0]");

    let lines = describe();
    assert!(lines.iter().any(|l| l == "op[0x5b] BolusWizard head[2] date[5] body[15] (larger)"));
    assert!(lines.iter().any(|l| l.starts_with("op[0x5c] UnabsorbedInsulin")));
}
