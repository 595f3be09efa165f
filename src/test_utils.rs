//! Scripted transport and history fixtures for tests and benches.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::{BTreeMap, VecDeque};

use crate::TransportError;
use crate::session::Command;
use crate::transport::{StatsReport, Transport};

/// LowReservoir, 20.0 units, 2012-12-07T11:02:43.
pub const LOW_RESERVOIR: [u8; 7] = [0x34, 0xc8, 0xeb, 0x02, 0x0b, 0x07, 0x0c];

/// CalBGForPH reading 268 (high bit carried in the year byte).
pub const CAL_BG_FOR_PH: [u8; 7] = [0x0a, 0x0c, 0x8b, 0xc3, 0x28, 0x0c, 0x8c];

/// Smaller-model normal bolus, 3.1 units programmed and delivered.
pub const BOLUS: [u8; 9] = [0x01, 0x1f, 0x1f, 0x00, 0x6f, 0xd7, 0x08, 0x01, 0x06];

/// TempBasal at 1.0 U/h followed by its 120 minute duration.
pub const TEMP_BASAL_PAIR: [u8; 15] = [
    0x33, 0x28, 0x6f, 0xd7, 0x08, 0x01, 0x06, 0x00, //
    0x16, 0x04, 0x6f, 0xd7, 0x08, 0x01, 0x06,
];

/// A page mixing known records, one unknown opcode and a cut-off tail.
///
/// Walks to six records (one of them unknown) with two bytes left over.
pub fn sample_page() -> Vec<u8> {
    let mut page = Vec::new();
    page.extend_from_slice(&BOLUS);
    page.extend_from_slice(&TEMP_BASAL_PAIR);
    page.extend_from_slice(&[0xee, 0x00]);
    page.extend_from_slice(&LOW_RESERVOIR);
    page.extend_from_slice(&CAL_BG_FOR_PH);
    page.extend_from_slice(&LOW_RESERVOIR[..2]);
    page
}

/// `ReadPumpModel` response: length byte, model digits, zero padding to 64 bytes.
pub fn model_response(model: &str) -> Vec<u8> {
    let mut data = Vec::with_capacity(64);
    data.push(model.len() as u8);
    data.extend_from_slice(model.as_bytes());
    data.resize(64, 0);
    data
}

/// A transport that replays scripted outcomes.
///
/// Unscripted transmits succeed, unscripted downloads fail with an ack error
/// and unscripted signal polls repeat the last scripted strength.
#[derive(Debug, Default)]
pub struct MockTransport {
    transmits: VecDeque<Result<(), TransportError>>,
    downloads: VecDeque<Result<Vec<u8>, TransportError>>,
    signals: VecDeque<i32>,
    last_signal: i32,
    transmitted: Vec<Command>,
    download_calls: u32,
    signal_polls: u32,
    stats_calls: Vec<&'static str>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transmit_result(mut self, result: Result<(), TransportError>) -> Self {
        self.transmits.push_back(result);
        self
    }

    /// Script `count` consecutive transmit comm failures.
    pub fn failing_transmits(mut self, count: usize) -> Self {
        for n in 1..=count {
            self.transmits.push_back(Err(TransportError::comm(format!("no response {}", n))));
        }
        self
    }

    pub fn download_result(mut self, result: Result<Vec<u8>, TransportError>) -> Self {
        self.downloads.push_back(result);
        self
    }

    pub fn download_ok(self, data: Vec<u8>) -> Self {
        self.download_result(Ok(data))
    }

    pub fn download_nak(self, reason: &str) -> Self {
        self.download_result(Err(TransportError::ack(reason)))
    }

    pub fn signals(mut self, strengths: impl IntoIterator<Item = i32>) -> Self {
        self.signals.extend(strengths);
        self
    }

    /// Commands passed to `transmit_packet`, in order.
    pub fn transmitted(&self) -> &[Command] {
        &self.transmitted
    }

    pub fn transmit_count(&self) -> usize {
        self.transmitted.len()
    }

    pub fn download_calls(&self) -> u32 {
        self.download_calls
    }

    pub fn signal_polls(&self) -> u32 {
        self.signal_polls
    }

    /// Names of the stats reports requested so far.
    pub fn stats_calls(&self) -> &[&'static str] {
        &self.stats_calls
    }

    fn report(&mut self, name: &'static str) -> StatsReport {
        self.stats_calls.push(name);
        BTreeMap::from([("source".to_string(), name.to_string())])
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn transmit_packet(&mut self, command: &Command) -> Result<(), TransportError> {
        self.transmitted.push(command.clone());
        self.transmits.pop_front().unwrap_or(Ok(()))
    }

    async fn download(&mut self) -> Result<Vec<u8>, TransportError> {
        self.download_calls += 1;
        self.downloads
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::ack("no scripted response")))
    }

    async fn signal_strength(&mut self) -> Result<i32, TransportError> {
        self.signal_polls += 1;
        if let Some(signal) = self.signals.pop_front() {
            self.last_signal = signal;
        }
        Ok(self.last_signal)
    }

    async fn product_info(&mut self) -> Result<StatsReport, TransportError> {
        Ok(self.report("product_info"))
    }

    async fn usb_stats(&mut self) -> Result<StatsReport, TransportError> {
        Ok(self.report("usb_stats"))
    }

    async fn radio_stats(&mut self) -> Result<StatsReport, TransportError> {
        Ok(self.report("radio_stats"))
    }

    async fn interface_stats(&mut self) -> Result<StatsReport, TransportError> {
        Ok(self.report("interface_stats"))
    }
}
