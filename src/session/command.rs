//! Commands sent through a session.
//!
//! The full command catalog (bolus, temp basal, clock, settings readers) lives
//! outside this crate. A catalog entry only has to implement [`CommandType`];
//! the session reads nothing beyond what that trait exposes.

use std::fmt;
use std::time::Duration;

use crate::{PumpError, Result};

/// Static description of a pump command.
pub trait CommandType {
    const NAME: &'static str;
    const CODE: u8;
    const RETRIES: u32 = 2;
    const BYTES_PER_RECORD: usize = 64;
    const MAX_RECORDS: usize = 1;
    /// Time the pump needs before the command's effect can be read back.
    const EFFECT_TIME: Duration = Duration::from_millis(500);

    fn params() -> Vec<u8> {
        Vec::new()
    }
}

/// One command invocation bound to a pump serial.
///
/// Built per call, executed once, then read for its response.
#[derive(Clone, PartialEq, Eq)]
pub struct Command {
    device_id: String,
    name: &'static str,
    code: u8,
    params: Vec<u8>,
    retries: u32,
    bytes_per_record: usize,
    max_records: usize,
    effect_time: Duration,
    data: Option<Vec<u8>>,
}

impl Command {
    pub fn new<C: CommandType>(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            name: C::NAME,
            code: C::CODE,
            params: C::params(),
            retries: C::RETRIES,
            bytes_per_record: C::BYTES_PER_RECORD,
            max_records: C::MAX_RECORDS,
            effect_time: C::EFFECT_TIME,
            data: None,
        }
    }

    pub fn with_params(mut self, params: Vec<u8>) -> Self {
        self.params = params;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_effect_time(mut self, effect_time: Duration) -> Self {
        self.effect_time = effect_time;
        self
    }

    pub fn with_response_size(mut self, bytes_per_record: usize, max_records: usize) -> Self {
        self.bytes_per_record = bytes_per_record;
        self.max_records = max_records;
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn code(&self) -> u8 {
        self.code
    }

    pub fn params(&self) -> &[u8] {
        &self.params
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn effect_time(&self) -> Duration {
        self.effect_time
    }

    /// Response bytes the pump is expected to return.
    pub fn expected_len(&self) -> usize {
        self.bytes_per_record * self.max_records
    }

    /// Downloaded response, if the command completed a download.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub(crate) fn set_data(&mut self, data: Vec<u8>) {
        self.data = Some(data);
    }

    /// Response bytes, or a parse error naming this command.
    pub fn require_data(&self) -> Result<&[u8]> {
        self.data().ok_or_else(|| {
            PumpError::parse_error(self.name, "command completed without response data")
        })
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("code", &format_args!("{:#04x}", self.code))
            .field("device_id", &self.device_id)
            .field("params", &self.params)
            .field("retries", &self.retries)
            .field("expected_len", &self.expected_len())
            .field("effect_time", &self.effect_time)
            .field("data_len", &self.data.as_ref().map(Vec::len))
            .finish()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:#04x} for {}", self.name, self.code, self.device_id)
    }
}

/// Read the model number string.
#[derive(Debug)]
pub struct ReadPumpModel;

impl CommandType for ReadPumpModel {
    const NAME: &'static str = "ReadPumpModel";
    const CODE: u8 = 0x8d;
}

/// Read one 1024 byte history page. The page number is the only parameter.
#[derive(Debug)]
pub struct ReadHistoryData;

impl CommandType for ReadHistoryData {
    const NAME: &'static str = "ReadHistoryData";
    const CODE: u8 = 0x80;
    const MAX_RECORDS: usize = 16;
    const EFFECT_TIME: Duration = Duration::from_millis(100);

    fn params() -> Vec<u8> {
        vec![0x00]
    }
}

/// Model string from a `ReadPumpModel` response (length byte, then ASCII).
pub fn parse_model(data: &[u8]) -> Result<String> {
    let (&length, rest) = data
        .split_first()
        .ok_or_else(|| PumpError::parse_error("ReadPumpModel", "empty response"))?;
    let model = rest.get(..usize::from(length)).ok_or_else(|| {
        PumpError::parse_error(
            "ReadPumpModel",
            format!("length byte {} exceeds response of {} bytes", length, rest.len()),
        )
    })?;
    if model.is_empty() || !model.iter().all(u8::is_ascii_alphanumeric) {
        return Err(PumpError::parse_error("ReadPumpModel", format!("not a model number: {:02x?}", model)));
    }
    Ok(String::from_utf8_lossy(model).into_owned())
}

/// Whether a model number belongs to the larger (x23 and up) family.
///
/// ```rust
/// use pumplink::session::is_larger_model;
///
/// assert!(!is_larger_model("522"));
/// assert!(is_larger_model("723"));
/// ```
pub fn is_larger_model(model: &str) -> bool {
    model.get(1..).and_then(|generation| generation.parse::<u32>().ok()).is_some_and(|g| g >= 23)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_from_type() {
        let command = Command::new::<ReadPumpModel>("208850");
        assert_eq!(command.code(), 0x8d);
        assert_eq!(command.retries(), 2);
        assert_eq!(command.expected_len(), 64);
        assert_eq!(command.device_id(), "208850");
        assert_eq!(command.data(), None);
        assert_eq!(command.to_string(), "ReadPumpModel:0x8d for 208850");
    }

    #[test]
    fn history_command_covers_a_page() {
        let command = Command::new::<ReadHistoryData>("208850").with_params(vec![3]);
        assert_eq!(command.expected_len(), 1024);
        assert_eq!(command.params(), &[3]);
    }

    #[test]
    fn builder_overrides() {
        let command = Command::new::<ReadPumpModel>("1")
            .with_retries(5)
            .with_effect_time(Duration::ZERO)
            .with_response_size(0, 0);
        assert_eq!(command.retries(), 5);
        assert_eq!(command.effect_time(), Duration::ZERO);
        assert_eq!(command.expected_len(), 0);
        assert!(command.require_data().is_err());
    }

    #[test]
    fn model_responses() {
        let mut response = vec![3, b'5', b'2', b'2'];
        response.resize(64, 0);
        assert_eq!(parse_model(&response).unwrap(), "522");

        assert!(parse_model(&[]).is_err());
        assert!(parse_model(&[9, b'5', b'2']).is_err());
        assert!(parse_model(&[0]).is_err());
    }

    #[test]
    fn larger_models() {
        assert!(!is_larger_model("522"));
        assert!(!is_larger_model("722"));
        assert!(is_larger_model("523"));
        assert!(is_larger_model("754"));
        assert!(!is_larger_model(""));
        assert!(!is_larger_model("5x2"));
    }
}
