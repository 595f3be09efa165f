//! Transport trait for the radio link to the pump

use std::collections::BTreeMap;

use crate::TransportError;
use crate::session::Command;

/// Named counters or properties reported by the stick.
pub type StatsReport = BTreeMap<String, String>;

/// Capability the session needs from the serial/RF link.
///
/// Opening and closing the port, USB framing and per-call read deadlines all
/// live behind this trait. A session owns exactly one transport and never
/// issues two calls at once; the link is half duplex.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Send one command packet to the pump.
    async fn transmit_packet(&mut self, command: &Command) -> Result<(), TransportError>;

    /// Download the response to the last transmitted command.
    ///
    /// A negative or missing acknowledgment is [`TransportError::Ack`].
    async fn download(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Current radio signal strength as reported by the stick.
    async fn signal_strength(&mut self) -> Result<i32, TransportError>;

    async fn product_info(&mut self) -> Result<StatsReport, TransportError>;

    async fn usb_stats(&mut self) -> Result<StatsReport, TransportError>;

    async fn radio_stats(&mut self) -> Result<StatsReport, TransportError>;

    async fn interface_stats(&mut self) -> Result<StatsReport, TransportError>;
}
