//! Command sessions with a pump.
//!
//! A [`Session`] drives one command at a time through a bounded cycle:
//!
//! ```text
//! Idle -> Transmitting -> TransmitOk -> Settling -> Downloading -> Complete
//!              |                                        |
//!              +-> TransmitRetry (retries)              +-> DownloadRetry (download_attempts)
//!              +-> Failed                               +-> Failed
//! ```
//!
//! Transmit failures are retried up to the command's retry count; running out
//! leaves the command without data and is reported in the [`ExecutionReport`],
//! not as an error. Download acknowledgment failures are retried up to
//! [`SessionConfig::download_attempts`]; running out is an error carrying every
//! cause. Nothing retries forever and nothing reconnects the transport.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use pumplink::session::Pump;
//! use pumplink::transport::Transport;
//!
//! async fn latest_page<T: Transport>(transport: T) -> pumplink::Result<()> {
//!     let mut pump = Pump::new(transport, "208850");
//!     pump.session_mut().init().await?;
//!     let model = pump.read_model().await?;
//!     let page = pump.read_history_page(0).await?;
//!     println!("{} has {} records on page 0", model, page.len());
//!     pump.session_mut().end().await
//! }
//! ```

mod command;
mod state;

pub use command::{
    Command, CommandType, ReadHistoryData, ReadPumpModel, is_larger_model, parse_model,
};
pub use state::{ExecutionReport, SessionState};

use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::{PumpConfig, SessionConfig};
use crate::history::{HistoryPage, parse_page};
use crate::transport::{StatsReport, Transport};
use crate::{PumpError, Result, TransportError};

/// A single command channel to one pump.
///
/// Owns its transport for its whole life. Every operation takes `&mut self`,
/// so two commands can never be in flight on the same link.
pub struct Session<T: Transport> {
    transport: T,
    config: SessionConfig,
    state: SessionState,
    states: Vec<SessionState>,
    transmit_attempts: u32,
    download_attempts: u32,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        Self::build(transport, SessionConfig::default())
    }

    /// Session with a custom retry policy.
    ///
    /// # Errors
    ///
    /// [`PumpError::Config`] when the configuration fails validation.
    pub fn with_config(transport: T, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(transport, config))
    }

    fn build(transport: T, config: SessionConfig) -> Self {
        Self {
            transport,
            config,
            state: SessionState::Idle,
            states: Vec::new(),
            transmit_attempts: 0,
            download_attempts: 0,
        }
    }

    fn reset_trace(&mut self) {
        self.state = SessionState::Idle;
        self.states = vec![SessionState::Idle];
        self.transmit_attempts = 0;
        self.download_attempts = 0;
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Turn response downloads on or off for later commands.
    pub fn set_download(&mut self, download: bool) {
        self.config.download = download;
    }

    /// State reached by the most recent command.
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    fn enter(&mut self, state: SessionState) {
        debug!("Session state: {} -> {}", self.state, state);
        self.state = state;
        self.states.push(state);
    }

    /// Log the stick's product info and wait for a usable signal.
    ///
    /// Returns the signal strength that passed the threshold.
    pub async fn init(&mut self) -> Result<i32> {
        let product = self.transport.product_info().await?;
        info!(?product, "Stick product info");

        let threshold = self.config.signal_threshold;
        let mut best = i32::MIN;
        for poll in 1..=self.config.signal_poll_limit {
            let signal = self.transport.signal_strength().await?;
            best = best.max(signal);
            if signal >= threshold {
                info!("Found signal strength {} after {} polls", signal, poll);
                return Ok(signal);
            }
            debug!("Signal strength {} below {}", signal, threshold);
            let interval = self.config.signal_poll_interval();
            if !interval.is_zero() {
                tokio::time::sleep(interval).await;
            }
        }

        warn!("Signal strength never reached {} (best {})", threshold, best);
        Err(PumpError::WeakSignal { threshold, best, polls: self.config.signal_poll_limit })
    }

    /// Log USB and radio statistics at the end of a session.
    pub async fn end(&mut self) -> Result<()> {
        let usb = self.transport.usb_stats().await?;
        info!(?usb, "Stick USB stats");
        let radio = self.transport.radio_stats().await?;
        info!(?radio, "Stick radio stats");
        Ok(())
    }

    pub async fn interface_stats(&mut self) -> Result<StatsReport> {
        Ok(self.transport.interface_stats().await?)
    }

    /// Run one command through transmit, settle and download.
    ///
    /// Returns `Ok` with a failed report when every transmit attempt failed; the
    /// command then has no data. Returns `Err` when the download itself ran out
    /// of attempts, so a missing response is never mistaken for an empty one.
    pub async fn execute(&mut self, command: &mut Command) -> Result<ExecutionReport> {
        self.reset_trace();

        let attempts = command.retries().max(1);
        let mut outcome = Ok(());
        for attempt in 1..=attempts {
            info!("Execute {} attempt {}/{}", command.name(), attempt, attempts);
            self.transmit_attempts = attempt;
            self.enter(SessionState::Transmitting { attempt });

            match self.exchange(command).await {
                Ok(()) => {
                    outcome = Ok(());
                    break;
                }
                Err(PumpError::Transport(e)) => {
                    error!("{} attempt {} failed: {}", command.name(), attempt, e);
                    outcome = Err(PumpError::Transport(e));
                    if attempt < attempts {
                        self.enter(SessionState::TransmitRetry { attempt });
                    }
                }
                Err(e) => {
                    if self.state != SessionState::Failed {
                        self.enter(SessionState::Failed);
                    }
                    return Err(e);
                }
            }
        }

        if let Err(e) = outcome {
            error!("{} gave up after {} attempts, last error: {}", command.name(), attempts, e);
            self.enter(SessionState::Failed);
        }

        Ok(ExecutionReport {
            transmit_attempts: self.transmit_attempts,
            download_attempts: self.download_attempts,
            states: self.states.clone(),
        })
    }

    async fn exchange(&mut self, command: &mut Command) -> Result<()> {
        debug!("Transmitting {}", command);
        self.transport.transmit_packet(command).await?;
        self.enter(SessionState::TransmitOk);

        if !self.config.download {
            return Ok(());
        }

        let effect_time = command.effect_time();
        if !effect_time.is_zero() {
            info!("Sleeping {:?} before download", effect_time);
            self.enter(SessionState::Settling);
            tokio::time::sleep(effect_time).await;
        }

        self.fetch(command).await.map(|_| ())
    }

    /// Download the response to a transmitted command.
    ///
    /// A command expecting no response bytes is a no-op returning `Ok(None)`.
    /// Acknowledgment errors are retried with a short backoff; any other
    /// transport error is returned at once.
    ///
    /// # Errors
    ///
    /// [`PumpError::DownloadExhausted`] listing every failed attempt.
    pub async fn download(&mut self, command: &mut Command) -> Result<Option<Vec<u8>>> {
        self.reset_trace();
        self.fetch(command).await
    }

    /// States entered since the last `execute` or `download` began.
    ///
    /// Still readable after `execute` returned an error.
    pub fn trace(&self) -> &[SessionState] {
        &self.states
    }

    async fn fetch(&mut self, command: &mut Command) -> Result<Option<Vec<u8>>> {
        if command.expected_len() == 0 {
            info!("No download required for {}", command.name());
            self.enter(SessionState::Complete);
            return Ok(None);
        }

        let attempts = self.config.download_attempts.max(1);
        let backoff: Duration = self.config.download_backoff();
        let mut causes = Vec::new();

        for attempt in 1..=attempts {
            self.download_attempts = attempt;
            self.enter(SessionState::Downloading { attempt });

            let result = match self.transport.download().await {
                Ok(data) if data.is_empty() => Err(TransportError::ack("empty response")),
                other => other,
            };

            match result {
                Ok(data) => {
                    if data.len() != command.expected_len() {
                        debug!(
                            "{} returned {} bytes, expected {}",
                            command.name(),
                            data.len(),
                            command.expected_len()
                        );
                    }
                    command.set_data(data.clone());
                    self.enter(SessionState::Complete);
                    return Ok(Some(data));
                }
                Err(e) if e.is_ack() => {
                    error!("{} download attempt {} failed: {}", command.name(), attempt, e);
                    causes.push(e);
                    if attempt < attempts {
                        self.enter(SessionState::DownloadRetry { attempt });
                        tokio::time::sleep(backoff).await;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.enter(SessionState::Failed);
        Err(PumpError::download_exhausted(causes))
    }
}

/// A session bound to one pump serial number.
pub struct Pump<T: Transport> {
    session: Session<T>,
    serial: String,
    model: Option<String>,
}

impl<T: Transport> Pump<T> {
    pub fn new(transport: T, serial: impl Into<String>) -> Self {
        let serial = serial.into();
        info!("Setting up to talk with {}", serial);
        Self { session: Session::new(transport), serial, model: None }
    }

    pub fn from_config(transport: T, config: PumpConfig) -> Result<Self> {
        config.validate()?;
        info!("Setting up to talk with {}", config.serial);
        Ok(Self {
            session: Session::with_config(transport, config.session)?,
            serial: config.serial,
            model: None,
        })
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Model number, once [`read_model`](Self::read_model) has succeeded.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<T> {
        &mut self.session
    }

    /// Build a command of type `C` for this pump, execute it, and return it.
    pub async fn query<C: CommandType>(&mut self) -> Result<Command> {
        self.run(Command::new::<C>(self.serial.as_str())).await
    }

    /// Execute a prepared command and return it with any response attached.
    pub async fn run(&mut self, mut command: Command) -> Result<Command> {
        let report = self.session.execute(&mut command).await?;
        if !report.succeeded() {
            warn!(
                "{} failed after {} transmit attempts",
                command.name(),
                report.transmit_attempts
            );
        }
        Ok(command)
    }

    pub async fn read_model(&mut self) -> Result<String> {
        let command = self.query::<ReadPumpModel>().await?;
        let model = parse_model(command.require_data()?)?;
        info!("Pump model: {}", model);
        self.model = Some(model.clone());
        Ok(model)
    }

    /// Whether records from this pump use the larger-model framing.
    pub async fn is_larger(&mut self) -> Result<bool> {
        let model = match &self.model {
            Some(model) => model.clone(),
            None => self.read_model().await?,
        };
        Ok(is_larger_model(&model))
    }

    /// Download and decode one history page.
    pub async fn read_history_page(&mut self, page: u8) -> Result<HistoryPage> {
        let larger = self.is_larger().await?;
        let command = Command::new::<ReadHistoryData>(self.serial.as_str()).with_params(vec![page]);
        let command = self.run(command).await?;
        let data = command.require_data()?;
        info!("Decoding history page {} ({} bytes, larger={})", page, data.len(), larger);
        Ok(parse_page(data, larger))
    }
}
