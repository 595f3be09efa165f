//! Opt-in tracing setup for applications driving a pump.

use tracing_subscriber::filter::EnvFilter;

use crate::{PumpError, Result};

/// Environment variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "PUMPLINK_LOG";

/// Build the filter from `PUMPLINK_LOG`, then `RUST_LOG`, then `default_directive`.
///
/// An invalid `PUMPLINK_LOG` directive is a configuration error rather than a
/// silent fallback. An invalid `RUST_LOG` falls through to the default.
pub fn env_filter(default_directive: &str) -> Result<EnvFilter> {
    match std::env::var(LOG_ENV) {
        Ok(directive) => parse_directive(&directive),
        Err(_) => match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => parse_directive(default_directive),
        },
    }
}

fn parse_directive(directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directive)
        .map_err(|e| PumpError::config_error(format!("invalid log directive {:?}: {}", directive, e)))
}

/// Install a `fmt` subscriber for the process.
///
/// Returns `Ok(false)` when a global subscriber was already installed.
pub fn init_tracing(default_directive: &str) -> Result<bool> {
    let filter = env_filter(default_directive)?;
    let installed = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init().is_ok();
    if installed {
        tracing::debug!("Tracing initialised");
    }
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives() {
        assert!(parse_directive("info").is_ok());
        assert!(parse_directive("pumplink::session=debug,warn").is_ok());
        assert!(matches!(parse_directive("pumplink=verbose"), Err(PumpError::Config { .. })));
    }

    #[test]
    fn second_init_is_a_noop() {
        let _ = tracing_subscriber::fmt::try_init();
        if std::env::var(LOG_ENV).is_err() {
            assert!(!init_tracing("info").unwrap());
        }
    }
}
