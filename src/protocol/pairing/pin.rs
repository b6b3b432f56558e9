//! PIN sources for pair-setup

use std::io::{BufRead, Write};

use async_trait::async_trait;

use crate::error::AirPlayError;

/// Supplies the PIN the device displays during pair-setup
#[async_trait]
pub trait PinProvider: Send + Sync {
    /// Obtain a PIN
    ///
    /// # Errors
    ///
    /// Returns [`AirPlayError::PinUnavailable`] if no PIN can be produced.
    async fn pin(&self) -> Result<String, AirPlayError>;
}

/// A fixed PIN, for tests and unattended setups
#[derive(Debug, Clone)]
pub struct StaticPin(String);

impl StaticPin {
    /// Wrap a PIN string
    pub fn new(pin: impl Into<String>) -> Self {
        Self(pin.into())
    }
}

#[async_trait]
impl PinProvider for StaticPin {
    async fn pin(&self) -> Result<String, AirPlayError> {
        Ok(self.0.clone())
    }
}

/// Prompts on stderr and reads one line from stdin
#[derive(Debug, Clone)]
pub struct StdinPin {
    prompt: String,
}

impl StdinPin {
    /// Use a custom prompt
    pub fn with_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

impl Default for StdinPin {
    fn default() -> Self {
        Self::with_prompt("pin: ")
    }
}

#[async_trait]
impl PinProvider for StdinPin {
    async fn pin(&self) -> Result<String, AirPlayError> {
        let prompt = self.prompt.clone();
        let line = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
            let mut stderr = std::io::stderr();
            stderr.write_all(prompt.as_bytes())?;
            stderr.flush()?;

            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await
        .map_err(|e| AirPlayError::PinUnavailable {
            message: format!("prompt task failed: {e}"),
        })?
        .map_err(|e| AirPlayError::PinUnavailable {
            message: e.to_string(),
        })?;

        let pin = line.trim();
        if pin.is_empty() {
            return Err(AirPlayError::PinUnavailable {
                message: "no PIN entered".to_string(),
            });
        }
        Ok(pin.to_string())
    }
}
