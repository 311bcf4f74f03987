use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::analytics::FaceOffset;
use crate::config::ActuatorConfig;

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("actuator returned status {0}")]
    Status(StatusCode),
}

/// Pan/tilt correction, each axis within `[-max_delta, max_delta]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MoveCommand {
    pub dx: f64,
    pub dy: f64,
}

impl MoveCommand {
    /// Clamp both axes, then flip x: the pan servo turns opposite to the
    /// camera's image x axis.
    pub fn from_offset(offset: &FaceOffset, max_delta: f64) -> Self {
        let dx = -offset.dx.clamp(-max_delta, max_delta);
        let dy = offset.dy.clamp(-max_delta, max_delta);
        Self {
            // avoid sending "-0.0" for a centered face
            dx: if dx == 0.0 { 0.0 } else { dx },
            dy,
        }
    }
}

/// Best-effort HTTP client for the servo controller.
pub struct ActuatorClient {
    client: reqwest::Client,
    move_url: String,
    max_delta: f64,
}

impl ActuatorClient {
    pub fn new(config: &ActuatorConfig) -> Result<Self, ActuatorError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            move_url: config.move_url.clone(),
            max_delta: config.max_delta,
        })
    }

    /// Clamp `offset` and POST it as a form. Failures are logged and
    /// returned; callers are expected to carry on.
    pub async fn send_move(&self, offset: &FaceOffset) -> Result<MoveCommand, ActuatorError> {
        let command = MoveCommand::from_offset(offset, self.max_delta);

        match self.post(&command).await {
            Ok(body) => {
                tracing::debug!(
                    dx = format!("{:.2}", command.dx),
                    dy = format!("{:.2}", command.dy),
                    response = %body.trim(),
                    "move command sent"
                );
                Ok(command)
            }
            Err(e) => {
                tracing::warn!(
                    url = %self.move_url,
                    dx = format!("{:.2}", command.dx),
                    dy = format!("{:.2}", command.dy),
                    error = %e,
                    "move command failed"
                );
                Err(e)
            }
        }
    }

    async fn post(&self, command: &MoveCommand) -> Result<String, ActuatorError> {
        let response = self
            .client
            .post(&self.move_url)
            .form(command)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ActuatorError::Status(status));
        }

        // A 200 means the move was accepted; the body is only logged.
        match response.text().await {
            Ok(body) => Ok(body),
            Err(e) => {
                tracing::debug!(error = %e, "failed to read move response body");
                Ok(String::new())
            }
        }
    }
}
