use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("camera.stream_url is empty")]
    MissingStreamUrl,
    #[error("actuator.move_url is empty")]
    MissingMoveUrl,
    #[error("detector.confidence_threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f32),
    #[error("actuator.max_delta must be positive, got {0}")]
    InvalidMaxDelta(f64),
    #[error("camera connection budget must allow at least one frame and a positive, finite duration")]
    InvalidBudget,
    #[error("camera.reconnect_backoff_secs must be a finite, non-negative number, got {0}")]
    InvalidBackoff(f64),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    pub stream_url: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_max_frames")]
    pub max_frames_per_connection: u32,
    #[serde(default = "default_max_connection_secs")]
    pub max_connection_secs: f64,
    #[serde(default = "default_backoff")]
    pub reconnect_backoff_secs: f64,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_frames() -> u32 {
    10
}

fn default_max_connection_secs() -> f64 {
    3.0
}

fn default_backoff() -> f64 {
    2.0
}

impl CameraConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn max_connection_duration(&self) -> Duration {
        Duration::from_secs_f64(self.max_connection_secs)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_secs_f64(self.reconnect_backoff_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActuatorConfig {
    pub move_url: String,
    #[serde(default = "default_actuator_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_delta")]
    pub max_delta: f64,
}

fn default_actuator_timeout() -> u64 {
    5
}

fn default_max_delta() -> f64 {
    10.0
}

impl ActuatorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_model_path")]
    pub model_path: String,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

fn default_model_path() -> String {
    "models/res10_300x300_ssd.onnx".to_string()
}

fn default_confidence_threshold() -> f32 {
    0.5
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

fn default_http_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub camera: CameraConfig,
    pub actuator: ActuatorConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.stream_url.trim().is_empty() {
            return Err(ConfigError::MissingStreamUrl);
        }
        if self.actuator.move_url.trim().is_empty() {
            return Err(ConfigError::MissingMoveUrl);
        }

        let threshold = self.detector.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        // Written as a negated comparison so NaN is rejected too.
        if !(self.actuator.max_delta > 0.0) {
            return Err(ConfigError::InvalidMaxDelta(self.actuator.max_delta));
        }
        if self.camera.max_frames_per_connection == 0
            || !(self.camera.max_connection_secs > 0.0)
            || Duration::try_from_secs_f64(self.camera.max_connection_secs).is_err()
        {
            return Err(ConfigError::InvalidBudget);
        }
        // Rejects negatives, NaN, infinity and anything too large for a Duration.
        if Duration::try_from_secs_f64(self.camera.reconnect_backoff_secs).is_err() {
            return Err(ConfigError::InvalidBackoff(self.camera.reconnect_backoff_secs));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [camera]
        stream_url = "http://cam.local/stream"

        [actuator]
        move_url = "http://cam.local/move"
    "#;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.camera.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.camera.max_frames_per_connection, 10);
        assert_eq!(config.camera.max_connection_duration(), Duration::from_secs(3));
        assert_eq!(config.camera.reconnect_backoff(), Duration::from_secs(2));
        assert_eq!(config.actuator.timeout(), Duration::from_secs(5));
        assert_eq!(config.actuator.max_delta, 10.0);
        assert_eq!(config.detector.confidence_threshold, 0.5);
        assert_eq!(config.http.port, 8080);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_toml_str(
            r#"
            [camera]
            stream_url = "http://cam.local/stream"
            max_frames_per_connection = 25
            max_connection_secs = 1.5
            reconnect_backoff_secs = 0.5

            [actuator]
            move_url = "http://cam.local/move"
            max_delta = 4.0

            [detector]
            model_path = "https://models.example/face.onnx"
            confidence_threshold = 0.7
            "#,
        )
        .unwrap();

        assert_eq!(config.camera.max_frames_per_connection, 25);
        assert_eq!(
            config.camera.max_connection_duration(),
            Duration::from_millis(1500)
        );
        assert_eq!(config.camera.reconnect_backoff(), Duration::from_millis(500));
        assert_eq!(config.actuator.max_delta, 4.0);
        assert_eq!(config.detector.model_path, "https://models.example/face.onnx");
        assert_eq!(config.detector.confidence_threshold, 0.7);
    }

    #[test]
    fn test_example_config_loads() {
        let config = Config::load_from(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.toml"))
            .unwrap();
        assert_eq!(config.camera.stream_url, "http://192.168.137.7:80/stream");
        assert_eq!(config.actuator.move_url, "http://192.168.137.7:80/move");
    }

    #[test]
    fn test_missing_section_is_parse_error() {
        let err = Config::from_toml_str("[camera]\nstream_url = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let empty_url = MINIMAL.replace("http://cam.local/stream", " ");
        assert!(matches!(
            Config::from_toml_str(&empty_url),
            Err(ConfigError::MissingStreamUrl)
        ));

        let bad_threshold = format!("{MINIMAL}\n[detector]\nconfidence_threshold = 1.5\n");
        assert!(matches!(
            Config::from_toml_str(&bad_threshold),
            Err(ConfigError::InvalidThreshold(_))
        ));

        let bad_delta = MINIMAL.replace(
            "move_url = \"http://cam.local/move\"",
            "move_url = \"http://cam.local/move\"\nmax_delta = 0.0",
        );
        assert!(matches!(
            Config::from_toml_str(&bad_delta),
            Err(ConfigError::InvalidMaxDelta(_))
        ));

        let bad_budget = MINIMAL.replace(
            "stream_url = \"http://cam.local/stream\"",
            "stream_url = \"http://cam.local/stream\"\nmax_frames_per_connection = 0",
        );
        assert!(matches!(
            Config::from_toml_str(&bad_budget),
            Err(ConfigError::InvalidBudget)
        ));
    }

    fn with_camera_key(line: &str) -> String {
        MINIMAL.replace(
            "stream_url = \"http://cam.local/stream\"",
            &format!("stream_url = \"http://cam.local/stream\"\n{line}"),
        )
    }

    #[test]
    fn test_rejects_unrepresentable_connection_duration() {
        for value in ["inf", "nan", "1e30", "-1.0"] {
            let toml = with_camera_key(&format!("max_connection_secs = {value}"));
            assert!(
                matches!(Config::from_toml_str(&toml), Err(ConfigError::InvalidBudget)),
                "max_connection_secs = {value} was accepted"
            );
        }
    }

    #[test]
    fn test_rejects_unrepresentable_backoff() {
        for value in ["inf", "nan", "1e30", "-0.5"] {
            let toml = with_camera_key(&format!("reconnect_backoff_secs = {value}"));
            assert!(
                matches!(Config::from_toml_str(&toml), Err(ConfigError::InvalidBackoff(_))),
                "reconnect_backoff_secs = {value} was accepted"
            );
        }
    }

    #[test]
    fn test_accepts_zero_backoff() {
        let config = Config::from_toml_str(&with_camera_key("reconnect_backoff_secs = 0.0")).unwrap();
        assert_eq!(config.camera.reconnect_backoff(), Duration::ZERO);
    }
}
