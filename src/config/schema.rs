use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

use crate::error::{AppError, Result};
use crate::video::{EncodedFormat, Resolution};

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Listener settings
    pub server: ServerConfig,
    /// Startup camera
    pub camera: CameraConfig,
    /// Outbound stream settings
    pub stream: StreamConfig,
}

impl AppConfig {
    /// Check every section
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.camera.validate()?;
        self.stream.validate()
    }
}

/// Network listener configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address shared by both listeners
    pub host: String,
    /// Frame streaming port (0 picks a free port)
    pub send_port: u16,
    /// Camera control port (0 picks a free port)
    pub recv_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            send_port: 1024,
            recv_port: 1025,
        }
    }
}

impl ServerConfig {
    fn ip(&self) -> Result<IpAddr> {
        self.host
            .parse()
            .map_err(|_| AppError::Config(format!("invalid host address '{}'", self.host)))
    }

    /// Address of the frame streaming listener
    pub fn send_addr(&self) -> Result<SocketAddr> {
        Ok(SocketAddr::new(self.ip()?, self.send_port))
    }

    /// Address of the camera control listener
    pub fn recv_addr(&self) -> Result<SocketAddr> {
        Ok(SocketAddr::new(self.ip()?, self.recv_port))
    }

    fn validate(&self) -> Result<()> {
        self.ip()?;
        if self.send_port != 0 && self.send_port == self.recv_port {
            return Err(AppError::Config(format!(
                "send_port and recv_port must differ (both {})",
                self.send_port
            )));
        }
        Ok(())
    }
}

/// Startup camera configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Default render width
    pub width: u32,
    /// Default render height
    pub height: u32,
    /// Largest width a control client may request
    pub max_width: u32,
    /// Largest height a control client may request
    pub max_height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            max_width: 3840,
            max_height: 2160,
        }
    }
}

impl CameraConfig {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn max_resolution(&self) -> Resolution {
        Resolution::new(self.max_width, self.max_height)
    }

    fn validate(&self) -> Result<()> {
        if !self.resolution().is_valid() {
            return Err(AppError::Config(format!(
                "invalid default resolution {}",
                self.resolution()
            )));
        }
        if !self.max_resolution().is_valid() {
            return Err(AppError::Config(format!(
                "invalid resolution limit {}",
                self.max_resolution()
            )));
        }
        if !self.resolution().fits_within(self.max_resolution()) {
            return Err(AppError::Config(format!(
                "default resolution {} exceeds limit {}",
                self.resolution(),
                self.max_resolution()
            )));
        }
        Ok(())
    }
}

/// Stream output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Payload encoding
    pub encoding: EncodedFormat,
    /// JPEG quality (0-100)
    pub jpeg_quality: u32,
    /// Only send each generation once per connection
    pub skip_duplicate_frames: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            encoding: EncodedFormat::Jpeg,
            jpeg_quality: 75,
            skip_duplicate_frames: false,
        }
    }
}

impl StreamConfig {
    fn validate(&self) -> Result<()> {
        if self.jpeg_quality > 100 {
            return Err(AppError::Config(format!(
                "jpeg_quality must be 0-100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}
