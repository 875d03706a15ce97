use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Streaming protocol a camera speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "RTSP")]
    Rtsp,
    #[serde(rename = "WebRTC")]
    WebRtc,
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rtsp => write!(f, "RTSP"),
            Self::WebRtc => write!(f, "WebRTC"),
        }
    }
}

/// Reachability decided once by the registration-time probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraStatus {
    Online,
    Offline,
}

/// Registered camera record.
///
/// Field names serialize in camelCase so the persisted JSON matches the
/// layout existing installs already have on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    pub id: String,
    pub name: String,
    pub ip: String,
    /// Numeric string, 1-65535
    pub port: String,
    pub username: String,
    pub password: String,
    pub protocol: Protocol,
    pub status: CameraStatus,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub last_seen: String,
    pub created_at: String,
}

impl Camera {
    /// Build a record from validated form input and the registration-time
    /// probe outcome. The id is the creation timestamp in milliseconds.
    pub fn from_form(form: CameraForm, reachable: bool) -> Self {
        let now = Utc::now();
        Self {
            id: now.timestamp_millis().to_string(),
            name: form.name,
            ip: form.ip,
            port: form.port,
            username: form.username,
            password: form.password,
            protocol: form.protocol,
            status: if reachable {
                CameraStatus::Online
            } else {
                CameraStatus::Offline
            },
            location: form.location,
            last_seen: if reachable { "Just now" } else { "Never" }.to_string(),
            created_at: now.to_rfc3339(),
        }
    }

    /// Merge the set fields of `patch` into this record.
    pub fn apply_patch(&mut self, patch: CameraPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(ip) = patch.ip {
            self.ip = ip;
        }
        if let Some(port) = patch.port {
            self.port = port;
        }
        if let Some(username) = patch.username {
            self.username = username;
        }
        if let Some(password) = patch.password {
            self.password = password;
        }
        if let Some(protocol) = patch.protocol {
            self.protocol = protocol;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(last_seen) = patch.last_seen {
            self.last_seen = last_seen;
        }
    }
}

/// Field-by-field update to an existing camera
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraPatch {
    pub name: Option<String>,
    pub ip: Option<String>,
    pub port: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub protocol: Option<Protocol>,
    pub status: Option<CameraStatus>,
    pub location: Option<String>,
    pub last_seen: Option<String>,
}

/// Raw add-camera form input, validated before a record is created
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraForm {
    pub name: String,
    pub ip: String,
    pub port: String,
    pub username: String,
    pub password: String,
    pub protocol: Protocol,
    pub location: String,
}

/// Validation failure, one per offending form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl CameraForm {
    /// Check every field; callers surface the messages next to the inputs.
    pub fn validate(&self) -> std::result::Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(FieldError {
                field: "name",
                message: "Camera name is required",
            });
        }

        if self.ip.trim().is_empty() {
            errors.push(FieldError {
                field: "ip",
                message: "IP address is required",
            });
        } else if !is_dotted_quad(&self.ip) {
            errors.push(FieldError {
                field: "ip",
                message: "Invalid IP address format",
            });
        }

        if self.port.trim().is_empty() {
            errors.push(FieldError {
                field: "port",
                message: "Port is required",
            });
        } else {
            match self.port.parse::<u32>() {
                Ok(port) if (1..=65535).contains(&port) => {}
                _ => errors.push(FieldError {
                    field: "port",
                    message: "Port must be between 1 and 65535",
                }),
            }
        }

        if self.location.trim().is_empty() {
            errors.push(FieldError {
                field: "location",
                message: "Location is required",
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn is_dotted_quad(ip: &str) -> bool {
    let octets: Vec<&str> = ip.split('.').collect();
    octets.len() == 4 && octets.iter().all(|o| o.parse::<u8>().is_ok() && !o.is_empty())
}

/// Captured still image from a camera's stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: String,
    /// Weak reference; a snapshot may outlive its camera
    pub camera_id: String,
    pub camera_name: String,
    pub location: String,
    /// Human-readable capture time
    pub timestamp: String,
    /// ISO-8601, used for grouping and sorting
    pub date: String,
    /// Path of the image file owned by the snapshot registry
    pub image_uri: String,
}
