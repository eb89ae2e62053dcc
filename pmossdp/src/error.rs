//! Error types for SSDP discovery and device description

use std::net::SocketAddr;
use std::time::Duration;

/// Result type alias for discovery operations
pub type Result<T> = std::result::Result<T, SsdpError>;

/// Errors raised while locating a camera and reading its description
#[derive(Debug, thiserror::Error)]
pub enum SsdpError {
    /// Socket creation, send or receive failed
    #[error("SSDP socket error: {0}")]
    Io(#[from] std::io::Error),

    /// Nobody answered the M-SEARCH in time
    #[error("No SSDP advertisement received within {0:?}")]
    NoAdvertisement(Duration),

    /// The first answer did not carry a LOCATION line
    #[error("SSDP advertisement from {from} has no LOCATION header")]
    MissingLocation { from: SocketAddr },

    /// The description could not be retrieved
    #[error("Failed to fetch device description at {location}: {message}")]
    DescriptorFetch { location: String, message: String },

    /// The description body is not well-formed XML
    #[error("Device description is not valid XML: {0}")]
    DescriptorParse(#[from] xmltree::ParseError),

    /// Well-formed XML without the expected elements
    #[error("Device description has no {0}")]
    DescriptorShape(String),
}

impl SsdpError {
    pub fn descriptor_fetch(location: &str, message: impl ToString) -> Self {
        Self::DescriptorFetch {
            location: location.to_string(),
            message: message.to_string(),
        }
    }

    pub fn descriptor_shape(what: impl Into<String>) -> Self {
        Self::DescriptorShape(what.into())
    }

    /// No usable advertisement (socket failure, timeout, garbled answer)
    pub fn is_discovery(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::NoAdvertisement(_) | Self::MissingLocation { .. }
        )
    }

    /// Description unreachable or malformed
    pub fn is_descriptor(&self) -> bool {
        matches!(
            self,
            Self::DescriptorFetch { .. } | Self::DescriptorParse(_) | Self::DescriptorShape(_)
        )
    }
}
