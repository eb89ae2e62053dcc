//! # pmossdp - discovery of Scalar Web API cameras
//!
//! This crate covers the network plumbing needed before a camera can be
//! driven:
//!
//! - [`SsdpClient`]: sends an M-SEARCH and waits for the first answer
//! - [`SearchResponse`]: the parsed advertisement (only `LOCATION` is required)
//! - [`DeviceDescription`]: the device description.xml reduced to the device
//!   identity and its `X_ScalarWebAPI_Service` list
//! - [`discover_and_describe`]: the whole chain, from M-SEARCH to the
//!   `camera` control endpoint
//!
//! ## SSDP constants
//!
//! - **Multicast Address**: 239.255.255.250:1900
//! - **Search target**: `urn:schemas-sony-com:service:ScalarWebAPI:1`
//! - **MX**: 1 second
//!
//! ## Example
//!
//! ```no_run
//! use pmossdp::{SearchOptions, discover_and_describe};
//!
//! # async fn example() -> pmossdp::Result<()> {
//! let http = reqwest::Client::new();
//! let found = discover_and_describe(&SearchOptions::default(), &http).await?;
//! println!("camera endpoint: {}", found.endpoint);
//! # Ok(())
//! # }
//! ```

mod client;
mod description;
mod error;

pub use client::{SearchOptions, SearchResponse, SsdpClient, build_msearch, parse_search_response};
pub use description::{
    CAMERA_SERVICE, DeviceDescription, ScalarService, fetch_description, xml_tree,
};
pub use error::{Result, SsdpError};

use tracing::info;

/// Adresse multicast SSDP
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250";

/// Port SSDP
pub const SSDP_PORT: u16 = 1900;

/// Search target advertised by Scalar Web API devices
pub const SCALAR_WEB_API_ST: &str = "urn:schemas-sony-com:service:ScalarWebAPI:1";

/// Outcome of a full discovery: the advertisement, the parsed description
/// and the control endpoint of the `camera` service.
#[derive(Debug, Clone)]
pub struct Discovered {
    pub advertisement: SearchResponse,
    pub description: DeviceDescription,
    pub endpoint: String,
}

/// Discover a camera and resolve its `camera` control endpoint.
///
/// One M-SEARCH is sent, the first responder wins, its description is
/// fetched once. Nothing is retried: a timeout is terminal for this attempt.
pub async fn discover_and_describe(
    options: &SearchOptions,
    http: &reqwest::Client,
) -> Result<Discovered> {
    let advertisement = SsdpClient::search_first(options).await?;
    let (description, endpoint) = describe(&advertisement.location, http).await?;

    Ok(Discovered {
        advertisement,
        description,
        endpoint,
    })
}

/// Fetch the description at `location` and extract the `camera` endpoint.
pub async fn describe(
    location: &str,
    http: &reqwest::Client,
) -> Result<(DeviceDescription, String)> {
    let description = fetch_description(http, location).await?;
    let endpoint = description.camera_endpoint()?;

    info!(
        "✅ {} exposes camera service at {}",
        description.display_name(),
        endpoint
    );

    Ok((description, endpoint))
}
