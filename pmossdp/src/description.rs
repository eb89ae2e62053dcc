//! Device description (`description.xml`) of Scalar Web API devices.
//!
//! The XML is first turned into a generic element tree ([`xml_tree`]), then
//! walked by local element name so the `av:` prefix used by the vendor
//! extension does not matter:
//!
//! ```text
//! root
//! └── device
//!     ├── friendlyName / manufacturer / modelName / UDN
//!     └── X_ScalarWebAPI_DeviceInfo
//!         └── X_ScalarWebAPI_ServiceList
//!             └── X_ScalarWebAPI_Service*
//!                 ├── X_ScalarWebAPI_ServiceType     (camera, guide, system, ...)
//!                 └── X_ScalarWebAPI_ActionList_URL
//! ```

use crate::error::{Result, SsdpError};
use tracing::debug;
use xmltree::{Element, XMLNode};

/// Service type of the camera control service
pub const CAMERA_SERVICE: &str = "camera";

/// One `X_ScalarWebAPI_Service` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarService {
    pub service_type: String,
    pub action_list_url: String,
}

impl ScalarService {
    /// Control endpoint of this service: action-list URL + `/<service type>`
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.action_list_url.trim_end_matches('/'),
            self.service_type
        )
    }
}

/// Parsed device description
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceDescription {
    pub udn: Option<String>,
    pub friendly_name: Option<String>,
    pub manufacturer: Option<String>,
    pub model_name: Option<String>,
    pub services: Vec<ScalarService>,
}

impl DeviceDescription {
    /// Parse a description document.
    ///
    /// Fails with [`SsdpError::DescriptorParse`] on malformed XML and with
    /// [`SsdpError::DescriptorShape`] when the device or its service list
    /// is missing.
    pub fn parse(xml: &str) -> Result<Self> {
        let root = xml_tree(xml)?;

        let device = root
            .get_child("device")
            .ok_or_else(|| SsdpError::descriptor_shape("device element"))?;

        let service_list = device
            .get_child("X_ScalarWebAPI_DeviceInfo")
            .and_then(|info| info.get_child("X_ScalarWebAPI_ServiceList"))
            .ok_or_else(|| SsdpError::descriptor_shape("X_ScalarWebAPI_ServiceList"))?;

        let services = child_elements(service_list)
            .filter(|e| e.name == "X_ScalarWebAPI_Service")
            .filter_map(|service| {
                let service_type = child_text(service, "X_ScalarWebAPI_ServiceType")?;
                let action_list_url = child_text(service, "X_ScalarWebAPI_ActionList_URL")?;
                Some(ScalarService {
                    service_type,
                    action_list_url,
                })
            })
            .collect::<Vec<_>>();

        let description = Self {
            udn: child_text(device, "UDN"),
            friendly_name: child_text(device, "friendlyName"),
            manufacturer: child_text(device, "manufacturer"),
            model_name: child_text(device, "modelName"),
            services,
        };

        debug!(
            "Parsed description of {}: services={:?}",
            description.display_name(),
            description
                .services
                .iter()
                .map(|s| s.service_type.as_str())
                .collect::<Vec<_>>()
        );

        Ok(description)
    }

    /// Find a service by its type tag
    pub fn service(&self, service_type: &str) -> Option<&ScalarService> {
        self.services
            .iter()
            .find(|s| s.service_type == service_type)
    }

    /// Control endpoint of the `camera` service
    pub fn camera_endpoint(&self) -> Result<String> {
        self.service(CAMERA_SERVICE)
            .map(ScalarService::endpoint)
            .ok_or_else(|| SsdpError::descriptor_shape("service of type 'camera'"))
    }

    /// Friendly name, model name or a placeholder
    pub fn display_name(&self) -> &str {
        self.friendly_name
            .as_deref()
            .or(self.model_name.as_deref())
            .unwrap_or("unnamed device")
    }
}

/// Convert an XML document to a generic element tree
pub fn xml_tree(text: &str) -> Result<Element> {
    Ok(Element::parse(text.as_bytes())?)
}

/// GET the description at `location` and parse it
pub async fn fetch_description(
    http: &reqwest::Client,
    location: &str,
) -> Result<DeviceDescription> {
    debug!("Fetching device description at {}", location);

    let response = http
        .get(location)
        .send()
        .await
        .map_err(|e| SsdpError::descriptor_fetch(location, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SsdpError::descriptor_fetch(
            location,
            format!("HTTP status {}", status),
        ));
    }

    let body = response
        .text()
        .await
        .map_err(|e| SsdpError::descriptor_fetch(location, e))?;

    DeviceDescription::parse(&body)
}

fn child_elements(element: &Element) -> impl Iterator<Item = &Element> {
    element.children.iter().filter_map(XMLNode::as_element)
}

fn child_text(element: &Element, name: &str) -> Option<String> {
    element
        .get_child(name)
        .and_then(|child| child.get_text())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
