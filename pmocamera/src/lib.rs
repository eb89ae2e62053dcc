//! Remote control client for Scalar Web API cameras
//!
//! The camera is found with SSDP, its description gives the JSON-RPC
//! endpoint of the `camera` service, and the camera itself tells which
//! methods it implements (`getMethodTypes`) and which ones it accepts in its
//! current mode (`getAvailableApiList`).
//!
//! # Features
//!
//! - **Discovery**: one M-SEARCH, first responder wins ([`pmossdp`])
//! - **Generic commands**: any declared method through [`Camera::invoke`],
//!   with argument count and types checked against the declared signature
//! - **Preconditions**: commands that need a mode switch (taking a picture
//!   needs `startRecMode`) are made available before being called
//! - **Timelapse**: a timed series of pictures that survives failed frames
//!
//! # Example
//!
//! ```no_run
//! use pmocamera::Camera;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut camera = Camera::new()?;
//!     camera.connect().await?;
//!
//!     let picture = camera.picture().await?;
//!     println!("{:?}", picture.value());
//!
//!     let frames = camera.timelapse(10, Duration::from_secs(5)).await?;
//!     println!("{} frames", frames.len());
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! Timings (settling delay, discovery and HTTP timeouts) and the discovery
//! target live in [`CameraConfig`], loadable from YAML and overridable with
//! `PMOCAMERA__*` environment variables.

pub mod camera;
pub mod config;
pub mod error;
pub mod precondition;
pub mod registry;
pub mod rpc;
pub mod timelapse;
pub mod validator;

pub use camera::{CallOutcome, Camera, CameraBuilder, ConnectionState};
pub use config::CameraConfig;
pub use error::{CameraError, Result};
pub use precondition::{PreconditionMap, Resolver, STANDARD_PRECONDITIONS};
pub use registry::{CapabilityRegistry, MethodDescriptor, TypeTag, available_now};
pub use rpc::{RequestIds, RpcChannel};
pub use validator::validate;

pub use pmossdp::{DeviceDescription, SsdpError};

// Some standard api calls
pub const GET_AVAILABLE_API: &str = "getAvailableApiList";
pub const GET_METHOD_TYPES: &str = "getMethodTypes";
pub const START_REC_MODE: &str = "startRecMode";
pub const STOP_REC_MODE: &str = "stopRecMode";
pub const ACT_TAKE_PICTURE: &str = "actTakePicture";
