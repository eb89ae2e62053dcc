//! Precondition resolution
//!
//! Some commands are only accepted in a given camera mode: `actTakePicture`
//! needs the camera in recording mode, which `startRecMode` switches on.
//! The camera does not say which call enables which, so the mapping is a
//! static table.
//!
//! Resolution of a call:
//!
//! 1. ask `getAvailableApiList`; if the method is there, call it
//! 2. otherwise look its precondition up, failing if there is none
//! 3. resolve the precondition (recursively, without parameters), wait the
//!    settling delay, then check availability once more and call the method
//!    if it showed up
//!
//! The recursion is capped so that a cyclic table cannot loop forever.

use crate::error::{CameraError, Result};
use crate::registry::available_now;
use crate::rpc::RpcChannel;
use crate::{ACT_TAKE_PICTURE, START_REC_MODE};
use async_recursion::async_recursion;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Known preconditions: (method, call that makes it available)
pub const STANDARD_PRECONDITIONS: &[(&str, &str)] = &[(ACT_TAKE_PICTURE, START_REC_MODE)];

/// Method name -> prerequisite method name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreconditionMap(HashMap<String, String>);

impl PreconditionMap {
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Add or replace an entry
    pub fn with(mut self, method: impl Into<String>, precondition: impl Into<String>) -> Self {
        self.0.insert(method.into(), precondition.into());
        self
    }

    pub fn get(&self, method: &str) -> Option<&str> {
        self.0.get(method).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for PreconditionMap {
    fn default() -> Self {
        STANDARD_PRECONDITIONS
            .iter()
            .fold(Self::empty(), |map, (method, precondition)| {
                map.with(*method, *precondition)
            })
    }
}

/// Runs calls through the availability check
pub struct Resolver<'a> {
    channel: &'a RpcChannel,
    preconditions: &'a PreconditionMap,
    settling_delay: Duration,
    max_depth: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(
        channel: &'a RpcChannel,
        preconditions: &'a PreconditionMap,
        settling_delay: Duration,
        max_depth: usize,
    ) -> Self {
        Self {
            channel,
            preconditions,
            settling_delay,
            max_depth,
        }
    }

    /// Make `method` available if needed, then call it.
    pub async fn ensure_available_then_call(
        &self,
        method: &str,
        params: &[Value],
    ) -> Result<Value> {
        self.resolve(method, params, 0).await
    }

    #[async_recursion]
    async fn resolve(&self, method: &str, params: &[Value], depth: usize) -> Result<Value> {
        if depth > self.max_depth {
            return Err(CameraError::unresolvable(
                method,
                format!("precondition chain is deeper than {}", self.max_depth),
            ));
        }

        if available_now(self.channel).await?.contains(method) {
            return self.channel.call(method, params).await;
        }

        let Some(precondition) = self.preconditions.get(method) else {
            return Err(CameraError::unresolvable(
                method,
                "the calls required to make it available are not known",
            ));
        };

        info!("'{}' is not available, calling '{}' first", method, precondition);
        self.resolve(precondition, &[], depth + 1).await?;

        if !self.settling_delay.is_zero() {
            debug!("Waiting {:?} for the camera to settle", self.settling_delay);
            tokio::time::sleep(self.settling_delay).await;
        }

        if available_now(self.channel).await?.contains(method) {
            self.channel.call(method, params).await
        } else {
            Err(CameraError::StillUnavailable {
                method: method.to_string(),
                precondition: precondition.to_string(),
            })
        }
    }
}
