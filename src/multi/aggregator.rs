//! Multi-bridge aggregator implementation

use super::aggregate::{Aggregate, FailureKind, MemberFailure};
use crate::strand::{LightStrand, SocketId};
use crate::{Result, StrandError};
use futures::future::BoxFuture;
use hue::{Controller, LastScan, Light, LightAttributes, LightId, LightState, NewLights};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default time a single bridge may take to answer (10 seconds)
pub const DEFAULT_MEMBER_TIMEOUT: Duration = Duration::from_secs(10);

/// Aggregator configuration
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Per-bridge time limit; `None` waits forever
    pub member_timeout: Option<Duration>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            member_timeout: Some(DEFAULT_MEMBER_TIMEOUT),
        }
    }
}

impl AggregatorConfig {
    /// Wait for every bridge no matter how long it takes
    pub fn unbounded() -> Self {
        Self {
            member_timeout: None,
        }
    }

    pub fn with_member_timeout(mut self, timeout: Duration) -> Self {
        self.member_timeout = Some(timeout);
        self
    }
}

/// A bridge registered with the aggregator
pub struct Member {
    name: String,
    controller: Arc<dyn Controller>,
    sockets: Option<u32>,
}

impl Member {
    /// A bridge whose light ids are passed through unchanged
    ///
    /// Pass-through members show up in fan-out calls but cannot be addressed
    /// by socket.
    pub fn passthrough(name: impl Into<String>, controller: Arc<dyn Controller>) -> Self {
        Self {
            name: name.into(),
            controller,
            sockets: None,
        }
    }

    /// A strand whose sockets join the aggregator's socket space
    pub fn strand(name: impl Into<String>, strand: Arc<LightStrand>) -> Self {
        let sockets = strand.length();
        Self {
            name: name.into(),
            controller: strand,
            sockets: Some(sockets),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of sockets, or `None` for a pass-through member
    pub fn sockets(&self) -> Option<u32> {
        self.sockets
    }
}

struct Registered {
    member: Member,
    /// Global socket id = offset + strand-local socket id
    offset: u32,
}

impl Registered {
    fn owns(&self, global: u32) -> bool {
        match self.member.sockets {
            Some(length) => global > self.offset && global - self.offset <= length,
            None => false,
        }
    }

    /// Rewrite strand-local socket ids as global socket ids
    fn to_global(&self, lights: Vec<Light>) -> std::result::Result<Vec<Light>, FailureKind> {
        let Some(length) = self.member.sockets else {
            return Ok(lights);
        };

        lights
            .into_iter()
            .map(|light| {
                let local = light
                    .id
                    .as_str()
                    .parse::<u32>()
                    .ok()
                    .filter(|n| (1..=length).contains(n))
                    .ok_or_else(|| {
                        FailureKind::Controller(hue::Error::InvalidResponse(format!(
                            "light id '{}' is not a socket of a {}-socket strand",
                            light.id, length
                        )))
                    })?;
                let global = self.offset.checked_add(local).ok_or_else(|| {
                    FailureKind::Controller(hue::Error::InvalidResponse(format!(
                        "socket {} is beyond the global socket range",
                        local
                    )))
                })?;
                Ok(Light {
                    id: LightId::new(global.to_string()),
                    ..light
                })
            })
            .collect()
    }

    fn failure(&self, index: usize, kind: FailureKind) -> MemberFailure {
        tracing::warn!(member = %self.member.name, error = %kind, "Bridge call failed");
        MemberFailure {
            index,
            member: self.member.name.clone(),
            kind,
        }
    }
}

/// Several bridges presented as one
///
/// Fan-out calls run one task per bridge and merge the replies in
/// registration order. Strand members are given consecutive blocks of
/// global socket ids in registration order: with strands of 5 and 3 sockets,
/// sockets 1-5 belong to the first and 6-8 to the second.
pub struct MultiController {
    members: Vec<Registered>,
    config: AggregatorConfig,
}

impl MultiController {
    pub fn new(members: Vec<Member>, config: AggregatorConfig) -> Self {
        let mut next_offset: u32 = 0;
        let members: Vec<Registered> = members
            .into_iter()
            .map(|member| {
                let offset = next_offset;
                if let Some(length) = member.sockets {
                    next_offset = next_offset.checked_add(length).unwrap_or_else(|| {
                        tracing::warn!(
                            member = %member.name,
                            "Strand sockets exceed the global socket range"
                        );
                        u32::MAX
                    });
                }
                Registered { member, offset }
            })
            .collect();

        tracing::info!(
            members = members.len(),
            sockets = next_offset,
            "Created multi-bridge aggregator"
        );

        Self { members, config }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Registered bridge names in registration order
    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|r| r.member.name()).collect()
    }

    /// Global socket ids owned by a strand member
    ///
    /// `None` for pass-through members and for a strand that does not fit
    /// below `u32::MAX`.
    pub fn socket_range(&self, name: &str) -> Option<std::ops::RangeInclusive<u32>> {
        let registered = self.members.iter().find(|r| r.member.name == name)?;
        let length = registered.member.sockets?;
        let first = registered.offset.checked_add(1)?;
        let last = registered.offset.checked_add(length)?;
        Some(first..=last)
    }

    /// Total number of addressable sockets
    pub fn total_sockets(&self) -> u32 {
        self.members
            .iter()
            .filter_map(|r| r.member.sockets)
            .fold(0, u32::saturating_add)
    }

    /// Run `call` against every bridge concurrently, replies in registration order
    async fn fan_out<T, F>(
        &self,
        operation: &'static str,
        call: F,
    ) -> Vec<std::result::Result<T, FailureKind>>
    where
        T: Send + 'static,
        F: Fn(Arc<dyn Controller>) -> BoxFuture<'static, hue::Result<T>>,
    {
        tracing::debug!(operation, members = self.members.len(), "Fanning out");

        let handles: Vec<_> = self
            .members
            .iter()
            .map(|registered| {
                let request = call(Arc::clone(&registered.member.controller));
                let limit = self.config.member_timeout;
                tokio::spawn(async move {
                    match limit {
                        Some(limit) => match tokio::time::timeout(limit, request).await {
                            Ok(reply) => reply.map_err(FailureKind::Controller),
                            Err(_) => Err(FailureKind::TimedOut(limit)),
                        },
                        None => request.await.map_err(FailureKind::Controller),
                    }
                })
            })
            .collect();

        let mut replies = Vec::with_capacity(handles.len());
        for handle in handles {
            replies.push(match handle.await {
                Ok(reply) => reply,
                Err(e) => Err(FailureKind::Panicked(e.to_string())),
            });
        }
        replies
    }

    /// All lights of all bridges
    ///
    /// Strand lights carry global socket ids; pass-through lights keep their
    /// bridge ids.
    pub async fn get_lights(&self) -> Aggregate<Vec<Light>> {
        let replies = self
            .fan_out("get_lights", |c| Box::pin(async move { c.get_lights().await }))
            .await;

        let mut lights = Vec::new();
        let mut failures = Vec::new();
        for (index, (registered, reply)) in self.members.iter().zip(replies).enumerate() {
            match reply.and_then(|l| registered.to_global(l)) {
                Ok(member_lights) => lights.extend(member_lights),
                Err(kind) => failures.push(registered.failure(index, kind)),
            }
        }

        tracing::debug!(
            lights = lights.len(),
            failed = failures.len(),
            "Merged lights"
        );
        Aggregate {
            value: lights,
            failures,
        }
    }

    /// New lights of all bridges
    ///
    /// `last_scan` is `Active` if any bridge is still searching, otherwise
    /// the most recent scan time reported by a successful bridge, otherwise
    /// `Never`.
    ///
    /// A strand member only reports new lights that already have a socket.
    /// Freshly discovered lights have none until they are mapped, so a strand
    /// usually contributes just its scan time. Query the strand's own bridge
    /// to see them.
    pub async fn get_new_lights(&self) -> Aggregate<NewLights> {
        let replies = self
            .fan_out("get_new_lights", |c| {
                Box::pin(async move { c.get_new_lights().await })
            })
            .await;

        let mut lights = Vec::new();
        let mut last_scan = LastScan::Never;
        let mut failures = Vec::new();
        for (index, (registered, reply)) in self.members.iter().zip(replies).enumerate() {
            let translated = reply.and_then(|new_lights| {
                Ok((registered.to_global(new_lights.lights)?, new_lights.last_scan))
            });
            match translated {
                Ok((member_lights, member_scan)) => {
                    if !member_lights.is_empty() {
                        lights.extend(member_lights);
                    }
                    last_scan = latest_scan(last_scan, member_scan);
                }
                Err(kind) => failures.push(registered.failure(index, kind)),
            }
        }

        Aggregate {
            value: NewLights { lights, last_scan },
            failures,
        }
    }

    /// Start a light search on every bridge
    pub async fn search_for_new_lights(&self) -> Aggregate<()> {
        let replies = self
            .fan_out("search_for_new_lights", |c| {
                Box::pin(async move { c.search_for_new_lights().await })
            })
            .await;

        let failures = self
            .members
            .iter()
            .zip(replies)
            .enumerate()
            .filter_map(|(index, (registered, reply))| {
                reply.err().map(|kind| registered.failure(index, kind))
            })
            .collect();

        Aggregate {
            value: (),
            failures,
        }
    }

    pub async fn get_light_attributes(&self, socket_id: &str) -> Result<LightAttributes> {
        let (registered, local) = self.route(socket_id)?;
        let local = local.to_string();
        self.call_routed(
            registered,
            registered.member.controller.get_light_attributes(&local),
        )
        .await
    }

    pub async fn set_light_name(&self, socket_id: &str, name: &str) -> Result<()> {
        let (registered, local) = self.route(socket_id)?;
        let local = local.to_string();
        self.call_routed(
            registered,
            registered.member.controller.set_light_name(&local, name),
        )
        .await
    }

    pub async fn set_light_state(&self, socket_id: &str, state: &LightState) -> Result<()> {
        let (registered, local) = self.route(socket_id)?;
        let local = local.to_string();
        self.call_routed(
            registered,
            registered.member.controller.set_light_state(&local, state),
        )
        .await
    }

    /// Find the strand owning a global socket id and the strand-local id
    fn route(&self, socket_id: &str) -> Result<(&Registered, SocketId)> {
        let unknown = || StrandError::UnknownSocket(socket_id.to_string());
        let global: u32 = socket_id.parse().map_err(|_| unknown())?;

        let registered = self
            .members
            .iter()
            .find(|r| r.owns(global))
            .ok_or_else(unknown)?;
        let local = SocketId::new(global - registered.offset).ok_or_else(unknown)?;

        tracing::debug!(
            socket = global,
            member = %registered.member.name,
            local = %local,
            "Routed socket"
        );
        Ok((registered, local))
    }

    async fn call_routed<T>(
        &self,
        registered: &Registered,
        call: impl Future<Output = hue::Result<T>>,
    ) -> Result<T> {
        match self.config.member_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(reply) => Ok(reply?),
                Err(_) => Err(StrandError::TimedOut {
                    member: registered.member.name.clone(),
                    seconds: limit.as_secs_f64(),
                }),
            },
            None => Ok(call.await?),
        }
    }
}

/// Combine two scan times: an active scan wins, then the later timestamp
fn latest_scan(current: LastScan, next: LastScan) -> LastScan {
    match (current, next) {
        (LastScan::Active, _) | (_, LastScan::Active) => LastScan::Active,
        (LastScan::At(a), LastScan::At(b)) => LastScan::At(a.max(b)),
        (LastScan::At(at), LastScan::Never) | (LastScan::Never, LastScan::At(at)) => {
            LastScan::At(at)
        }
        (LastScan::Never, LastScan::Never) => LastScan::Never,
    }
}
