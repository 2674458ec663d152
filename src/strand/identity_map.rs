//! Two-way mapping between socket ids and bridge light ids

use super::SocketId;
use hue::LightId;
use std::collections::{BTreeMap, HashMap, HashSet};

/// What a [`IdentityMap::set`] call displaced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Displaced {
    /// Light the socket pointed at before, if it was a different light
    pub previous_light: Option<LightId>,
    /// Socket the light was mapped to before, if it was a different socket
    pub evicted_socket: Option<SocketId>,
}

impl Displaced {
    pub fn is_empty(&self) -> bool {
        self.previous_light.is_none() && self.evicted_socket.is_none()
    }
}

/// Bijective socket ⇄ light store for one strand
///
/// Every socket maps to at most one light and every light to at most one
/// socket. Assigning a light that is already mapped moves it: the old socket
/// becomes unmapped.
///
/// Not synchronized; owners guard it themselves.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    lights: BTreeMap<SocketId, LightId>,
    sockets: HashMap<LightId, SocketId>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `socket` to `light`, replacing whatever either side pointed at
    pub fn set(&mut self, socket: SocketId, light: LightId) -> Displaced {
        let mut displaced = Displaced::default();

        if let Some(old_socket) = self.sockets.get(&light).copied() {
            if old_socket == socket {
                return displaced;
            }
            self.lights.remove(&old_socket);
            displaced.evicted_socket = Some(old_socket);
        }

        if let Some(old_light) = self.lights.insert(socket, light.clone()) {
            self.sockets.remove(&old_light);
            displaced.previous_light = Some(old_light);
        }
        self.sockets.insert(light, socket);

        displaced
    }

    pub fn get(&self, socket: SocketId) -> Option<&LightId> {
        self.lights.get(&socket)
    }

    /// Reverse lookup
    pub fn socket_of(&self, light: &LightId) -> Option<SocketId> {
        self.sockets.get(light).copied()
    }

    /// All mapped light ids
    pub fn values(&self) -> HashSet<LightId> {
        self.sockets.keys().cloned().collect()
    }

    pub fn contains_light(&self, light: &LightId) -> bool {
        self.sockets.contains_key(light)
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Pairs in ascending socket order
    pub fn iter(&self) -> impl Iterator<Item = (SocketId, &LightId)> {
        self.lights.iter().map(|(socket, light)| (*socket, light))
    }
}
