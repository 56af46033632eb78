//! ServerPool implementation

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::aggregator::AggregatorHandle;
use crate::chance::Chance;
use crate::domain::ServerNode;
use crate::error::{ControlError, ControlResult};
use crate::events::{EventBus, IntersectionEvent};

use super::config::PoolConfig;

/// Log component for pool and background activity
pub const SYSTEM: &str = "System";

/// Shared pool of simulated servers
pub struct ServerPool {
    config: PoolConfig,
    nodes: RwLock<Vec<ServerNode>>,
    aggregator: AggregatorHandle,
    events: Arc<EventBus>,
}

impl ServerPool {
    pub fn new(config: PoolConfig, aggregator: AggregatorHandle, events: Arc<EventBus>) -> Self {
        debug!(servers = config.servers.len(), "ServerPool::new: called");
        let nodes = RwLock::new(config.servers.clone());
        Self {
            config,
            nodes,
            aggregator,
            events,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<ServerNode>> {
        self.nodes.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<ServerNode>> {
        self.nodes.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply `f` to the node named `id` and return its updated copy
    fn update<F>(&self, id: &str, f: F) -> ControlResult<ServerNode>
    where
        F: FnOnce(&mut ServerNode),
    {
        let mut nodes = self.write();
        let node = nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| ControlError::unknown_server(id))?;
        f(node);
        Ok(node.clone())
    }

    /// Snapshot of every node
    pub fn servers(&self) -> Vec<ServerNode> {
        self.read().clone()
    }

    pub fn get(&self, id: &str) -> ControlResult<ServerNode> {
        self.read()
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or_else(|| ControlError::unknown_server(id))
    }

    /// Uniformly random connected node
    pub fn select_server(&self, chance: &dyn Chance) -> ControlResult<ServerNode> {
        let nodes = self.read();
        let eligible: Vec<&ServerNode> = nodes.iter().filter(|n| n.connected).collect();
        if eligible.is_empty() {
            debug!("ServerPool::select_server: no connected server");
            return Err(ControlError::NoEligibleServer);
        }
        let node = eligible[chance.pick(eligible.len())].clone();
        debug!(server = %node.id, load = node.load, "ServerPool::select_server: selected");
        Ok(node)
    }

    pub async fn disconnect(&self, id: &str) -> ControlResult<ServerNode> {
        debug!(%id, "ServerPool::disconnect: called");
        let node = self.update(id, |n| n.connected = false)?;
        self.aggregator
            .warning(SYSTEM, format!("Disconnected from {id}"))
            .await;
        self.events.emit(IntersectionEvent::ServerChanged { server: node.clone() });
        Ok(node)
    }

    /// Reconnect after the configured settle delay
    pub async fn reconnect(&self, id: &str) -> ControlResult<ServerNode> {
        debug!(%id, "ServerPool::reconnect: called");
        self.get(id)?;
        self.aggregator
            .info(SYSTEM, format!("Attempting to reconnect to {id}..."))
            .await;

        tokio::time::sleep(self.config.reconnect_settle()).await;

        let node = self.update(id, |n| n.connected = true)?;
        info!(server = %id, "Server reconnected");
        self.aggregator
            .info(SYSTEM, format!("Successfully reconnected to {id}"))
            .await;
        self.events.emit(IntersectionEvent::ServerChanged { server: node.clone() });
        Ok(node)
    }

    /// Randomly nudge every connected node's load; returns whether anything drifted
    pub fn drift(&self, chance: &dyn Chance) -> bool {
        if !chance.hit(self.config.drift_probability) {
            return false;
        }
        let mut nodes = self.write();
        for node in nodes
            .iter_mut()
            .filter(|n| n.connected)
        {
            node.nudge(chance.delta(self.config.drift_delta));
        }
        debug!("ServerPool::drift: loads adjusted");
        true
    }

    /// Count an in-flight request against a node's load
    ///
    /// Returns false when the node was already at capacity and its load did
    /// not move; such a request must not be released with [`Self::end_request`].
    pub fn begin_request(&self, id: &str) -> ControlResult<bool> {
        let mut applied = 0;
        self.update(id, |n| applied = n.nudge(1))?;
        Ok(applied > 0)
    }

    /// Release an in-flight request from a node's load
    pub fn end_request(&self, id: &str) -> ControlResult<ServerNode> {
        self.update(id, |n| {
            n.nudge(-1);
        })
    }
}
