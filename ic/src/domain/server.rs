//! Simulated backend server nodes

use serde::{Deserialize, Serialize};

/// Whether a node fronts the pool or serves requests behind it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServerRole {
    Balancer,
    Backend,
}

/// A simulated server with a bounded load counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerNode {
    pub id: String,
    pub port: u16,
    pub role: ServerRole,
    pub load: u32,
    #[serde(rename = "max-load")]
    pub max_load: u32,
    pub connected: bool,
}

impl ServerNode {
    pub fn new(id: impl Into<String>, port: u16, role: ServerRole, load: u32, max_load: u32) -> Self {
        Self {
            id: id.into(),
            port,
            role,
            load: load.min(max_load),
            max_load,
            connected: true,
        }
    }

    /// Apply a signed delta, clamped to `[0, max_load]`; returns the change actually applied
    pub fn nudge(&mut self, delta: i64) -> i64 {
        let before = i64::from(self.load);
        let next = (before + delta).clamp(0, i64::from(self.max_load));
        self.load = next as u32;
        next - before
    }

    /// Load as a fraction of capacity
    pub fn utilization(&self) -> f64 {
        if self.max_load == 0 {
            return 0.0;
        }
        f64::from(self.load) / f64::from(self.max_load)
    }
}

/// Default pool: a balancer in front of a primary backend and its clone
pub fn default_servers() -> Vec<ServerNode> {
    vec![
        ServerNode::new("load-balancer", 9000, ServerRole::Balancer, 0, 100),
        ServerNode::new("primary", 8000, ServerRole::Backend, 5, 10),
        ServerNode::new("clone", 8001, ServerRole::Backend, 3, 10),
    ]
}
