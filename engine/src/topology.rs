use common::{NetworkNode, NodeKind, NodeStatus};

const SEED_NODES: [(&str, &str, NodeKind, NodeStatus, &[&str]); 6] = [
    ("user1", "John Doe", NodeKind::User, NodeStatus::Secure, &["app1"]),
    ("user2", "Jane Smith", NodeKind::User, NodeStatus::Secure, &["db1"]),
    ("user3", "Bob Wilson", NodeKind::User, NodeStatus::Unknown, &["server1"]),
    ("app1", "CRM Application", NodeKind::Application, NodeStatus::Secure, &["db1"]),
    ("server1", "File Server", NodeKind::Server, NodeStatus::Secure, &["db1"]),
    ("db1", "Customer Database", NodeKind::Database, NodeStatus::Secure, &[]),
];

pub const ACCESS_LEVEL: &str = "Restricted";

/// Fixed network map. Built once and never changed afterwards.
#[derive(Debug, Clone)]
pub struct Topology {
    nodes: Vec<NetworkNode>,
}

impl Topology {
    pub fn seed() -> Self {
        let nodes = SEED_NODES
            .iter()
            .map(|(id, name, kind, status, connections)| NetworkNode {
                id: id.to_string(),
                name: name.to_string(),
                kind: *kind,
                status: *status,
                connections: connections.iter().map(|c| c.to_string()).collect(),
            })
            .collect();
        Self { nodes }
    }

    pub fn nodes(&self) -> &[NetworkNode] {
        &self.nodes
    }

    pub fn get(&self, id: &str) -> Option<&NetworkNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::seed()
    }
}

/// Details shown for the selected node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDetails {
    pub name: String,
    pub kind: NodeKind,
    pub status: NodeStatus,
    pub connection_count: usize,
    pub access_level: &'static str,
}

impl From<&NetworkNode> for NodeDetails {
    fn from(node: &NetworkNode) -> Self {
        NodeDetails {
            name: node.name.clone(),
            kind: node.kind,
            status: node.status,
            connection_count: node.connections.len(),
            access_level: ACCESS_LEVEL,
        }
    }
}
