//! Static cluster configuration.
//!
//! The cluster is a fixed set of six nodes, each with an opaque id, a client
//! HTTP address, and a data directory. The router fans out over this table;
//! a node only ever consumes its own row.

use std::net::SocketAddr;
use std::path::PathBuf;

/// One node's place in the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// Opaque node id (`n1`..`n6`).
    pub id: String,

    /// Client-facing HTTP address. Port-only (`:8090`) binds all interfaces.
    pub client_addr: String,

    /// Data directory holding the node's journal.
    pub data_dir: PathBuf,
}

impl NodeConfig {
    fn new(id: &str, client_addr: &str, data_dir: &str) -> Self {
        Self {
            id: id.to_string(),
            client_addr: client_addr.to_string(),
            data_dir: PathBuf::from(data_dir),
        }
    }
}

/// The static six-node cluster table.
pub fn cluster_config() -> Vec<NodeConfig> {
    vec![
        NodeConfig::new("n1", ":8090", "./data1"),
        NodeConfig::new("n2", ":8091", "./data2"),
        NodeConfig::new("n3", ":8092", "./data3"),
        NodeConfig::new("n4", ":8093", "./data4"),
        NodeConfig::new("n5", ":8094", "./data5"),
        NodeConfig::new("n6", ":8095", "./data6"),
    ]
}

/// Looks up one node's config by id.
pub fn config_for_id(id: &str) -> Option<NodeConfig> {
    cluster_config().into_iter().find(|c| c.id == id)
}

/// Resolves a listen address string into a bindable socket address.
///
/// A port-only address (`:8090`) binds all interfaces.
pub fn listen_addr(addr: &str) -> Result<SocketAddr, std::net::AddrParseError> {
    if let Some(port) = addr.strip_prefix(':') {
        format!("0.0.0.0:{port}").parse()
    } else {
        addr.parse()
    }
}
