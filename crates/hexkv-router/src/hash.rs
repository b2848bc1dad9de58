//! Key placement: FNV-1a over the key bytes, modulo the node count.

use hexkv_server::NodeConfig;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a.
///
/// Hand-rolled because the placement function is pinned to exactly this
/// algorithm; changing it would re-home every key in the cluster.
pub fn fnv1a_32(data: &[u8]) -> u32 {
    data.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Picks the node that owns a key.
///
/// # Panics
///
/// Panics if `nodes` is empty; the caller validates the cluster table at
/// startup.
pub fn pick_node<'a>(key: &[u8], nodes: &'a [NodeConfig]) -> &'a NodeConfig {
    let idx = fnv1a_32(key) as usize % nodes.len();
    &nodes[idx]
}
