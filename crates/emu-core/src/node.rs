//! Discrete logic/sound node notification.

/// Opaque identifier of an input node in a discrete logic/sound network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// Sink for edge-triggered node updates.
///
/// A device reports each bit transition once, with the new level (0 or 1).
/// Bits that did not change are never reported.
pub trait NodeSink {
    /// Drive `node` to `level`.
    fn node_write(&mut self, node: NodeId, level: u8);
}
