//! Latch configuration and bind-time resolution.

use std::array;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use emu_core::{DeviceRegistry, NodeId, NodeSink, Scheduler};

use crate::{DevSource, FnSource, Latch8};

/// Free read handler: returns the byte the configured bit samples from.
pub type ReadHandler = fn() -> u8;

/// Reference to another device's output, before resolution.
#[derive(Debug, Clone)]
struct DevRead {
    device: String,
    from_bit: u8,
}

/// Wiring description for a [`Latch8`].
///
/// Describes how each of the eight bits behaves: which bits mirror other
/// devices or read handlers, which bits drive discrete nodes, which output
/// bits are forced low or inverted, and which bits settle immediately on
/// write. Supplied once, validated and resolved by [`bind`](Self::bind),
/// never mutated afterwards.
pub struct Latch8Config {
    tag: String,
    node_map: [Option<NodeId>; 8],
    devread: [Option<DevRead>; 8],
    handlers: [Option<FnSource>; 8],
    maskout: u8,
    xorvalue: u8,
    nosync: u8,
}

impl Latch8Config {
    /// Start a configuration for the latch tagged `tag`.
    ///
    /// Defaults: no node map, no read sources, nothing masked or inverted,
    /// and every write deferred to the next resynchronization point
    /// (`nosync = 0x00`).
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            node_map: [None; 8],
            devread: array::from_fn(|_| None),
            handlers: [None; 8],
            maskout: 0,
            xorvalue: 0,
            nosync: 0,
        }
    }

    /// Output bits forced to zero on read, regardless of source.
    #[must_use]
    pub fn maskout(mut self, mask: u8) -> Self {
        self.maskout = mask;
        self
    }

    /// Output bits inverted on read, after masking.
    #[must_use]
    pub fn xorvalue(mut self, mask: u8) -> Self {
        self.xorvalue = mask;
        self
    }

    /// Bits whose writes settle within the issuing bus cycle. Writes to the
    /// remaining bits defer to the next resynchronization point.
    #[must_use]
    pub fn nosync(mut self, mask: u8) -> Self {
        self.nosync = mask;
        self
    }

    /// Drive `node` from output bit `bit` on every transition of that bit.
    #[must_use]
    pub fn node(mut self, bit: u8, node: NodeId) -> Self {
        assert!(bit < 8);
        self.node_map[bit as usize] = Some(node);
        self
    }

    /// Bit `bit` reads as bit `from_bit` of the device registered as
    /// `device`. The name is resolved once, at bind time.
    #[must_use]
    pub fn devread(mut self, bit: u8, device: &str, from_bit: u8) -> Self {
        assert!(bit < 8);
        assert!(from_bit < 8);
        self.devread[bit as usize] = Some(DevRead {
            device: device.to_string(),
            from_bit,
        });
        self
    }

    /// Bit `bit` reads as bit `from_bit` of the byte returned by `handler`.
    #[must_use]
    pub fn read_handler(mut self, bit: u8, handler: ReadHandler, from_bit: u8) -> Self {
        assert!(bit < 8);
        assert!(from_bit < 8);
        self.handlers[bit as usize] = Some(FnSource { handler, from_bit });
        self
    }

    /// Validate the configuration and resolve device references.
    ///
    /// Fails if a bit carries both a device source and a read handler, if a
    /// device reference does not resolve, or if a node map is configured
    /// without a sink to notify. All failures are wiring mistakes in the
    /// machine description: they abort machine construction and are never
    /// retried.
    pub fn bind(
        self,
        registry: &DeviceRegistry,
        scheduler: Rc<RefCell<dyn Scheduler>>,
        sink: Option<Rc<RefCell<dyn NodeSink>>>,
    ) -> Result<Latch8, Latch8Error> {
        let mut devices: [Option<DevSource>; 8] = array::from_fn(|_| None);
        let mut has_node_map = false;
        let mut has_devread = false;
        let mut has_read = false;

        for bit in 0..8 {
            if self.devread[bit].is_some() && self.handlers[bit].is_some() {
                return Err(Latch8Error::SourceConflict {
                    tag: self.tag,
                    bit: bit as u8,
                });
            }
            if let Some(devread) = &self.devread[bit] {
                let Some(source) = registry.resolve(&devread.device) else {
                    return Err(Latch8Error::UnresolvedDevice {
                        tag: self.tag,
                        bit: bit as u8,
                        device: devread.device.clone(),
                    });
                };
                devices[bit] = Some(DevSource {
                    source,
                    from_bit: devread.from_bit,
                });
                has_devread = true;
            }
            if self.handlers[bit].is_some() {
                has_read = true;
            }
            if self.node_map[bit].is_some() {
                has_node_map = true;
            }
        }

        if has_node_map && sink.is_none() {
            return Err(Latch8Error::MissingNodeSink { tag: self.tag });
        }

        Ok(Latch8 {
            tag: self.tag,
            value: 0,
            node_map: self.node_map,
            devread: devices,
            handlers: self.handlers,
            maskout: self.maskout,
            xorvalue: self.xorvalue,
            nosync: self.nosync,
            has_node_map,
            has_devread,
            has_read,
            scheduler,
            sink,
        })
    }
}

/// A wiring mistake caught while binding a [`Latch8Config`].
#[derive(Debug)]
pub enum Latch8Error {
    /// A bit carries both a device source and a read handler.
    SourceConflict { tag: String, bit: u8 },
    /// A device reference did not resolve in the registry.
    UnresolvedDevice {
        tag: String,
        bit: u8,
        device: String,
    },
    /// A node map is configured but no node sink was bound.
    MissingNodeSink { tag: String },
}

impl fmt::Display for Latch8Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceConflict { tag, bit } => {
                write!(f, "{tag}: bit {bit} already has a read source")
            }
            Self::UnresolvedDevice { tag, bit, device } => {
                write!(f, "{tag}: bit {bit} reads unknown device \"{device}\"")
            }
            Self::MissingNodeSink { tag } => {
                write!(f, "{tag}: node map configured but no node sink bound")
            }
        }
    }
}

impl std::error::Error for Latch8Error {}

#[cfg(test)]
mod tests {
    use emu_core::{ByteSource, EventQueue, NodeId};

    use super::*;

    struct Silent;

    impl ByteSource for Silent {
        fn read_byte(&mut self) -> u8 {
            0
        }
    }

    fn queue() -> Rc<RefCell<EventQueue>> {
        Rc::new(RefCell::new(EventQueue::new()))
    }

    fn always_high() -> u8 {
        0xFF
    }

    #[test]
    fn conflicting_sources_on_one_bit_rejected() {
        let mut registry = DeviceRegistry::new();
        registry.insert("snd", Rc::new(RefCell::new(Silent)));

        let result = Latch8Config::new("main")
            .devread(2, "snd", 0)
            .read_handler(2, always_high, 0)
            .bind(&registry, queue(), None);

        match result {
            Err(Latch8Error::SourceConflict { tag, bit }) => {
                assert_eq!(tag, "main");
                assert_eq!(bit, 2);
            }
            _ => panic!("expected source conflict"),
        }
    }

    #[test]
    fn unresolved_device_rejected_with_name() {
        let result =
            Latch8Config::new("main")
                .devread(4, "missing", 1)
                .bind(&DeviceRegistry::new(), queue(), None);

        match result {
            Err(err @ Latch8Error::UnresolvedDevice { .. }) => {
                let message = err.to_string();
                assert!(message.contains("main"));
                assert!(message.contains("bit 4"));
                assert!(message.contains("missing"));
            }
            _ => panic!("expected unresolved device"),
        }
    }

    #[test]
    fn node_map_without_sink_rejected() {
        let result = Latch8Config::new("main")
            .node(0, NodeId(7))
            .bind(&DeviceRegistry::new(), queue(), None);

        assert!(matches!(result, Err(Latch8Error::MissingNodeSink { .. })));
    }

    #[test]
    fn resolvable_config_binds() {
        let mut registry = DeviceRegistry::new();
        registry.insert("snd", Rc::new(RefCell::new(Silent)));

        let latch = Latch8Config::new("main")
            .devread(0, "snd", 3)
            .read_handler(1, always_high, 0)
            .maskout(0x80)
            .bind(&registry, queue(), None)
            .expect("bind");

        assert_eq!(latch.tag(), "main");
    }
}
