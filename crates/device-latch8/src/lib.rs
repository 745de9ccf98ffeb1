//! Generic 8-bit latch.
//!
//! Models a 74xx-series octal latch wired arbitrarily into a machine. Each
//! of the eight bits is independently configurable:
//!
//! - it may mirror a bit of another device's output, sampled on read;
//! - it may mirror a bit of the byte returned by a free read handler;
//! - it may drive a discrete logic/sound node, notified on transitions;
//! - it may settle immediately on write, or only at the next
//!   resynchronization point, because real write-to-read propagation lags
//!   the bus cycle that issued the write.
//!
//! The stored byte is raw: output masking and inversion apply to the read
//! result only, never to storage. The per-bit accessors read storage
//! directly and bypass aggregation and masking altogether.

use std::cell::RefCell;
use std::rc::Rc;

use emu_core::{
    NodeId, NodeSink, Observable, Persist, SaveState, Scheduler, SourceHandle, SyncEvent, Value,
};

mod config;

pub use config::{Latch8Config, Latch8Error, ReadHandler};

/// Resolved device read source for one bit.
pub(crate) struct DevSource {
    pub(crate) source: SourceHandle,
    pub(crate) from_bit: u8,
}

/// Free-function read source for one bit.
#[derive(Clone, Copy)]
pub(crate) struct FnSource {
    pub(crate) handler: ReadHandler,
    pub(crate) from_bit: u8,
}

/// An 8-bit latch bound into a machine.
///
/// Built by [`Latch8Config::bind`]; storage starts at zero. The scheduler
/// handle is the injected capability for deferring writes; the sink, when
/// present, receives edge notifications for node-mapped bits.
pub struct Latch8 {
    pub(crate) tag: String,
    pub(crate) value: u8,
    pub(crate) node_map: [Option<NodeId>; 8],
    pub(crate) devread: [Option<DevSource>; 8],
    pub(crate) handlers: [Option<FnSource>; 8],
    pub(crate) maskout: u8,
    pub(crate) xorvalue: u8,
    pub(crate) nosync: u8,
    // Capability flags, computed once at bind. Pure skip-work optimizations:
    // they never change observable behavior.
    pub(crate) has_node_map: bool,
    pub(crate) has_devread: bool,
    pub(crate) has_read: bool,
    pub(crate) scheduler: Rc<RefCell<dyn Scheduler>>,
    pub(crate) sink: Option<Rc<RefCell<dyn NodeSink>>>,
}

impl Latch8 {
    /// Tag this latch was bound under.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Read the externally observable byte.
    ///
    /// Starts from storage, substitutes every bit that has a device or
    /// handler source, then masks and inverts the result. The two source
    /// passes run separately and the handler pass runs last; a bit somehow
    /// carrying both kinds would read from the handler. Bind rejects such a
    /// configuration, so the ordering only matters for compatibility with
    /// machines that relied on it.
    #[must_use]
    pub fn read(&self) -> u8 {
        let mut result = self.value;
        if self.has_devread {
            for (bit, dev) in self.devread.iter().enumerate() {
                if let Some(dev) = dev {
                    let level = (dev.source.borrow_mut().read_byte() >> dev.from_bit) & 0x01;
                    result &= !(1 << bit);
                    result |= level << bit;
                }
            }
        }
        if self.has_read {
            for (bit, handler) in self.handlers.iter().enumerate() {
                if let Some(handler) = handler {
                    let level = ((handler.handler)() >> handler.from_bit) & 0x01;
                    result &= !(1 << bit);
                    result |= level << bit;
                }
            }
        }
        (result & !self.maskout) ^ self.xorvalue
    }

    /// Byte-wide write.
    ///
    /// Merges immediately only when every bit is marked no-sync; otherwise
    /// the whole byte defers to the next resynchronization point. The call
    /// returns at once either way.
    pub fn write(&mut self, data: u8) {
        if self.nosync == 0xFF {
            self.update(data, 0xFF);
        } else {
            self.defer(data, 0xFF);
        }
    }

    /// Write one bit: source bit `bit` of `data` lands at output `offset`.
    ///
    /// Immediate or deferred per that output bit's no-sync setting.
    pub fn bit_w(&mut self, bit: u8, offset: u8, data: u8) {
        assert!(bit < 8);
        assert!(offset < 8);
        let mask = 1 << offset;
        let packed = ((data >> bit) & 0x01) << offset;
        if self.nosync & mask != 0 {
            self.update(packed, mask);
        } else {
            self.defer(packed, mask);
        }
    }

    /// Raw storage bit; bypasses aggregation and output masking.
    #[must_use]
    pub fn bit_r(&self, bit: u8) -> u8 {
        assert!(bit < 8);
        (self.value >> bit) & 0x01
    }

    /// Complement of the raw storage bit.
    #[must_use]
    pub fn bit_q_r(&self, bit: u8) -> u8 {
        self.bit_r(bit) ^ 0x01
    }

    /// Asynchronous reset line: zero storage immediately.
    ///
    /// Bypasses the deferred write path and fires no node notifications.
    /// Deferred writes already in flight still apply when they fire, merging
    /// into the zeroed value.
    pub fn reset(&mut self) {
        self.value = 0;
    }

    /// Merge `new_value` into storage under `mask`, then notify transitions.
    ///
    /// The single merge primitive behind both write paths. The machine loop
    /// also dispatches drained [`SyncEvent`]s here.
    pub fn update(&mut self, new_value: u8, mask: u8) {
        let old = self.value;
        self.value = (self.value & !mask) | (new_value & mask);

        if self.has_node_map {
            let changed = old ^ self.value;
            for (bit, node) in self.node_map.iter().enumerate() {
                if changed & (1 << bit) != 0 {
                    if let Some(node) = node {
                        if let Some(sink) = &self.sink {
                            sink.borrow_mut().node_write(*node, (self.value >> bit) & 0x01);
                        }
                    }
                }
            }
        }
    }

    fn defer(&mut self, value: u8, mask: u8) {
        self.scheduler.borrow_mut().call_after_resync(SyncEvent {
            device: self.tag.clone(),
            value,
            mask,
        });
    }

    fn state_key(&self) -> String {
        format!("latch8.{}.value", self.tag)
    }
}

impl Persist for Latch8 {
    fn save(&self, state: &mut SaveState) {
        state.put_u8(&self.state_key(), self.value);
    }

    fn restore(&mut self, state: &SaveState) {
        if let Some(value) = state.get_u8(&self.state_key()) {
            self.value = value;
        }
    }
}

impl Observable for Latch8 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "value" => Some(Value::U8(self.value)),
            "maskout" => Some(Value::U8(self.maskout)),
            "xorvalue" => Some(Value::U8(self.xorvalue)),
            "nosync" => Some(Value::U8(self.nosync)),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["value", "maskout", "xorvalue", "nosync"]
    }
}
