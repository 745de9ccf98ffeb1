//! Late-bound byte sources.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A component whose byte output another device can sample.
///
/// Devices that mirror bits of other chips (a latch input wired to a sound
/// chip's status port, say) hold a resolved handle to this trait. Reading may
/// have side effects on the source chip; the sampling device treats the
/// result as the value currently presented on the source's output pins.
pub trait ByteSource {
    /// The byte currently presented on the source's output.
    fn read_byte(&mut self) -> u8;
}

/// Shared single-threaded handle to a byte source.
pub type SourceHandle = Rc<RefCell<dyn ByteSource>>;

/// Name → device map used while wiring a machine together.
///
/// Devices register under their tag; other devices resolve references by
/// name exactly once, at bind time, and keep the returned handle. A lookup
/// miss is a wiring mistake in the machine description and surfaces as a
/// bind error, never a runtime condition.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, SourceHandle>,
}

impl DeviceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device under its tag, replacing any previous entry.
    pub fn insert(&mut self, tag: &str, device: SourceHandle) {
        self.devices.insert(tag.to_string(), device);
    }

    /// Resolve a tag to a live handle.
    #[must_use]
    pub fn resolve(&self, tag: &str) -> Option<SourceHandle> {
        self.devices.get(tag).cloned()
    }
}
