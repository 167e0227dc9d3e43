//! Per-device keyboard layout tracking.
//!
//! Sway keeps a layout per input device, but the status line shows only
//! one: the layout of the device that changed last.  The [`DeviceRegistry`]
//! keeps every known device in a doubly linked recency list whose links
//! are device identifiers into a map, so the list can be edited without
//! any pointer aliasing.  The tail of the list is the most recently
//! changed device.

use log::debug;
use std::collections::HashMap;

/// A known input device and its position in the recency list.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Device {
    /// Active layout name.  Never empty while the device is registered.
    layout: String,
    /// Identifier of the device changed just before this one.
    prev: Option<String>,
    /// Identifier of the device changed just after this one.
    next: Option<String>,
}

/// Devices ordered by recency of layout change.
///
/// All methods run on the thread that owns the registry; there is no
/// internal locking.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, Device>,
    /// Most recently changed device.  `None` iff `devices` is empty.
    tail: Option<String>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that device `id` now uses `layout`.
    ///
    /// An empty `layout` removes the device.  A new device, or a device
    /// whose layout text differs from the stored one, becomes the tail.
    /// Setting the same layout again leaves the order untouched.
    ///
    /// Returns `true` if the registry changed.
    pub fn set(&mut self, id: &str, layout: &str) -> bool {
        if layout.is_empty() {
            return self.delete(id);
        }
        match self.devices.get_mut(id) {
            Some(dev) if dev.layout == layout => return false,
            Some(dev) => {
                debug!("device {} layout {:?} -> {:?}", id, dev.layout, layout);
                dev.layout = layout.to_string();
                if self.tail.as_deref() == Some(id) {
                    return true;
                }
                self.unlink(id);
            }
            None => {
                debug!("new device {} with layout {:?}", id, layout);
                self.devices.insert(
                    id.to_string(),
                    Device {
                        layout: layout.to_string(),
                        prev: None,
                        next: None,
                    },
                );
            }
        }
        self.push_tail(id);
        true
    }

    /// Forget device `id`.
    ///
    /// If it was the tail, its predecessor becomes the tail.  Returns
    /// `false` if the device was unknown.
    pub fn delete(&mut self, id: &str) -> bool {
        if !self.devices.contains_key(id) {
            return false;
        }
        self.unlink(id);
        self.devices.remove(id);
        debug!("removed device {}", id);
        true
    }

    /// Layout of the most recently changed device, or `""` if no device
    /// is registered.
    pub fn current_layout(&self) -> &str {
        self.tail
            .as_deref()
            .and_then(|id| self.devices.get(id))
            .map(|d| d.layout.as_str())
            .unwrap_or("")
    }

    /// Identifier of the most recently changed device.
    #[cfg(test)]
    fn most_recent(&self) -> Option<&str> {
        self.tail.as_deref()
    }

    /// Layout stored for `id`, if the device is known.
    #[cfg(test)]
    fn layout_of(&self, id: &str) -> Option<&str> {
        self.devices.get(id).map(|d| d.layout.as_str())
    }

    /// Number of registered devices.
    pub(crate) fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether no device is registered.
    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Device identifiers from the most recently changed to the least.
    #[cfg(test)]
    fn recency(&self) -> impl Iterator<Item = &str> + '_ {
        let mut cursor = self.tail.as_deref();
        std::iter::from_fn(move || {
            let id = cursor?;
            cursor = self.devices.get(id).and_then(|d| d.prev.as_deref());
            Some(id)
        })
    }

    //  List surgery

    /// Detach `id` from its neighbours, moving the tail back if needed.
    /// The record itself stays in the map with cleared links.
    fn unlink(&mut self, id: &str) {
        let (prev, next) = match self.devices.get_mut(id) {
            Some(dev) => (dev.prev.take(), dev.next.take()),
            None => return,
        };
        if let Some(p) = prev.as_deref().and_then(|p| self.devices.get_mut(p)) {
            p.next = next.clone();
        }
        if let Some(n) = next.as_deref().and_then(|n| self.devices.get_mut(n)) {
            n.prev = prev.clone();
        }
        if self.tail.as_deref() == Some(id) {
            self.tail = prev;
        }
    }

    /// Append a detached `id` after the current tail.
    fn push_tail(&mut self, id: &str) {
        let old_tail = self.tail.take();
        if let Some(t) = old_tail.as_deref().and_then(|t| self.devices.get_mut(t)) {
            t.next = Some(id.to_string());
        }
        if let Some(dev) = self.devices.get_mut(id) {
            dev.prev = old_tail;
            dev.next = None;
        }
        self.tail = Some(id.to_string());
    }
}

//  Tests
