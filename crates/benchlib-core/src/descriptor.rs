//! Static instrument descriptors.
//!
//! Every driver is described by an [`InstrumentDescriptor`]: which category
//! it implements, who makes the instrument, how to ask the instrument for
//! its identity, and which channels it has. Descriptors are plain static
//! data so that drivers can define them as plain factory functions and tables
//! can be built from them.

use std::fmt;

use crate::types::{Category, ChannelId};

/// Static identity/capability record for one driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrumentDescriptor {
    /// Instrument category this driver implements.
    pub category: Category,
    /// Manufacturer as it appears in the identity string (e.g. `"Siglent"`).
    pub manufacturer: &'static str,
    /// Model as it appears in the identity string (e.g. `"SPD1168X"`).
    pub model: &'static str,
    /// Command that makes the instrument report its identity.
    pub id_command: &'static str,
    /// Channels present on the instrument, in front-panel order.
    pub channels: &'static [ChannelId],
}

impl InstrumentDescriptor {
    /// Registration name: `manufacturer_model`, lower-cased.
    pub fn name(&self) -> String {
        format!("{}_{}", self.manufacturer, self.model).to_lowercase()
    }

    /// Whether `channel` exists on this instrument.
    pub fn has_channel(&self, channel: ChannelId) -> bool {
        self.channels.contains(&channel)
    }

    /// Channels present on the instrument.
    pub fn channels(&self) -> &'static [ChannelId] {
        self.channels
    }

    /// Channels not contained in `listed`, in front-panel order.
    pub fn unlisted_channels(&self, listed: &[ChannelId]) -> Vec<ChannelId> {
        self.channels
            .iter()
            .copied()
            .filter(|ch| !listed.contains(ch))
            .collect()
    }
}

impl fmt::Display for InstrumentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.manufacturer, self.model, self.category)
    }
}
