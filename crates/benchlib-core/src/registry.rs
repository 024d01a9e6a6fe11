//! Instrument driver registry.
//!
//! The [`Registry`] is an append-only catalog of drivers. Each entry pairs
//! an [`InstrumentDescriptor`] with a [`DriverFactory`] that builds the
//! category driver. Registration validates the entry up front, so a
//! misnamed or miscategorised driver is rejected before any instrument is
//! opened.
//!
//! The registry also drives identification: it knows which identity
//! commands are worth trying first ([`Registry::id_commands_by_frequency`])
//! and which driver an identity string belongs to
//! ([`Registry::match_identity`]).

use crate::descriptor::InstrumentDescriptor;
use crate::error::{Error, Result};
use crate::load::LoadDriver;
use crate::meter::MeterDriver;
use crate::psu::PowerSupplyDriver;
use crate::scope::ScopeDriver;
use crate::types::Category;

/// Constructor for a category driver.
#[derive(Debug, Clone, Copy)]
pub enum DriverFactory {
    PowerSupply(fn() -> Box<dyn PowerSupplyDriver>),
    Load(fn() -> Box<dyn LoadDriver>),
    Scope(fn() -> Box<dyn ScopeDriver>),
    Meter(fn() -> Box<dyn MeterDriver>),
}

impl DriverFactory {
    /// Category of the drivers this factory builds.
    pub fn category(&self) -> Category {
        match self {
            DriverFactory::PowerSupply(_) => Category::PowerSupply,
            DriverFactory::Load(_) => Category::Load,
            DriverFactory::Scope(_) => Category::Scope,
            DriverFactory::Meter(_) => Category::Meter,
        }
    }
}

/// One registered driver.
#[derive(Debug, Clone)]
pub struct RegisteredDriver {
    name: String,
    descriptor: InstrumentDescriptor,
    factory: DriverFactory,
}

impl RegisteredDriver {
    /// Registration name, lower-cased `manufacturer_model`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }

    pub fn factory(&self) -> DriverFactory {
        self.factory
    }
}

/// Append-only catalog of instrument drivers.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<RegisteredDriver>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver under `name`.
    ///
    /// `name` must be `manufacturer_model`: exactly two underscore-separated
    /// tokens equal (case-insensitively) to the descriptor's manufacturer
    /// and model. The factory must build drivers of the descriptor's
    /// category, and the name must not already be taken.
    pub fn register(
        &mut self,
        name: &str,
        descriptor: InstrumentDescriptor,
        factory: DriverFactory,
    ) -> Result<()> {
        let name = name.to_lowercase();
        let manufacturer = descriptor.manufacturer.to_lowercase();
        let model = descriptor.model.to_lowercase();

        if manufacturer.is_empty() || model.is_empty() {
            return Err(Error::Registration(format!(
                "driver '{name}' has an empty manufacturer or model"
            )));
        }

        let tokens: Vec<&str> = name.split('_').collect();
        if tokens != [manufacturer.as_str(), model.as_str()] {
            return Err(Error::Registration(format!(
                "driver name '{name}' does not match its descriptor '{manufacturer}_{model}'"
            )));
        }

        if factory.category() != descriptor.category {
            return Err(Error::Registration(format!(
                "driver '{name}' is described as a {} but builds a {}",
                descriptor.category,
                factory.category()
            )));
        }

        if self.lookup(&name).is_some() {
            return Err(Error::Registration(format!(
                "driver '{name}' is already registered"
            )));
        }

        tracing::debug!(
            driver = %name,
            category = %descriptor.category,
            id_command = descriptor.id_command,
            "Registered instrument driver"
        );

        self.entries.push(RegisteredDriver {
            name,
            descriptor,
            factory,
        });
        Ok(())
    }

    /// Find a driver by registration name (case-insensitive).
    pub fn lookup(&self, name: &str) -> Option<&RegisteredDriver> {
        let name = name.to_lowercase();
        self.entries.iter().find(|e| e.name == name)
    }

    /// All registered drivers, in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &RegisteredDriver> {
        self.entries.iter()
    }

    /// All registered descriptors, in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &InstrumentDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct identity commands, most widely used first.
    ///
    /// Ties keep the order in which the commands were first registered.
    pub fn id_commands_by_frequency(&self) -> Vec<&'static str> {
        let mut counts: Vec<(&'static str, usize)> = Vec::new();
        for entry in &self.entries {
            let cmd = entry.descriptor.id_command;
            match counts.iter_mut().find(|(c, _)| *c == cmd) {
                Some((_, n)) => *n += 1,
                None => counts.push((cmd, 1)),
            }
        }
        // Stable sort keeps first-registration order among equal counts.
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.into_iter().map(|(cmd, _)| cmd).collect()
    }

    /// Find the driver an identity string belongs to.
    ///
    /// A driver matches when both its manufacturer and its model occur in
    /// the response, compared case-insensitively with hyphens removed.
    /// When several drivers match (one model name being a prefix of
    /// another, say `SDS1104X` and `SDS1104XE`) the longest combined
    /// manufacturer+model wins; among equally long matches the earliest
    /// registration wins.
    pub fn match_identity(&self, response: &str) -> Option<&RegisteredDriver> {
        let haystack = normalize(response);
        let mut best: Option<(&RegisteredDriver, usize)> = None;

        for entry in &self.entries {
            let manufacturer = normalize(entry.descriptor.manufacturer);
            let model = normalize(entry.descriptor.model);
            if !(haystack.contains(&manufacturer) && haystack.contains(&model)) {
                continue;
            }
            let specificity = manufacturer.len() + model.len();
            if best.map_or(true, |(_, len)| specificity > len) {
                best = Some((entry, specificity));
            }
        }

        best.map(|(entry, _)| entry)
    }
}

fn normalize(s: &str) -> String {
    s.replace('-', "").to_lowercase()
}
