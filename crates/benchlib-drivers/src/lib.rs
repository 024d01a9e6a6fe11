//! Bundled instrument drivers for benchlib.
//!
//! This crate carries the drivers for the instruments benchlib knows out of
//! the box, and the registry that makes them discoverable:
//!
//! - **Descriptors** ([`models`]) -- manufacturer, model, identity command
//!   and channels of every bundled instrument.
//! - **Command builders** ([`commands`]) -- pure builders and parsers for
//!   the command dialects several drivers share.
//! - **Drivers** -- one unit struct per instrument, implementing the
//!   category driver trait from `benchlib-core`:
//!   [`siglent`], [`bk`], [`magnapower`], [`keithley`], [`lecroy`],
//!   [`fluke`] and [`hp`].
//! - **Registry** ([`builtin_registry`]) -- every bundled driver registered
//!   under its `manufacturer_model` name.
//!
//! # Example
//!
//! ```
//! use benchlib_drivers::builtin_registry;
//!
//! let registry = builtin_registry();
//! let entry = registry
//!     .match_identity("Siglent Technologies,SDL1020X-E,SDL13GCX1R0123,1.1.1.21")
//!     .unwrap();
//! assert_eq!(entry.name(), "siglent_sdl1020xe");
//! ```

use std::sync::LazyLock;

use benchlib_core::{
    DriverFactory, InstrumentDescriptor, LoadDriver, MeterDriver, PowerSupplyDriver, Registry,
    ScopeDriver,
};

pub mod bk;
pub mod commands;
pub mod fluke;
pub mod hp;
pub mod keithley;
pub mod lecroy;
pub mod magnapower;
pub mod models;
pub mod siglent;

#[cfg(test)]
mod testing;

pub use bk::Bk9141;
pub use fluke::Fluke8840a;
pub use hp::Hp3458a;
pub use keithley::K2380;
pub use lecroy::Hdo6104;
pub use magnapower::Sl1000;
pub use models::all_models;
pub use siglent::{Sdl1020xe, Sdm3055, Sds1104xe, Spd1168x};

fn spd1168x() -> Box<dyn PowerSupplyDriver> {
    Box::new(Spd1168x)
}

fn bk9141() -> Box<dyn PowerSupplyDriver> {
    Box::new(Bk9141)
}

fn sl1000() -> Box<dyn PowerSupplyDriver> {
    Box::new(Sl1000)
}

fn sdl1020xe() -> Box<dyn LoadDriver> {
    Box::new(Sdl1020xe)
}

fn k2380() -> Box<dyn LoadDriver> {
    Box::new(K2380)
}

fn sds1104xe() -> Box<dyn ScopeDriver> {
    Box::new(Sds1104xe)
}

fn hdo6104() -> Box<dyn ScopeDriver> {
    Box::new(Hdo6104)
}

fn sdm3055() -> Box<dyn MeterDriver> {
    Box::new(Sdm3055)
}

fn hp3458a() -> Box<dyn MeterDriver> {
    Box::new(Hp3458a)
}

fn fluke8840a() -> Box<dyn MeterDriver> {
    Box::new(Fluke8840a)
}

/// Factory of the bundled driver for `descriptor`, if there is one.
pub fn driver_factory(descriptor: &InstrumentDescriptor) -> Option<DriverFactory> {
    let factory = match descriptor.name().as_str() {
        "siglent_spd1168x" => DriverFactory::PowerSupply(spd1168x),
        "bk_9141" => DriverFactory::PowerSupply(bk9141),
        "magnapower_sl1000" => DriverFactory::PowerSupply(sl1000),
        "siglent_sdl1020xe" => DriverFactory::Load(sdl1020xe),
        "keithley_2380" => DriverFactory::Load(k2380),
        "siglent_sds1104xe" => DriverFactory::Scope(sds1104xe),
        "lecroy_hdo6104" => DriverFactory::Scope(hdo6104),
        "siglent_sdm3055" => DriverFactory::Meter(sdm3055),
        "hp_3458a" => DriverFactory::Meter(hp3458a),
        "fluke_8840a" => DriverFactory::Meter(fluke8840a),
        _ => return None,
    };
    Some(factory)
}

/// Register every bundled driver into `registry`.
///
/// Drivers whose registration is rejected (a name already taken, say) are
/// skipped with a warning; the rest are still registered.
pub fn register_builtin(registry: &mut Registry) {
    for descriptor in all_models() {
        let name = descriptor.name();
        let Some(factory) = driver_factory(&descriptor) else {
            tracing::warn!(driver = %name, "No bundled driver for descriptor");
            continue;
        };
        if let Err(e) = registry.register(&name, descriptor, factory) {
            tracing::warn!(driver = %name, error = %e, "Skipping bundled driver");
        }
    }
}

static BUILTIN: LazyLock<Registry> = LazyLock::new(|| {
    let mut registry = Registry::new();
    register_builtin(&mut registry);
    registry
});

/// The registry of bundled drivers, built on first use.
pub fn builtin_registry() -> &'static Registry {
    &BUILTIN
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchlib_core::Category;

    #[test]
    fn every_model_is_registered() {
        let registry = builtin_registry();
        assert_eq!(registry.len(), all_models().len());
        for descriptor in all_models() {
            let entry = registry.lookup(&descriptor.name()).unwrap();
            assert_eq!(*entry.descriptor(), descriptor);
            assert_eq!(entry.factory().category(), descriptor.category);
        }
    }

    #[test]
    fn identifies_real_identity_strings() {
        let registry = builtin_registry();
        let cases = [
            ("Siglent Technologies,SPD1168X,SPD1XCAX2R0001,1.01.01.02.05", "siglent_spd1168x"),
            ("Siglent Technologies,SDL1020X-E,SDL13GCX1R0123,1.1.1.21", "siglent_sdl1020xe"),
            ("Siglent Technologies,SDS1104X-E,SDSMMEBD2R1234,8.2.6.1.37R9", "siglent_sds1104xe"),
            ("Siglent Technologies,SDM3055,SDM35FAX1R0001,1.01.01.25", "siglent_sdm3055"),
            ("Magna-Power Electronics Inc.,SL1000-32-37,1171-1234,2.0", "magnapower_sl1000"),
            ("Keithley instruments, 2380-120-60, 802193012737110077, 1.04-1.04", "keithley_2380"),
            ("LECROY,HDO6104,LCRY3702N12345,8.5.1", "lecroy_hdo6104"),
            ("HP3458A", "hp_3458a"),
            ("Fluke 8840A", "fluke_8840a"),
        ];
        for (reply, expected) in cases {
            let entry = registry.match_identity(reply).unwrap();
            assert_eq!(entry.name(), expected, "{reply}");
        }
    }

    #[test]
    fn unknown_identity_matches_nothing() {
        assert!(builtin_registry()
            .match_identity("RIGOL TECHNOLOGIES,DP832,DP8C0000001,00.01.14")
            .is_none());
    }

    #[test]
    fn identity_commands_put_idn_first() {
        assert_eq!(
            builtin_registry().id_commands_by_frequency(),
            vec!["*IDN?", "ID?", "G3"]
        );
    }

    #[test]
    fn factories_build_their_category() {
        let registry = builtin_registry();
        let categories: Vec<Category> = registry
            .entries()
            .map(|e| e.factory().category())
            .collect();
        assert_eq!(
            categories.iter().filter(|c| **c == Category::PowerSupply).count(),
            3
        );
        assert_eq!(categories.iter().filter(|c| **c == Category::Meter).count(), 3);
    }

    #[test]
    fn duplicate_registration_is_skipped() {
        let mut registry = Registry::new();
        register_builtin(&mut registry);
        register_builtin(&mut registry);
        assert_eq!(registry.len(), all_models().len());
    }
}
