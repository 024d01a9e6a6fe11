//! Descriptors of the bundled instruments.
//!
//! Each supported instrument is described by an
//! [`InstrumentDescriptor`] returned from a factory function (e.g.
//! [`spd1168x()`]). The manufacturer and model strings are what
//! identification looks for in the identity reply, so they are spelled the
//! way the instruments report themselves (hyphens do not matter).
//!
//! | Driver              | Category     | Identity | Channels |
//! |---------------------|--------------|----------|----------|
//! | `siglent_spd1168x`  | Power Supply | `*IDN?`  | 1        |
//! | `bk_9141`           | Power Supply | `*IDN?`  | 3        |
//! | `magnapower_sl1000` | Power Supply | `*IDN?`  | 1        |
//! | `siglent_sdl1020xe` | Load         | `*IDN?`  | 1        |
//! | `keithley_2380`     | Load         | `*IDN?`  | 1        |
//! | `siglent_sds1104xe` | Scope        | `*IDN?`  | 4        |
//! | `lecroy_hdo6104`    | Scope        | `*IDN?`  | 4        |
//! | `siglent_sdm3055`   | Meter        | `*IDN?`  | 1        |
//! | `hp_3458a`          | Meter        | `ID?`    | 1        |
//! | `fluke_8840a`       | Meter        | `G3`     | 1        |

use benchlib_core::{Category, ChannelId, InstrumentDescriptor};

const ONE_CHANNEL: &[ChannelId] = &[ChannelId::CH1];
const THREE_CHANNELS: &[ChannelId] = &[ChannelId::CH1, ChannelId::CH2, ChannelId::CH3];
const FOUR_CHANNELS: &[ChannelId] = &[
    ChannelId::CH1,
    ChannelId::CH2,
    ChannelId::CH3,
    ChannelId::CH4,
];

/// Siglent SPD1168X single-output bench supply.
pub fn spd1168x() -> InstrumentDescriptor {
    InstrumentDescriptor {
        category: Category::PowerSupply,
        manufacturer: "Siglent",
        model: "SPD1168X",
        id_command: "*IDN?",
        channels: ONE_CHANNEL,
    }
}

/// BK Precision 9141 triple-output supply.
///
/// The 9141 reports itself as `B&K Precision`, which does not contain
/// `BK`; it has to be selected with a forced driver.
pub fn bk9141() -> InstrumentDescriptor {
    InstrumentDescriptor {
        category: Category::PowerSupply,
        manufacturer: "BK",
        model: "9141",
        id_command: "*IDN?",
        channels: THREE_CHANNELS,
    }
}

/// Magna-Power SL1000 series programmable supply.
pub fn sl1000() -> InstrumentDescriptor {
    InstrumentDescriptor {
        category: Category::PowerSupply,
        manufacturer: "MagnaPower",
        model: "SL1000",
        id_command: "*IDN?",
        channels: ONE_CHANNEL,
    }
}

/// Siglent SDL1020X-E electronic load.
pub fn sdl1020xe() -> InstrumentDescriptor {
    InstrumentDescriptor {
        category: Category::Load,
        manufacturer: "Siglent",
        model: "SDL1020XE",
        id_command: "*IDN?",
        channels: ONE_CHANNEL,
    }
}

/// Keithley 2380 series electronic load.
pub fn k2380() -> InstrumentDescriptor {
    InstrumentDescriptor {
        category: Category::Load,
        manufacturer: "Keithley",
        model: "2380",
        id_command: "*IDN?",
        channels: ONE_CHANNEL,
    }
}

/// Siglent SDS1104X-E four-channel oscilloscope.
pub fn sds1104xe() -> InstrumentDescriptor {
    InstrumentDescriptor {
        category: Category::Scope,
        manufacturer: "Siglent",
        model: "SDS1104XE",
        id_command: "*IDN?",
        channels: FOUR_CHANNELS,
    }
}

/// Teledyne LeCroy HDO6104 four-channel oscilloscope.
pub fn hdo6104() -> InstrumentDescriptor {
    InstrumentDescriptor {
        category: Category::Scope,
        manufacturer: "LeCroy",
        model: "HDO6104",
        id_command: "*IDN?",
        channels: FOUR_CHANNELS,
    }
}

/// Siglent SDM3055 5.5 digit multimeter.
pub fn sdm3055() -> InstrumentDescriptor {
    InstrumentDescriptor {
        category: Category::Meter,
        manufacturer: "Siglent",
        model: "SDM3055",
        id_command: "*IDN?",
        channels: ONE_CHANNEL,
    }
}

/// HP 3458A 8.5 digit multimeter (HP-IL command set, no `*IDN?`).
pub fn hp3458a() -> InstrumentDescriptor {
    InstrumentDescriptor {
        category: Category::Meter,
        manufacturer: "HP",
        model: "3458A",
        id_command: "ID?",
        channels: ONE_CHANNEL,
    }
}

/// Fluke 8840A multimeter.
///
/// The 8840A has no identity query. `G3` reads back the user string, which
/// has to be stored once as `Fluke 8840A` for identification to find it.
pub fn fluke8840a() -> InstrumentDescriptor {
    InstrumentDescriptor {
        category: Category::Meter,
        manufacturer: "Fluke",
        model: "8840A",
        id_command: "G3",
        channels: ONE_CHANNEL,
    }
}

/// Every bundled descriptor, in registration order.
pub fn all_models() -> Vec<InstrumentDescriptor> {
    vec![
        spd1168x(),
        bk9141(),
        sl1000(),
        sdl1020xe(),
        k2380(),
        sds1104xe(),
        hdo6104(),
        sdm3055(),
        hp3458a(),
        fluke8840a(),
    ]
}
