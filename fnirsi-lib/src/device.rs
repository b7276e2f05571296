//! Supported meters and the protocol differences between them.
//!
//! [`SUPPORTED_DEVICES`] is the only place a model is tied to a [`DeviceVariant`], and
//! [`VariantProfile`] is the only place a variant's constants live.

use crate::command::Command;
use crate::error::DiscoveryError;
use std::fmt;
use std::time::Duration;
use strum_macros::Display;

/// USB vendor/product pair of an attached device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceIdentity {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self { vendor_id, product_id }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DeviceModel {
    #[strum(to_string = "FNB48")]
    Fnb48,
    #[strum(to_string = "C1")]
    C1,
    #[strum(to_string = "FNB58")]
    Fnb58,
    #[strum(to_string = "FNB48S")]
    Fnb48s,
}

/// Protocol family of a meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DeviceVariant {
    #[strum(to_string = "FNB48/C1")]
    Fnb48OrC1,
    #[strum(to_string = "FNB58/FNB48S")]
    Fnb58OrFnb48s,
}

/// Variant-specific protocol constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantProfile {
    /// Commands written, in order, to start streaming.
    pub handshake: [Command; 3],
    /// Minimum wall-clock time between keep-alive commands.
    pub keepalive_interval: Duration,
}

const FNB48_OR_C1_PROFILE: VariantProfile = VariantProfile {
    handshake: [Command::Handshake1, Command::Handshake2, Command::Refresh],
    keepalive_interval: Duration::from_millis(3),
};

const FNB58_OR_FNB48S_PROFILE: VariantProfile = VariantProfile {
    handshake: [Command::Handshake1, Command::Handshake2, Command::Handshake2],
    keepalive_interval: Duration::from_secs(1),
};

impl DeviceVariant {
    pub fn profile(self) -> &'static VariantProfile {
        match self {
            DeviceVariant::Fnb48OrC1 => &FNB48_OR_C1_PROFILE,
            DeviceVariant::Fnb58OrFnb48s => &FNB58_OR_FNB48S_PROFILE,
        }
    }

    pub fn handshake(self) -> &'static [Command; 3] {
        &self.profile().handshake
    }

    pub fn keepalive_interval(self) -> Duration {
        self.profile().keepalive_interval
    }
}

/// One row of the device table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedDevice {
    pub identity: DeviceIdentity,
    pub model: DeviceModel,
    pub variant: DeviceVariant,
}

pub const VID_STM: u16 = 0x0483;
pub const VID_FNIRSI: u16 = 0x2E3C;

/// Known meters, in discovery priority order.
pub const SUPPORTED_DEVICES: [SupportedDevice; 4] = [
    SupportedDevice {
        identity: DeviceIdentity::new(VID_STM, 0x003A),
        model: DeviceModel::Fnb48,
        variant: DeviceVariant::Fnb48OrC1,
    },
    SupportedDevice {
        identity: DeviceIdentity::new(VID_STM, 0x003B),
        model: DeviceModel::C1,
        variant: DeviceVariant::Fnb48OrC1,
    },
    SupportedDevice {
        identity: DeviceIdentity::new(VID_FNIRSI, 0x5558),
        model: DeviceModel::Fnb58,
        variant: DeviceVariant::Fnb58OrFnb48s,
    },
    SupportedDevice {
        identity: DeviceIdentity::new(VID_FNIRSI, 0x0049),
        model: DeviceModel::Fnb48s,
        variant: DeviceVariant::Fnb58OrFnb48s,
    },
];

/// Look up the table entry for `identity`.
pub fn lookup(identity: DeviceIdentity) -> Result<&'static SupportedDevice, DiscoveryError> {
    SUPPORTED_DEVICES
        .iter()
        .find(|d| d.identity == identity)
        .ok_or(DiscoveryError::UnsupportedDevice(identity))
}

/// Map a USB identity to its protocol variant.
pub fn resolve(identity: DeviceIdentity) -> Result<DeviceVariant, DiscoveryError> {
    lookup(identity).map(|d| d.variant)
}

/// Pick the attached device that comes first in `candidates`.
///
/// `found` pairs an opaque handle with the identity it reported during enumeration.
pub fn select<T>(
    found: impl IntoIterator<Item = (T, DeviceIdentity)>,
    candidates: &[SupportedDevice],
) -> Option<(T, SupportedDevice)> {
    found
        .into_iter()
        .filter_map(|(handle, identity)| {
            candidates
                .iter()
                .position(|c| c.identity == identity)
                .map(|rank| (rank, handle))
        })
        .min_by_key(|(rank, _)| *rank)
        .map(|(rank, handle)| (handle, candidates[rank]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_devices() {
        assert_eq!(resolve(DeviceIdentity::new(0x0483, 0x003A)).unwrap(), DeviceVariant::Fnb48OrC1);
        assert_eq!(resolve(DeviceIdentity::new(0x0483, 0x003B)).unwrap(), DeviceVariant::Fnb48OrC1);
        assert_eq!(resolve(DeviceIdentity::new(0x2E3C, 0x5558)).unwrap(), DeviceVariant::Fnb58OrFnb48s);
        assert_eq!(resolve(DeviceIdentity::new(0x2E3C, 0x0049)).unwrap(), DeviceVariant::Fnb58OrFnb48s);
    }

    #[test]
    fn test_resolve_unknown_device() {
        let identity = DeviceIdentity::new(0x5FC9, 0x0063);
        match resolve(identity) {
            Err(DiscoveryError::UnsupportedDevice(id)) => assert_eq!(id, identity),
            other => panic!("Expected UnsupportedDevice, got {:?}", other),
        }
        // Right vendor, wrong product
        assert!(resolve(DeviceIdentity::new(0x0483, 0x5740)).is_err());
    }

    #[test]
    fn test_table_identities_unique() {
        for (i, a) in SUPPORTED_DEVICES.iter().enumerate() {
            for b in &SUPPORTED_DEVICES[i + 1..] {
                assert_ne!(a.identity, b.identity);
            }
        }
    }

    #[test]
    fn test_variant_profiles() {
        let fnb48 = DeviceVariant::Fnb48OrC1;
        assert_eq!(fnb48.keepalive_interval(), Duration::from_millis(3));
        assert_eq!(fnb48.handshake()[2], Command::Refresh);

        let fnb58 = DeviceVariant::Fnb58OrFnb48s;
        assert_eq!(fnb58.keepalive_interval(), Duration::from_secs(1));
        assert_eq!(fnb58.handshake()[2], Command::Handshake2);

        for variant in [fnb48, fnb58] {
            assert_eq!(variant.handshake()[0], Command::Handshake1);
            assert_eq!(variant.handshake()[1], Command::Handshake2);
        }
    }

    #[test]
    fn test_select_prefers_table_order() {
        let found = vec![
            ("hub", DeviceIdentity::new(0x05E3, 0x0610)),
            ("fnb58", DeviceIdentity::new(0x2E3C, 0x5558)),
            ("c1", DeviceIdentity::new(0x0483, 0x003B)),
        ];
        let (handle, device) = select(found, &SUPPORTED_DEVICES).unwrap();
        assert_eq!(handle, "c1");
        assert_eq!(device.model, DeviceModel::C1);
    }

    #[test]
    fn test_select_nothing_supported() {
        let found = vec![((), DeviceIdentity::new(0x05E3, 0x0610))];
        assert!(select(found, &SUPPORTED_DEVICES).is_none());
        assert!(select(Vec::<((), DeviceIdentity)>::new(), &SUPPORTED_DEVICES).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(DeviceIdentity::new(0x2E3C, 0x5558).to_string(), "2e3c:5558");
        assert_eq!(DeviceModel::Fnb48s.to_string(), "FNB48S");
        assert_eq!(DeviceVariant::Fnb58OrFnb48s.to_string(), "FNB58/FNB48S");
    }
}
