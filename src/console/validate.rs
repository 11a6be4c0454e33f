//! Validation rules for device records and whole configurations.

use std::collections::HashMap;

use super::model::{Configuration, DeviceConfig, MAX_DEVICES};

/// Per-field error flags for one device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub address: bool,
    pub name: bool,
    pub calibration: bool,
}

impl FieldErrors {
    pub fn any(&self) -> bool {
        self.address || self.name || self.calibration
    }
}

/// Result of checking every device in a configuration.
///
/// `devices` is index-aligned with `Configuration::devices`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub devices: Vec<FieldErrors>,
    pub over_capacity: bool,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        !self.over_capacity && self.devices.iter().all(|d| !d.any())
    }

    pub fn errors_for(&self, index: usize) -> FieldErrors {
        self.devices.get(index).copied().unwrap_or_default()
    }
}

pub fn is_name_valid(name: &str) -> bool {
    !name.trim().is_empty()
}

pub fn is_calibration_valid(calibration: f64) -> bool {
    calibration.is_finite() && calibration > 0.0
}

pub fn is_address_in_range(address: i64) -> bool {
    (1..=MAX_DEVICES as i64).contains(&address)
}

/// Name and calibration check. Addresses are checked at collection scope.
pub fn is_device_valid(device: &DeviceConfig) -> bool {
    is_name_valid(&device.name) && is_calibration_valid(device.calibration)
}

/// Check every device without stopping at the first failure.
///
/// A duplicated address flags every device that shares it.
pub fn validate_configuration(config: &Configuration) -> ValidationReport {
    let mut address_counts: HashMap<i64, usize> = HashMap::new();
    for address in config.devices.iter().filter_map(|d| d.address.as_integer()) {
        if is_address_in_range(address) {
            *address_counts.entry(address).or_insert(0) += 1;
        }
    }

    let devices = config
        .devices
        .iter()
        .map(|device| {
            // Fractional addresses are never in range
            let address = device.address.as_integer();
            let in_range = address.is_some_and(is_address_in_range);
            let duplicate = address
                .and_then(|address| address_counts.get(&address))
                .is_some_and(|count| *count > 1);
            FieldErrors {
                address: !in_range || duplicate,
                name: !is_name_valid(&device.name),
                calibration: !is_calibration_valid(device.calibration),
            }
        })
        .collect();

    ValidationReport {
        devices,
        over_capacity: config.devices.len() > MAX_DEVICES,
    }
}

pub fn is_configuration_valid(config: &Configuration) -> bool {
    validate_configuration(config).is_valid()
}
