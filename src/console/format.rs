//! Display strings for live metrics.

use super::model::DeviceMetrics;

/// Placeholder shown for absent or non-finite values.
pub const MISSING: &str = "--";

/// Power factors this close to 1 are not shown.
const UNITY_PF_TOLERANCE: f64 = 0.005;

/// Round to `decimals` places, then drop trailing zeros and a bare decimal point.
pub fn format_metric(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return MISSING.to_string();
    }

    let scale = 10f64.powi(decimals as i32);
    // f64::round rounds halves away from zero; adding 0.0 folds -0 into 0
    let rounded = (value * scale).round() / scale + 0.0;
    let fixed = format!("{:.*}", decimals, rounded);

    if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        fixed
    }
}

/// Voltage rounded to whole volts, e.g. `230 V`.
pub fn format_voltage(metrics: Option<&DeviceMetrics>) -> String {
    match metrics.and_then(|m| m.volts).filter(|v| v.is_finite()) {
        Some(volts) => format!("{} V", format_metric(volts, 0)),
        None => MISSING.to_string(),
    }
}

/// Real power from volts, amps and power factor, e.g. `437 W, pf 0.95`.
pub fn format_power(metrics: Option<&DeviceMetrics>) -> String {
    let Some(metrics) = metrics else {
        return MISSING.to_string();
    };
    let (Some(volts), Some(amps), Some(pf)) = (metrics.volts, metrics.amps, metrics.pf) else {
        return MISSING.to_string();
    };
    if !volts.is_finite() || !amps.is_finite() || !pf.is_finite() {
        return MISSING.to_string();
    }

    let watts = volts * amps * pf;
    if !watts.is_finite() {
        return MISSING.to_string();
    }

    let watts_label = format_metric(watts, 0);
    if (pf - 1.0).abs() < UNITY_PF_TOLERANCE {
        format!("{} W", watts_label)
    } else {
        format!("{} W, pf {}", watts_label, format_metric(pf, 2))
    }
}
