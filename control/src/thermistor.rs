//! Thermistor conversion and feedback plausibility.
//!
//! The probe is an NTC thermistor on the high side of a divider: thermistor
//! from the analog supply to the ADC node, a fixed resistor to ground. The
//! ADC measures against the internal 1.1 V reference, so the divider
//! equation carries the supply/reference ratio explicitly.

// Shadowed by the std inherent methods when testing on the host.
#[allow(unused_imports)]
use micromath::F32Ext;

/// Fixed divider resistor to ground, in kΩ.
pub const DIVIDER_KOHM: f32 = 1.5;
/// Analog supply feeding the divider, in V.
pub const SUPPLY_V: f32 = 4.7;
/// Internal ADC reference, in V.
pub const ADC_REFERENCE_V: f32 = 1.1;
/// 10-bit ADC full scale.
pub const ADC_FULL_SCALE: f32 = 1024.0;

/// Readings below this are implausibly cold for a cooking vessel.
pub const PLAUSIBLE_MIN_DEG_C: f32 = -20.0;
/// Readings above this are implausibly hot (or the probe shorted).
pub const PLAUSIBLE_MAX_DEG_C: f32 = 150.0;
/// Ceiling above which the over-limit fault latches.
pub const OVERLIMIT_DEG_C: f32 = 130.0;
/// Consecutive implausible updates before the feedback fault latches.
pub const FEEDBACK_STRIKES: u8 = 3;

/// Thermistor resistance from a filtered ADC reading, in kΩ.
///
/// The reading is clamped away from the rails so an open or shorted probe
/// yields a finite, extreme resistance instead of a division blow-up.
pub fn divider_resistance_kohm(adc_mean: f32) -> f32 {
    let adc = adc_mean.clamp(1.0, ADC_FULL_SCALE - 1.0);
    (DIVIDER_KOHM * SUPPLY_V * ADC_FULL_SCALE / ADC_REFERENCE_V - DIVIDER_KOHM * adc) / adc
}

/// B-parameter model constants of the fitted probe.
///
/// Individual jars ship with slightly different probes; the constants are
/// configuration, not code.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ThermistorModel {
    /// B constant in K.
    pub beta: f32,
    /// Nominal resistance at `t0_deg_c`, in kΩ.
    pub r0_kohm: f32,
    /// Reference temperature of `r0_kohm`, in °C.
    pub t0_deg_c: f32,
}

impl ThermistorModel {
    /// Constants of the stock probe.
    pub const STOCK: Self = Self {
        beta: 3435.0,
        r0_kohm: 58.3,
        t0_deg_c: 25.0,
    };

    /// Temperature in °C from a filtered ADC reading.
    pub fn temperature_deg_c(&self, adc_mean: f32) -> f32 {
        let resistance = divider_resistance_kohm(adc_mean);
        let t0_kelvin = self.t0_deg_c + 273.0;
        self.beta * t0_kelvin / ((resistance / self.r0_kohm).ln() * t0_kelvin + self.beta) - 273.0
    }
}

/// Verdict on one filtered temperature update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Plausibility {
    /// The reading is usable.
    Ok,
    /// The vessel is over the temperature ceiling.
    Overlimit,
    /// The probe has produced implausible readings repeatedly.
    FeedbackFailed,
}

/// Counts consecutive implausible readings before declaring the probe dead.
pub struct FeedbackMonitor {
    /// Consecutive implausible updates so far.
    strikes: u8,
}

impl FeedbackMonitor {
    /// A monitor with a clean record.
    pub const fn new() -> Self {
        Self { strikes: 0 }
    }

    /// Judge one filtered temperature update.
    pub fn check(&mut self, temperature_deg_c: f32) -> Plausibility {
        let plausible = temperature_deg_c.is_finite()
            && temperature_deg_c > PLAUSIBLE_MIN_DEG_C
            && temperature_deg_c < PLAUSIBLE_MAX_DEG_C;

        if !plausible {
            self.strikes = self.strikes.saturating_add(1);
            if self.strikes >= FEEDBACK_STRIKES {
                return Plausibility::FeedbackFailed;
            }
            return Plausibility::Ok;
        }

        self.strikes = 0;
        if temperature_deg_c > OVERLIMIT_DEG_C {
            return Plausibility::Overlimit;
        }
        Plausibility::Ok
    }
}

impl Default for FeedbackMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_is_monotone_and_sane_midscale() {
        let model = ThermistorModel::STOCK;
        // Higher ADC reading = lower thermistor resistance = hotter.
        let cool = model.temperature_deg_c(200.0);
        let warm = model.temperature_deg_c(500.0);
        let hot = model.temperature_deg_c(900.0);
        assert!(cool < warm && warm < hot);
        assert!((-20.0..150.0).contains(&warm));
    }

    #[test]
    fn rail_readings_stay_finite() {
        let model = ThermistorModel::STOCK;
        for adc in [0.0, 1.0, 1023.0, 1024.0] {
            let t = model.temperature_deg_c(adc);
            assert!(t.is_finite(), "ADC {} produced {}", adc, t);
        }
    }

    #[test]
    fn reference_point_reproduces_t0() {
        let model = ThermistorModel::STOCK;
        // Solve the divider for R = R0: adc = Rv·Vs·1024 / (Vi·(R0 + Rv)).
        let adc = DIVIDER_KOHM * SUPPLY_V * ADC_FULL_SCALE
            / (ADC_REFERENCE_V * (model.r0_kohm + DIVIDER_KOHM));
        let t = model.temperature_deg_c(adc);
        assert!((t - model.t0_deg_c).abs() < 0.5, "got {}", t);
    }

    #[test]
    fn feedback_monitor_needs_consecutive_strikes() {
        let mut monitor = FeedbackMonitor::new();
        assert_eq!(monitor.check(200.0), Plausibility::Ok);
        assert_eq!(monitor.check(95.0), Plausibility::Ok); // streak broken
        assert_eq!(monitor.check(200.0), Plausibility::Ok);
        assert_eq!(monitor.check(200.0), Plausibility::Ok);
        assert_eq!(monitor.check(200.0), Plausibility::FeedbackFailed);
    }

    #[test]
    fn overlimit_fires_inside_the_plausibility_window() {
        let mut monitor = FeedbackMonitor::new();
        assert_eq!(monitor.check(135.0), Plausibility::Overlimit);
        assert_eq!(monitor.check(110.0), Plausibility::Ok);
    }
}
