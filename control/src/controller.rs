//! The power-rate controller and its persisted tuning constants.
//!
//! The loop is proportional on the sum of the instantaneous error and a
//! leaky error integral. The integral is advanced by the sampler at its own
//! cadence, not here, so the controller itself stays a pure function.

/// Below this vessel temperature the commanded rate is capped, avoiding
/// inrush and thermistor self-heating artifacts far from target.
pub const COLD_VESSEL_DEG_C: f32 = 40.0;
/// Rate cap while the vessel is cold.
pub const COLD_VESSEL_MAX_RATE: f32 = 0.5;

/// Tuning constants, RAM-shadowed from the non-volatile store.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tunings {
    /// Proportional gain in 1/°C.
    pub kp: f32,
    /// Leak rate of the error integral per sampler update; 0 disables it.
    pub ti: f32,
    /// Derivative gain. Persisted for completeness; the stock loop leaves
    /// it at zero.
    pub td: f32,
}

impl Tunings {
    /// Factory defaults, also used to repair a corrupt store.
    pub const DEFAULT: Self = Self {
        kp: 0.3,
        ti: 0.01,
        td: 0.0,
    };

    /// A proportional gain the hardware can meaningfully run with.
    pub fn kp_is_valid(value: f32) -> bool {
        value.is_finite() && value > 1e-6 && value < 1e4
    }

    /// Validity for the integral/derivative constants.
    pub fn integral_is_valid(value: f32) -> bool {
        value.is_finite() && (0.0..9e4).contains(&value)
    }

    /// Build tunings from raw store values, replacing invalid fields with
    /// their defaults. The flag reports whether anything was replaced and
    /// the store should be rewritten.
    pub fn sanitize(kp: f32, ti: f32, td: f32) -> (Self, bool) {
        let kp_ok = Self::kp_is_valid(kp);
        let ti_ok = Self::integral_is_valid(ti);
        let td_ok = Self::integral_is_valid(td);
        let tunings = Self {
            kp: if kp_ok { kp } else { Self::DEFAULT.kp },
            ti: if ti_ok { ti } else { Self::DEFAULT.ti },
            td: if td_ok { td } else { Self::DEFAULT.td },
        };
        (tunings, !(kp_ok && ti_ok && td_ok))
    }
}

impl Default for Tunings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// One controller evaluation: error plus integral, through the gain, into
/// the [0, 1] rate window, with the cold-vessel cap on top.
pub fn power_rate(target_deg_c: f32, current_deg_c: f32, error_integral: f32, kp: f32) -> f32 {
    let error = target_deg_c - current_deg_c;
    let mut rate = (kp * (error + error_integral)).clamp(0.0, 1.0);
    if current_deg_c < COLD_VESSEL_DEG_C {
        rate = rate.min(COLD_VESSEL_MAX_RATE);
    }
    rate
}

/// Advance the leaky error integral by one sampler update.
pub fn leak_integral(error_integral: f32, target_deg_c: f32, current_deg_c: f32, ti: f32) -> f32 {
    error_integral + ((target_deg_c - current_deg_c) - error_integral) * ti
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_clamped_to_the_unit_window() {
        assert_eq!(power_rate(100.0, 50.0, 0.0, 10.0), 1.0);
        assert_eq!(power_rate(20.0, 90.0, 0.0, 10.0), 0.0);
    }

    #[test]
    fn cold_vessel_caps_the_rate() {
        // Far from target and cold: capped at half power.
        assert_eq!(power_rate(95.0, 20.0, 0.0, 1.0), COLD_VESSEL_MAX_RATE);
        // Same error when warm: full power.
        assert_eq!(power_rate(115.0, 41.0, 0.0, 1.0), 1.0);
    }

    #[test]
    fn integral_leaks_toward_the_error() {
        let mut integral = 0.0;
        for _ in 0..1000 {
            integral = leak_integral(integral, 60.0, 55.0, 0.01);
        }
        // Converges on the steady-state error.
        assert!((integral - 5.0).abs() < 0.1, "integral {}", integral);

        // Ti of zero disables accumulation.
        assert_eq!(leak_integral(0.0, 60.0, 55.0, 0.0), 0.0);
    }

    #[test]
    fn sanitize_repairs_a_fresh_store() {
        // A blank EEPROM reads as all-ones, which decodes to NaN.
        let blank = f32::from_le_bytes([0xFF; 4]);
        let (tunings, dirty) = Tunings::sanitize(blank, blank, blank);
        assert_eq!(tunings, Tunings::DEFAULT);
        assert!(dirty);
    }

    #[test]
    fn sanitize_keeps_good_fields() {
        let (tunings, dirty) = Tunings::sanitize(0.5, 0.02, 1e9);
        assert_eq!(tunings.kp, 0.5);
        assert_eq!(tunings.ti, 0.02);
        assert_eq!(tunings.td, Tunings::DEFAULT.td);
        assert!(dirty);

        let (tunings, dirty) = Tunings::sanitize(0.5, 0.02, 0.0);
        assert_eq!(
            tunings,
            Tunings {
                kp: 0.5,
                ti: 0.02,
                td: 0.0
            }
        );
        assert!(!dirty);
    }

    #[test]
    fn kp_bounds_are_exclusive() {
        assert!(!Tunings::kp_is_valid(1e-6));
        assert!(!Tunings::kp_is_valid(1e4));
        assert!(!Tunings::kp_is_valid(f32::NAN));
        assert!(Tunings::kp_is_valid(0.3));
        assert!(Tunings::integral_is_valid(0.0));
        assert!(!Tunings::integral_is_valid(9e4));
    }
}
