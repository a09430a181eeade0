//! Phase-angle timing for the triac gate.
//!
//! Each AC half-cycle, the gate fires after a delay chosen so that the
//! conducting tail of the half-sine delivers the requested fraction of RMS
//! power. The delay comes from the algebraic inverse of the power curve:
//! the on-duration for rate `r` over a half-period `T` is
//! `Δon(r) = T·arccos(1 − 2r)/π`, monotone from `Δon(0) = 0` to
//! `Δon(1) = T`.

// Shadowed by the std inherent methods when testing on the host.
#[allow(unused_imports)]
use micromath::F32Ext;

/// Zero-cross edges closer together than this are contact bounce or noise.
pub const DEBOUNCE_US: u64 = 5_000;
/// Half-period assumed until the first clean measurement (50 Hz mains).
pub const DEFAULT_HALF_PERIOD_US: u32 = 10_000;
/// Shortest believable half-period (just above 60 Hz).
pub const HALF_PERIOD_MIN_US: u32 = 7_000;
/// Longest believable half-period (just below 50 Hz, with drift margin).
pub const HALF_PERIOD_MAX_US: u32 = 13_000;
/// The gate is released this long before the expected next zero cross, so
/// the edge detector re-arms in time. The triac holds conduction through
/// the zero crossing regardless.
pub const REARM_MARGIN_US: u32 = 500;

/// Debounces zero-cross edges and tracks the mains half-period.
pub struct EdgeFilter {
    /// Timestamp of the last accepted edge.
    last_edge_us: Option<u64>,
    /// Latched half-period; starts at the 50 Hz default.
    half_period_us: u32,
}

impl EdgeFilter {
    /// A fresh filter assuming 50 Hz mains.
    pub const fn new() -> Self {
        Self {
            last_edge_us: None,
            half_period_us: DEFAULT_HALF_PERIOD_US,
        }
    }

    /// Report a rising edge at `now_us`.
    ///
    /// Returns the half-period to schedule against, or `None` when the edge
    /// is debounced away. Intervals outside the believable band leave the
    /// previous measurement in place.
    pub fn on_edge(&mut self, now_us: u64) -> Option<u32> {
        if let Some(last) = self.last_edge_us {
            let spacing = now_us.saturating_sub(last);
            if spacing < DEBOUNCE_US {
                return None;
            }
            if spacing >= HALF_PERIOD_MIN_US as u64 && spacing <= HALF_PERIOD_MAX_US as u64 {
                self.half_period_us = spacing as u32;
            }
        }
        self.last_edge_us = Some(now_us);
        Some(self.half_period_us)
    }

    /// The latched half-period in µs.
    pub fn half_period_us(&self) -> u32 {
        self.half_period_us
    }
}

impl Default for EdgeFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// On-duration in µs for a power rate over the given half-period.
pub fn on_duration_us(rate: f32, half_period_us: u32) -> u32 {
    let rate = rate.clamp(0.0, 1.0);
    let angle = (1.0 - 2.0 * rate).clamp(-1.0, 1.0).acos();
    ((half_period_us as f32 * angle / core::f32::consts::PI) as u32).min(half_period_us)
}

/// What to do with the gate for one half-cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GatePlan {
    /// No conduction this half-cycle; the gate stays low.
    Off,
    /// Full power: hold the gate high continuously, no pulse scheduling.
    Held,
    /// Fire a pulse within the half-cycle.
    Pulse {
        /// Delay from the zero-cross edge to the gate's rising edge.
        fire_delay_us: u32,
        /// How long the gate stays high.
        on_duration_us: u32,
    },
}

impl GatePlan {
    /// Plan the gate for one half-cycle.
    ///
    /// `phase_delay_us` compensates the zero-cross detector's lead: it is
    /// subtracted from the firing delay, clamped so the pulse never starts
    /// before the edge.
    pub fn for_rate(rate: f32, half_period_us: u32, phase_delay_us: u16) -> Self {
        if rate >= 1.0 {
            return Self::Held;
        }
        if rate <= 0.0 {
            return Self::Off;
        }

        let on = on_duration_us(rate, half_period_us);
        if on == 0 {
            return Self::Off;
        }

        let fire_delay_us = (half_period_us - on).saturating_sub(phase_delay_us as u32);
        let on_duration_us = on.min(
            half_period_us
                .saturating_sub(fire_delay_us)
                .saturating_sub(REARM_MARGIN_US),
        );
        if on_duration_us == 0 {
            return Self::Off;
        }

        Self::Pulse {
            fire_delay_us,
            on_duration_us,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_duration_is_monotone_with_fixed_endpoints() {
        let half = DEFAULT_HALF_PERIOD_US;
        assert_eq!(on_duration_us(0.0, half), 0);
        // Endpoint through an approximated arccos; allow a little slack.
        assert!(on_duration_us(1.0, half) >= half - 20);

        let mut previous = 0;
        for step in 0..=100 {
            let on = on_duration_us(step as f32 / 100.0, half);
            assert!(on >= previous, "Δon must not decrease (step {})", step);
            previous = on;
        }
    }

    #[test]
    fn half_rate_fires_at_the_half_cycle_midpoint() {
        // arccos(0)/π = 1/2, so the gate goes high 5000 µs after the edge.
        match GatePlan::for_rate(0.5, 10_000, 0) {
            GatePlan::Pulse { fire_delay_us, .. } => {
                assert!((4980..=5020).contains(&fire_delay_us), "{}", fire_delay_us);
            }
            other => panic!("expected a pulse, got {:?}", other),
        }
    }

    #[test]
    fn extreme_rates_bypass_the_pulse_scheduler() {
        assert_eq!(GatePlan::for_rate(1.0, 10_000, 0), GatePlan::Held);
        assert_eq!(GatePlan::for_rate(1.5, 10_000, 0), GatePlan::Held);
        assert_eq!(GatePlan::for_rate(0.0, 10_000, 0), GatePlan::Off);
        assert_eq!(GatePlan::for_rate(-0.2, 10_000, 0), GatePlan::Off);
    }

    #[test]
    fn pulse_ends_before_the_next_edge() {
        for step in 1..100 {
            let rate = step as f32 / 100.0;
            if let GatePlan::Pulse {
                fire_delay_us,
                on_duration_us,
            } = GatePlan::for_rate(rate, 10_000, 0)
            {
                assert!(fire_delay_us + on_duration_us <= 10_000 - REARM_MARGIN_US);
            }
        }
    }

    #[test]
    fn phase_delay_pulls_the_pulse_forward() {
        let plain = GatePlan::for_rate(0.5, 10_000, 0);
        let compensated = GatePlan::for_rate(0.5, 10_000, 1000);
        match (plain, compensated) {
            (
                GatePlan::Pulse {
                    fire_delay_us: a, ..
                },
                GatePlan::Pulse {
                    fire_delay_us: b, ..
                },
            ) => assert_eq!(a - b, 1000),
            other => panic!("expected pulses, got {:?}", other),
        }

        // Compensation larger than the delay saturates at the edge.
        match GatePlan::for_rate(0.9, 10_000, u16::MAX) {
            GatePlan::Pulse { fire_delay_us, .. } => assert_eq!(fire_delay_us, 0),
            other => panic!("expected a pulse, got {:?}", other),
        }
    }

    #[test]
    fn edges_inside_the_debounce_window_are_dropped() {
        let mut filter = EdgeFilter::new();
        assert_eq!(filter.on_edge(100_000), Some(DEFAULT_HALF_PERIOD_US));
        // 2 ms later: bounce.
        assert_eq!(filter.on_edge(102_000), None);
        // A clean edge 10 ms after the first latches the measurement.
        assert_eq!(filter.on_edge(110_000), Some(10_000));
    }

    #[test]
    fn implausible_intervals_keep_the_previous_half_period() {
        let mut filter = EdgeFilter::new();
        filter.on_edge(0);
        assert_eq!(filter.on_edge(8_333), Some(8_333)); // 60 Hz
        // A 50 ms gap (missed edges) must not be latched as the half-period.
        assert_eq!(filter.on_edge(58_333), Some(8_333));
        assert_eq!(filter.half_period_us(), 8_333);
    }
}
