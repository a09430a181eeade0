//! The control state shared between the foreground and the heat executor.

use crate::controller::{self, Tunings};

/// Everything the gate scheduler needs to turn a half-cycle into power.
///
/// The foreground owns the setpoints and tunings; the heat executor reads a
/// snapshot under a critical section each zero cross.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlState {
    /// Temperature setpoint in °C; 0 when no program is active.
    pub target_deg_c: f32,
    /// Latest filtered vessel temperature in °C.
    pub current_deg_c: f32,
    /// Leaky error integral, advanced by the sampler.
    pub error_integral: f32,
    /// RAM shadow of the persisted tuning constants.
    pub tunings: Tunings,
    /// Fixed power-rate override installed by SET_POWER, bypassing the loop.
    pub manual_rate: Option<f32>,
    /// Gate lead compensation in µs (SET_PHASE_DELAY).
    pub phase_delay_us: u16,
}

impl ControlState {
    /// State at boot: everything zero, factory tunings.
    pub const fn new() -> Self {
        Self {
            target_deg_c: 0.0,
            current_deg_c: 0.0,
            error_integral: 0.0,
            tunings: Tunings::DEFAULT,
            manual_rate: None,
            phase_delay_us: 0,
        }
    }

    /// The power rate for the coming half-cycle.
    pub fn power_rate(&self) -> f32 {
        if let Some(rate) = self.manual_rate {
            return rate.clamp(0.0, 1.0);
        }
        controller::power_rate(
            self.target_deg_c,
            self.current_deg_c,
            self.error_integral,
            self.tunings.kp,
        )
    }

    /// Zero every setpoint so the heater cannot be driven. Entered once a
    /// fault has latched, and on shutdown.
    pub fn freeze(&mut self) {
        self.target_deg_c = 0.0;
        self.error_integral = 0.0;
        self.manual_rate = None;
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_rate_bypasses_the_loop() {
        let mut state = ControlState::new();
        state.target_deg_c = 0.0;
        state.current_deg_c = 90.0;
        state.manual_rate = Some(0.7);
        assert_eq!(state.power_rate(), 0.7);

        state.manual_rate = Some(3.0);
        assert_eq!(state.power_rate(), 1.0);
    }

    #[test]
    fn frozen_state_never_drives_the_heater() {
        let mut state = ControlState::new();
        state.target_deg_c = 95.0;
        state.current_deg_c = 50.0;
        state.error_integral = 10.0;
        state.manual_rate = Some(1.0);
        state.freeze();
        assert_eq!(state.power_rate(), 0.0);
    }
}
