//! The cooking sequencer.
//!
//! Re-entered on every foreground pass, it executes the slot under the
//! `cmdid` cursor: temperature targets dwell until the vessel has settled,
//! holds count wall-clock time and publish the remainder, tuning writes are
//! applied and handed back as persistence effects. The sequencer touches no
//! hardware and no clock; the caller supplies `now_us` and carries out the
//! returned [`Effect`].

// Shadowed by the std inherent methods when testing on the host.
#[allow(unused_imports)]
use micromath::F32Ext;

use simmer_protocol::{encode_remaining, Opcode, StatusCode, StatusRecord};

use crate::program::Program;
use crate::state::ControlState;
use crate::Tunings;

/// How long the vessel must sit within tolerance before a temperature
/// target counts as reached. Dwelling rides out overshoot; first touch
/// does not.
pub const TARGET_DWELL_S: f32 = 120.0;
/// Settling tolerance around the target.
pub const TARGET_TOLERANCE_DEG_C: f32 = 0.5;

/// Which tuning constant a persistence effect refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TuningField {
    /// Proportional gain.
    Kp,
    /// Integral leak rate.
    Ti,
    /// Derivative gain.
    Td,
}

impl TuningField {
    /// Byte address of the constant in the non-volatile store.
    pub fn address(self) -> u32 {
        match self {
            Self::Kp => 0,
            Self::Ti => 4,
            Self::Td => 8,
        }
    }
}

/// A side effect the caller must carry out after a sequencer pass.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Effect {
    /// The program finished; play the finish melody.
    FinishMelody,
    /// A hold elapsed; play the notification melody.
    NotifyMelody,
    /// Persist a tuning constant to the non-volatile store.
    StoreTuning(TuningField, f32),
}

/// Walks the program array, one pass at a time.
pub struct Sequencer {
    /// Opcode byte seen on the previous pass, for entry detection.
    previous_op: u8,
    /// Cursor position on the previous pass, so two equal adjacent opcodes
    /// still register as an entry.
    previous_slot: u8,
    /// Time accumulated on the current operation, in seconds.
    operation_time_s: f32,
    /// Timestamp of the previous pass, in µs.
    previous_time_us: u64,
}

impl Sequencer {
    /// A sequencer that has seen nothing yet.
    pub const fn new() -> Self {
        Self {
            previous_op: Opcode::Nop as u8,
            previous_slot: 0,
            operation_time_s: 0.0,
            previous_time_us: 0,
        }
    }

    /// Execute one pass over the slot under the cursor.
    ///
    /// With a fault latched, the pass only zeroes the setpoints so the
    /// heater stays dark; status keeps publishing for diagnostics.
    pub fn step(
        &mut self,
        now_us: u64,
        program: &mut Program,
        status: &mut StatusRecord,
        control: &mut ControlState,
    ) -> Option<Effect> {
        let record = program.slot(status.cmdid);
        let delta_s = now_us.saturating_sub(self.previous_time_us) as f32 * 1e-6;
        let entered = self.previous_op != record.op || self.previous_slot != status.cmdid;

        self.previous_time_us = now_us;
        self.previous_op = record.op;
        self.previous_slot = status.cmdid;

        if status.code.is_fault() {
            control.freeze();
            return None;
        }

        if entered {
            self.operation_time_s = 0.0;
        }

        match record.opcode() {
            // A raw byte that decodes to nothing is treated as an empty
            // slot; ingest never stores one.
            Some(Opcode::Nop) | None => {
                status.latch_code(StatusCode::Standby);
                None
            }
            Some(Opcode::Finish) => {
                program.reset(status);
                control.target_deg_c = 0.0;
                control.error_integral = 0.0;
                control.manual_rate = None;
                status.remain_time = 0;
                status.latch_code(StatusCode::Standby);
                Some(Effect::FinishMelody)
            }
            Some(Opcode::TargetTemperature) => {
                status.latch_code(StatusCode::Cooking);
                if entered {
                    control.target_deg_c = record.params[0] as f32;
                    control.manual_rate = None;
                } else if (control.current_deg_c - control.target_deg_c).abs()
                    <= TARGET_TOLERANCE_DEG_C
                {
                    self.operation_time_s += delta_s;
                } else {
                    self.operation_time_s = 0.0;
                }
                if self.operation_time_s >= TARGET_DWELL_S {
                    status.cmdid += 1;
                }
                None
            }
            Some(Opcode::Hold) => {
                status.latch_code(StatusCode::Cooking);
                let duration_s = record.param_u16(0) as f32 * 60.0;
                if !entered {
                    self.operation_time_s += delta_s;
                }
                if self.operation_time_s >= duration_s {
                    status.remain_time = 0;
                    status.cmdid += 1;
                    Some(Effect::NotifyMelody)
                } else {
                    let remaining_s = (duration_s - self.operation_time_s) as u32;
                    status.remain_time = encode_remaining(remaining_s);
                    None
                }
            }
            Some(Opcode::SetKp) => {
                status.cmdid += 1;
                let value = record.param_f32(0);
                if Tunings::kp_is_valid(value) {
                    control.tunings.kp = value;
                    Some(Effect::StoreTuning(TuningField::Kp, value))
                } else {
                    status.latch_code(StatusCode::InvalidArgument);
                    None
                }
            }
            Some(Opcode::SetTi) => {
                status.cmdid += 1;
                let value = record.param_f32(0);
                if Tunings::integral_is_valid(value) {
                    control.tunings.ti = value;
                    Some(Effect::StoreTuning(TuningField::Ti, value))
                } else {
                    status.latch_code(StatusCode::InvalidArgument);
                    None
                }
            }
            Some(Opcode::SetTd) => {
                status.cmdid += 1;
                let value = record.param_f32(0);
                if Tunings::integral_is_valid(value) {
                    control.tunings.td = value;
                    Some(Effect::StoreTuning(TuningField::Td, value))
                } else {
                    status.latch_code(StatusCode::InvalidArgument);
                    None
                }
            }
            Some(Opcode::SetPhaseDelay) => {
                control.phase_delay_us = record.param_u16(0);
                status.cmdid += 1;
                None
            }
            Some(Opcode::SetPower) => {
                status.latch_code(StatusCode::Cooking);
                let percent = record.params[0].min(100);
                control.manual_rate = Some(percent as f32 / 100.0);
                status.cmdid += 1;
                None
            }
        }
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{INDEX_APPEND, PROGRAM_CAPACITY};
    use simmer_protocol::CommandRecord;

    const SECOND_US: u64 = 1_000_000;

    struct Bench {
        sequencer: Sequencer,
        program: Program,
        status: StatusRecord,
        control: ControlState,
        now_us: u64,
    }

    impl Bench {
        fn new() -> Self {
            Self {
                sequencer: Sequencer::new(),
                program: Program::new(),
                status: StatusRecord::new(),
                control: ControlState::new(),
                now_us: 0,
            }
        }

        fn load(&mut self, op: Opcode, params: [u8; 6]) {
            let record = CommandRecord::new(op, INDEX_APPEND, params);
            self.program.store(record, &mut self.status).unwrap();
        }

        fn step_after(&mut self, seconds: f32) -> Option<Effect> {
            self.now_us += (seconds * SECOND_US as f32) as u64;
            self.sequencer.step(
                self.now_us,
                &mut self.program,
                &mut self.status,
                &mut self.control,
            )
        }
    }

    fn u16_params(value: u16) -> [u8; 6] {
        let mut params = [0u8; 6];
        params[..2].copy_from_slice(&value.to_le_bytes());
        params
    }

    fn f32_params(value: f32) -> [u8; 6] {
        let mut params = [0u8; 6];
        params[..4].copy_from_slice(&value.to_le_bytes());
        params
    }

    #[test]
    fn empty_program_idles_in_standby() {
        let mut bench = Bench::new();
        assert_eq!(bench.step_after(1.0), None);
        assert_eq!(bench.status.code, StatusCode::Standby);
        assert_eq!(bench.status.cmdid, 0);
    }

    #[test]
    fn target_requires_dwell_not_first_touch() {
        let mut bench = Bench::new();
        bench.load(Opcode::TargetTemperature, [8, 0, 0, 0, 0, 0]);
        bench.control.current_deg_c = 8.2;

        // Entry pass installs the target.
        bench.step_after(0.2);
        assert_eq!(bench.control.target_deg_c, 8.0);
        assert_eq!(bench.status.code, StatusCode::Cooking);

        // A minute within tolerance is not enough.
        bench.step_after(60.0);
        assert_eq!(bench.status.cmdid, 0);

        // Wandering off target resets the dwell clock.
        bench.control.current_deg_c = 12.0;
        bench.step_after(30.0);
        bench.control.current_deg_c = 8.0;
        bench.step_after(60.0);
        assert_eq!(bench.status.cmdid, 0);

        // An uninterrupted 120 s inside the band advances the cursor.
        bench.step_after(60.0);
        bench.step_after(61.0);
        assert_eq!(bench.status.cmdid, 1);
    }

    #[test]
    fn hold_counts_down_and_notifies() {
        let mut bench = Bench::new();
        bench.load(Opcode::Hold, u16_params(120));

        // Entry: two hours remain, reported in minutes with the high bit.
        assert_eq!(bench.step_after(0.2), None);
        assert_eq!(bench.status.remain_time, 120 | 0x8000);

        // At the one-hour mark the units switch to seconds.
        assert_eq!(bench.step_after(3600.0), None);
        assert_eq!(bench.status.remain_time, 3600);

        // Past the full duration: melody and advance.
        assert_eq!(bench.step_after(3600.0), Some(Effect::NotifyMelody));
        assert_eq!(bench.status.cmdid, 1);
        assert_eq!(bench.status.remain_time, 0);
    }

    #[test]
    fn finish_rewinds_everything() {
        let mut bench = Bench::new();
        bench.load(Opcode::TargetTemperature, [60, 0, 0, 0, 0, 0]);
        bench.step_after(0.2);
        assert_eq!(bench.control.target_deg_c, 60.0);

        // Drop a FINISH into the executing slot.
        let finish = CommandRecord::new(Opcode::Finish, 0x81, [0; 6]);
        bench.program.store(finish, &mut bench.status).unwrap();

        assert_eq!(bench.step_after(0.2), Some(Effect::FinishMelody));
        assert_eq!(bench.status.cmdid, 0);
        assert_eq!(bench.status.cmdnum, 0);
        assert_eq!(bench.status.code, StatusCode::Standby);
        assert_eq!(bench.control.target_deg_c, 0.0);
        // The consumed slot is gone; the next pass idles.
        assert_eq!(bench.step_after(0.2), None);
        assert_eq!(bench.status.code, StatusCode::Standby);
    }

    #[test]
    fn tuning_writes_apply_and_persist() {
        let mut bench = Bench::new();
        bench.load(Opcode::SetKp, f32_params(0.8));
        bench.load(Opcode::SetTi, f32_params(0.05));
        bench.load(Opcode::SetTd, f32_params(0.0));

        assert_eq!(
            bench.step_after(0.2),
            Some(Effect::StoreTuning(TuningField::Kp, 0.8))
        );
        assert_eq!(
            bench.step_after(0.2),
            Some(Effect::StoreTuning(TuningField::Ti, 0.05))
        );
        assert_eq!(
            bench.step_after(0.2),
            Some(Effect::StoreTuning(TuningField::Td, 0.0))
        );
        assert_eq!(bench.control.tunings.kp, 0.8);
        assert_eq!(bench.control.tunings.ti, 0.05);
        assert_eq!(bench.status.cmdid, 3);
        assert_eq!(TuningField::Kp.address(), 0);
        assert_eq!(TuningField::Ti.address(), 4);
        assert_eq!(TuningField::Td.address(), 8);
    }

    #[test]
    fn invalid_tuning_latches_and_advances() {
        let mut bench = Bench::new();
        bench.load(Opcode::SetKp, f32_params(f32::NAN));
        assert_eq!(bench.step_after(0.2), None);
        assert_eq!(bench.status.code, StatusCode::InvalidArgument);
        assert_eq!(bench.status.cmdid, 1);
        assert_eq!(bench.control.tunings.kp, Tunings::DEFAULT.kp);
    }

    #[test]
    fn manual_power_overrides_until_a_target_arrives() {
        let mut bench = Bench::new();
        bench.load(Opcode::SetPower, [40, 0, 0, 0, 0, 0]);
        bench.load(Opcode::TargetTemperature, [60, 0, 0, 0, 0, 0]);

        bench.step_after(0.2);
        assert_eq!(bench.control.manual_rate, Some(0.4));

        bench.step_after(0.2);
        assert_eq!(bench.control.manual_rate, None);
        assert_eq!(bench.control.target_deg_c, 60.0);
    }

    #[test]
    fn phase_delay_is_installed_from_the_wire() {
        let mut bench = Bench::new();
        bench.load(Opcode::SetPhaseDelay, u16_params(800));
        bench.step_after(0.2);
        assert_eq!(bench.control.phase_delay_us, 800);
        assert_eq!(bench.status.cmdid, 1);
    }

    #[test]
    fn a_latched_fault_freezes_the_setpoints() {
        let mut bench = Bench::new();
        bench.load(Opcode::TargetTemperature, [90, 0, 0, 0, 0, 0]);
        bench.step_after(0.2);
        assert_eq!(bench.control.target_deg_c, 90.0);

        bench.status.latch_code(StatusCode::CommandOverflow);
        assert_eq!(bench.step_after(0.2), None);
        assert_eq!(bench.control.target_deg_c, 0.0);
        assert_eq!(bench.control.error_integral, 0.0);
        // The fault survives every subsequent pass.
        bench.step_after(10.0);
        assert_eq!(bench.status.code, StatusCode::CommandOverflow);
    }

    #[test]
    fn cursor_never_leaves_the_program() {
        let mut bench = Bench::new();
        for _ in 0..PROGRAM_CAPACITY {
            bench.load(Opcode::SetPhaseDelay, u16_params(0));
        }
        for _ in 0..PROGRAM_CAPACITY {
            bench.step_after(0.2);
        }
        assert_eq!(bench.status.cmdid, PROGRAM_CAPACITY as u8);
        // The cursor parked past the last slot reads NOP forever.
        assert_eq!(bench.step_after(0.2), None);
        assert_eq!(bench.status.cmdid, PROGRAM_CAPACITY as u8);
        assert_eq!(bench.status.code, StatusCode::Standby);
    }

    #[test]
    fn back_to_back_holds_each_get_their_own_clock() {
        let mut bench = Bench::new();
        bench.load(Opcode::Hold, u16_params(1));
        bench.load(Opcode::Hold, u16_params(1));

        bench.step_after(0.2);
        assert_eq!(bench.step_after(61.0), Some(Effect::NotifyMelody));
        assert_eq!(bench.status.cmdid, 1);

        // The second hold starts from zero despite the identical opcode.
        assert_eq!(bench.step_after(0.2), None);
        assert_eq!(bench.status.remain_time, 60);
        assert_eq!(bench.step_after(61.0), Some(Effect::NotifyMelody));
        assert_eq!(bench.status.cmdid, 2);
    }
}
