//! Zero-cross synchronized heater control.
//!
//! Runs on the interrupt-mode executor: every rising edge of the
//! opto-isolated zero-cross input, the task reads a fresh power rate from
//! the shared control state and fires the triac gate at the matching phase
//! angle. Foreground work (display flushes, the blocking melody player)
//! cannot delay these edges.

use defmt::trace;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::Output;
use embassy_time::{Duration, Instant, Timer};
use micromath::F32Ext;
use simmer_control::phase::{EdgeFilter, GatePlan};

use crate::{CONTROL_MUTEX, STATUS_MUTEX};

/// Fire the gate each half-cycle according to the commanded power rate.
#[embassy_executor::task]
pub async fn heat_task(mut zero_cross: ExtiInput<'static>, mut gate: Output<'static>) {
    let mut edges = EdgeFilter::new();

    loop {
        zero_cross.wait_for_rising_edge().await;
        let edge = Instant::now();

        let Some(half_period_us) = edges.on_edge(edge.as_micros()) else {
            // Contact bounce or a noise pulse.
            continue;
        };

        let (rate, phase_delay_us) = CONTROL_MUTEX.lock(|state| {
            let state = state.borrow();
            (state.power_rate(), state.phase_delay_us)
        });

        STATUS_MUTEX.lock(|status| {
            status.borrow_mut().power = (rate * 100.0).round().clamp(0.0, 100.0) as u8;
        });

        match GatePlan::for_rate(rate, half_period_us, phase_delay_us) {
            GatePlan::Held => gate.set_high(),
            GatePlan::Off => gate.set_low(),
            GatePlan::Pulse {
                fire_delay_us,
                on_duration_us,
            } => {
                Timer::at(edge + Duration::from_micros(fire_delay_us as u64)).await;
                gate.set_high();
                Timer::after_micros(on_duration_us as u64).await;
                gate.set_low();
                trace!("gate pulse: +{} µs for {} µs", fire_delay_us, on_duration_us);
            }
        }
    }
}
