//! Power switch handling and shutdown sequencing.

use defmt::info;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::Output;
use embassy_time::Timer;

use crate::{Melody, CONTROL_MUTEX, MELODY_SIG};

/// Debounce time for the mechanical switch.
const DEBOUNCE_MS: u64 = 50;

/// Resources of the power path.
pub struct PowerResources {
    /// The power switch, active low.
    pub pin_switch: ExtiInput<'static>,
    /// The supply-hold output; dropping it cuts our own power.
    pub pin_hold: Output<'static>,
}

/// Wait for the power switch and shut the controller down.
#[embassy_executor::task]
pub async fn power_task(mut resources: PowerResources) {
    loop {
        resources.pin_switch.wait_for_falling_edge().await;
        Timer::after_millis(DEBOUNCE_MS).await;
        if resources.pin_switch.is_high() {
            // Bounce.
            continue;
        }

        info!("power switch pressed, shutting down");

        // Zeroed setpoints drop the gate at the next zero cross; the heat
        // executor keeps running until the supply actually decays.
        CONTROL_MUTEX.lock(|state| state.borrow_mut().freeze());

        MELODY_SIG.signal(Melody::Shutdown);
        Timer::after_millis(800).await;

        resources.pin_hold.set_low();
        loop {
            Timer::after_secs(1).await;
        }
    }
}
