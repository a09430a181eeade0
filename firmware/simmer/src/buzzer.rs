//! The melody player.
//!
//! Playback is synchronous within this task and may run for seconds; that
//! is fine, because heat regulation lives on the interrupt executor and
//! keeps firing throughout.

use embassy_stm32::peripherals;
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::simple_pwm::SimplePwm;
use embassy_time::Timer;

use crate::{Melody, MELODY_SIG};

/// One melody step; a zero frequency is a rest.
struct Note {
    /// Tone frequency in Hz.
    frequency_hz: u16,
    /// Step length in ms.
    duration_ms: u64,
}

/// Shorthand for melody tables.
const fn note(frequency_hz: u16, duration_ms: u64) -> Note {
    Note {
        frequency_hz,
        duration_ms,
    }
}

/// Played when the program runs to completion.
const FINISH_MELODY: &[Note] = &[
    note(1047, 150),
    note(1319, 150),
    note(1568, 150),
    note(2093, 300),
    note(0, 100),
    note(1568, 150),
    note(2093, 450),
];

/// Played when a hold elapses.
const NOTIFY_MELODY: &[Note] = &[
    note(1760, 120),
    note(0, 80),
    note(1760, 120),
    note(0, 80),
    note(1760, 240),
];

/// Terminal beep on power-down.
const SHUTDOWN_MELODY: &[Note] = &[note(1568, 150), note(1047, 300)];

/// Wait for melody requests and play them.
#[embassy_executor::task]
pub async fn buzzer_task(mut pwm: SimplePwm<'static, peripherals::TIM1>) {
    pwm.ch1().set_duty_cycle_fully_off();
    pwm.ch1().enable();

    loop {
        let melody = MELODY_SIG.wait().await;
        let notes = match melody {
            Melody::Finish => FINISH_MELODY,
            Melody::Notify => NOTIFY_MELODY,
            Melody::Shutdown => SHUTDOWN_MELODY,
        };

        for step in notes {
            if step.frequency_hz == 0 {
                pwm.ch1().set_duty_cycle_fully_off();
            } else {
                pwm.set_frequency(Hertz(step.frequency_hz as u32));
                pwm.ch1().set_duty_cycle_percent(50);
            }
            Timer::after_millis(step.duration_ms).await;
        }
        pwm.ch1().set_duty_cycle_fully_off();
    }
}
