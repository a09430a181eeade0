//! The foreground cooking loop: sample, filter, sequence.

use defmt::{debug, info, warn};
use embassy_stm32::adc::{self, Adc, AnyAdcChannel};
use embassy_stm32::gpio::Output;
use embassy_stm32::peripherals;
use embassy_time::{Duration, Instant, Ticker};
use micromath::F32Ext;
use simmer_control::filter::{TemperatureFilter, SAMPLE_INTERVAL_MS};
use simmer_control::thermistor::{FeedbackMonitor, Plausibility, ThermistorModel};
use simmer_control::{controller, Effect, Sequencer};
use simmer_protocol::StatusCode;

use crate::{Melody, CONTROL_MUTEX, MELODY_SIG, PROGRAM_MUTEX, STATUS_MUTEX, STORE_TUNING_SIG};

/// Sampler passes per heartbeat LED toggle (1 Hz at the 200 ms cadence).
const HEARTBEAT_DIVIDER: u8 = 5;

/// Resources of the cooking loop.
pub struct CookResources {
    /// The ADC reading the thermistor divider.
    pub adc: Adc<'static, peripherals::ADC2>,
    /// The thermistor input channel.
    pub pin_thermistor: AnyAdcChannel<peripherals::ADC2>,
    /// The heartbeat LED.
    pub led_heartbeat: Output<'static>,
}

/// Sample the vessel temperature and walk the cooking program.
#[embassy_executor::task]
pub async fn cook_task(mut resources: CookResources) {
    let model = ThermistorModel::STOCK;
    let mut filter = TemperatureFilter::new();
    let mut monitor = FeedbackMonitor::new();
    let mut sequencer = Sequencer::new();
    let mut heartbeat = 0u8;

    resources.adc.set_sample_time(adc::SampleTime::CYCLES247_5);

    let mut ticker = Ticker::every(Duration::from_millis(SAMPLE_INTERVAL_MS));
    loop {
        ticker.next().await;

        // The divider model is referred to the 10-bit scale of the original
        // board; fold the 12-bit reading down to match.
        let raw = resources.adc.blocking_read(&mut resources.pin_thermistor) >> 2;

        if let Some(mean) = filter.push(raw) {
            let temperature_deg_c = model.temperature_deg_c(mean);
            debug!("temperature: {} °C (ADC mean {})", temperature_deg_c, mean);

            match monitor.check(temperature_deg_c) {
                Plausibility::Ok => {}
                Plausibility::Overlimit => {
                    warn!("temperature over limit: {} °C", temperature_deg_c);
                    STATUS_MUTEX.lock(|status| {
                        status
                            .borrow_mut()
                            .latch_code(StatusCode::TemperatureOverlimit)
                    });
                }
                Plausibility::FeedbackFailed => {
                    warn!("temperature feedback implausible: {} °C", temperature_deg_c);
                    STATUS_MUTEX.lock(|status| {
                        status
                            .borrow_mut()
                            .latch_code(StatusCode::TemperatureFeedbackFailed)
                    });
                }
            }

            CONTROL_MUTEX.lock(|state| {
                let mut state = state.borrow_mut();
                state.current_deg_c = temperature_deg_c;
                state.error_integral = controller::leak_integral(
                    state.error_integral,
                    state.target_deg_c,
                    temperature_deg_c,
                    state.tunings.ti,
                );
            });
            STATUS_MUTEX.lock(|status| {
                status.borrow_mut().temperature = (temperature_deg_c * 256.0).round() as i16;
            });
        }

        let now_us = Instant::now().as_micros();
        let effect = CONTROL_MUTEX.lock(|control| {
            STATUS_MUTEX.lock(|status| {
                PROGRAM_MUTEX.lock(|program| {
                    sequencer.step(
                        now_us,
                        &mut program.borrow_mut(),
                        &mut status.borrow_mut(),
                        &mut control.borrow_mut(),
                    )
                })
            })
        });

        match effect {
            Some(Effect::FinishMelody) => {
                info!("cooking program finished");
                MELODY_SIG.signal(Melody::Finish);
            }
            Some(Effect::NotifyMelody) => {
                info!("hold elapsed");
                MELODY_SIG.signal(Melody::Notify);
            }
            Some(Effect::StoreTuning(field, value)) => {
                STORE_TUNING_SIG.signal((field, value));
            }
            None => {}
        }

        heartbeat += 1;
        if heartbeat == HEARTBEAT_DIVIDER {
            heartbeat = 0;
            resources.led_heartbeat.toggle();
        }
    }
}
