//! Persistence of the tuning constants.
//!
//! Kp, Ti and Td live as native-encoded `f32` at byte addresses 0, 4 and 8
//! of a 24x64 EEPROM. Boot reads and sanitizes the whole image, writing
//! defaults back over anything implausible (a blank part reads as NaN);
//! afterwards the task only waits for write requests from the sequencer.

use defmt::{debug, info};
use embassy_stm32::i2c;
use embassy_stm32::mode::Async;
use embassy_time::Timer;
use simmer_control::{TuningField, Tunings};

use crate::STORE_TUNING_SIG;

/// The EEPROM on this board.
pub type Eeprom = eeprom24x::Eeprom24x<
    i2c::I2c<'static, Async>,
    eeprom24x::page_size::B32,
    eeprom24x::addr_size::TwoBytes,
    eeprom24x::unique_serial::No,
>;

/// Size of the tuning image: three f32 fields.
const IMAGE_SIZE: usize = 12;

/// One f32 field out of the raw image.
fn image_field(image: &[u8; IMAGE_SIZE], at: usize) -> f32 {
    f32::from_le_bytes([image[at], image[at + 1], image[at + 2], image[at + 3]])
}

/// Load the tunings at boot, repairing the store when needed.
pub async fn load_tunings(eeprom: &mut Eeprom) -> Tunings {
    let mut image = [0u8; IMAGE_SIZE];
    while eeprom.read_data(0, &mut image).is_err() {
        debug!("retry EEPROM read");
        Timer::after_millis(10).await;
    }

    let (tunings, dirty) = Tunings::sanitize(
        image_field(&image, 0),
        image_field(&image, 4),
        image_field(&image, 8),
    );

    if dirty {
        info!("tuning store invalid, writing defaults back");
        store_tuning(eeprom, TuningField::Kp, tunings.kp).await;
        store_tuning(eeprom, TuningField::Ti, tunings.ti).await;
        store_tuning(eeprom, TuningField::Td, tunings.td).await;
    }

    info!(
        "tunings: kp={} ti={} td={}",
        tunings.kp, tunings.ti, tunings.td
    );
    tunings
}

/// Write one constant at its keyed address. Retries ride out the part's
/// internal write cycle.
async fn store_tuning(eeprom: &mut Eeprom, field: TuningField, value: f32) {
    while eeprom
        .write_page(field.address(), &value.to_le_bytes())
        .is_err()
    {
        debug!("retry EEPROM write");
        Timer::after_millis(10).await;
    }
}

/// Handle tuning writes requested by the sequencer.
#[embassy_executor::task]
pub async fn eeprom_task(mut eeprom: Eeprom) {
    loop {
        let (field, value) = STORE_TUNING_SIG.wait().await;
        store_tuning(&mut eeprom, field, value).await;
        debug!("stored {} = {}", field, value);
    }
}
