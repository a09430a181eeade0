//! The status display.
use core::fmt::Write;

use embassy_stm32::gpio::Output;
use embassy_stm32::mode::Async;
use embassy_stm32::spi::Spi;
use embassy_time::{Duration, Ticker};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::text::{Alignment, Text};
use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyleBuilder, Rectangle},
};
use micromath::F32Ext;
use profont::{PROFONT_14_POINT, PROFONT_24_POINT, PROFONT_9_POINT};
use ssd1306::prelude::{Brightness, DisplayRotation, DisplaySize128x64, SPIInterface};
use ssd1306::Ssd1306Async;

use crate::{CONTROL_MUTEX, STATUS_MUTEX};

/// Display width in pixels.
const DISPLAY_WIDTH: i32 = 128;

/// Resources for driving the display.
pub struct DisplayResources {
    /// The display SPI controller.
    pub spi: Spi<'static, Async>,
    /// The display chip select (for SPI).
    pub pin_cs: Output<'static>,
    /// The display data/control line.
    pub pin_dc: Output<'static>,
    /// The display reset line.
    pub pin_reset: Output<'static>,
}

/// Render the status record at a steady cadence.
#[embassy_executor::task]
pub async fn display_task(mut display_resources: DisplayResources) {
    let spi = embedded_hal_bus::spi::ExclusiveDevice::new_no_delay(
        display_resources.spi,
        display_resources.pin_cs,
    )
    .unwrap();
    let interface = SPIInterface::new(spi, display_resources.pin_dc);
    let mut display = Ssd1306Async::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
        .into_buffered_graphics_mode();

    display
        .reset(&mut display_resources.pin_reset, &mut embassy_time::Delay {})
        .await
        .unwrap();
    display
        .init_with_addr_mode(ssd1306::command::AddrMode::Horizontal)
        .await
        .unwrap();
    display.set_brightness(Brightness::BRIGHTEST).await.unwrap();

    let filled_style = PrimitiveStyleBuilder::new()
        .stroke_width(1)
        .fill_color(BinaryColor::On)
        .stroke_color(BinaryColor::On)
        .build();

    let mut status_string: heapless::String<10> = heapless::String::new();
    let mut temperature_string: heapless::String<10> = heapless::String::new();
    let mut target_string: heapless::String<10> = heapless::String::new();
    let mut power_string: heapless::String<10> = heapless::String::new();
    let mut remain_string: heapless::String<12> = heapless::String::new();

    let mut refresh_ticker = Ticker::every(Duration::from_hz(10));

    loop {
        let status = STATUS_MUTEX.lock(|status| *status.borrow());
        let target_deg_c = CONTROL_MUTEX.lock(|state| state.borrow().target_deg_c);

        status_string.clear();
        write!(&mut status_string, "ST:{}", status.code as i8).unwrap();

        temperature_string.clear();
        let temperature_deg_c = status.temperature as f32 / 256.0;
        write!(&mut temperature_string, "{}", temperature_deg_c.round() as i32).unwrap();

        target_string.clear();
        write!(&mut target_string, "> {}", target_deg_c.round() as i32).unwrap();

        power_string.clear();
        write!(&mut power_string, "{} %", status.power).unwrap();

        remain_string.clear();
        if status.remain_time & 0x8000 != 0 {
            write!(&mut remain_string, "{} min", status.remain_time & 0x7FFF).unwrap();
        } else if status.remain_time > 0 {
            write!(&mut remain_string, "{} s", status.remain_time).unwrap();
        }

        display.clear_buffer();

        Text::new(
            &target_string,
            Point::new(0, 11),
            MonoTextStyle::new(&PROFONT_14_POINT, BinaryColor::On),
        )
        .draw(&mut display)
        .unwrap();

        Text::with_alignment(
            &temperature_string,
            Point::new(DISPLAY_WIDTH - 1, 30),
            MonoTextStyle::new(&PROFONT_24_POINT, BinaryColor::On),
            Alignment::Right,
        )
        .draw(&mut display)
        .unwrap();

        Text::new(
            &status_string,
            Point::new(0, 45),
            MonoTextStyle::new(&PROFONT_9_POINT, BinaryColor::On),
        )
        .draw(&mut display)
        .unwrap();

        let power_bar_width = (status.power as i32 * DISPLAY_WIDTH) / 100;
        Rectangle::new(Point::new(0, 49), Size::new(power_bar_width as u32, 2))
            .draw_styled(&filled_style, &mut display)
            .unwrap();

        Text::new(
            &remain_string,
            Point::new(0, 60),
            MonoTextStyle::new(&PROFONT_9_POINT, BinaryColor::On),
        )
        .draw(&mut display)
        .unwrap();

        Text::with_alignment(
            &power_string,
            Point::new(DISPLAY_WIDTH - 1, 60),
            MonoTextStyle::new(&PROFONT_9_POINT, BinaryColor::On),
            Alignment::Right,
        )
        .draw(&mut display)
        .unwrap();

        display.flush().await.unwrap();

        refresh_ticker.next().await;
    }
}
