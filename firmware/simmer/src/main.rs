#![no_std]
#![no_main]

use defmt::{info, unwrap};
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_stm32::adc::{Adc, AdcChannel};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, OutputType, Pull, Speed};
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::time::{khz, Hertz};
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embassy_stm32::{bind_interrupts, i2c, peripherals, spi, usart};
use simmer::{buzzer, comm, cook, display, eeprom, heat, power, CONTROL_MUTEX};
use {defmt_rtt as _, panic_probe as _};

bind_interrupts!(struct Irqs {
    USART2 => usart::InterruptHandler<peripherals::USART2>;
    I2C1_EV => i2c::EventInterruptHandler<peripherals::I2C1>;
    I2C1_ER => i2c::ErrorInterruptHandler<peripherals::I2C1>;
});

/// High-priority executor for the zero-cross/gate path.
static HEAT_EXECUTOR: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn UART4() {
    HEAT_EXECUTOR.on_interrupt()
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let mut config = embassy_stm32::Config::default();
    {
        use embassy_stm32::rcc::mux;
        // Route a valid kernel clock to ADC1/2.
        config.rcc.mux.adc12sel = mux::Adcsel::SYS;
    }
    let p = embassy_stm32::init(config);
    info!("simmer starting");

    // Latch the supply on before anything else can fail.
    let pin_hold = Output::new(p.PB1, Level::High, Speed::Low);

    // Launch heat control on its own high-priority executor, so melodies and
    // display flushes can never delay a gate edge.
    {
        let zero_cross = ExtiInput::new(p.PA0, p.EXTI0, Pull::None);
        let gate = Output::new(p.PA1, Level::Low, Speed::Low);

        interrupt::UART4.set_priority(Priority::P6);
        let heat_spawner = HEAT_EXECUTOR.start(interrupt::UART4);
        unwrap!(heat_spawner.spawn(heat::heat_task(zero_cross, gate)));
    }

    // Load the tuning constants and launch EEPROM storage.
    {
        let i2c_bus = i2c::I2c::new(
            p.I2C1,
            p.PA15,
            p.PB7,
            Irqs,
            p.DMA1_CH5,
            p.DMA1_CH3,
            Hertz(100_000),
            Default::default(),
        );
        let mut eeprom = eeprom24x::Eeprom24x::new_24x64(i2c_bus, eeprom24x::SlaveAddr::Default);

        let tunings = eeprom::load_tunings(&mut eeprom).await;
        CONTROL_MUTEX.lock(|state| state.borrow_mut().tunings = tunings);

        unwrap!(spawner.spawn(eeprom::eeprom_task(eeprom)));
    }

    // Launch the wireless link: the module sits on USART2 at 2400 8-N-1.
    {
        let mut uart_config = usart::Config::default();
        uart_config.baudrate = 2400;
        let uart = unwrap!(usart::Uart::new(
            p.USART2,
            p.PA3,
            p.PA2,
            Irqs,
            p.DMA1_CH1,
            p.DMA1_CH2,
            uart_config,
        ));
        unwrap!(spawner.spawn(comm::comm_task(uart)));
    }

    // Launch the display.
    {
        let display_resources = {
            let spi_config = spi::Config::default();
            display::DisplayResources {
                spi: spi::Spi::new(
                    p.SPI2, p.PB13, p.PB15, p.PB14, p.DMA2_CH1, p.DMA2_CH2, spi_config,
                ),
                pin_dc: Output::new(p.PA10, Level::Low, Speed::High),
                pin_reset: Output::new(p.PA9, Level::Low, Speed::High),
                pin_cs: Output::new(p.PB12, Level::Low, Speed::High),
            }
        };
        unwrap!(spawner.spawn(display::display_task(display_resources)));
    }

    // Launch the buzzer.
    {
        let pwm_pin = PwmPin::new_ch1(p.PA8, OutputType::PushPull);
        let pwm = SimplePwm::new(
            p.TIM1,
            Some(pwm_pin),
            None,
            None,
            None,
            khz(4),
            Default::default(),
        );
        unwrap!(spawner.spawn(buzzer::buzzer_task(pwm)));
    }

    // Launch power switch supervision.
    {
        let pin_switch = ExtiInput::new(p.PB5, p.EXTI5, Pull::Up);
        unwrap!(spawner.spawn(power::power_task(power::PowerResources {
            pin_switch,
            pin_hold,
        })));
    }

    // Launch the cooking loop.
    {
        let adc = Adc::new(p.ADC2);
        let cook_resources = cook::CookResources {
            adc,
            pin_thermistor: p.PA4.degrade_adc(),
            led_heartbeat: Output::new(p.PB2, Level::Low, Speed::Low),
        };
        unwrap!(spawner.spawn(cook::cook_task(cook_resources)));
    }
}
