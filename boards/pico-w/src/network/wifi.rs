//! CYW43 hardware layer

use cyw43::{Control, NetDriver, Runner, State};
use cyw43_pio::{PioSpi, DEFAULT_CLOCK_DIVIDER};
use defmt::info;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{DMA_CH0, PIN_23, PIN_24, PIN_25, PIN_29, PIO0};
use embassy_rp::pio::{Common, InterruptHandler, Pio};
use embassy_rp::{bind_interrupts, Peri};
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => InterruptHandler<PIO0>;
});

/// Driver runner, must be polled continuously for the chip to work
pub type WifiRunner = Runner<'static, Output<'static>, PioSpi<'static, PIO0, 0, DMA_CH0>>;

/// Pins and blocks wired to the CYW43439 on the Pico W
pub struct WifiPeripherals {
    pub pwr: Peri<'static, PIN_23>,
    pub cs: Peri<'static, PIN_25>,
    pub dio: Peri<'static, PIN_24>,
    pub clk: Peri<'static, PIN_29>,
    pub pio: Peri<'static, PIO0>,
    pub dma: Peri<'static, DMA_CH0>,
}

/// Power up the chip and load its firmware
///
/// The CLM blob is loaded later by the control loop, once the runner is
/// being polled.
pub async fn init_cyw43(
    periph: WifiPeripherals,
) -> (NetDriver<'static>, Control<'static>, WifiRunner) {
    let pwr = Output::new(periph.pwr, Level::Low);
    let cs = Output::new(periph.cs, Level::High);

    let Pio {
        common, sm0, irq0, ..
    } = Pio::new(periph.pio, Irqs);
    static PIO_COMMON: StaticCell<Common<'static, PIO0>> = StaticCell::new();
    let common = PIO_COMMON.init(common);

    let spi = PioSpi::new(
        common,
        sm0,
        DEFAULT_CLOCK_DIVIDER,
        irq0,
        cs,
        periph.dio,
        periph.clk,
        periph.dma,
    );

    static STATE: StaticCell<State> = StaticCell::new();
    let state = STATE.init(State::new());
    let (device, control, runner) = cyw43::new(state, pwr, spi, cyw43_firmware::CYW43_43439A0).await;

    info!("CYW43 firmware loaded");

    (device, control, runner)
}
