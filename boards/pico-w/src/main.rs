#![deny(unsafe_code)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;

mod clock;
mod network;

/// Page served at `/`
const INDEX_HTML: &str = include_str!("index.html");

static RADIO_LINK: network::RadioLink = network::RadioLink::new();

#[app(device = embassy_rp::pac, peripherals = false, dispatchers = [SPI0_IRQ, SPI1_IRQ])]
mod app {
    use super::*;
    use defmt::{error, info, warn};
    use embassy_futures::join::join5;
    use embassy_rp::clocks::RoscRng;
    use embassy_rp::i2c::{self, I2c};
    use embassy_rp::peripherals;
    use embassy_time::{Delay, Timer};
    use rand_core::RngCore;

    use airnode_core::sensors::Scd4x;
    use airnode_core::{NodeConfig, NodeError, Orchestrator};

    use clock::EmbassyClock;
    use network::config::{self as net_config, NetworkConfig};
    use network::wifi::{self, WifiPeripherals};
    use network::{manager, radio, Cyw43Radio, HttpListener};

    type I2cPeripheral = embassy_rp::Peri<'static, peripherals::I2C0>;
    type PinGp0 = embassy_rp::Peri<'static, peripherals::PIN_0>;
    type PinGp1 = embassy_rp::Peri<'static, peripherals::PIN_1>;

    /// SCD4x on I2C0: SDA on GP0, SCL on GP1
    struct SensorPeripherals {
        i2c: I2cPeripheral,
        sda: PinGp0,
        scl: PinGp1,
    }

    #[shared]
    struct Shared {}

    #[local]
    struct Local {}

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local) {
        info!("Air-quality node starting...");

        let p = embassy_rp::init(Default::default());

        let wifi_periph = WifiPeripherals {
            pwr: p.PIN_23,
            cs: p.PIN_25,
            dio: p.PIN_24,
            clk: p.PIN_29,
            pio: p.PIO0,
            dma: p.DMA_CH0,
        };
        let sensor_periph = SensorPeripherals {
            i2c: p.I2C0,
            sda: p.PIN_0,
            scl: p.PIN_1,
        };

        node_task::spawn(wifi_periph, sensor_periph).ok();

        (Shared {}, Local {})
    }

    /// Node task - radio driver, network stack and the orchestrator loop
    ///
    /// Stack is !Send and must remain within this task.
    #[task(priority = 1)]
    async fn node_task(
        _cx: node_task::Context,
        wifi_periph: WifiPeripherals,
        sensor_periph: SensorPeripherals,
    ) {
        use embassy_net::{Config, StackResources};
        use static_cell::StaticCell;

        info!("Node task started");

        let (device, control, mut wifi_runner) = wifi::init_cyw43(wifi_periph).await;

        let seed = RoscRng.next_u64();
        static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
        let (stack, mut net_runner) = embassy_net::new(
            device,
            Config::dhcpv4(Default::default()),
            RESOURCES.init(StackResources::new()),
            seed,
        );

        join5(
            wifi_runner.run(),
            net_runner.run(),
            radio::run_control(control, &RADIO_LINK, NetworkConfig::default()),
            manager::watch_leases(stack),
            run_node(stack, sensor_periph),
        )
        .await;
    }

    async fn run_node(stack: embassy_net::Stack<'static>, sensor_periph: SensorPeripherals) -> ! {
        let config = NodeConfig::default();

        let candidates = match net_config::candidates() {
            Ok(list) => list,
            Err(e) => halt(e).await,
        };

        let mut i2c_config = i2c::Config::default();
        i2c_config.frequency = 100_000;
        let bus = I2c::new_blocking(
            sensor_periph.i2c,
            sensor_periph.scl,
            sensor_periph.sda,
            i2c_config,
        );
        let sensor = Scd4x::new(bus, Delay);

        let radio = Cyw43Radio::new(&RADIO_LINK, stack);
        let mut node = match Orchestrator::new(
            &config,
            radio,
            candidates,
            sensor,
            EmbassyClock,
            INDEX_HTML,
        ) {
            Ok(node) => node,
            Err(e) => halt(e).await,
        };

        let mut rx_buffer = [0u8; 1024];
        let mut tx_buffer = [0u8; 1024];
        let mut listener = match HttpListener::bind(
            stack,
            &mut rx_buffer,
            &mut tx_buffer,
            config.server.port,
            config.server.io_timeout,
        ) {
            Ok(listener) => listener,
            Err(e) => {
                warn!("Listener: {}", e);
                halt(NodeError::ListenerBind).await
            }
        };
        info!("HTTP server on port {}", config.server.port);

        node.run(&mut listener).await
    }

    /// Report a fatal startup error and park the task
    async fn halt(reason: NodeError) -> ! {
        loop {
            error!("Startup failed: {}", reason);
            Timer::after_secs(5).await;
        }
    }

    /// RTIC idle task - WFI sleep mode when no tasks active
    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        info!("Idle task started - entering WFI loop");
        loop {
            cortex_m::asm::wfi();
        }
    }
}
