//! Network side of the node
//!
//! - **`config`**: candidate networks baked in at build time
//! - **`error`**: error enum shared by the radio bridge and the listener
//! - **`manager`**: DHCP lease reporting
//! - **`radio`**: `Radio` bridge to the CYW43 control loop
//! - **`socket`**: `Listener` / `Connection` over an embassy-net TCP socket
//! - **`wifi`**: CYW43 bring-up over PIO SPI
//!
//! ## Architecture
//!
//! The CYW43 `Control` API is async, while the connectivity supervisor
//! expects every radio call to return immediately. The node therefore never
//! touches `Control` directly: it queues commands to [`radio::run_control`],
//! which owns the driver, and reads back the last status that loop
//! published. Everything runs inside one RTIC task because the embassy-net
//! `Stack` is !Send.

pub mod config;
pub mod error;
pub mod manager;
pub mod radio;
pub mod socket;
pub mod wifi;

pub use radio::{Cyw43Radio, RadioLink};
pub use socket::HttpListener;
