//! `Radio` bridge to the CYW43 control loop
//!
//! [`Cyw43Radio`] is called from inside the orchestrator and must never
//! wait, so each request is queued on a [`RadioLink`] and [`run_control`]
//! carries it out against the driver. Results flow back through a shared
//! [`LinkSnapshot`] that the bridge reads; each request carries the snapshot
//! generation it was made under, and results of superseded requests are
//! discarded.

use core::cell::RefCell;
use core::net::Ipv4Addr;

use airnode_core::network::candidates::MAX_CREDENTIAL_LEN;
use cyw43::{Control, JoinOptions, PowerManagementMode, ScanOptions};
use defmt::{info, warn};
use embassy_net::Stack;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_time::{with_timeout, Duration};
use hal_abstractions::{LinkSnapshot, Radio, RadioStatus, ScanResults, Ssid};
use heapless::String;

use super::config::NetworkConfig;
use super::error::NetworkError;

/// A connection cycle queues at most leave, scan and join back to back
const COMMAND_DEPTH: usize = 4;

/// Event status the firmware reports when no access point matched
const EVENT_STATUS_NO_NETWORKS: u32 = 3;

enum RadioCommand {
    Leave {
        generation: u32,
    },
    Scan,
    Join {
        generation: u32,
        ssid: Ssid,
        credential: String<MAX_CREDENTIAL_LEN>,
    },
}

/// Command queue and status snapshot shared by the bridge and the control loop
pub struct RadioLink {
    commands: Channel<CriticalSectionRawMutex, RadioCommand, COMMAND_DEPTH>,
    snapshot: Mutex<CriticalSectionRawMutex, RefCell<LinkSnapshot>>,
}

impl RadioLink {
    pub const fn new() -> Self {
        Self {
            commands: Channel::new(),
            snapshot: Mutex::new(RefCell::new(LinkSnapshot::new())),
        }
    }

    fn publish<T>(&self, update: impl FnOnce(&mut LinkSnapshot) -> T) -> T {
        self.snapshot.lock(|cell| update(&mut cell.borrow_mut()))
    }

    fn read<T>(&self, view: impl FnOnce(&LinkSnapshot) -> T) -> T {
        self.snapshot.lock(|cell| view(&cell.borrow()))
    }
}

impl Default for RadioLink {
    fn default() -> Self {
        Self::new()
    }
}

/// Station-mode radio as seen by the connectivity supervisor
pub struct Cyw43Radio {
    link: &'static RadioLink,
    stack: Stack<'static>,
}

impl Cyw43Radio {
    pub fn new(link: &'static RadioLink, stack: Stack<'static>) -> Self {
        Self { link, stack }
    }

    fn request(&self, command: RadioCommand) -> Result<(), NetworkError> {
        self.link
            .commands
            .try_send(command)
            .map_err(|_| NetworkError::CommandQueueFull)
    }
}

impl Radio for Cyw43Radio {
    type Error = NetworkError;

    fn reset(&mut self) -> Result<(), NetworkError> {
        let generation = self.link.publish(|s| s.begin(RadioStatus::Idle));
        self.request(RadioCommand::Leave { generation })
    }

    /// Results of the last completed scan
    ///
    /// A fresh scan is queued each call, so the list lags by one request.
    fn scan(&mut self) -> Result<ScanResults, NetworkError> {
        self.request(RadioCommand::Scan)?;
        Ok(self.link.read(|s| s.scan.clone()))
    }

    fn disconnect(&mut self) -> Result<(), NetworkError> {
        let generation = self.link.publish(|s| s.begin(RadioStatus::Idle));
        self.request(RadioCommand::Leave { generation })
    }

    fn connect(&mut self, identifier: &str, credential: &str) -> Result<(), NetworkError> {
        let ssid = Ssid::try_from(identifier).map_err(|_| NetworkError::InvalidRequest)?;
        let credential = String::try_from(credential).map_err(|_| NetworkError::InvalidRequest)?;
        let generation = self.link.publish(|s| s.begin(RadioStatus::Connecting));
        self.request(RadioCommand::Join {
            generation,
            ssid,
            credential,
        })
    }

    fn status(&mut self) -> RadioStatus {
        if self.is_associated() {
            RadioStatus::GotIp
        } else {
            self.link.read(|s| s.status)
        }
    }

    fn is_associated(&mut self) -> bool {
        self.link.read(LinkSnapshot::joined) && self.stack.is_config_up()
    }

    fn local_address(&mut self) -> Option<Ipv4Addr> {
        self.stack.config_v4().map(|config| config.address.address())
    }
}

/// Own the driver and execute queued commands, forever
///
/// Loads the CLM blob first, which needs the driver runner to be polled
/// concurrently.
pub async fn run_control(
    mut control: Control<'static>,
    link: &'static RadioLink,
    config: NetworkConfig,
) -> ! {
    control.init(cyw43_firmware::CYW43_43439A0_CLM).await;
    if config.power_save {
        control
            .set_power_management(PowerManagementMode::PowerSave)
            .await;
    }
    info!("Radio control loop ready");

    let join_timeout = Duration::from_secs(config.join_timeout_secs);
    loop {
        match link.commands.receive().await {
            RadioCommand::Leave { generation } => {
                control.leave().await;
                link.publish(|s| s.complete_leave(generation));
            }
            RadioCommand::Scan => {
                let found = scan(&mut control).await;
                info!("Scan found {} networks", found.len());
                link.publish(|s| s.scan = found);
            }
            RadioCommand::Join {
                generation,
                ssid,
                credential,
            } => {
                if !link.read(|s| s.is_current(generation)) {
                    info!("Join '{}' superseded before it started", ssid.as_str());
                    continue;
                }
                let options = if credential.is_empty() {
                    JoinOptions::new_open()
                } else {
                    JoinOptions::new(credential.as_bytes())
                };
                let result = match with_timeout(join_timeout, control.join(&ssid, options)).await {
                    Ok(Ok(())) => {
                        info!("Joined '{}', waiting for DHCP", ssid.as_str());
                        Ok(())
                    }
                    Ok(Err(err)) => {
                        warn!("Join '{}' failed: status {}", ssid.as_str(), err.status);
                        Err(join_failure(err.status))
                    }
                    Err(_) => {
                        warn!("Join '{}' did not complete", ssid.as_str());
                        Err(RadioStatus::ConnectFailed)
                    }
                };
                let current = link.publish(|s| s.complete_join(generation, result));
                if !current && result.is_ok() {
                    warn!("Join '{}' finished after a newer request, leaving", ssid.as_str());
                    control.leave().await;
                }
            }
        }
    }
}

/// The firmware does not tell a bad passphrase apart from other failures
fn join_failure(event_status: u32) -> RadioStatus {
    match event_status {
        EVENT_STATUS_NO_NETWORKS => RadioStatus::NoApFound,
        _ => RadioStatus::ConnectFailed,
    }
}

async fn scan(control: &mut Control<'_>) -> ScanResults {
    let mut found = ScanResults::new();
    let mut scanner = control.scan(ScanOptions::default()).await;
    while let Some(bss) = scanner.next().await {
        let len = usize::from(bss.ssid_len).min(bss.ssid.len());
        let Ok(name) = core::str::from_utf8(&bss.ssid[..len]) else {
            continue;
        };
        if name.is_empty() || found.iter().any(|seen| seen == name) {
            continue;
        }
        let Ok(ssid) = Ssid::try_from(name) else {
            continue;
        };
        if found.push(ssid).is_err() {
            break;
        }
    }
    found
}
