//! DHCP lease watcher
//!
//! Purely diagnostic: the connectivity supervisor decides when the link is
//! usable, this only reports what the stack was handed.

use defmt::{info, warn};
use embassy_net::Stack;

/// Report every lease gained and lost, forever
pub async fn watch_leases(stack: Stack<'_>) -> ! {
    let mut leases: u32 = 0;
    loop {
        stack.wait_config_up().await;
        leases = leases.wrapping_add(1);
        match stack.config_v4() {
            Some(lease) => info!(
                "Lease #{}: {} via {:?}",
                leases,
                lease.address,
                lease.gateway.map(|gw| gw.octets())
            ),
            None => info!("Lease #{}: link configured without IPv4", leases),
        }

        stack.wait_config_down().await;
        warn!("Lease #{} released", leases);
    }
}
