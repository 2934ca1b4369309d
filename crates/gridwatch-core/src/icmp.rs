//! Active ICMP probing for ping monitors, via `surge-ping`.
//!
//! `surge-ping` opens a raw ICMP socket, which needs `CAP_NET_RAW` (or root)
//! unless the host's `net.ipv4.ping_group_range` sysctl admits the
//! process's group, in which case the kernel transparently serves it over
//! an unprivileged ICMP datagram socket instead. `PING_PRIVILEGED` doesn't
//! change which code path this module takes — it documents which of those
//! two deployment postures is expected, so a misconfigured container
//! (socket creation denied, sysctl unset) fails loudly at startup instead
//! of silently losing every probe.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use surge_ping::{Client, Config, IcmpPacket, PingIdentifier, PingSequence, SurgeError, ICMP};
use tracing::warn;

const PROBE_COUNT: u16 = 3;
const PROBE_PAYLOAD: [u8; 32] = [0u8; 32];

/// A single reachability probe, behind a trait so the fan-out checker can
/// be driven by a fast fake in tests instead of a real ICMP socket.
#[async_trait]
pub trait Pinger: Send + Sync {
    async fn probe(&self, target: IpAddr) -> bool;
}

pub struct IcmpProber {
    client: Client,
}

impl IcmpProber {
    pub fn new(privileged: bool) -> anyhow::Result<Self> {
        let config = Config::builder().kind(ICMP::V4).build();
        let client = Client::new(&config)?;
        if !privileged {
            warn!(
                "PING_PRIVILEGED=false: relying on net.ipv4.ping_group_range for unprivileged ICMP"
            );
        }
        Ok(Self { client })
    }

    /// Probe `target` with up to three packets, a five-second timeout, and
    /// return true on the first successful reply. A single unreachable
    /// target never blocks past the timeout.
    async fn probe_inner(&self, target: IpAddr) -> bool {
        let mut pinger = self
            .client
            .pinger(target, PingIdentifier(std::process::id() as u16))
            .await;
        pinger.timeout(Duration::from_secs(5));

        for seq in 0..PROBE_COUNT {
            match pinger.ping(PingSequence(seq), &PROBE_PAYLOAD).await {
                Ok((IcmpPacket::V4(_), _)) | Ok((IcmpPacket::V6(_), _)) => return true,
                Err(SurgeError::Timeout { .. }) => continue,
                Err(e) => {
                    warn!(target = %target, error = %e, "icmp probe error");
                    continue;
                }
            }
        }
        false
    }
}

#[async_trait]
impl Pinger for IcmpProber {
    async fn probe(&self, target: IpAddr) -> bool {
        self.probe_inner(target).await
    }
}
