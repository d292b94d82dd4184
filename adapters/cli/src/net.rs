//! UDP transport between the operator's machine and the robots.
//!
//! Every datagram carries one JSON document: primitives travel to the robot,
//! statuses and team snapshots travel back.

use std::{
    net::{Ipv6Addr, SocketAddr, SocketAddrV6, UdpSocket},
    sync::Arc,
    thread,
    time::Instant,
};

use anyhow::{Context, Result};
use botscope_core::{
    multicast_channel, ChannelId, Primitive, RobotStatus, SnapshotPublisher, TeamSnapshot,
};
use botscope_system_diagnostics::StatusBoard;
use serde::de::DeserializeOwned;
use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, info, warn};

const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Destination for primitives produced by the shell.
pub(crate) trait PrimitiveSender {
    /// Transmits one primitive to the robot.
    fn send(&mut self, primitive: &Primitive) -> Result<()>;
}

/// Multicast group shared by the robots on one channel, scoped to a local interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Multicast {
    group: Ipv6Addr,
    scope_id: u32,
}

impl Multicast {
    pub(crate) fn resolve(channel: ChannelId, interface: &str) -> Result<Self> {
        let group = multicast_channel(channel)
            .with_context(|| format!("channel {} has no multicast address", channel.get()))?;
        let scope_id = interface_index(interface)?;
        Ok(Self { group, scope_id })
    }

    fn target(&self, port: u16) -> SocketAddr {
        SocketAddr::V6(SocketAddrV6::new(self.group, port, 0, self.scope_id))
    }

    fn bind(&self, port: u16) -> Result<UdpSocket> {
        let socket = reusable_socket(port)?;
        socket
            .join_multicast_v6(&self.group, self.scope_id)
            .with_context(|| format!("failed to join multicast group {}", self.group))?;
        Ok(socket)
    }
}

/// Binds an IPv6 UDP socket on `port` that other local listeners may share.
fn reusable_socket(port: u16) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))
        .context("failed to create UDP socket")?;
    socket
        .set_reuse_address(true)
        .context("failed to set SO_REUSEADDR")?;
    #[cfg(unix)]
    socket
        .set_reuse_port(true)
        .context("failed to set SO_REUSEPORT")?;
    let address = SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, port, 0, 0));
    socket
        .bind(&address.into())
        .with_context(|| format!("failed to bind UDP port {port}"))?;
    Ok(socket.into())
}

/// Looks up the index of a network interface, used as the IPv6 scope id.
fn interface_index(interface: &str) -> Result<u32> {
    if_addrs::get_if_addrs()
        .context("failed to list network interfaces")?
        .into_iter()
        .find(|candidate| candidate.name == interface)
        .and_then(|candidate| candidate.index)
        .with_context(|| format!("unknown network interface '{interface}'"))
}

/// Sends primitives as JSON datagrams.
#[derive(Debug)]
pub(crate) struct UdpPrimitiveSender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpPrimitiveSender {
    pub(crate) fn new(socket: UdpSocket, target: SocketAddr) -> Self {
        Self { socket, target }
    }

    pub(crate) fn for_multicast(multicast: &Multicast, port: u16) -> Result<Self> {
        let socket = UdpSocket::bind(SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, 0, 0, 0))
            .context("failed to bind primitive socket")?;
        Ok(Self::new(socket, multicast.target(port)))
    }
}

impl PrimitiveSender for UdpPrimitiveSender {
    fn send(&mut self, primitive: &Primitive) -> Result<()> {
        let payload = serde_json::to_vec(primitive).context("failed to encode primitive")?;
        let _ = self
            .socket
            .send_to(&payload, self.target)
            .with_context(|| format!("failed to send primitive to {}", self.target))?;
        debug!(destination = %self.target, ?primitive, "sent primitive");
        Ok(())
    }
}

/// Starts a thread recording robot statuses received on `port` into `board`.
pub(crate) fn spawn_status_listener(
    multicast: &Multicast,
    port: u16,
    board: Arc<StatusBoard>,
) -> Result<()> {
    let socket = multicast.bind(port)?;
    spawn_listener("status-listener", socket, move |status: RobotStatus| {
        board.record(status, Instant::now());
    })
}

/// Starts a thread publishing team snapshots received on `port`.
pub(crate) fn spawn_snapshot_listener(
    multicast: &Multicast,
    port: u16,
    publisher: SnapshotPublisher<TeamSnapshot>,
) -> Result<()> {
    let socket = multicast.bind(port)?;
    spawn_listener("snapshot-listener", socket, move |snapshot: TeamSnapshot| {
        publisher.publish(snapshot);
    })
}

fn spawn_listener<T, F>(name: &str, socket: UdpSocket, mut deliver: F) -> Result<()>
where
    T: DeserializeOwned,
    F: FnMut(T) + Send + 'static,
{
    let local = socket.local_addr().context("listener socket has no address")?;
    let thread_name = name.to_owned();
    let _ = thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            info!(listener = %thread_name, %local, "listening for datagrams");
            let mut buffer = vec![0_u8; MAX_DATAGRAM_SIZE];
            loop {
                let (length, source) = match socket.recv_from(&mut buffer) {
                    Ok(received) => received,
                    Err(error) => {
                        warn!(listener = %thread_name, %error, "listener stopped");
                        return;
                    }
                };
                match serde_json::from_slice::<T>(&buffer[..length]) {
                    Ok(message) => deliver(message),
                    Err(error) => {
                        debug!(listener = %thread_name, %source, %error, "dropped malformed datagram")
                    }
                }
            }
        })
        .with_context(|| format!("failed to start {name} thread"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use botscope_core::{MoveDirection, RobotId};
    use std::time::Duration;

    fn loopback() -> UdpSocket {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("loopback socket");
        socket
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("read timeout");
        socket
    }

    fn status(sequence_number: u64) -> RobotStatus {
        RobotStatus {
            robot_id: RobotId::new(5),
            sequence_number,
            epoch_timestamp_seconds: 1_000 + sequence_number,
            battery_voltage: 24.1,
            capacitor_voltage: 190.0,
            primitive_packet_loss_percentage: 0,
            running_primitive: true,
        }
    }

    #[test]
    fn primitives_are_sent_as_json() {
        let receiver = loopback();
        let target = receiver.local_addr().expect("address");
        let mut sender = UdpPrimitiveSender::new(loopback(), target);
        let primitive = Primitive::Move {
            direction: MoveDirection::Back,
            heading_degrees: 270,
            speed: 40.0,
        };

        sender.send(&primitive).expect("datagram sent");

        let mut buffer = [0; 1024];
        let (length, _) = receiver.recv_from(&mut buffer).expect("datagram received");
        let decoded: Primitive = serde_json::from_slice(&buffer[..length]).expect("valid json");
        assert_eq!(decoded, primitive);
    }

    #[test]
    fn listener_delivers_decoded_statuses_and_skips_garbage() {
        let socket = loopback();
        let address = socket.local_addr().expect("address");
        let board = Arc::new(StatusBoard::new());
        let listener_board = Arc::clone(&board);
        spawn_listener("test-status", socket, move |status: RobotStatus| {
            listener_board.record(status, Instant::now());
        })
        .expect("listener starts");

        let sender = loopback();
        let _ = sender.send_to(b"not json", address).expect("garbage sent");
        let payload = serde_json::to_vec(&status(3)).expect("encodable");
        let _ = sender.send_to(&payload, address).expect("status sent");

        let deadline = Instant::now() + Duration::from_secs(5);
        let latest = loop {
            if let Some(latest) = board.latest() {
                break latest;
            }
            assert!(Instant::now() < deadline, "status never arrived");
            thread::sleep(Duration::from_millis(10));
        };
        assert_eq!(latest.status, status(3));
    }

    #[test]
    fn unknown_interface_is_reported() {
        let error = Multicast::resolve(ChannelId::new(0), "botscope-missing0")
            .expect_err("interface does not exist");

        assert!(format!("{error:#}").contains("botscope-missing0"));
    }

    #[test]
    fn listeners_share_a_port() {
        let first = reusable_socket(0).expect("first listener");
        let port = first.local_addr().expect("address").port();

        let second = reusable_socket(port).expect("second listener on the same port");

        assert_eq!(second.local_addr().expect("address").port(), port);
    }

    #[test]
    fn loopback_interface_has_an_index() {
        let multicast = Multicast::resolve(ChannelId::new(0), "lo").expect("loopback exists");

        assert_ne!(multicast.scope_id, 0);
    }

    #[test]
    fn channels_without_address_are_rejected() {
        assert!(Multicast::resolve(ChannelId::new(99), "lo").is_err());
    }
}
