use log::debug;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::UdpSocket;

use super::packet::ObservationPacket;

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("socket setup failed: {0}")]
    Socket(std::io::Error),

    #[error("send failed: {0}")]
    Send(std::io::Error),

    #[error("packet serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Broadcast one datagram from a short-lived socket
///
/// Best effort: there is no acknowledgement and no retry.
pub async fn send_datagram(payload: &str, target: SocketAddr) -> Result<usize, BroadcastError> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(BroadcastError::Socket)?;
    socket.set_broadcast(true).map_err(BroadcastError::Socket)?;

    let sent = socket
        .send_to(payload.as_bytes(), target)
        .await
        .map_err(BroadcastError::Send)?;
    debug!("Sent {} bytes to {}", sent, target);
    Ok(sent)
}

/// Render a packet and broadcast it
pub async fn broadcast_packet(
    packet: &ObservationPacket,
    target: SocketAddr,
) -> Result<usize, BroadcastError> {
    let text = packet.to_json()?;
    send_datagram(&text, target).await
}
