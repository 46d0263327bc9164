//! Inbound/outbound packet dispatch: channel authorization, then
//! structural validation, then replay-safe nonce bookkeeping.

use crate::domain::{parse_packet, Acknowledgement, Event, OracleError, Packet};
use crate::domain::event;

use super::nonce_manager::NonceManager;
use super::OracleModule;

pub(super) fn receive_packet(
    module: &mut OracleModule<'_>,
    port_id: &str,
    channel_id: &str,
    sender: &str,
    payload: &[u8],
    now_unix_seconds: i64,
) -> Result<(Acknowledgement, Vec<Event>), OracleError> {
    let params = module.load_params()?;
    if !params
        .authorized_channels
        .iter()
        .any(|c| c.port_id == port_id && c.channel_id == channel_id)
    {
        return Err(OracleError::UnauthorizedChannel {
            port_id: port_id.to_string(),
            channel_id: channel_id.to_string(),
        });
    }

    let packet = parse_packet(payload)?;
    packet.validate_basic()?;

    let received = Event::new(event::EVT_PACKET_RECEIVED)
        .attr("channel_id", channel_id)
        .attr("sender", sender)
        .attr("packet_type", packet.type_tag());

    NonceManager::validate_incoming(
        module.store,
        channel_id,
        sender,
        packet.nonce(),
        packet.timestamp(),
        now_unix_seconds,
    )?;

    let ack = Acknowledgement { nonce: packet.nonce(), success: true };
    let acknowledged = Event::new(event::EVT_PACKET_ACKNOWLEDGED)
        .attr("channel_id", channel_id)
        .attr("nonce", ack.nonce);

    Ok((ack, vec![received, acknowledged]))
}

/// Serializes `packet` and assigns it the next outbound nonce for
/// `(channel_id, sender)`, returning the wire bytes ready to send.
pub(super) fn send_packet(
    module: &mut OracleModule<'_>,
    channel_id: &str,
    sender: &str,
    mut packet: Packet,
    now_unix_seconds: i64,
) -> Result<Vec<u8>, OracleError> {
    let nonce = NonceManager::next_outbound(module.store, channel_id, sender, now_unix_seconds)?;
    set_nonce(&mut packet, nonce);
    serde_json::to_vec(&packet).map_err(|e| OracleError::InvalidPacket(e.to_string()))
}

fn set_nonce(packet: &mut Packet, nonce: u64) {
    match packet {
        Packet::SubscribePrices { nonce: n, .. }
        | Packet::QueryPrice { nonce: n, .. }
        | Packet::PriceUpdate { nonce: n, .. }
        | Packet::OracleHeartbeat { nonce: n, .. } => *n = nonce,
    }
}
