//! Command payload layouts.
//!
//! Control-plane producers encode their requests into the payload carried by
//! [`Message::Command`](crate::message::Message); the dispatch loop decodes
//! them here. Integers are little-endian, unit names are NUL-terminated,
//! matching the layouts units already speak:
//!
//! | command            | payload                                |
//! |--------------------|----------------------------------------|
//! | SetBatchSize       | `count: u32` (exactly 4 bytes)         |
//! | RegisterUnit       | `packet_size: i32`, `name\0`           |
//! | RegisterRemoteUnit | `ip: i32`, `id: i32`, `name\0`         |
//! | UnregisterUnit     | `name\0`                               |
//!
//! Bytes after the name terminator are ignored, the way a fixed C struct
//! with a trailing name field would be read.

use crate::error::{BrokerError, BrokerResult};

const INT_LEN: usize = std::mem::size_of::<u32>();

/// Decoded local registration request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterUnit {
    pub name: String,
    pub packet_size: i32,
}

/// Decoded remote registration request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterRemoteUnit {
    pub name: String,
    pub ip: i32,
    pub id: i32,
}

pub fn encode_set_batch_size(count: u32) -> Vec<u8> {
    count.to_le_bytes().to_vec()
}

pub fn decode_set_batch_size(payload: &[u8]) -> BrokerResult<u32> {
    if payload.len() != INT_LEN {
        return Err(BrokerError::SizeMismatch {
            expected: INT_LEN,
            got: payload.len(),
        });
    }
    let mut buf = [0u8; INT_LEN];
    buf.copy_from_slice(payload);
    Ok(u32::from_le_bytes(buf))
}

pub fn encode_register_unit(name: &str, packet_size: i32) -> Vec<u8> {
    let mut payload = Vec::with_capacity(INT_LEN + name.len() + 1);
    payload.extend_from_slice(&packet_size.to_le_bytes());
    push_name(&mut payload, name);
    payload
}

pub fn decode_register_unit(payload: &[u8]) -> BrokerResult<RegisterUnit> {
    let (packet_size, rest) = read_i32(payload)?;
    let name = read_name(rest)?;
    Ok(RegisterUnit { name, packet_size })
}

pub fn encode_register_remote_unit(name: &str, ip: i32, id: i32) -> Vec<u8> {
    let mut payload = Vec::with_capacity(2 * INT_LEN + name.len() + 1);
    payload.extend_from_slice(&ip.to_le_bytes());
    payload.extend_from_slice(&id.to_le_bytes());
    push_name(&mut payload, name);
    payload
}

pub fn decode_register_remote_unit(payload: &[u8]) -> BrokerResult<RegisterRemoteUnit> {
    let (ip, rest) = read_i32(payload)?;
    let (id, rest) = read_i32(rest)?;
    let name = read_name(rest)?;
    Ok(RegisterRemoteUnit { name, ip, id })
}

pub fn encode_unregister_unit(name: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(name.len() + 1);
    push_name(&mut payload, name);
    payload
}

pub fn decode_unregister_unit(payload: &[u8]) -> BrokerResult<String> {
    read_name(payload)
}

fn push_name(payload: &mut Vec<u8>, name: &str) {
    payload.extend_from_slice(name.as_bytes());
    payload.push(0);
}

fn read_i32(payload: &[u8]) -> BrokerResult<(i32, &[u8])> {
    if payload.len() < INT_LEN {
        return Err(BrokerError::SizeMismatch {
            expected: INT_LEN,
            got: payload.len(),
        });
    }
    let mut buf = [0u8; INT_LEN];
    buf.copy_from_slice(&payload[..INT_LEN]);
    Ok((i32::from_le_bytes(buf), &payload[INT_LEN..]))
}

fn read_name(payload: &[u8]) -> BrokerResult<String> {
    let end = payload
        .iter()
        .position(|byte| *byte == 0)
        .ok_or(BrokerError::InvalidCommand("unit name missing terminator"))?;
    if end == 0 {
        return Err(BrokerError::InvalidCommand("empty unit name"));
    }
    std::str::from_utf8(&payload[..end])
        .map(str::to_owned)
        .map_err(|_| BrokerError::InvalidCommand("unit name is not valid utf-8"))
}
