//! Addresses and the tagged messages carried by the bus.

/// Handle reserved for the core daemon itself.
pub const DAEMON_ID: i32 = 1;

/// First handle handed out to a locally registered unit; 0 and 1 are
/// reserved and never allocated.
pub const FIRST_UNIT_ID: i32 = 2;

/// Identity of a unit: `ip == 0` means the unit lives on this host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Address {
    pub ip: i32,
    pub id: i32,
}

impl Address {
    pub fn local(id: i32) -> Self {
        Self { ip: 0, id }
    }

    pub fn is_local(&self) -> bool {
        self.ip == 0
    }
}

/// Discriminant for the command path. New kinds extend this enum, which
/// keeps every dispatch site exhaustive at compile time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Connect,
    Disconnect,
    SetBatchSize,
    RegisterUnit,
    RegisterRemoteUnit,
    UnregisterUnit,
}

/// A bus message. Ownership moves wholly into the bus on push and wholly
/// out to the dispatch loop on pop; nothing is shared or aliased.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// Payload addressed to a unit, routed through its channel.
    Data {
        src: Address,
        dest: Address,
        payload: Vec<u8>,
    },
    /// Instruction to the broker itself; the payload layout depends on the
    /// kind and is decoded by the wire module.
    Command { kind: CommandKind, payload: Vec<u8> },
}
