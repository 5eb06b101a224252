//! Unit registry: the address book plus per-unit channel state.
//!
//! Local units keep a permanent identity slot: a daemon that crashes and
//! respawns under the same name reacquires the same numeric id without any
//! coordination, because unregistration only marks the record offline.
//! Remote ids are assigned by their own host, so stale remote entries are
//! simply dropped.

use transport::Channel;

use crate::error::{BrokerError, BrokerResult};
use crate::message::{Address, FIRST_UNIT_ID};

/// Channel state for a local unit that requested a data transport.
#[derive(Debug)]
pub struct ChannelInfo {
    pub online: bool,
    pub shm_name: String,
    pub sem_name: String,
    pub capacity: u32,
    pub channel: Channel,
}

/// One address-book entry. Local records live for the whole process;
/// remote records live until unregistration.
#[derive(Debug)]
pub struct UnitRecord {
    pub name: String,
    pub address: Address,
    pub channel: Option<ChannelInfo>,
}

/// Name-to-address directory owning every local channel.
///
/// Mutated only from the dispatch thread; producers reach it exclusively by
/// pushing commands onto the bus.
#[derive(Debug)]
pub struct AddressBook {
    records: Vec<UnitRecord>,
    next_id: i32,
    prefix: String,
}

impl AddressBook {
    /// `prefix` seeds the derived channel object names:
    /// `"{prefix}{name}_shm"` and `"{prefix}{name}_sem"`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            next_id: FIRST_UNIT_ID,
            prefix: prefix.into(),
        }
    }

    /// Registers a local unit, allocating the next free id and, when
    /// `packet_size > 0`, opening its data channel.
    ///
    /// Idempotent by name: an existing record keeps its address untouched.
    /// A record that went offline comes back online on re-registration,
    /// reopening its channel with the originally requested capacity — this
    /// is the respawn path, so the requested size of the new call is
    /// ignored in favour of the identity the unit already owns.
    pub fn register_local(&mut self, name: &str, packet_size: u32) -> BrokerResult<Address> {
        if name.is_empty() {
            return Err(BrokerError::InvalidCommand("empty unit name"));
        }

        if let Some(record) = self.records.iter_mut().find(|r| r.name == name) {
            if let Some(info) = record.channel.as_mut() {
                if !info.online {
                    info.channel = Channel::open(
                        &info.shm_name,
                        &info.sem_name,
                        info.capacity as usize,
                        true,
                    )?;
                    info.online = true;
                }
            }
            return Ok(record.address);
        }

        let id = self.next_id;
        let channel = if packet_size > 0 {
            let shm_name = format!("{}{}_shm", self.prefix, name);
            let sem_name = format!("{}{}_sem", self.prefix, name);
            let channel = Channel::open(&shm_name, &sem_name, packet_size as usize, true)?;
            Some(ChannelInfo {
                online: true,
                shm_name,
                sem_name,
                capacity: packet_size,
                channel,
            })
        } else {
            None
        };

        // The id is only consumed once the channel allocation has
        // succeeded, so a failed registration leaves nothing behind.
        self.next_id += 1;
        let address = Address::local(id);
        self.records.push(UnitRecord {
            name: name.to_owned(),
            address,
            channel,
        });
        Ok(address)
    }

    /// Registers a remote unit under its externally assigned address.
    /// Idempotent by name exactly like [`AddressBook::register_local`].
    pub fn register_remote(&mut self, name: &str, ip: i32, id: i32) -> BrokerResult<Address> {
        if name.is_empty() {
            return Err(BrokerError::InvalidCommand("empty unit name"));
        }

        if let Some(record) = self.records.iter().find(|r| r.name == name) {
            return Ok(record.address);
        }

        let address = Address { ip, id };
        self.records.push(UnitRecord {
            name: name.to_owned(),
            address,
            channel: None,
        });
        Ok(address)
    }

    /// Takes a unit out of service.
    ///
    /// Local records are marked offline and their channel closed but the
    /// entry survives for id reacquisition; remote records are removed
    /// entirely. Unknown names are a no-op.
    pub fn unregister(&mut self, name: &str) {
        let Some(pos) = self.records.iter().position(|r| r.name == name) else {
            return;
        };
        if self.records[pos].address.is_local() {
            if let Some(info) = self.records[pos].channel.as_mut() {
                info.online = false;
                info.channel.close();
            }
        } else {
            self.records.remove(pos);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Address> {
        self.records
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.address)
    }

    pub fn record(&self, name: &str) -> Option<&UnitRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Channel of the online local unit with handle `id`, if any.
    pub fn channel_for(&mut self, id: i32) -> Option<&mut ChannelInfo> {
        self.records
            .iter_mut()
            .filter(|r| r.address.is_local() && r.address.id == id)
            .find_map(|r| r.channel.as_mut())
            .filter(|info| info.online)
    }

    /// Visits every currently-online local unit; offline units are skipped.
    pub fn for_each_online(&self, mut visit: impl FnMut(&UnitRecord)) {
        for record in &self.records {
            if record
                .channel
                .as_ref()
                .is_some_and(|info| info.online)
            {
                visit(record);
            }
        }
    }

    /// Handles of every currently-online local unit, for broadcast.
    pub fn online_ids(&self) -> Vec<i32> {
        let mut ids = Vec::new();
        self.for_each_online(|record| ids.push(record.address.id));
        ids
    }

    /// Closes every channel. Shutdown path only; records stay in place so
    /// late lookups still resolve.
    pub fn close_all(&mut self) {
        for record in &mut self.records {
            if let Some(info) = record.channel.as_mut() {
                info.online = false;
                info.channel.close();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
