//! The broker dispatch loop: single consumer of the bus.
//!
//! Every invocation drains one bounded batch and routes each message to the
//! data path (a unit channel) or the command path (registry and settings
//! mutation). All registry mutation happens here, on the one thread driving
//! the loop; producers only ever push onto the bus. No error on any single
//! message may take the loop down.

use std::sync::Arc;

use log::{debug, info, warn};

use transport::NotifyQueue;

use crate::bus::Bus;
use crate::config::BrokerConfig;
use crate::error::{BrokerError, BrokerResult};
use crate::message::{Address, CommandKind, Message};
use crate::registry::AddressBook;
use crate::wire;

/// Notice queued for a unit once its channel is ready for traffic.
pub const NOTICE_CHANNEL_READY: &[u8] = b"channel-ready";
/// Notice broadcast to every online unit when the daemon terminates.
pub const NOTICE_SHUTDOWN: &[u8] = b"shutdown";

/// The broker core: owns the registry, consumes the bus, pushes notices.
pub struct Broker {
    bus: Arc<Bus>,
    notify: Arc<NotifyQueue>,
    registry: AddressBook,
    batch_size: u32,
}

impl Broker {
    pub fn new(config: &BrokerConfig, bus: Arc<Bus>, notify: Arc<NotifyQueue>) -> Self {
        Self {
            bus,
            notify,
            registry: AddressBook::new(config.channel_prefix.clone()),
            batch_size: config.batch_size,
        }
    }

    pub fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }

    pub fn registry(&self) -> &AddressBook {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut AddressBook {
        &mut self.registry
    }

    /// Batch size applied to the next invocation.
    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    /// Drains and handles up to one batch of bus messages.
    ///
    /// Stops early when the bus runs dry; never blocks waiting for more
    /// traffic. Returns the number of messages handled. A `SetBatchSize`
    /// inside the batch applies from the following invocation.
    pub fn process_bus_messages(&mut self) -> usize {
        let batch = self.bus.drain(self.batch_size as usize);
        let handled = batch.len();
        for message in batch {
            match message {
                Message::Data { src, dest, payload } => self.route(src, dest, &payload),
                Message::Command { kind, payload } => self.execute(kind, &payload),
            }
        }
        handled
    }

    /// Data path: deliver through the destination unit's channel.
    ///
    /// Offline, unknown, or remote destinations drop the message; there is
    /// no retry queue.
    fn route(&mut self, src: Address, dest: Address, payload: &[u8]) {
        if let Err(err) = self.try_route(dest, payload) {
            warn!(
                "dropping message from {}:{} to {}:{}: {err}",
                src.ip, src.id, dest.ip, dest.id
            );
        }
    }

    fn try_route(&mut self, dest: Address, payload: &[u8]) -> BrokerResult<()> {
        if !dest.is_local() {
            return Err(BrokerError::Unimplemented("routing to remote hosts"));
        }
        let info = self
            .registry
            .channel_for(dest.id)
            .ok_or_else(|| BrokerError::NotFound {
                unit: dest.id.to_string(),
            })?;
        info.channel.write(payload)?;
        Ok(())
    }

    /// Command path: decode the payload for the kind and apply it.
    fn execute(&mut self, kind: CommandKind, payload: &[u8]) {
        match kind {
            CommandKind::Connect => warn!("connect command is not implemented yet"),
            CommandKind::Disconnect => warn!("disconnect command is not implemented yet"),
            CommandKind::SetBatchSize => match wire::decode_set_batch_size(payload) {
                Ok(count) => {
                    info!("dispatch batch size changed to {count}");
                    self.batch_size = count;
                }
                Err(err) => warn!("rejecting batch size change: {err}"),
            },
            CommandKind::RegisterUnit => match wire::decode_register_unit(payload) {
                Ok(cmd) => self.register_local(&cmd.name, cmd.packet_size.max(0) as u32),
                Err(err) => warn!("malformed register command: {err}"),
            },
            CommandKind::RegisterRemoteUnit => match wire::decode_register_remote_unit(payload) {
                Ok(cmd) => match self.registry.register_remote(&cmd.name, cmd.ip, cmd.id) {
                    Ok(address) => {
                        info!(
                            "remote unit [{}] registered as {}:{}",
                            cmd.name, address.ip, address.id
                        );
                    }
                    Err(err) => warn!("remote registration of [{}] failed: {err}", cmd.name),
                },
                Err(err) => warn!("malformed remote register command: {err}"),
            },
            CommandKind::UnregisterUnit => match wire::decode_unregister_unit(payload) {
                Ok(name) => self.unregister(&name),
                Err(err) => warn!("malformed unregister command: {err}"),
            },
        }
    }

    fn register_local(&mut self, name: &str, packet_size: u32) {
        match self.registry.register_local(name, packet_size) {
            Ok(address) => {
                info!(
                    "unit [{name}] registered as {}:{} (packet size {packet_size})",
                    address.ip, address.id
                );
                self.notify.register(address.id);
                if let Err(err) = self.notify.send(address.id, NOTICE_CHANNEL_READY) {
                    warn!("ready notice for unit {} failed: {err}", address.id);
                }
            }
            Err(err) => warn!("registration of [{name}] failed: {err}"),
        }
    }

    fn unregister(&mut self, name: &str) {
        if let Some(address) = self.registry.lookup(name) {
            if address.is_local() {
                self.notify.unregister(address.id);
                info!(
                    "unit [{name}]:{}:{} is marked offline",
                    address.ip, address.id
                );
            } else {
                info!("unit [{name}]:{}:{} is removed", address.ip, address.id);
            }
        } else {
            debug!("unregister of unknown unit [{name}] ignored");
        }
        self.registry.unregister(name);
    }

    /// Broadcasts the shutdown notice, drops pending traffic, and closes
    /// every channel.
    pub fn shutdown(&mut self) {
        let online = self.registry.online_ids();
        if let Err(err) = self.notify.broadcast(&online, NOTICE_SHUTDOWN) {
            warn!("shutdown broadcast failed: {err}");
        }
        self.bus.clear();
        self.registry.close_all();
        info!("broker shut down, {} unit(s) notified", online.len());
    }
}
