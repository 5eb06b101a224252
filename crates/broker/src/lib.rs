//! Local inter-process communication broker core.
//!
//! Cooperating processes ("units") register with the daemon embedding this
//! crate; each local unit gets a dedicated [`transport::Channel`] for its
//! data traffic and a handle in the notification queue. Internally all
//! control and data traffic is sequenced through one [`Bus`] drained by the
//! single-threaded [`Broker`] dispatch loop.
//!
//! Producers (a control-plane handler, unit readers) push [`Message`]s from
//! any thread; registry state is mutated only on the dispatch thread.

mod bus;
mod config;
mod dispatch;
mod error;
mod message;
mod registry;
pub mod wire;

pub use bus::{Bus, Drained};
pub use config::{BrokerConfig, DEFAULT_BATCH_SIZE};
pub use dispatch::{Broker, NOTICE_CHANNEL_READY, NOTICE_SHUTDOWN};
pub use error::{BrokerError, BrokerResult};
pub use message::{Address, CommandKind, Message, DAEMON_ID, FIRST_UNIT_ID};
pub use registry::{AddressBook, ChannelInfo, UnitRecord};
