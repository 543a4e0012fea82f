#[macro_use]
extern crate log;

mod client;
mod codec;
pub mod config;
pub mod constants;
mod error;

pub use client::{BlockHandler, Client, LifecycleState, NotificationHandlers};
pub use codec::{MessageCodec, MessageCodecError};
pub use config::{ConnectionConfig, TransportKind};
pub use error::Error;
