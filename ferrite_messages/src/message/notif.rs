use std::io::Write;

use cookie_factory::{
    bytes::{be_u32, be_u8},
    combinator::slice,
    sequence::tuple,
    SerializeFn, WriteContext,
};
use nom::{bytes::complete::take, number::complete as num, IResult};

use crate::hash::BlockHash;

/// The classes of server pushed events a client can subscribe to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum EventClass {
    BlockConnected,
    BlockDisconnected,
}

impl EventClass {
    pub fn code(self) -> u8 {
        match self {
            EventClass::BlockConnected => 0,
            EventClass::BlockDisconnected => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<EventClass> {
        match code {
            0 => Some(EventClass::BlockConnected),
            1 => Some(EventClass::BlockDisconnected),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventClass {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            EventClass::BlockConnected => write!(f, "block-connected"),
            EventClass::BlockDisconnected => write!(f, "block-disconnected"),
        }
    }
}

/// A server initiated message, not an answer to any request.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    BlockConnected { hash: BlockHash, height: u32 },
    BlockDisconnected { hash: BlockHash, height: u32 },
}

impl Notification {
    pub fn event_class(&self) -> EventClass {
        match self {
            Notification::BlockConnected { .. } => EventClass::BlockConnected,
            Notification::BlockDisconnected { .. } => EventClass::BlockDisconnected,
        }
    }
}

pub(super) fn fn_notification<'c, 'a: 'c, W: Write + 'c>(
    ntfn: &'a Notification,
) -> impl SerializeFn<W> + 'c {
    move |out: WriteContext<W>| match ntfn {
        Notification::BlockConnected { hash, height } => tuple((
            be_u8(EventClass::BlockConnected.code()),
            slice(&hash.0),
            be_u32(*height),
        ))(out),
        Notification::BlockDisconnected { hash, height } => tuple((
            be_u8(EventClass::BlockDisconnected.code()),
            slice(&hash.0),
            be_u32(*height),
        ))(out),
    }
}

pub(super) fn parse_notification(i: &[u8]) -> IResult<&[u8], Notification> {
    let (i, code) = num::be_u8(i)?;
    let (i, hash) = take(32usize)(i)?;
    let (i, height) = num::be_u32(i)?;
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(hash);
    let hash = BlockHash(bytes);
    match EventClass::from_code(code) {
        Some(EventClass::BlockConnected) => Ok((i, Notification::BlockConnected { hash, height })),
        Some(EventClass::BlockDisconnected) => {
            Ok((i, Notification::BlockDisconnected { hash, height }))
        }
        None => Err(nom::Err::Failure(nom::error::Error::new(
            i,
            nom::error::ErrorKind::Tag,
        ))),
    }
}
