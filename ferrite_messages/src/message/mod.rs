use std::io::Write;

use cookie_factory::{
    bytes::{be_u32, be_u64},
    combinator::{slice, string},
    sequence::tuple,
    SerializeFn,
};
use nom::{bytes::complete::take, combinator::all_consuming, number::complete as num, IResult};

mod hello;
mod notif;
mod request;

pub use hello::{Hello, HelloAck, Reject};
pub use notif::{EventClass, Notification};
pub use request::{Call, Reply, Request, Response};

/// Frame header: magic `u32`, 12 byte NUL padded command, payload length `u64`.
pub const HEADER_LENGTH: usize = 24;

const COMMAND_LENGTH: usize = 12;

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum MessageType {
    Hello,
    HelloAck,
    Reject,
    Request,
    Response,
    Notif,
    Unknown(Vec<u8>),
}

impl MessageType {
    fn name(&self) -> &[u8] {
        match self {
            MessageType::Hello => b"hello",
            MessageType::HelloAck => b"helloack",
            MessageType::Reject => b"reject",
            MessageType::Request => b"request",
            MessageType::Response => b"response",
            MessageType::Notif => b"notif",
            MessageType::Unknown(cmd) => cmd,
        }
    }

    pub fn command(&self) -> [u8; COMMAND_LENGTH] {
        let name = self.name();
        let mut command = [0u8; COMMAND_LENGTH];
        let length = name.len().min(COMMAND_LENGTH);
        command[..length].copy_from_slice(&name[..length]);
        command
    }

    pub fn from_command(command: &[u8]) -> MessageType {
        let end = command
            .iter()
            .rposition(|b| *b != 0)
            .map(|p| p + 1)
            .unwrap_or(0);
        match &command[..end] {
            b"hello" => MessageType::Hello,
            b"helloack" => MessageType::HelloAck,
            b"reject" => MessageType::Reject,
            b"request" => MessageType::Request,
            b"response" => MessageType::Response,
            b"notif" => MessageType::Notif,
            other => MessageType::Unknown(other.to_vec()),
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.name()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Hello(Hello),
    HelloAck(HelloAck),
    Reject(Reject),
    Request(Request),
    Response(Response),
    Notif(Notification),
}

#[derive(Debug, Clone)]
pub struct MessageHeader {
    pub magic: u32,
    pub message_type: MessageType,
    pub payload_length: u64,
}

impl MessageHeader {
    pub fn from_bytes(expected_magic: u32, bytes: &[u8]) -> Result<Self, MessageError> {
        let (_, header) = all_consuming(parse_header)(bytes)
            .map_err(|e: nom::Err<nom::error::Error<&[u8]>>| {
                MessageError::InvalidPayload(e.to_string())
            })?;
        if header.magic != expected_magic {
            return Err(MessageError::InvalidMagic {
                expected: expected_magic,
                got: header.magic,
            });
        }
        Ok(header)
    }
}

fn parse_header(i: &[u8]) -> IResult<&[u8], MessageHeader> {
    let (i, magic) = num::be_u32(i)?;
    let (i, command) = take(COMMAND_LENGTH)(i)?;
    let (i, payload_length) = num::be_u64(i)?;
    Ok((
        i,
        MessageHeader {
            magic,
            message_type: MessageType::from_command(command),
            payload_length,
        },
    ))
}

#[derive(Debug)]
pub enum MessageError {
    InvalidMagic { expected: u32, got: u32 },
    UnknownType(Vec<u8>),
    InvalidSize { expected: u64, got: u64 },
    InvalidPayload(String),
}

impl std::fmt::Display for MessageError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MessageError::InvalidMagic { expected, got } => {
                write!(f, "invalid magic, got {} expected {}", got, expected)
            }
            MessageError::UnknownType(cmd) => {
                write!(f, "unknown command: {}", String::from_utf8_lossy(cmd))
            }
            MessageError::InvalidSize { expected, got } => {
                write!(f, "payload of {} bytes, header said {}", got, expected)
            }
            MessageError::InvalidPayload(e) => write!(f, "invalid payload: {}", e),
        }
    }
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Hello(_) => MessageType::Hello,
            Message::HelloAck(_) => MessageType::HelloAck,
            Message::Reject(_) => MessageType::Reject,
            Message::Request(_) => MessageType::Request,
            Message::Response(_) => MessageType::Response,
            Message::Notif(_) => MessageType::Notif,
        }
    }

    pub fn payload(&self) -> Vec<u8> {
        match self {
            Message::Hello(m) => crate::as_bytes(hello::fn_hello(m)),
            Message::HelloAck(m) => crate::as_bytes(hello::fn_hello_ack(m)),
            Message::Reject(m) => crate::as_bytes(hello::fn_reject(m)),
            Message::Request(m) => crate::as_bytes(request::fn_request(m)),
            Message::Response(m) => crate::as_bytes(request::fn_response(m)),
            Message::Notif(m) => crate::as_bytes(notif::fn_notification(m)),
        }
    }

    pub fn to_bytes(&self, magic: u32) -> Vec<u8> {
        let payload = self.payload();
        let command = self.message_type().command();
        let mut bytes = crate::as_bytes(tuple((
            be_u32(magic),
            slice(&command),
            be_u64(payload.len() as u64),
        )));
        bytes.extend_from_slice(&payload);
        bytes
    }

    pub fn from_payload(header: &MessageHeader, payload: &[u8]) -> Result<Message, MessageError> {
        if header.payload_length != payload.len() as u64 {
            return Err(MessageError::InvalidSize {
                expected: header.payload_length,
                got: payload.len() as u64,
            });
        }
        trace!(
            "parsing {} payload of {} bytes",
            header.message_type,
            payload.len()
        );
        match &header.message_type {
            MessageType::Hello => all_consuming(hello::parse_hello)(payload)
                .map(|(_, m)| Message::Hello(m)),
            MessageType::HelloAck => all_consuming(hello::parse_hello_ack)(payload)
                .map(|(_, m)| Message::HelloAck(m)),
            MessageType::Reject => all_consuming(hello::parse_reject)(payload)
                .map(|(_, m)| Message::Reject(m)),
            MessageType::Request => all_consuming(request::parse_request)(payload)
                .map(|(_, m)| Message::Request(m)),
            MessageType::Response => all_consuming(request::parse_response)(payload)
                .map(|(_, m)| Message::Response(m)),
            MessageType::Notif => all_consuming(notif::parse_notification)(payload)
                .map(|(_, m)| Message::Notif(m)),
            MessageType::Unknown(cmd) => return Err(MessageError::UnknownType(cmd.clone())),
        }
        .map_err(|e| MessageError::InvalidPayload(e.to_string()))
    }
}

pub(crate) fn fn_varbytes<'c, 'a: 'c, W: Write + 'c>(data: &'a [u8]) -> impl SerializeFn<W> + 'c {
    tuple((be_u64(data.len() as u64), slice(data)))
}

pub(crate) fn fn_varstr<'c, 'a: 'c, W: Write + 'c>(data: &'a str) -> impl SerializeFn<W> + 'c {
    tuple((be_u64(data.len() as u64), string(data)))
}

pub(crate) fn parse_varbytes(i: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (i, length) = num::be_u64(i)?;
    let (i, data) = take(length as usize)(i)?;
    Ok((i, data.to_vec()))
}

pub(crate) fn parse_varstr(i: &[u8]) -> IResult<&[u8], String> {
    let (i, data) = parse_varbytes(i)?;
    match String::from_utf8(data) {
        Ok(s) => Ok((i, s)),
        Err(_) => Err(nom::Err::Failure(nom::error::Error::new(
            i,
            nom::error::ErrorKind::Char,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::BlockHash;

    const MAGIC: u32 = 0x4645_5252;

    fn round_trip(message: Message) -> Message {
        let bytes = message.to_bytes(MAGIC);
        let header = MessageHeader::from_bytes(MAGIC, &bytes[..HEADER_LENGTH]).unwrap();
        assert_eq!(header.message_type, message.message_type());
        Message::from_payload(&header, &bytes[HEADER_LENGTH..]).unwrap()
    }

    #[test]
    fn hello_round_trip() {
        let message = Message::Hello(Hello {
            version: 1,
            streaming: true,
            user: String::from("rpcuser"),
            secret: String::from("rpcpass"),
        });
        assert_eq!(round_trip(message.clone()), message);
    }

    #[test]
    fn hello_ack_round_trip() {
        let message = Message::HelloAck(HelloAck {
            certificate: vec![1, 2, 3, 4],
        });
        assert_eq!(round_trip(message.clone()), message);
    }

    #[test]
    fn reject_round_trip() {
        let message = Message::Reject(Reject {
            reason: String::from("bad credentials"),
        });
        assert_eq!(round_trip(message.clone()), message);
    }

    #[test]
    fn request_round_trips() {
        for call in [
            Call::BlockCount,
            Call::BestBlockHash,
            Call::Subscribe(vec![EventClass::BlockConnected, EventClass::BlockDisconnected]),
        ] {
            let message = Message::Request(Request { id: 7, call });
            assert_eq!(round_trip(message.clone()), message);
        }
    }

    #[test]
    fn response_round_trips() {
        for result in [
            Ok(Reply::Ack),
            Ok(Reply::BlockCount(123_456)),
            Ok(Reply::BlockHash(BlockHash([0xab; 32]))),
            Err(String::from("no such method")),
        ] {
            let message = Message::Response(Response { id: 9, result });
            assert_eq!(round_trip(message.clone()), message);
        }
    }

    #[test]
    fn notification_round_trip() {
        let message = Message::Notif(Notification::BlockConnected {
            hash: BlockHash([7; 32]),
            height: 42,
        });
        assert_eq!(round_trip(message.clone()), message);
    }

    #[test]
    fn header_rejects_wrong_magic() {
        let bytes = Message::Reject(Reject {
            reason: String::new(),
        })
        .to_bytes(MAGIC);
        match MessageHeader::from_bytes(0xdead_beef, &bytes[..HEADER_LENGTH]) {
            Err(MessageError::InvalidMagic { got, .. }) => assert_eq!(got, MAGIC),
            other => panic!("expected InvalidMagic, got {:?}", other),
        }
    }

    #[test]
    fn unknown_command_is_preserved() {
        match MessageType::from_command(b"frobnicate\0\0") {
            MessageType::Unknown(cmd) => assert_eq!(cmd, b"frobnicate"),
            other => panic!("expected Unknown, got {:?}", other),
        }
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let message = Message::Hello(Hello {
            version: 1,
            streaming: false,
            user: String::from("u"),
            secret: String::from("s"),
        });
        let bytes = message.to_bytes(MAGIC);
        let header = MessageHeader::from_bytes(MAGIC, &bytes[..HEADER_LENGTH]).unwrap();
        match Message::from_payload(&header, &bytes[HEADER_LENGTH..bytes.len() - 1]) {
            Err(MessageError::InvalidSize { .. }) => (),
            other => panic!("expected InvalidSize, got {:?}", other),
        }
    }
}
