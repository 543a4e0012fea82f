use bytes::BytesMut;
use ferrite_messages::message::{Message, MessageError, MessageHeader, MessageType, HEADER_LENGTH};
use tokio_util::codec::{Decoder, Encoder};

#[derive(Debug)]
pub enum MessageCodecError {
    IoError(std::io::Error),
    InvalidMessage(MessageError),
}

impl std::fmt::Display for MessageCodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MessageCodecError::IoError(e) => write!(f, "io error: {}", e),
            MessageCodecError::InvalidMessage(e) => write!(f, "invalid message: {}", e),
        }
    }
}

impl From<MessageError> for MessageCodecError {
    fn from(err: MessageError) -> Self {
        Self::InvalidMessage(err)
    }
}

impl From<std::io::Error> for MessageCodecError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err)
    }
}

pub struct MessageCodec {
    header: Option<MessageHeader>,
}

impl MessageCodec {
    pub fn new() -> MessageCodec {
        MessageCodec { header: None }
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = MessageCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.header.is_none() {
                if buf.len() < HEADER_LENGTH {
                    return Ok(None);
                }
                trace!("reading header");
                let header = buf.split_to(HEADER_LENGTH);
                let header = MessageHeader::from_bytes(crate::constants::MAGIC, &header)?;
                trace!(
                    "message: {} of size {} to read",
                    header.message_type,
                    header.payload_length
                );
                self.header = Some(header);
            }
            let header = match self.header.take() {
                Some(header) => header,
                None => return Ok(None),
            };
            if buf.len() < header.payload_length as usize {
                self.header = Some(header);
                return Ok(None);
            }
            trace!("reading payload");
            let payload = buf.split_to(header.payload_length as usize);
            if let MessageType::Unknown(cmd) = &header.message_type {
                // unadvertised commands are skipped, not fatal
                warn!(
                    "skipping unknown command: {}",
                    String::from_utf8_lossy(cmd)
                );
                continue;
            }
            return Ok(Some(Message::from_payload(&header, &payload)?));
        }
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = MessageCodecError;

    fn encode(&mut self, message: Message, buf: &mut BytesMut) -> Result<(), Self::Error> {
        buf.extend_from_slice(&message.to_bytes(crate::constants::MAGIC));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrite_messages::message::{Hello, Reject};

    fn hello() -> Message {
        Message::Hello(Hello {
            version: 1,
            streaming: true,
            user: String::from("rpcuser"),
            secret: String::from("rpcpass"),
        })
    }

    #[test]
    fn decodes_what_it_encodes() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(hello(), &mut buf).unwrap();
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, hello());
        assert!(buf.is_empty());
    }

    #[test]
    fn partial_frames_yield_nothing() {
        let mut codec = MessageCodec::new();
        let mut full = BytesMut::new();
        codec.encode(hello(), &mut full).unwrap();

        let mut buf = BytesMut::from(&full[..HEADER_LENGTH + 3]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&full[HEADER_LENGTH + 3..]);
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), hello());
    }

    #[test]
    fn unknown_commands_are_skipped() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();

        // a frame with an unadvertised command, then a valid one
        buf.extend_from_slice(&crate::constants::MAGIC.to_be_bytes());
        buf.extend_from_slice(b"frobnicate\0\0");
        buf.extend_from_slice(&2u64.to_be_bytes());
        buf.extend_from_slice(&[0xaa, 0xbb]);
        codec.encode(hello(), &mut buf).unwrap();

        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), hello());
    }

    #[test]
    fn wrong_magic_is_fatal() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&hello().to_bytes(0xdead_beef));
        match codec.decode(&mut buf) {
            Err(MessageCodecError::InvalidMessage(MessageError::InvalidMagic { .. })) => (),
            other => panic!("expected InvalidMagic, got {:?}", other),
        }
    }

    #[test]
    fn reject_round_trip() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();
        let message = Message::Reject(Reject {
            reason: String::from("bad credentials"),
        });
        codec.encode(message.clone(), &mut buf).unwrap();
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), message);
    }
}
