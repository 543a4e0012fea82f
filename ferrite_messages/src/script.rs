use std::io::Write;

use cookie_factory::{
    bytes::be_u8, combinator::slice, multi::all, sequence::tuple, SerializeFn, WriteContext,
};

use crate::address::Address;

pub const OP_FALSE: u8 = 0x00;
pub const OP_TRUE: u8 = 0x51;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;

/// Largest direct data push, one length byte.
pub const MAX_PUSH_LENGTH: usize = 75;

#[derive(Debug)]
pub enum ScriptError {
    InvalidOpcode(u8),
    TruncatedPush { wanted: usize, got: usize },
    PushTooLarge(usize),
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ScriptError::InvalidOpcode(n) => write!(f, "invalid opcode: {:#04x}", n),
            ScriptError::TruncatedPush { wanted, got } => {
                write!(f, "push of {} bytes but only {} remain", wanted, got)
            }
            ScriptError::PushTooLarge(n) => write!(f, "cannot push {} bytes directly", n),
        }
    }
}

#[derive(Hash, Clone, PartialEq, Eq, Debug)]
pub enum Op {
    False,
    True,
    Dup,
    Equal,
    EqualVerify,
    Hash160,
    CheckSig,
    Push(Vec<u8>),
}

impl Op {
    pub fn push(data: &[u8]) -> Result<Op, ScriptError> {
        if data.is_empty() || data.len() > MAX_PUSH_LENGTH {
            return Err(ScriptError::PushTooLarge(data.len()));
        }
        Ok(Op::Push(data.to_vec()))
    }

    fn asm(&self) -> String {
        match self {
            Op::False => String::from("OP_FALSE"),
            Op::True => String::from("OP_TRUE"),
            Op::Dup => String::from("OP_DUP"),
            Op::Equal => String::from("OP_EQUAL"),
            Op::EqualVerify => String::from("OP_EQUALVERIFY"),
            Op::Hash160 => String::from("OP_HASH160"),
            Op::CheckSig => String::from("OP_CHECKSIG"),
            Op::Push(data) => hex::encode(data),
        }
    }
}

#[derive(Hash, Clone, PartialEq, Eq, Debug)]
pub struct Script(Vec<Op>);

impl Script {
    pub fn concat(&mut self, mut other: Script) {
        self.0.append(&mut other.0)
    }

    pub fn into_inner(self) -> Vec<Op> {
        self.0
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        crate::as_bytes(fn_script(self))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Script, ScriptError> {
        let mut ops = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            let code = bytes[i];
            i += 1;
            match code {
                OP_FALSE => ops.push(Op::False),
                n @ 1..=75 => {
                    let n = n as usize;
                    if i + n > bytes.len() {
                        return Err(ScriptError::TruncatedPush {
                            wanted: n,
                            got: bytes.len() - i,
                        });
                    }
                    ops.push(Op::Push(bytes[i..i + n].to_vec()));
                    i += n;
                }
                OP_TRUE => ops.push(Op::True),
                OP_DUP => ops.push(Op::Dup),
                OP_EQUAL => ops.push(Op::Equal),
                OP_EQUALVERIFY => ops.push(Op::EqualVerify),
                OP_HASH160 => ops.push(Op::Hash160),
                OP_CHECKSIG => ops.push(Op::CheckSig),
                n => return Err(ScriptError::InvalidOpcode(n)),
            }
        }
        Ok(Script(ops))
    }

    /// Renders the script as space separated mnemonics, pushed data as hex.
    pub fn to_asm_string(&self) -> String {
        self.0
            .iter()
            .map(Op::asm)
            .collect::<Vec<String>>()
            .join(" ")
    }
}

impl From<Vec<Op>> for Script {
    fn from(raw_script: Vec<Op>) -> Self {
        Self(raw_script)
    }
}

pub fn fn_script<'c, 'a: 'c, W: Write + 'c>(script: &'a Script) -> impl SerializeFn<W> + 'c {
    all(script.0.iter().map(fn_op))
}

fn fn_op<'c, 'a: 'c, W: Write + 'c>(op: &'a Op) -> impl SerializeFn<W> + 'c {
    move |out: WriteContext<W>| match op {
        Op::False => be_u8(OP_FALSE)(out),
        Op::True => be_u8(OP_TRUE)(out),
        Op::Dup => be_u8(OP_DUP)(out),
        Op::Equal => be_u8(OP_EQUAL)(out),
        Op::EqualVerify => be_u8(OP_EQUALVERIFY)(out),
        Op::Hash160 => be_u8(OP_HASH160)(out),
        Op::CheckSig => be_u8(OP_CHECKSIG)(out),
        Op::Push(data) => tuple((be_u8(data.len() as u8), slice(data)))(out),
    }
}

/// The standard spend script for a pay-to-pubkey-hash address:
/// `OP_DUP OP_HASH160 <pubkey hash> OP_EQUALVERIFY OP_CHECKSIG`.
pub fn pay_to_addr_script(address: &Address) -> Result<Script, ScriptError> {
    Ok(Script(vec![
        Op::Dup,
        Op::Hash160,
        Op::push(address.pubkey_hash())?,
        Op::EqualVerify,
        Op::CheckSig,
    ]))
}

/// Disassembles raw script bytes into a human readable mnemonic string.
pub fn disasm_string(bytes: &[u8]) -> Result<String, ScriptError> {
    Ok(Script::from_bytes(bytes)?.to_asm_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{decode_address, Network};

    const P2PKH_HEX: &str = "76a914128004ff2fcaf13b2b91eb654b1dc2b674f7ec6188ac";

    #[test]
    fn builds_p2pkh_spend_script() {
        let address =
            decode_address("12gpXQVcCL2qhTNQgyLVdCFG2Qs2px98nV", Network::Mainnet).unwrap();
        let script = pay_to_addr_script(&address).unwrap();
        assert_eq!(script.to_hex(), P2PKH_HEX);
    }

    #[test]
    fn disassembles_p2pkh_spend_script() {
        let bytes = hex::decode(P2PKH_HEX).unwrap();
        assert_eq!(
            disasm_string(&bytes).unwrap(),
            "OP_DUP OP_HASH160 128004ff2fcaf13b2b91eb654b1dc2b674f7ec61 \
             OP_EQUALVERIFY OP_CHECKSIG"
        );
    }

    #[test]
    fn parse_round_trips() {
        let bytes = hex::decode(P2PKH_HEX).unwrap();
        let script = Script::from_bytes(&bytes).unwrap();
        assert_eq!(script.to_bytes(), bytes);
    }

    #[test]
    fn rejects_unknown_opcode() {
        match Script::from_bytes(&[0xff]) {
            Err(ScriptError::InvalidOpcode(0xff)) => (),
            other => panic!("expected InvalidOpcode, got {:?}", other),
        }
    }

    #[test]
    fn rejects_truncated_push() {
        match Script::from_bytes(&[0x05, 0x01, 0x02]) {
            Err(ScriptError::TruncatedPush { wanted: 5, got: 2 }) => (),
            other => panic!("expected TruncatedPush, got {:?}", other),
        }
    }

    #[test]
    fn rejects_oversized_push() {
        match Op::push(&[0u8; 76]) {
            Err(ScriptError::PushTooLarge(76)) => (),
            other => panic!("expected PushTooLarge, got {:?}", other),
        }
    }
}
