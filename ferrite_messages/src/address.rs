use crate::hash::{hash160, sha256d};

pub const MAINNET_P2PKH: u8 = 0x00;
pub const TESTNET_P2PKH: u8 = 0x6f;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn p2pkh_version(self) -> u8 {
        match self {
            Network::Mainnet => MAINNET_P2PKH,
            Network::Testnet => TESTNET_P2PKH,
        }
    }
}

#[derive(Debug)]
pub enum AddressError {
    BadBase58,
    BadChecksum,
    BadLength(usize),
    WrongNetwork { expected: u8, got: u8 },
}

impl std::fmt::Display for AddressError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AddressError::BadBase58 => write!(f, "invalid base58 character"),
            AddressError::BadChecksum => write!(f, "checksum mismatch"),
            AddressError::BadLength(n) => write!(f, "decoded to {} bytes, expected 25", n),
            AddressError::WrongNetwork { expected, got } => {
                write!(f, "version byte {} does not match network ({})", got, expected)
            }
        }
    }
}

/// A pay-to-pubkey-hash address: a 20 byte hash160 plus the network it
/// belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Address {
    pubkey_hash: [u8; 20],
    network: Network,
}

impl Address {
    pub fn from_pubkey_hash(pubkey_hash: [u8; 20], network: Network) -> Address {
        Address {
            pubkey_hash,
            network,
        }
    }

    pub fn from_pubkey(pubkey: &[u8], network: Network) -> Address {
        Address {
            pubkey_hash: hash160(pubkey),
            network,
        }
    }

    pub fn pubkey_hash(&self) -> &[u8; 20] {
        &self.pubkey_hash
    }

    pub fn network(&self) -> Network {
        self.network
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut payload = Vec::with_capacity(25);
        payload.push(self.network.p2pkh_version());
        payload.extend_from_slice(&self.pubkey_hash);
        let checksum = sha256d(&payload);
        payload.extend_from_slice(&checksum[..4]);
        write!(f, "{}", bs58::encode(payload).into_string())
    }
}

/// Parses a base58check address and checks it belongs to `network`.
pub fn decode_address(text: &str, network: Network) -> Result<Address, AddressError> {
    let raw = bs58::decode(text)
        .into_vec()
        .map_err(|_| AddressError::BadBase58)?;
    if raw.len() != 25 {
        return Err(AddressError::BadLength(raw.len()));
    }
    let checksum = sha256d(&raw[..21]);
    if raw[21..] != checksum[..4] {
        return Err(AddressError::BadChecksum);
    }
    if raw[0] != network.p2pkh_version() {
        return Err(AddressError::WrongNetwork {
            expected: network.p2pkh_version(),
            got: raw[0],
        });
    }
    let mut pubkey_hash = [0u8; 20];
    pubkey_hash.copy_from_slice(&raw[1..21]);
    Ok(Address {
        pubkey_hash,
        network,
    })
}
