#[macro_use]
extern crate log;

pub mod address;
pub mod hash;
pub mod message;
pub mod script;

use cookie_factory::{gen_simple, SerializeFn};

pub fn as_bytes<F: SerializeFn<Vec<u8>>>(f: F) -> Vec<u8> {
    gen_simple(f, Vec::new()).expect("write in vec")
}
