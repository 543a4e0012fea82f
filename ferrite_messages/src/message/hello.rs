use std::io::Write;

use cookie_factory::{
    bytes::{be_u32, be_u8},
    sequence::tuple,
    SerializeFn,
};
use nom::{number::complete as num, IResult};

use super::{fn_varbytes, fn_varstr, parse_varbytes, parse_varstr};

/// Opening handshake, sent once by the client. `streaming` asks the server
/// to keep the connection open for server pushed notifications.
#[derive(Debug, Clone, PartialEq)]
pub struct Hello {
    pub version: u32,
    pub streaming: bool,
    pub user: String,
    pub secret: String,
}

/// Server acknowledgement of a `Hello`, carrying its identity material.
#[derive(Debug, Clone, PartialEq)]
pub struct HelloAck {
    pub certificate: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reject {
    pub reason: String,
}

pub(super) fn fn_hello<'c, 'a: 'c, W: Write + 'c>(hello: &'a Hello) -> impl SerializeFn<W> + 'c {
    tuple((
        be_u32(hello.version),
        be_u8(hello.streaming as u8),
        fn_varstr(&hello.user),
        fn_varstr(&hello.secret),
    ))
}

pub(super) fn fn_hello_ack<'c, 'a: 'c, W: Write + 'c>(
    ack: &'a HelloAck,
) -> impl SerializeFn<W> + 'c {
    fn_varbytes(&ack.certificate)
}

pub(super) fn fn_reject<'c, 'a: 'c, W: Write + 'c>(
    reject: &'a Reject,
) -> impl SerializeFn<W> + 'c {
    fn_varstr(&reject.reason)
}

pub(super) fn parse_hello(i: &[u8]) -> IResult<&[u8], Hello> {
    let (i, version) = num::be_u32(i)?;
    let (i, streaming) = num::be_u8(i)?;
    let (i, user) = parse_varstr(i)?;
    let (i, secret) = parse_varstr(i)?;
    Ok((
        i,
        Hello {
            version,
            streaming: streaming != 0,
            user,
            secret,
        },
    ))
}

pub(super) fn parse_hello_ack(i: &[u8]) -> IResult<&[u8], HelloAck> {
    let (i, certificate) = parse_varbytes(i)?;
    Ok((i, HelloAck { certificate }))
}

pub(super) fn parse_reject(i: &[u8]) -> IResult<&[u8], Reject> {
    let (i, reason) = parse_varstr(i)?;
    Ok((i, Reject { reason }))
}
