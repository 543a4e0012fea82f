use std::io::Write;

use cookie_factory::{
    bytes::{be_u64, be_u8},
    combinator::slice,
    multi::all,
    sequence::tuple,
    SerializeFn, WriteContext,
};
use nom::{bytes::complete::take, multi::count, number::complete as num, IResult};

use super::{fn_varstr, parse_varstr, EventClass};
use crate::hash::BlockHash;

/// The calls a client can issue against the node.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    BlockCount,
    BestBlockHash,
    Subscribe(Vec<EventClass>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: u64,
    pub call: Call,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ack,
    BlockCount(u64),
    BlockHash(BlockHash),
}

/// The server's answer to the request with the same `id`. A server side
/// failure carries the reason as text.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: u64,
    pub result: Result<Reply, String>,
}

pub(super) fn fn_request<'c, 'a: 'c, W: Write + 'c>(
    request: &'a Request,
) -> impl SerializeFn<W> + 'c {
    tuple((be_u64(request.id), fn_call(&request.call)))
}

fn fn_call<'c, 'a: 'c, W: Write + 'c>(call: &'a Call) -> impl SerializeFn<W> + 'c {
    move |out: WriteContext<W>| match call {
        Call::BlockCount => be_u8(0)(out),
        Call::BestBlockHash => be_u8(1)(out),
        Call::Subscribe(classes) => tuple((
            be_u8(2),
            be_u64(classes.len() as u64),
            all(classes.iter().map(|class| be_u8(class.code()))),
        ))(out),
    }
}

pub(super) fn fn_response<'c, 'a: 'c, W: Write + 'c>(
    response: &'a Response,
) -> impl SerializeFn<W> + 'c {
    tuple((be_u64(response.id), fn_call_result(&response.result)))
}

fn fn_call_result<'c, 'a: 'c, W: Write + 'c>(
    result: &'a Result<Reply, String>,
) -> impl SerializeFn<W> + 'c {
    move |out: WriteContext<W>| match result {
        Ok(reply) => tuple((be_u8(0), fn_reply(reply)))(out),
        Err(reason) => tuple((be_u8(1), fn_varstr(reason)))(out),
    }
}

fn fn_reply<'c, 'a: 'c, W: Write + 'c>(reply: &'a Reply) -> impl SerializeFn<W> + 'c {
    move |out: WriteContext<W>| match reply {
        Reply::Ack => be_u8(0)(out),
        Reply::BlockCount(n) => tuple((be_u8(1), be_u64(*n)))(out),
        Reply::BlockHash(hash) => tuple((be_u8(2), slice(&hash.0)))(out),
    }
}

pub(super) fn parse_request(i: &[u8]) -> IResult<&[u8], Request> {
    let (i, id) = num::be_u64(i)?;
    let (i, call) = parse_call(i)?;
    Ok((i, Request { id, call }))
}

fn parse_call(i: &[u8]) -> IResult<&[u8], Call> {
    let (i, tag) = num::be_u8(i)?;
    match tag {
        0 => Ok((i, Call::BlockCount)),
        1 => Ok((i, Call::BestBlockHash)),
        2 => {
            let (i, length) = num::be_u64(i)?;
            let (i, codes) = count(num::be_u8, length as usize)(i)?;
            let classes: Option<Vec<EventClass>> =
                codes.into_iter().map(EventClass::from_code).collect();
            match classes {
                Some(classes) => Ok((i, Call::Subscribe(classes))),
                None => Err(nom::Err::Failure(nom::error::Error::new(
                    i,
                    nom::error::ErrorKind::Tag,
                ))),
            }
        }
        _ => Err(nom::Err::Failure(nom::error::Error::new(
            i,
            nom::error::ErrorKind::Tag,
        ))),
    }
}

pub(super) fn parse_response(i: &[u8]) -> IResult<&[u8], Response> {
    let (i, id) = num::be_u64(i)?;
    let (i, status) = num::be_u8(i)?;
    let (i, result) = match status {
        0 => {
            let (i, reply) = parse_reply(i)?;
            (i, Ok(reply))
        }
        1 => {
            let (i, reason) = parse_varstr(i)?;
            (i, Err(reason))
        }
        _ => {
            return Err(nom::Err::Failure(nom::error::Error::new(
                i,
                nom::error::ErrorKind::Tag,
            )))
        }
    };
    Ok((i, Response { id, result }))
}

fn parse_reply(i: &[u8]) -> IResult<&[u8], Reply> {
    let (i, tag) = num::be_u8(i)?;
    match tag {
        0 => Ok((i, Reply::Ack)),
        1 => {
            let (i, n) = num::be_u64(i)?;
            Ok((i, Reply::BlockCount(n)))
        }
        2 => {
            let (i, hash) = take(32usize)(i)?;
            let mut bytes = [0u8; 32];
            bytes.copy_from_slice(hash);
            Ok((i, Reply::BlockHash(BlockHash(bytes))))
        }
        _ => Err(nom::Err::Failure(nom::error::Error::new(
            i,
            nom::error::ErrorKind::Tag,
        ))),
    }
}
