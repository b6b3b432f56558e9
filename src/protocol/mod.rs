//! Wire-level protocol: message framing, payload codec, crypto and handshakes

pub mod crypto;
pub mod http;
pub mod pairing;
pub mod plist;
