//! Device sockets
//!
//! A [`DeviceConnection`] is one persistent TCP connection tagged with its
//! [`SocketRole`](crate::types::SocketRole). It carries at most one request
//! at a time and reports when the peer goes away. [`ReverseConnection`]
//! turns a connection into the device's event push channel.

mod connection;
mod reverse;


pub use connection::DeviceConnection;
pub use reverse::ReverseConnection;
