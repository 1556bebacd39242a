//! Realtime chat rooms over WebSocket.
//!
//! A single [`hub::Hub`] task owns every room and every outbound socket half.
//! Each connection's reader task feeds inbound frames back into the hub.

pub mod connection;
pub mod events;
pub mod hub;
pub mod server;
pub mod sink;
