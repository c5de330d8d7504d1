//! RPC and HTTP surface wiring: thin translation layers over the shared
//! domain state in [`crate::state::AppState`].

pub mod grpc;
pub mod http;
