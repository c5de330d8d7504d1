//! gRPC transport implementing the `edgemesh.v1.EdgeMesh` service, the
//! single RPC contract every node in the mesh serves.

pub mod convert;
pub mod service;

/// Generated protobuf types for the `edgemesh.v1` package.
pub mod proto {
    tonic::include_proto!("edgemesh.v1");
}

pub use service::EdgeMeshGrpc;
