//! dblease-proto — generated wire types for the database lease protocol.
//!
//! The `dblease.v1` protobuf package: the `DatabaseLease` service with
//! its status and instance-stream messages. Everything in this crate is
//! generated by `tonic-build` from `proto/dblease.proto`.

tonic::include_proto!("dblease.v1");
