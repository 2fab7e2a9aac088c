//! Generated protobuf types for the dp-service API (package `dpdkonmetal.v1`).
//!
//! Identity and address fields are `bytes` holding the textual form, never a
//! packed binary address. Every response carries a [`Status`] at tag 1.

#![allow(clippy::enum_variant_names)]

tonic::include_proto!("dpdkonmetal.v1");

pub use dpd_konmetal_client::DpdKonmetalClient;
