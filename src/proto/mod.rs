//! Generated protobuf modules for the IAM service
//!
//! `iam.rs` is produced by build.rs from `proto/iam.proto` whenever protoc is
//! available. Do not edit it by hand.

#![allow(clippy::all)]
#![allow(warnings)]

pub mod iam;

pub use iam::iam_client::IamClient;
pub use iam::iam_server::{Iam, IamServer};
pub use iam::{AuthenticateRequest, AuthenticateResponse, AuthorizeRequest, AuthorizeResponse};
