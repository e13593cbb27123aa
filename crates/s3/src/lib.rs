//! osn-s3: S3 SDK adapter for osn
//!
//! Implements the `ObjectStore` trait from osn-core on top of aws-sdk-s3,
//! signing requests with SigV4 against any S3-compatible endpoint.

mod client;

pub use client::S3Client;
