pub mod client;
pub mod signer;

pub use client::{DeltaClient, OrderGateway};
pub use signer::{ClientOrderIds, OrderRequest, OrderSigner, SignedRequest};
