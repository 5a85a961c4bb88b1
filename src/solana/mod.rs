pub mod decoder;
pub mod rpc_client;
pub mod types;

pub use decoder::{pubkey_string, AnchorEventDecoder, DecodeError, EventDecoder};
pub use rpc_client::{LedgerRpc, RpcError, SolanaRpcClient};
pub use types::{Commitment, RawTransaction};
