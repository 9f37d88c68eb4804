pub mod rpc_client;
pub mod block_decoder;
pub mod sync_engine;

pub use rpc_client::{ChainClient, RpcClient, RpcValue};
pub use block_decoder::{block_tag, decode_block, parse_block_number};
pub use sync_engine::{SyncEngine, SyncReport};
