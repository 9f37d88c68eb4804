pub mod facade;
pub mod http;

pub use facade::{IndexerStatus, QueryFacade};
pub use http::{
    router, ApiError, ApiServer, AppState, BlockResponse, ErrorResponse, StatusResponse,
    SubscribeRequest, SubscribeResponse, get_block, get_status, get_transactions, subscribe,
};
