//! The read-side query server: a JSON-RPC API answering `GetBlockCount`,
//! `GetAddressTrxs`, `GetRawTrx`, `GetTrx`, `GetUtxo` and `ListUnSpent`
//! directly from the stores, with no path through the ingestion caches.

pub mod error;
pub mod handlers;
pub mod server;
pub mod types;

pub use error::RpcError;
pub use handlers::AppState;
pub use server::serve;
