//! Infrastructure adapters for the inventory indexer, chain RPC and
//! transaction submission.

pub mod atomic;
pub mod dry_run;
pub mod memory;
pub mod rpc;

pub use atomic::AtomicAssetsClient;
pub use dry_run::DryRunSubmitter;
pub use memory::InMemoryChain;
pub use rpc::ChainRpcClient;
