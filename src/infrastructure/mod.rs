pub mod logging;
pub mod notifier;
pub mod rpc_wallet;
pub mod wallet_provider;
