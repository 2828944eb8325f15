pub mod builder;
pub mod chain;
pub mod chain_config;
pub mod config;
pub mod decoder;
pub mod driver;
pub mod error;
pub mod gas_estimator;
pub mod logging;
pub mod override_resolver;
pub mod rpc_server;
pub mod signer;
#[cfg(test)]
mod tests;
