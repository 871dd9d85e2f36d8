pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod notifications;
pub mod provider;
pub mod ui;
pub mod wallets;

#[cfg(test)]
mod test_fakes;
