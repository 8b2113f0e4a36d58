//! Scripts for deploying and wiring the superbridge contracts across chains.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod cli;
mod commands;
pub mod config;
pub mod constants;
pub mod deployer;
pub mod errors;
pub mod ledger;
pub mod networks;
pub mod orchestrator;
mod solidity;
pub mod types;
pub mod vaults;
pub mod verification;

#[cfg(test)]
mod test_utils;
