pub mod auth; // session lookup against the hosted auth backend
pub mod config_parser; // gateway config file
pub mod dictionary; // grug-speak translation dictionary
pub mod endpoints; // API endpoints
pub mod error; // error handling
pub mod gateway_util; // utilities for gateway
pub mod identity; // caller identity resolution
pub mod inference; // completion provider client
pub mod ledger; // per-identity daily usage counters
pub mod observability; // utilities for observability (logs)
pub mod persona; // system instruction and in-character strings
pub mod quota; // daily quota policy
mod testing;

pub mod built_info {
    #![expect(clippy::allow_attributes)]
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
