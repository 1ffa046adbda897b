#![allow(dead_code)]

pub mod config;
pub mod ledger;
pub mod mock_upstream;
pub mod server;
