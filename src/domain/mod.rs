//! Domain types shared by every layer: accounts, transactions, and the store port.

pub mod account;
pub mod ports;
pub mod transaction;
