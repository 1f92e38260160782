//! Route handlers, one module per resource group.

pub mod health;
pub mod imaging;
pub mod notes;
pub mod records;
