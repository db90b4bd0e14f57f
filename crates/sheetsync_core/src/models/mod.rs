//! Data models for SheetSync.
//!
//! This module contains all core data structures:
//! - `config` - SyncConfig built from the environment
//! - `connection` - ConnectionConfig, SslMode
//! - `result_set` - ResultSet, Column, CellValue
//! - `sheet` - TargetSheet, SheetProperties, GridSize

pub mod config;
pub mod connection;
pub mod result_set;
pub mod sheet;

pub use config::SyncConfig;
pub use connection::{ConnectionConfig, SslMode};
pub use result_set::{CellValue, Column, ResultSet};
pub use sheet::{GridSize, SheetProperties, TargetSheet};
