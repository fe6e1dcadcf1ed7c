//! Learned index engine
//!
//! Builds a recursive model index (RMI) over a sorted key array: a fixed-fanout
//! tree of linear models that maps a query key to an approximate position in
//! the array in one model evaluation per layer.
//!
//! ```
//! use rmi_engine::Rmi;
//!
//! let keys: Vec<u64> = (0..100).map(|i| i * 10).collect();
//! let rmi = Rmi::build(&keys, 2, 2).unwrap();
//! assert_eq!(rmi.get_index(500u64), 50);
//! ```
//!
//! The returned position is an estimate. Callers that need the exact slot
//! refine it against their own key array.

pub mod error;
pub mod regression;
pub mod rmi_config;
pub mod rmi_core;

pub use error::{RegressionError, RmiError};
pub use regression::LinearFit;
pub use rmi_config::RmiConfig;
pub use rmi_core::{Node, Rmi, RmiStats};
