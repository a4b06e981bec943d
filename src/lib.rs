pub mod crypto;
pub mod io;
pub mod error;

pub use error::{Error, Result};
