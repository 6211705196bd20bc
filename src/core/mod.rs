pub mod error;
pub mod value;

pub use error::{DataError, Result};
pub use value::Value;
