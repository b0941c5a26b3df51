pub mod constants;
pub mod error;
pub mod event;
pub mod host;
pub mod pin;
pub mod pool;
pub mod receipt;
pub mod types;

pub use constants::*;
pub use error::CoordinatorError;
pub use event::*;
pub use host::*;
pub use pin::*;
pub use pool::*;
pub use receipt::*;
pub use types::*;
