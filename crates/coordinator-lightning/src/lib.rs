pub mod backend;
pub mod dev;
pub mod lnd;

pub use backend::{Invoice, InvoiceStatus, LightningBackend, LightningError};
pub use dev::DevBackend;
pub use lnd::LndRestBackend;
