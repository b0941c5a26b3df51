pub mod edges;
pub mod validation;

pub use edges::{extract_edges, CitationEdge};
pub use validation::{compute_event_id, validate_pow, validate_shape, validate_signature};
