pub mod document_extraction;
pub mod rate_limiter;
pub mod test_generation;
