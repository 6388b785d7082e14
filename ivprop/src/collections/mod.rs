pub mod heap;
pub mod ref_store;
