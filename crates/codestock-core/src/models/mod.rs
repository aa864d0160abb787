pub mod section;
pub mod snippet;
