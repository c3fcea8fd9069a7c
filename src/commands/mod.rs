pub mod completions;
pub mod notify;
