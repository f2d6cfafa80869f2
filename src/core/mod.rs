pub mod notifier;
pub mod source;
pub mod types;
