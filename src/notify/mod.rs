pub mod board;

pub use board::{MessageBoard, StoredMessage};
