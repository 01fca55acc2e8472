mod message;
mod test_case;

pub use message::{ChatMessage, Role};
pub use test_case::{TestCase, DEFAULT_PROFILE};
