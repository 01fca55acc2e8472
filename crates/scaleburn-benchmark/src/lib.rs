pub mod client;
pub mod openai;
pub mod runner;

pub use client::{Completion, CompletionClient};
pub use openai::OpenAiClient;
pub use runner::{run_worker, BenchmarkEvent, BenchmarkRunner};
