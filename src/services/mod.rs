pub mod insights;
pub mod llm;
pub mod prompts;
pub mod providers;
pub mod recommendations;

pub use providers::{GeminiProvider, LanguageModel};
