// LLM abstraction layer

pub mod provider;
pub mod openai;
pub mod assistants;

pub use provider::*;
pub use openai::OpenAIAdapter;
pub use assistants::AssistantsClient;
