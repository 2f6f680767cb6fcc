//! Documentation generation backends
//!
//! Generators turn a code snippet into documentation text for a kind's
//! standard. Providers talk to hosted models over HTTP; tests plug in their
//! own `DocGenerator`.

mod generator;
mod prompts;
mod providers;

pub use generator::{clean_response, DocGenerator};
pub use prompts::PromptBuilder;
pub use providers::{create_generator, AnthropicProvider, OpenAiProvider};
