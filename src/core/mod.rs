mod discovery;
mod doc_parser;
mod engine;
mod injector;
mod languages;
mod llm;
mod parser;
mod scanner;
mod validator;
mod writer;

pub use discovery::discover;
pub use doc_parser::{parse_existing, parse_item, Discovery, DocumentationRecord};
pub use engine::{CheckOutcome, Engine, FileOutcome, ItemReport, RunSummary, SkippedItem};
pub use injector::{inject, ordered_descending, InjectionTarget, LineBuffer, Splice};
pub use languages::{FileKind, LanguageFrontEnd, PythonFrontEnd, RFrontEnd, SqlFrontEnd};
pub use llm::{
    clean_response, create_generator, AnthropicProvider, DocGenerator, OpenAiProvider,
    PromptBuilder,
};
pub use parser::{content_hash, split_lines, CodeItem, CodeParser, ItemKind, SourceFile};
pub use validator::{validate, ValidationResult, MIN_DESCRIPTION_LEN};
pub use writer::AtomicWriter;
