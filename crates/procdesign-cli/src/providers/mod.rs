pub mod openai;
pub mod prompt;
