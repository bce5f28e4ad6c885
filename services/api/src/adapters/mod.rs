pub mod debate_llm;

pub use debate_llm::OpenAiDebateAdapter;
