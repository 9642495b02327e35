pub mod config;
pub mod digest;
pub mod environment;
pub mod feeds;
pub mod llm;
pub mod logging;
pub mod mailer;
pub mod pipeline;
pub mod prompts;
pub mod rss;
pub mod scrape;
pub mod state;

use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use ollama_rs::Ollama;

pub use llm::GeminiClient;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_LLM_REQUEST: &str = "llm_request";
pub const TARGET_MAIL: &str = "mail_delivery";

#[derive(Clone, Debug)]
pub enum LLMClient {
    Gemini(GeminiClient),
    Ollama(Ollama),
    OpenAI(OpenAIClient<OpenAIConfig>),
}

#[derive(Clone, Debug)]
pub struct LLMParams {
    pub llm_client: LLMClient,
    pub model: String,
    pub temperature: f32,
}
