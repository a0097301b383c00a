//! Chat command implementation

use crate::cli::{upstream_server, ChatArgs};
use crate::config::DeckConfig;
use crate::prompts::PromptStore;
use crate::upstream::{ChatMessage, GenerationOptions};

/// System text from `--system` or a saved prompt id.
fn system_text(
    args: &ChatArgs,
    config: &DeckConfig,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    if let Some(ref text) = args.system {
        return Ok(Some(text.clone()));
    }
    match args.system_prompt {
        Some(ref id) => {
            let store = PromptStore::open(&config.prompts.path);
            let prompt = store
                .get(id)
                .ok_or_else(|| format!("Prompt not found: {}", id))?;
            Ok(Some(prompt.content.clone()))
        }
        None => Ok(None),
    }
}

/// Handle `llmdeck chat`
pub async fn handle_chat(args: &ChatArgs) -> Result<String, Box<dyn std::error::Error>> {
    let config = args.connection.load_config()?;
    let server = upstream_server(&config)?;

    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system_text(args, &config)? {
        messages.push(ChatMessage::system(system));
    }
    messages.push(ChatMessage::user(args.message.clone()));

    let options = GenerationOptions {
        temperature: args.temperature,
        max_tokens: args.max_tokens,
    };
    let reply = server.chat(&args.model, messages, options).await?;
    Ok(reply.response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ConnectionArgs;
    use mockito::{Matcher, Server};
    use std::path::PathBuf;

    fn chat_args(url: String) -> ChatArgs {
        ChatArgs {
            model: "llama3".to_string(),
            message: "hello".to_string(),
            system: None,
            system_prompt: None,
            temperature: 0.7,
            max_tokens: 2048,
            connection: ConnectionArgs {
                config: PathBuf::from("/nonexistent/llmdeck.toml"),
                server_url: Some(url),
            },
        }
    }

    #[tokio::test]
    async fn test_chat_returns_reply_text() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "llama3",
                "messages": [{"role": "system", "content": "Be brief."}, {"role": "user", "content": "hello"}]
            })))
            .with_status(200)
            .with_body(r#"{"model":"llama3","message":{"role":"assistant","content":"Hi."},"done":true}"#)
            .create_async()
            .await;

        let mut args = chat_args(server.url());
        args.system = Some("Be brief.".to_string());
        assert_eq!(handle_chat(&args).await.unwrap(), "Hi.");
    }

    #[test]
    fn test_system_prompt_by_id_uses_library() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DeckConfig::default();
        config.prompts.path = dir.path().join("prompts.json");

        let mut args = chat_args("http://unused".to_string());
        args.system_prompt = Some("1".to_string());

        let text = system_text(&args, &config).unwrap().unwrap();
        assert!(!text.is_empty());
    }

    #[test]
    fn test_unknown_system_prompt_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DeckConfig::default();
        config.prompts.path = dir.path().join("prompts.json");

        let mut args = chat_args("http://unused".to_string());
        args.system_prompt = Some("missing".to_string());
        assert!(system_text(&args, &config).is_err());
    }
}
