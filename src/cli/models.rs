//! Models and pull command implementation

use crate::cli::output::{format_models_table, format_running_table, to_json};
use crate::cli::{upstream_server, ModelsArgs, PullArgs};
use futures_util::StreamExt;
use std::io::Write;

/// Handle `llmdeck models`
pub async fn handle_models(args: &ModelsArgs) -> Result<String, Box<dyn std::error::Error>> {
    let config = args.connection.load_config()?;
    let server = upstream_server(&config)?;

    if args.running {
        let running = server.running_models().await?;
        if args.json {
            return Ok(to_json(&running)?);
        }
        if running.is_empty() {
            return Ok("No models loaded".to_string());
        }
        return Ok(format_running_table(&running));
    }

    let models = server.list_models().await?;
    if args.json {
        Ok(to_json(&models)?)
    } else if models.is_empty() {
        Ok(format!("No models installed on {}", server.base_url()))
    } else {
        Ok(format_models_table(&models))
    }
}

/// Handle `llmdeck pull`. Progress goes to stderr.
pub async fn handle_pull(args: &PullArgs) -> Result<String, Box<dyn std::error::Error>> {
    let config = args.connection.load_config()?;
    let server = upstream_server(&config)?;

    let mut progress = server.pull_model(&args.model).await?;
    let mut stderr = std::io::stderr();
    let mut last_status = String::new();

    while let Some(event) = progress.next().await {
        let event = event?;
        match event.fraction() {
            Some(f) => {
                let _ = write!(stderr, "\r{} {:>5.1}%", event.status, f * 100.0);
            }
            None if event.status != last_status => {
                let _ = writeln!(stderr, "\r{}", event.status);
            }
            None => {}
        }
        last_status = event.status;
    }
    let _ = writeln!(stderr);

    Ok(format!("✓ Pulled {}", args.model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ConnectionArgs;
    use mockito::Server;
    use std::path::PathBuf;

    fn connection(url: String) -> ConnectionArgs {
        ConnectionArgs {
            config: PathBuf::from("/nonexistent/llmdeck.toml"),
            server_url: Some(url),
        }
    }

    #[tokio::test]
    async fn test_models_table_lists_names() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[{"name":"llama3:8b","size":4661224676,"details":{"family":"llama"}}]}"#)
            .create_async()
            .await;

        let args = ModelsArgs {
            connection: connection(server.url()),
            running: false,
            json: false,
        };
        let output = handle_models(&args).await.unwrap();
        assert!(output.contains("llama3:8b"));
        assert!(output.contains("llama"));
    }

    #[tokio::test]
    async fn test_models_json_output() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[{"name":"a","size":10}]}"#)
            .create_async()
            .await;

        let args = ModelsArgs {
            connection: connection(server.url()),
            running: false,
            json: true,
        };
        let output = handle_models(&args).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["name"], "a");
    }

    #[tokio::test]
    async fn test_models_running_empty() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/ps")
            .with_status(200)
            .with_body(r#"{"models":[]}"#)
            .create_async()
            .await;

        let args = ModelsArgs {
            connection: connection(server.url()),
            running: true,
            json: false,
        };
        assert_eq!(handle_models(&args).await.unwrap(), "No models loaded");
    }

    #[tokio::test]
    async fn test_models_upstream_error_propagates() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/tags")
            .with_status(500)
            .with_body(r#"{"error":"boom"}"#)
            .create_async()
            .await;

        let args = ModelsArgs {
            connection: connection(server.url()),
            running: false,
            json: false,
        };
        assert!(handle_models(&args).await.is_err());
    }

    #[tokio::test]
    async fn test_pull_consumes_progress() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/api/pull")
            .with_status(200)
            .with_body(
                "{\"status\":\"pulling manifest\"}\n{\"status\":\"downloading\",\"completed\":5,\"total\":10}\n{\"status\":\"success\"}\n",
            )
            .create_async()
            .await;

        let args = PullArgs {
            model: "tiny".to_string(),
            connection: connection(server.url()),
        };
        assert_eq!(handle_pull(&args).await.unwrap(), "✓ Pulled tiny");
    }
}
