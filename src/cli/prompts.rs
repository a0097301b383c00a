//! Prompt library commands

use crate::cli::output::{format_prompts_table, to_json};
use crate::cli::{
    ConnectionArgs, PromptIdArgs, PromptsAddArgs, PromptsCommands, PromptsFileArgs,
    PromptsListArgs,
};
use crate::prompts::{NewPrompt, PromptStore};

fn open_store(connection: &ConnectionArgs) -> Result<PromptStore, Box<dyn std::error::Error>> {
    let config = connection.load_config()?;
    Ok(PromptStore::open(&config.prompts.path))
}

fn list(args: &PromptsListArgs) -> Result<String, Box<dyn std::error::Error>> {
    let store = open_store(&args.connection)?;
    let prompts = store.filter(&args.search, args.category.as_deref());
    if args.json {
        return Ok(to_json(&prompts)?);
    }
    if prompts.is_empty() {
        return Ok("No prompts match".to_string());
    }
    Ok(format_prompts_table(&prompts))
}

fn add(args: &PromptsAddArgs) -> Result<String, Box<dyn std::error::Error>> {
    let mut store = open_store(&args.connection)?;
    let created = store.create(NewPrompt {
        name: args.name.clone(),
        description: args.description.clone(),
        content: args.content.clone(),
        category: args.category.clone(),
        is_favorite: args.favorite,
    })?;
    Ok(format!("✓ Added prompt '{}' ({})", created.name, created.id))
}

fn remove(args: &PromptIdArgs) -> Result<String, Box<dyn std::error::Error>> {
    let mut store = open_store(&args.connection)?;
    let removed = store.delete(&args.id)?;
    Ok(format!("✓ Removed prompt '{}'", removed.name))
}

fn favorite(args: &PromptIdArgs) -> Result<String, Box<dyn std::error::Error>> {
    let mut store = open_store(&args.connection)?;
    let p = store.toggle_favorite(&args.id)?;
    let state = if p.is_favorite { "favorite" } else { "not favorite" };
    Ok(format!("✓ '{}' is now {}", p.name, state))
}

fn duplicate(args: &PromptIdArgs) -> Result<String, Box<dyn std::error::Error>> {
    let mut store = open_store(&args.connection)?;
    let copy = store.duplicate(&args.id)?;
    Ok(format!("✓ Created '{}' ({})", copy.name, copy.id))
}

fn export(args: &PromptsFileArgs) -> Result<String, Box<dyn std::error::Error>> {
    let store = open_store(&args.connection)?;
    let count = store.export_to(&args.path)?;
    Ok(format!("✓ Exported {} prompts to {}", count, args.path.display()))
}

fn import(args: &PromptsFileArgs) -> Result<String, Box<dyn std::error::Error>> {
    let mut store = open_store(&args.connection)?;
    let count = store.import_from(&args.path)?;
    Ok(format!("✓ Imported {} prompts from {}", count, args.path.display()))
}

/// Handle `llmdeck prompts ...`
pub fn handle_prompts(cmd: &PromptsCommands) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        PromptsCommands::List(args) => list(args),
        PromptsCommands::Add(args) => add(args),
        PromptsCommands::Remove(args) => remove(args),
        PromptsCommands::Favorite(args) => favorite(args),
        PromptsCommands::Duplicate(args) => duplicate(args),
        PromptsCommands::Export(args) => export(args),
        PromptsCommands::Import(args) => import(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    // The prompts path comes from the config file so tests stay clear of env vars.
    fn connection(dir: &Path) -> ConnectionArgs {
        let config = dir.join("llmdeck.toml");
        let prompts = dir.join("prompts.json");
        std::fs::write(
            &config,
            format!("[prompts]\npath = {:?}\n", prompts.display().to_string()),
        )
        .unwrap();
        ConnectionArgs {
            config,
            server_url: None,
        }
    }

    #[test]
    fn test_list_defaults_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = PromptsCommands::List(PromptsListArgs {
            search: String::new(),
            category: None,
            json: true,
            connection: connection(dir.path()),
        });
        let output = handle_prompts(&cmd).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.len(), 4);
    }

    #[test]
    fn test_add_then_remove() {
        let dir = tempfile::tempdir().unwrap();
        let add_cmd = PromptsCommands::Add(PromptsAddArgs {
            name: "Pirate".to_string(),
            content: "Talk like a pirate.".to_string(),
            description: String::new(),
            category: Some("Fun".to_string()),
            favorite: false,
            connection: connection(dir.path()),
        });
        assert!(handle_prompts(&add_cmd).unwrap().contains("Pirate"));

        let store = PromptStore::open(dir.path().join("prompts.json"));
        let id = store
            .list()
            .iter()
            .find(|p| p.name == "Pirate")
            .map(|p| p.id.clone())
            .unwrap();

        let remove_cmd = PromptsCommands::Remove(PromptIdArgs {
            id,
            connection: connection(dir.path()),
        });
        handle_prompts(&remove_cmd).unwrap();

        let store = PromptStore::open(dir.path().join("prompts.json"));
        assert!(store.list().iter().all(|p| p.name != "Pirate"));
    }

    #[test]
    fn test_remove_unknown_id_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = PromptsCommands::Remove(PromptIdArgs {
            id: "nope".to_string(),
            connection: connection(dir.path()),
        });
        assert!(handle_prompts(&cmd).is_err());
    }

    #[test]
    fn test_export_import_appends() {
        let dir = tempfile::tempdir().unwrap();
        let export_path = dir.path().join("export.json");

        let export_cmd = PromptsCommands::Export(PromptsFileArgs {
            path: export_path.clone(),
            connection: connection(dir.path()),
        });
        assert!(handle_prompts(&export_cmd).unwrap().contains("4 prompts"));

        let import_cmd = PromptsCommands::Import(PromptsFileArgs {
            path: export_path,
            connection: connection(dir.path()),
        });
        handle_prompts(&import_cmd).unwrap();

        let store = PromptStore::open(dir.path().join("prompts.json"));
        assert_eq!(store.list().len(), 8);
    }
}
