use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category given to prompts created without one.
pub const DEFAULT_CATEGORY: &str = "General";

/// Category filter value matching every prompt.
pub const ALL_CATEGORIES: &str = "All";

/// A saved, reusable system prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub content: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Fields accepted when creating a prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrompt {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
}

/// Partial update; absent fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub is_favorite: Option<bool>,
}

/// Built-in prompts used when no saved file can be read.
pub fn default_prompts() -> Vec<PromptTemplate> {
    let now = Utc::now();
    let make = |id: &str, name: &str, description: &str, content: &str, category: &str, fav| {
        PromptTemplate {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            content: content.to_string(),
            category: category.to_string(),
            is_favorite: fav,
            created_at: now,
            updated_at: now,
        }
    };
    vec![
        make(
            "1",
            "Helpful Assistant",
            "A general-purpose helpful assistant",
            "You are a helpful, harmless, and honest assistant. Provide accurate and useful information while being respectful and professional.",
            "General",
            true,
        ),
        make(
            "2",
            "Code Reviewer",
            "Expert code reviewer and programming assistant",
            "You are an expert software engineer and code reviewer. Analyze code for bugs, performance issues, security vulnerabilities, and best practices. Provide constructive feedback and suggestions for improvement.",
            "Programming",
            false,
        ),
        make(
            "3",
            "Creative Writer",
            "Creative writing and storytelling assistant",
            "You are a creative writing assistant with expertise in storytelling, character development, and narrative structure. Help users craft engaging stories, develop characters, and improve their writing style.",
            "Creative",
            false,
        ),
        make(
            "4",
            "Research Assistant",
            "Academic and research-focused assistant",
            "You are a research assistant with expertise in academic writing, data analysis, and scientific methodology. Help users with research questions, literature reviews, and academic writing while maintaining scholarly standards.",
            "Academic",
            false,
        ),
    ]
}
