//! File-backed library of system prompt templates.
//!
//! The whole list lives in one JSON array. Every mutation is applied to a
//! copy, written to disk, and only then made visible, so a failed write
//! leaves the in-memory list unchanged.

pub mod error;
pub mod types;

pub use error::PromptStoreError;
pub use types::{
    default_prompts, NewPrompt, PromptTemplate, PromptUpdate, ALL_CATEGORIES, DEFAULT_CATEGORY,
};

use chrono::Utc;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub struct PromptStore {
    path: PathBuf,
    prompts: Vec<PromptTemplate>,
}

impl PromptStore {
    /// Load the library at `path`.
    ///
    /// A missing or unreadable file yields the built-in defaults; nothing is
    /// written until the first mutation.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let prompts = match read_prompts(&path) {
            Ok(prompts) => prompts,
            Err(PromptStoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No prompt file, using defaults");
                default_prompts()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Prompt file unreadable, using defaults");
                default_prompts()
            }
        };
        Self { path, prompts }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> &[PromptTemplate] {
        &self.prompts
    }

    pub fn get(&self, id: &str) -> Option<&PromptTemplate> {
        self.prompts.iter().find(|p| p.id == id)
    }

    /// Prompts whose name or description contains `search` (ignoring case)
    /// and whose category equals `category`. `"All"` or `None` matches any
    /// category.
    pub fn filter(&self, search: &str, category: Option<&str>) -> Vec<&PromptTemplate> {
        let needle = search.to_lowercase();
        self.prompts
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.description.to_lowercase().contains(&needle)
            })
            .filter(|p| match category {
                None => true,
                Some(c) => c == ALL_CATEGORIES || p.category == c,
            })
            .collect()
    }

    /// `"All"` followed by each distinct category in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        let mut categories = vec![ALL_CATEGORIES.to_string()];
        for prompt in &self.prompts {
            if !categories[1..].contains(&prompt.category) {
                categories.push(prompt.category.clone());
            }
        }
        categories
    }

    pub fn create(&mut self, new: NewPrompt) -> Result<PromptTemplate, PromptStoreError> {
        validate_text("name", &new.name)?;
        validate_text("content", &new.content)?;

        let now = Utc::now();
        let prompt = PromptTemplate {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            description: new.description,
            content: new.content,
            category: non_blank_category(new.category),
            is_favorite: new.is_favorite,
            created_at: now,
            updated_at: now,
        };

        let mut next = self.prompts.clone();
        next.push(prompt.clone());
        self.commit(next)?;
        Ok(prompt)
    }

    pub fn update(
        &mut self,
        id: &str,
        update: PromptUpdate,
    ) -> Result<PromptTemplate, PromptStoreError> {
        if let Some(name) = &update.name {
            validate_text("name", name)?;
        }
        if let Some(content) = &update.content {
            validate_text("content", content)?;
        }

        self.modify(id, |p| {
            if let Some(name) = update.name {
                p.name = name.trim().to_string();
            }
            if let Some(description) = update.description {
                p.description = description;
            }
            if let Some(content) = update.content {
                p.content = content;
            }
            if update.category.is_some() {
                p.category = non_blank_category(update.category);
            }
            if let Some(fav) = update.is_favorite {
                p.is_favorite = fav;
            }
        })
    }

    pub fn delete(&mut self, id: &str) -> Result<PromptTemplate, PromptStoreError> {
        let index = self.index_of(id)?;
        let mut next = self.prompts.clone();
        let removed = next.remove(index);
        self.commit(next)?;
        Ok(removed)
    }

    pub fn toggle_favorite(&mut self, id: &str) -> Result<PromptTemplate, PromptStoreError> {
        self.modify(id, |p| p.is_favorite = !p.is_favorite)
    }

    /// Copy a prompt under a new id, named `"<name> (Copy)"` and not marked
    /// favorite.
    pub fn duplicate(&mut self, id: &str) -> Result<PromptTemplate, PromptStoreError> {
        let source = &self.prompts[self.index_of(id)?];
        let now = Utc::now();
        let copy = PromptTemplate {
            id: Uuid::new_v4().to_string(),
            name: format!("{} (Copy)", source.name),
            is_favorite: false,
            created_at: now,
            updated_at: now,
            ..source.clone()
        };

        let mut next = self.prompts.clone();
        next.push(copy.clone());
        self.commit(next)?;
        Ok(copy)
    }

    /// Write the current list to `path` as pretty JSON.
    pub fn export_to(&self, path: &Path) -> Result<usize, PromptStoreError> {
        write_prompts(path, &self.prompts)?;
        Ok(self.prompts.len())
    }

    /// Append every prompt found in `path` under fresh ids.
    ///
    /// Returns the number of prompts imported.
    pub fn import_from(&mut self, path: &Path) -> Result<usize, PromptStoreError> {
        let imported = read_prompts(path)?;
        let count = imported.len();

        let mut next = self.prompts.clone();
        next.extend(imported.into_iter().map(|p| PromptTemplate {
            id: Uuid::new_v4().to_string(),
            ..p
        }));
        self.commit(next)?;
        tracing::info!(count, path = %path.display(), "Imported prompts");
        Ok(count)
    }

    fn index_of(&self, id: &str) -> Result<usize, PromptStoreError> {
        self.prompts
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| PromptStoreError::NotFound(id.to_string()))
    }

    fn modify<F>(&mut self, id: &str, apply: F) -> Result<PromptTemplate, PromptStoreError>
    where
        F: FnOnce(&mut PromptTemplate),
    {
        let index = self.index_of(id)?;
        let mut next = self.prompts.clone();
        apply(&mut next[index]);
        next[index].updated_at = Utc::now();
        let updated = next[index].clone();
        self.commit(next)?;
        Ok(updated)
    }

    fn commit(&mut self, next: Vec<PromptTemplate>) -> Result<(), PromptStoreError> {
        write_prompts(&self.path, &next)?;
        self.prompts = next;
        Ok(())
    }
}

fn validate_text(field: &'static str, value: &str) -> Result<(), PromptStoreError> {
    if value.trim().is_empty() {
        return Err(PromptStoreError::Validation {
            field,
            message: "cannot be empty".to_string(),
        });
    }
    Ok(())
}

fn non_blank_category(category: Option<String>) -> String {
    category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}

fn read_prompts(path: &Path) -> Result<Vec<PromptTemplate>, PromptStoreError> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| PromptStoreError::Parse(e.to_string()))
}

/// Write through a sibling temp file so readers never see a partial list.
fn write_prompts(path: &Path, prompts: &[PromptTemplate]) -> Result<(), PromptStoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(prompts)
        .map_err(|e| PromptStoreError::Parse(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
