//! Prompt overrides read from a directory of markdown files.

use crate::prompts::PromptSet;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Where both binaries look for overrides, relative to the working directory.
pub const PROMPTS_DIR: &str = "prompts";

/// `interviewer.md` overrides the `interviewer` prompt, and so on.
fn override_key(path: &Path) -> Option<&str> {
    if !path.is_file() || path.extension()? != "md" {
        return None;
    }
    path.file_stem()?.to_str()
}

/// Reads every markdown file in `dir`, keyed by file stem.
pub fn read_overrides(dir: &Path) -> Result<HashMap<String, String>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read prompts directory: {}", dir.display()))?;

    let mut overrides = HashMap::new();
    for entry in entries {
        let path = entry?.path();
        let Some(key) = override_key(&path) else {
            continue;
        };
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;
        overrides.insert(key.to_string(), text);
    }
    Ok(overrides)
}

/// Built-in prompts, overridden by files in `dir` when that directory exists.
pub fn load_prompt_set(dir: &Path) -> Result<PromptSet> {
    if !dir.is_dir() {
        tracing::debug!("No prompts directory at {}, using built-in prompts", dir.display());
        return Ok(PromptSet::default());
    }
    let overrides = read_overrides(dir)?;
    tracing::info!("Loaded {} prompt overrides from {}", overrides.len(), dir.display());
    Ok(PromptSet::with_overrides(&overrides))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::FEEDBACK_PROMPT;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_only_markdown_files_are_read() -> Result<()> {
        let dir = tempdir()?;

        // `{{...}}` escapes the braces, so `{username}` is written to the file.
        let mut interviewer = File::create(dir.path().join("interviewer.md"))?;
        writeln!(interviewer, "Interview {{username}} politely.")?;
        let mut notes = File::create(dir.path().join("notes.txt"))?;
        writeln!(notes, "not a prompt")?;
        fs::create_dir(dir.path().join("drafts.md"))?;

        let overrides = read_overrides(dir.path())?;

        assert_eq!(overrides.len(), 1);
        assert_eq!(
            overrides.get("interviewer").map(String::as_str),
            Some("Interview {username} politely.\n")
        );
        Ok(())
    }

    #[test]
    fn test_unreadable_dir_is_an_error() {
        assert!(read_overrides(Path::new("nonexistent_dir_for_testing_prompts")).is_err());
    }

    #[test]
    fn test_prompt_set_overrides_builtins() -> Result<()> {
        let dir = tempdir()?;
        let mut file = File::create(dir.path().join("questions.md"))?;
        writeln!(file, "Ask {{amount}} questions about {{role}}.")?;

        let prompts = load_prompt_set(dir.path())?;
        assert_eq!(prompts.questions, "Ask {amount} questions about {role}.");
        assert_eq!(prompts.feedback, FEEDBACK_PROMPT);
        Ok(())
    }

    #[test]
    fn test_missing_dir_falls_back_to_builtins() -> Result<()> {
        let prompts = load_prompt_set(Path::new("nonexistent_dir_for_testing_prompts"))?;
        assert_eq!(prompts, PromptSet::default());
        Ok(())
    }
}
