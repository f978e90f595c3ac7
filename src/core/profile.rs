use std::path::Path;
use std::process::Command;
use tracing::debug;

use crate::credentials::EnvLookup;
use crate::error::{CoverMeError, Result};

/// Markers left in the starter profile until the user edits it
pub const PLACEHOLDER_MARKERS: &[&str] = &["[Your Company]", "[Achievement 1]"];

pub fn has_template_placeholders(content: &str) -> bool {
    PLACEHOLDER_MARKERS.iter().any(|marker| content.contains(marker))
}

/// `$VISUAL`, then `$EDITOR`, then the first platform editor on `PATH`
pub fn detect_editor(env: &dyn EnvLookup) -> String {
    for var in ["VISUAL", "EDITOR"] {
        if let Some(editor) = env.var(var) {
            let program = editor.split_whitespace().next().unwrap_or_default();
            if !program.is_empty() && which::which(program).is_ok() {
                return editor;
            }
        }
    }

    if cfg!(target_os = "macos") {
        return "open".to_string();
    }

    let candidates: &[&str] = if cfg!(windows) {
        &["code", "notepad++", "notepad"]
    } else {
        &["code", "nano", "vim", "vi", "emacs", "gedit"]
    };

    candidates
        .iter()
        .find(|name| which::which(name).is_ok())
        .map(|name| name.to_string())
        .unwrap_or_else(|| "vi".to_string())
}

/// Launch `editor` (which may carry arguments, e.g. `code --wait`) on `path`
pub fn open_in_editor(editor: &str, path: &Path) -> Result<()> {
    let mut parts = editor.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| CoverMeError::Setup("No editor configured".to_string()))?;

    debug!("Opening {} with {}", path.display(), editor);
    let status = Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .map_err(|e| CoverMeError::Setup(format!("Editor not found: {} ({})", program, e)))?;

    if !status.success() {
        return Err(CoverMeError::Setup(format!(
            "Failed to open editor: {} exited with {}",
            program, status
        )));
    }
    Ok(())
}

pub fn manual_edit_instructions(profile: &Path) -> String {
    format!(
        "Manual editing instructions:\n\
         \x20 1. Open this file in your preferred text editor:\n\
         \x20    {}\n\
         \x20 2. Replace the template placeholders with your information:\n\
         \x20    [Your Company] -> your actual company\n\
         \x20    [Achievement 1] -> your real achievements\n\
         \x20    [Skill 1] -> your actual skills\n\
         \x20 3. Add detailed information about your experience\n\
         \x20 4. Save the file when done",
        profile.display()
    )
}
