use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::error::{CoverMeError, Result};

/// Where the job description comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobInput {
    Clipboard,
    File(PathBuf),
}

impl JobInput {
    /// Read and validate the job description text
    pub fn read(&self, clipboard: &dyn ClipboardSource, max_size_bytes: usize) -> Result<String> {
        match self {
            JobInput::Clipboard => {
                let content = clipboard.read_text()?;
                validate_clipboard_content(&content, max_size_bytes)
            }
            JobInput::File(path) => read_job_file(path),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            JobInput::Clipboard => "clipboard".to_string(),
            JobInput::File(path) => path.display().to_string(),
        }
    }
}

/// Source of clipboard text
pub trait ClipboardSource: Send + Sync {
    fn read_text(&self) -> Result<String>;
}

/// Clipboard access through the platform's paste utility
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

const PASTE_COMMANDS: &[(&str, &[&str])] = &[
    ("pbpaste", &[]),
    ("wl-paste", &["--no-newline"]),
    ("xclip", &["-o", "-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--output"]),
    ("powershell", &["-NoProfile", "-Command", "Get-Clipboard"]),
];

impl ClipboardSource for SystemClipboard {
    fn read_text(&self) -> Result<String> {
        let (program, args) = PASTE_COMMANDS
            .iter()
            .find_map(|(name, args)| which::which(name).ok().map(|path| (path, *args)))
            .ok_or_else(|| {
                CoverMeError::Validation(
                    "No clipboard utility found (tried pbpaste, wl-paste, xclip, xsel, powershell). \
                     Use --file to read the job description from a file."
                        .to_string(),
                )
            })?;

        debug!("Reading clipboard with {}", program.display());
        let output = Command::new(&program).args(args).output()?;
        if !output.status.success() {
            return Err(CoverMeError::Validation(format!(
                "Failed to access clipboard: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Trim clipboard text and enforce the non-empty and size rules
pub fn validate_clipboard_content(content: &str, max_size_bytes: usize) -> Result<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(CoverMeError::Validation(
            "Clipboard is empty. Please copy a job description to the clipboard first.".to_string(),
        ));
    }
    if content.len() > max_size_bytes {
        return Err(CoverMeError::Validation(format!(
            "Clipboard content is too large (>{}KB). Please use file input for large job descriptions.",
            max_size_bytes / 1000
        )));
    }
    Ok(content.to_string())
}

fn read_job_file(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(CoverMeError::Validation(format!(
            "Job description file not found: {}",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path)?;
    let content = content.trim();
    if content.is_empty() {
        return Err(CoverMeError::Validation(format!(
            "Job description file is empty: {}",
            path.display()
        )));
    }
    Ok(content.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_fs::prelude::*;

    pub(crate) struct FixedClipboard(pub &'static str);

    impl ClipboardSource for FixedClipboard {
        fn read_text(&self) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_clipboard_content_is_trimmed() {
        let text = JobInput::Clipboard
            .read(&FixedClipboard("  Senior engineer wanted\n"), 50_000)
            .unwrap();
        assert_eq!(text, "Senior engineer wanted");
    }

    #[test]
    fn test_empty_clipboard_is_rejected() {
        let err = JobInput::Clipboard.read(&FixedClipboard(" \n\t "), 50_000).unwrap_err();
        assert!(matches!(err, CoverMeError::Validation(_)));
        assert!(err.to_string().contains("Clipboard is empty"));
    }

    #[test]
    fn test_oversized_clipboard_is_rejected() {
        let err = validate_clipboard_content(&"x".repeat(2_001), 2_000).unwrap_err();
        assert!(err.to_string().contains(">2KB"));
        assert!(validate_clipboard_content(&"x".repeat(2_000), 2_000).is_ok());
    }

    #[test]
    fn test_file_input() {
        let temp = assert_fs::TempDir::new().unwrap();
        let job = temp.child("job.txt");
        job.write_str("\nBackend role at Acme\n").unwrap();

        let text = JobInput::File(job.path().to_path_buf())
            .read(&FixedClipboard(""), 10)
            .unwrap();
        assert_eq!(text, "Backend role at Acme");
    }

    #[test]
    fn test_missing_file_is_validation_error() {
        let err = JobInput::File(PathBuf::from("/definitely/not/here.txt"))
            .read(&FixedClipboard(""), 10)
            .unwrap_err();
        assert!(matches!(err, CoverMeError::Validation(_)));
    }
}
