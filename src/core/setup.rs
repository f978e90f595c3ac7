//! First-run setup and configuration edits.
//!
//! Prompting is kept generic over `BufRead`/`Write` so the wizard can be
//! driven from scripted input.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use tera::{Context, Tera};
use tracing::debug;

use crate::config::{Config, ConfigResolver, LlmConfig, OutputConfig, OutputFormat, Provider, UserConfig};
use crate::error::{CoverMeError, Result};
use super::llm::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use super::profile::has_template_placeholders;

pub const DEFAULT_OUTPUT_DIR: &str = "~/Desktop/cover-letters";

const PROFILE_TEMPLATE: &str = r#"# Professional Profile

## Summary
Write a brief professional summary highlighting your key skills and experience.

## Experience
### Current/Recent Position
- **Company**: [Your Company]
- **Title**: {{ title | default(value="[Your Title]") }}
- **Duration**: [Start Date] - Present
- **Key Achievements**:
  - [Achievement 1]
  - [Achievement 2]
  - [Achievement 3]

### Previous Experience
Add your previous roles and key accomplishments here.

## Skills
### Technical Skills
- [Skill 1]
- [Skill 2]
- [Skill 3]

### Soft Skills
- [Skill 1]
- [Skill 2]
- [Skill 3]

## Education
### Degree
- **Institution**: [University Name]
- **Degree**: [Degree Type and Major]
- **Year**: [Graduation Year]

## Certifications
- [Certification 1]
- [Certification 2]
{% if linkedin or github %}
## Links
{% if linkedin %}- LinkedIn: {{ linkedin }}
{% endif %}{% if github %}- GitHub: {{ github }}
{% endif %}{% endif %}
---
*Edit this file with 'cover-me profile' to add your detailed professional background.*
"#;

/// Line-oriented prompts over any reader/writer pair
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, line: &str) -> Result<()> {
        writeln!(self.output, "{}", line)?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String> {
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(CoverMeError::Setup("Setup cancelled: input closed".to_string()));
        }
        Ok(line.trim().to_string())
    }

    /// Free-form answer; empty input takes `default` when one is given
    pub fn ask(&mut self, label: &str, default: Option<&str>) -> Result<String> {
        loop {
            match default {
                Some(d) if !d.is_empty() => write!(self.output, "{} [{}]: ", label, d)?,
                _ => write!(self.output, "{}: ", label)?,
            }
            let answer = self.read_line()?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            if let Some(d) = default {
                return Ok(d.to_string());
            }
        }
    }

    /// Numbered menu; returns the zero-based index of the choice
    pub fn choose(&mut self, label: &str, options: &[&str]) -> Result<usize> {
        self.say(label)?;
        for (i, option) in options.iter().enumerate() {
            self.say(&format!("[{}] {}", i + 1, option))?;
        }
        loop {
            write!(self.output, "Choice: ")?;
            match self.read_line()?.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(n - 1),
                _ => self.say(&format!("Please enter a number between 1 and {}", options.len()))?,
            }
        }
    }

    pub fn confirm(&mut self, label: &str, default: bool) -> Result<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            write!(self.output, "{} [{}]: ", label, hint)?;
            match self.read_line()?.to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.say("Please answer y or n")?,
            }
        }
    }
}

/// Everything the wizard collects
#[derive(Debug, Clone, PartialEq)]
pub struct SetupAnswers {
    pub user: UserConfig,
    pub llm: LlmConfig,
    pub output: OutputConfig,
}

impl SetupAnswers {
    pub fn provider(&self) -> Result<Provider> {
        self.llm
            .provider
            .as_deref()
            .unwrap_or_default()
            .parse()
    }

    pub fn into_config(self) -> Config {
        Config {
            user: Some(self.user),
            llm: Some(self.llm),
            output: Some(self.output),
            pdf: None,
            clipboard: None,
        }
    }
}

pub fn llm_defaults(provider: Provider, model: &str) -> LlmConfig {
    LlmConfig {
        provider: Some(provider.as_str().to_string()),
        model: Some(model.to_string()),
        max_tokens: Some(DEFAULT_MAX_TOKENS),
        temperature: Some(DEFAULT_TEMPERATURE),
        base_url: None,
    }
}

pub fn select_llm_provider<R: BufRead, W: Write>(prompter: &mut Prompter<R, W>) -> Result<LlmConfig> {
    let names: Vec<&str> = Provider::ALL.iter().map(|p| p.display_name()).collect();
    let provider = Provider::ALL[prompter.choose("Which AI provider would you like to use?", &names)?];

    let models = provider.models();
    let descriptions: Vec<&str> = models.iter().map(|(_, description)| *description).collect();
    let label = format!("Which {} model would you like to use?", provider.display_name());
    let (model, _) = models[prompter.choose(&label, &descriptions)?];

    Ok(llm_defaults(provider, model))
}

pub fn collect_professional_info<R: BufRead, W: Write>(prompter: &mut Prompter<R, W>) -> Result<UserConfig> {
    prompter.say("Please provide your professional contact information:")?;
    Ok(UserConfig {
        name: prompter.ask("Full Name", None)?,
        email: prompter.ask("Email", None)?,
        phone: prompter.ask("Phone (optional)", Some(""))?,
        title: prompter.ask("Professional Title", None)?,
        linkedin: normalize_profile_url(
            &prompter.ask("LinkedIn URL (optional)", Some(""))?,
            "https://linkedin.com/in/",
        ),
        github: normalize_profile_url(
            &prompter.ask("GitHub URL (optional)", Some(""))?,
            "https://github.com/",
        ),
    })
}

pub fn configure_output_preferences<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
) -> Result<OutputConfig> {
    let choice = prompter.choose(
        "Select your preferred output format:",
        &["PDF (recommended)", "Plain text"],
    )?;
    let format = if choice == 0 { OutputFormat::Pdf } else { OutputFormat::Text };
    let output_dir = prompter.ask("Save location", Some(DEFAULT_OUTPUT_DIR))?;

    Ok(OutputConfig {
        format: format.as_str().to_string(),
        output_dir,
        save_to_file: true,
    })
}

/// Bare handles become full profile URLs; URLs and empty input pass through
pub fn normalize_profile_url(value: &str, base: &str) -> String {
    let value = value.trim();
    if value.is_empty() || value.starts_with("http://") || value.starts_with("https://") {
        value.to_string()
    } else {
        format!("{}{}", base, value)
    }
}

pub fn render_profile_template(user: &UserConfig) -> Result<String> {
    let mut context = Context::new();
    if !user.title.is_empty() {
        context.insert("title", &user.title);
    }
    context.insert("linkedin", &user.linkedin);
    context.insert("github", &user.github);
    Ok(Tera::one_off(PROFILE_TEMPLATE, &context, false)?)
}

/// Copy defaults, save the config and write a starter profile. Existing
/// profiles are only replaced while they still hold template placeholders.
pub fn persist_setup(resolver: &ConfigResolver, answers: &SetupAnswers) -> Result<PathBuf> {
    let paths = resolver.paths();
    let wrap = |e: CoverMeError| CoverMeError::Setup(format!("Failed to save configuration: {}", e));

    paths.copy_defaults_to_user().map_err(wrap)?;
    resolver.save(&answers.clone().into_config()).map_err(wrap)?;

    let profile_path = paths.user_profile_file();
    let replace = match std::fs::read_to_string(&profile_path) {
        Ok(existing) => has_template_placeholders(&existing),
        Err(_) => true,
    };
    if replace {
        render_profile_template(&answers.user)
            .and_then(|content| std::fs::write(&profile_path, content).map_err(CoverMeError::from))
            .map_err(|e| CoverMeError::Setup(format!("Failed to create profile template: {}", e)))?;
        debug!("Wrote profile template to {}", profile_path.display());
    }

    Ok(paths.user_config_file())
}

/// Edits requested through `cover-me configure`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigChanges {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub format: Option<String>,
    pub output_dir: Option<String>,
}

impl ConfigChanges {
    pub fn is_empty(&self) -> bool {
        *self == ConfigChanges::default()
    }
}

/// Apply `changes`, validating each value. Switching provider without naming
/// a model selects that provider's recommended model.
pub fn apply_changes(mut config: Config, changes: &ConfigChanges) -> Result<Config> {
    if changes.provider.is_some() || changes.model.is_some() {
        let llm = config.llm.get_or_insert_with(LlmConfig::default);
        if let Some(raw) = &changes.provider {
            let provider: Provider = raw.parse()?;
            let current = llm.provider.as_deref().and_then(|p| p.parse::<Provider>().ok());
            if current != Some(provider) && changes.model.is_none() {
                llm.model = Some(provider.models()[0].0.to_string());
            }
            llm.provider = Some(provider.as_str().to_string());
        }
        if let Some(model) = &changes.model {
            if model.trim().is_empty() {
                return Err(CoverMeError::Validation("Model name cannot be empty".to_string()));
            }
            llm.model = Some(model.trim().to_string());
        }
    }

    if changes.format.is_some() || changes.output_dir.is_some() {
        let output = config.output.get_or_insert_with(OutputConfig::default);
        if let Some(raw) = &changes.format {
            let format: OutputFormat = raw
                .parse()
                .map_err(|e: CoverMeError| CoverMeError::Validation(e.to_string()))?;
            output.format = format.as_str().to_string();
        }
        if let Some(dir) = &changes.output_dir {
            if dir.trim().is_empty() {
                return Err(CoverMeError::Validation("Output directory cannot be empty".to_string()));
            }
            output.output_dir = dir.trim().to_string();
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::{env_with, sample_config};
    use crate::config::ConfigPaths;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn prompter(script: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(script.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_wizard_steps_from_scripted_input() {
        let mut p = prompter("2\n1\nAnn Example\nann@example.com\n\nStaff Engineer\nann-example\nhttps://github.com/ann\n9\n1\n\n");

        let llm = select_llm_provider(&mut p).unwrap();
        assert_eq!(llm.provider.as_deref(), Some("anthropic"));
        assert_eq!(llm.model.as_deref(), Some("claude-haiku-4-5-20251001"));
        assert_eq!(llm.max_tokens, Some(1000));

        let user = collect_professional_info(&mut p).unwrap();
        assert_eq!(user.name, "Ann Example");
        assert_eq!(user.phone, "");
        assert_eq!(user.linkedin, "https://linkedin.com/in/ann-example");
        assert_eq!(user.github, "https://github.com/ann");

        // "9" is out of range and re-prompted
        let output = configure_output_preferences(&mut p).unwrap();
        assert_eq!(output.format, "pdf");
        assert_eq!(output.output_dir, DEFAULT_OUTPUT_DIR);
    }

    #[test]
    fn test_closed_input_cancels_setup() {
        let mut p = prompter("");
        let err = p.ask("Full Name", None).unwrap_err();
        assert!(matches!(err, CoverMeError::Setup(_)));
    }

    #[test]
    fn test_confirm_defaults() {
        let mut p = prompter("\nyes\nmaybe\nn\n");
        assert!(p.confirm("Overwrite?", true).unwrap());
        assert!(p.confirm("Overwrite?", false).unwrap());
        assert!(!p.confirm("Overwrite?", true).unwrap());
    }

    #[test]
    fn test_normalize_profile_url() {
        assert_eq!(normalize_profile_url("", "https://github.com/"), "");
        assert_eq!(normalize_profile_url("octo", "https://github.com/"), "https://github.com/octo");
        assert_eq!(normalize_profile_url("http://x.dev", "https://github.com/"), "http://x.dev");
    }

    #[test]
    fn test_profile_template_uses_title_and_links() {
        let user = UserConfig {
            title: "Data Engineer".to_string(),
            github: "https://github.com/ann".to_string(),
            ..Default::default()
        };
        let profile = render_profile_template(&user).unwrap();
        assert!(profile.contains("- **Title**: Data Engineer"));
        assert!(profile.contains("- GitHub: https://github.com/ann"));
        assert!(!profile.contains("LinkedIn"));
        assert!(has_template_placeholders(&profile));

        let untitled = render_profile_template(&UserConfig::default()).unwrap();
        assert!(untitled.contains("- **Title**: [Your Title]"));
    }

    #[test]
    fn test_persist_setup_writes_config_and_profile() {
        let dir = TempDir::new().unwrap();
        let paths = ConfigPaths::new(dir.path().join("user"), dir.path().join("defaults"));
        let resolver = ConfigResolver::new(paths, env_with(&[]));
        let answers = SetupAnswers {
            user: UserConfig { name: "Ann".into(), title: "Engineer".into(), ..Default::default() },
            llm: llm_defaults(Provider::OpenAi, "gpt-4o-mini"),
            output: OutputConfig::default(),
        };

        let written = persist_setup(&resolver, &answers).unwrap();
        assert_eq!(written, resolver.paths().user_config_file());
        let loaded = resolver.load().unwrap();
        assert_eq!(loaded.llm, Some(answers.llm.clone()));
        let profile = std::fs::read_to_string(resolver.paths().user_profile_file()).unwrap();
        assert!(profile.contains("Engineer"));

        // a customised profile survives a second setup
        std::fs::write(resolver.paths().user_profile_file(), "My real profile").unwrap();
        persist_setup(&resolver, &answers).unwrap();
        let profile = std::fs::read_to_string(resolver.paths().user_profile_file()).unwrap();
        assert_eq!(profile, "My real profile");
    }

    #[test]
    fn test_apply_changes_switches_provider_and_model() {
        let config = sample_config("openai");
        let updated = apply_changes(
            config,
            &ConfigChanges { provider: Some("Anthropic".into()), ..Default::default() },
        )
        .unwrap();
        let llm = updated.llm.unwrap();
        assert_eq!(llm.provider.as_deref(), Some("anthropic"));
        assert_eq!(llm.model.as_deref(), Some("claude-haiku-4-5-20251001"));
    }

    #[test]
    fn test_apply_changes_validates_values() {
        let err = apply_changes(
            sample_config("openai"),
            &ConfigChanges { format: Some("docx".into()), ..Default::default() },
        )
        .unwrap_err();
        assert!(matches!(err, CoverMeError::Validation(_)));

        let err = apply_changes(
            sample_config("openai"),
            &ConfigChanges { provider: Some("mistral".into()), ..Default::default() },
        )
        .unwrap_err();
        assert!(err.to_string().contains("'mistral'"));

        let updated = apply_changes(
            sample_config("openai"),
            &ConfigChanges { format: Some("PDF".into()), output_dir: Some("~/letters".into()), ..Default::default() },
        )
        .unwrap();
        let output = updated.output.unwrap();
        assert_eq!(output.format, "pdf");
        assert_eq!(output.output_dir, "~/letters");
    }
}
