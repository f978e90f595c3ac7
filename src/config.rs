use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::credentials::{CredentialGuard, SharedEnv};
use crate::error::{CoverMeError, Result};

/// Environment variable that replaces `llm.provider`
pub const PROVIDER_OVERRIDE_VAR: &str = "COVER_ME_LLM_PROVIDER";

/// Environment variable that replaces `output.output_dir`
pub const OUTPUT_DIR_OVERRIDE_VAR: &str = "COVER_ME_OUTPUT_DIR";

/// Environment variable that relocates the installation defaults
pub const DEFAULTS_DIR_VAR: &str = "COVER_ME_DEFAULTS_DIR";

pub const DEFAULT_TEMPLATE_NAME: &str = "modern_template.html";
pub const DEFAULT_CLIPBOARD_MAX_BYTES: usize = 50_000;

const CONFIG_FILE: &str = "config.yaml";
const PROFILE_FILE: &str = "profile.md";
const SYSTEM_PROMPT_FILE: &str = "system_prompt.md";
const TEMPLATES_DIR: &str = "templates";

/// Copies of `defaults/` compiled into the binary, used when the
/// installation defaults directory is not on disk
const EMBEDDED_DEFAULTS: &[(&str, &str)] = &[
    (CONFIG_FILE, include_str!("../defaults/config.yaml")),
    (PROFILE_FILE, include_str!("../defaults/profile.md")),
    (SYSTEM_PROMPT_FILE, include_str!("../defaults/system_prompt.md")),
    (
        "templates/modern_template.html",
        include_str!("../defaults/templates/modern_template.html"),
    ),
];

/// Supported LLM backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    Anthropic,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::OpenAi, Provider::Anthropic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Anthropic => "Anthropic",
        }
    }

    /// `{PROVIDER_UPPER}_API_KEY`
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn key_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://platform.openai.com/api-keys",
            Provider::Anthropic => "https://console.anthropic.com/",
        }
    }

    /// Model used when the configuration names none
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o",
            Provider::Anthropic => "claude-3-5-sonnet-20241022",
        }
    }

    /// Models offered by the setup wizard, recommended first
    pub fn models(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Provider::OpenAi => &[
                ("gpt-4.1-mini", "GPT-4.1 Mini (Recommended)"),
                ("gpt-4.1-nano", "GPT-4.1 Nano (Cheapest)"),
                ("gpt-4o-mini", "GPT-4o Mini"),
                ("gpt-4.1", "GPT-4.1"),
            ],
            Provider::Anthropic => &[
                ("claude-haiku-4-5-20251001", "Claude 4.5 Haiku (Recommended)"),
                ("claude-3-5-haiku-latest", "Claude 3.5 Haiku (Cheapest)"),
                ("claude-sonnet-4-5-20250929", "Claude 4.5 Sonnet"),
            ],
        }
    }

    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = CoverMeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            _ => Err(CoverMeError::Config(format!(
                "Unsupported LLM provider: '{}'. Supported providers: {}",
                s,
                Provider::supported_list()
            ))),
        }
    }
}

/// Artifact produced by a generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pdf,
    Text,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Text => "text",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Text => "txt",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = CoverMeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(OutputFormat::Pdf),
            "text" | "txt" => Ok(OutputFormat::Text),
            _ => Err(CoverMeError::Config(format!(
                "Unsupported output format: '{}'. Supported formats: pdf, text",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider (openai, anthropic)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Model name (e.g., "gpt-4o-mini", "claude-haiku-4-5-20251001")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Maximum tokens for the generated letter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Alternative API endpoint (proxies, gateways)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format (pdf or text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Directory that receives timestamped letters
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default = "default_true")]
    pub save_to_file: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            output_dir: default_output_dir(),
            save_to_file: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfConfig {
    /// Template file name, looked up in the user then default templates dir
    #[serde(default = "default_template")]
    pub template: String,

    /// Values that override the ones derived from the `user` section
    #[serde(default)]
    pub template_variables: BTreeMap<String, String>,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
            template_variables: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub github: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardConfig {
    #[serde(default = "default_clipboard_max")]
    pub max_size_bytes: usize,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_CLIPBOARD_MAX_BYTES,
        }
    }
}

/// Full configuration file. `llm` and `output` are required but modelled as
/// optional so that their absence is reported by [`ConfigResolver::validate`]
/// rather than as a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf: Option<PdfConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clipboard: Option<ClipboardConfig>,
}

fn default_format() -> String {
    OutputFormat::Text.as_str().to_string()
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_true() -> bool {
    true
}

fn default_template() -> String {
    DEFAULT_TEMPLATE_NAME.to_string()
}

fn default_clipboard_max() -> usize {
    DEFAULT_CLIPBOARD_MAX_BYTES
}

impl Config {
    pub fn llm(&self) -> Result<&LlmConfig> {
        self.llm
            .as_ref()
            .ok_or_else(|| missing_section("llm"))
    }

    pub fn output(&self) -> Result<&OutputConfig> {
        self.output
            .as_ref()
            .ok_or_else(|| missing_section("output"))
    }

    pub fn provider(&self) -> Result<Provider> {
        match self.llm()?.provider.as_deref() {
            Some(value) => value.parse(),
            None => Err(CoverMeError::Config(
                "LLM provider not specified. Run 'cover-me setup' to configure your AI provider."
                    .to_string(),
            )),
        }
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        self.output()?.format.parse()
    }

    /// Output directory with `~` expanded
    pub fn output_dir(&self) -> Result<PathBuf> {
        let raw = &self.output()?.output_dir;
        Ok(PathBuf::from(shellexpand::tilde(raw).as_ref()))
    }

    pub fn template_name(&self) -> &str {
        self.pdf
            .as_ref()
            .map(|pdf| pdf.template.as_str())
            .unwrap_or(DEFAULT_TEMPLATE_NAME)
    }

    pub fn clipboard_max_bytes(&self) -> usize {
        self.clipboard
            .as_ref()
            .map(|c| c.max_size_bytes)
            .unwrap_or(DEFAULT_CLIPBOARD_MAX_BYTES)
    }
}

fn missing_section(section: &str) -> CoverMeError {
    CoverMeError::Config(format!(
        "Missing required configuration section: {}. \
         Run 'cover-me setup' to initialize your configuration.",
        section
    ))
}

/// A single environment-sourced replacement applied on top of a file config
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverride {
    Provider(String),
    OutputDir(String),
}

impl ConfigOverride {
    /// Collect overrides from the environment, provider first
    pub fn from_env(env: &SharedEnv) -> Vec<ConfigOverride> {
        let mut overrides = Vec::new();
        if let Some(provider) = env.var(PROVIDER_OVERRIDE_VAR) {
            overrides.push(ConfigOverride::Provider(provider));
        }
        if let Some(dir) = env.var(OUTPUT_DIR_OVERRIDE_VAR) {
            overrides.push(ConfigOverride::OutputDir(dir));
        }
        overrides
    }
}

/// Apply `overrides` in order to `base`; later entries win
pub fn merge(mut base: Config, overrides: &[ConfigOverride]) -> Config {
    for item in overrides {
        match item {
            ConfigOverride::Provider(provider) => {
                base.llm.get_or_insert_with(LlmConfig::default).provider = Some(provider.clone());
            }
            ConfigOverride::OutputDir(dir) => {
                base.output.get_or_insert_with(OutputConfig::default).output_dir = dir.clone();
            }
        }
    }
    base
}

/// Filesystem locations for user files and installation defaults
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub user_dir: PathBuf,
    pub defaults_dir: PathBuf,
}

impl ConfigPaths {
    pub fn new(user_dir: PathBuf, defaults_dir: PathBuf) -> Self {
        Self { user_dir, defaults_dir }
    }

    /// `~/.cover-me` (or `user_dir` when given) plus the installation defaults
    pub fn discover(user_dir: Option<PathBuf>, env: &SharedEnv) -> Self {
        let user_dir = user_dir.unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".cover-me")
        });
        let defaults_dir = env
            .var(DEFAULTS_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("defaults"));
        Self::new(user_dir, defaults_dir)
    }

    pub fn user_config_file(&self) -> PathBuf {
        self.user_dir.join(CONFIG_FILE)
    }

    pub fn user_profile_file(&self) -> PathBuf {
        self.user_dir.join(PROFILE_FILE)
    }

    pub fn user_system_prompt_file(&self) -> PathBuf {
        self.user_dir.join(SYSTEM_PROMPT_FILE)
    }

    pub fn user_templates_dir(&self) -> PathBuf {
        self.user_dir.join(TEMPLATES_DIR)
    }

    pub fn default_config_file(&self) -> PathBuf {
        self.defaults_dir.join(CONFIG_FILE)
    }

    pub fn system_prompt_path(&self) -> PathBuf {
        prefer_user(self.user_system_prompt_file(), self.defaults_dir.join(SYSTEM_PROMPT_FILE))
    }

    pub fn profile_path(&self) -> PathBuf {
        prefer_user(self.user_profile_file(), self.defaults_dir.join(PROFILE_FILE))
    }

    pub fn template_path(&self, name: &str) -> PathBuf {
        prefer_user(
            self.user_templates_dir().join(name),
            self.defaults_dir.join(TEMPLATES_DIR).join(name),
        )
    }

    pub fn ensure_user_dir(&self) -> Result<()> {
        std::fs::create_dir_all(self.user_templates_dir())?;
        Ok(())
    }

    /// Copy default config, profile, system prompt and templates into the
    /// user directory without overwriting anything already there. Files
    /// missing from the defaults directory come from the embedded copies.
    pub fn copy_defaults_to_user(&self) -> Result<()> {
        self.ensure_user_dir()?;

        let default_templates = self.defaults_dir.join(TEMPLATES_DIR);
        if default_templates.is_dir() {
            for entry in std::fs::read_dir(&default_templates)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("html") {
                    continue;
                }
                if let Some(name) = path.file_name() {
                    copy_if_missing(&path, &self.user_templates_dir().join(name))?;
                }
            }
        }

        for (relative, embedded) in EMBEDDED_DEFAULTS {
            let target = self.user_dir.join(relative);
            if target.exists() {
                continue;
            }
            let source = self.defaults_dir.join(relative);
            if source.is_file() {
                copy_if_missing(&source, &target)?;
            } else {
                debug!("Writing built-in {} (no {})", relative, source.display());
                std::fs::write(&target, embedded)?;
            }
        }
        Ok(())
    }
}

fn prefer_user(user: PathBuf, fallback: PathBuf) -> PathBuf {
    if user.exists() {
        user
    } else {
        fallback
    }
}

fn copy_if_missing(from: &Path, to: &Path) -> Result<()> {
    if from.exists() && !to.exists() {
        debug!("Copying {} -> {}", from.display(), to.display());
        std::fs::copy(from, to)?;
    }
    Ok(())
}

/// Loads, merges and validates configuration
#[derive(Clone)]
pub struct ConfigResolver {
    paths: ConfigPaths,
    env: SharedEnv,
}

impl ConfigResolver {
    pub fn new(paths: ConfigPaths, env: SharedEnv) -> Self {
        Self { paths, env }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn env(&self) -> &SharedEnv {
        &self.env
    }

    pub fn credentials(&self) -> CredentialGuard {
        CredentialGuard::new(self.env.clone())
    }

    pub fn has_user_config(&self) -> bool {
        self.paths.user_config_file().exists()
    }

    /// User file if present, otherwise the installation default, then
    /// environment overrides on top
    pub fn load(&self) -> Result<Config> {
        let user_file = self.paths.user_config_file();
        let base = if user_file.exists() {
            debug!("Loading user configuration from {}", user_file.display());
            parse_file(&user_file, "user")?
        } else {
            let default_file = self.paths.default_config_file();
            if !default_file.exists() {
                return Err(CoverMeError::Config(
                    "No default configuration found. Please run setup to initialize configuration."
                        .to_string(),
                ));
            }
            debug!("Loading default configuration from {}", default_file.display());
            parse_file(&default_file, "default")?
        };

        let overrides = ConfigOverride::from_env(&self.env);
        if !overrides.is_empty() {
            debug!("Applying environment overrides: {:?}", overrides);
        }
        Ok(merge(base, &overrides))
    }

    /// Structural checks plus the credential for the selected provider
    pub fn validate(&self, config: &Config) -> Result<()> {
        let llm = config.llm()?;
        config.output()?;
        config.provider()?;

        if llm.model.as_deref().map_or(true, |m| m.trim().is_empty()) {
            return Err(CoverMeError::Config(
                "LLM model not specified. Run 'cover-me configure' to select a model.".to_string(),
            ));
        }

        config.output_format()?;

        self.validate_credentials(config)
    }

    pub fn validate_credentials(&self, config: &Config) -> Result<()> {
        let provider = config.provider()?;
        self.credentials().require(provider)?;
        Ok(())
    }

    /// Cheap pre-flight: a user config must exist and its provider's key
    /// must be set. Nothing else is validated.
    pub fn check_credentials_early(&self) -> Result<()> {
        if !self.has_user_config() {
            return Err(CoverMeError::Config(
                "No configuration found. Run 'cover-me setup' to get started.".to_string(),
            ));
        }
        let config = self.load()?;
        self.validate_credentials(&config)
    }

    /// Rewrite the whole user configuration file
    pub fn save(&self, config: &Config) -> Result<()> {
        self.paths.ensure_user_dir()?;
        let content = serde_yaml::to_string(config)?;
        let path = self.paths.user_config_file();
        std::fs::write(&path, content)?;
        info!("Saved configuration to {}", path.display());
        Ok(())
    }
}

fn parse_file(path: &Path, label: &str) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&content)
        .map_err(|e| CoverMeError::Config(format!("Invalid YAML in {} configuration: {}", label, e)))
}
