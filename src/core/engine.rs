use chrono::Local;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{Config, ConfigPaths, ConfigResolver, LlmConfig, OutputFormat, Provider, UserConfig};
use crate::credentials::{remediation, ProcessEnv, SharedEnv};
use crate::error::{CoverMeError, Result};
use super::generator::CoverLetterGenerator;
use super::input::{ClipboardSource, JobInput, SystemClipboard};
use super::llm::{create_client, ProviderInfo};
use super::profile::{detect_editor, has_template_placeholders, manual_edit_instructions, open_in_editor};
use super::renderer::{default_output_path, template_variables, DocumentRenderer, PdfBackend, RenderTarget, SystemPdfBackend};
use super::setup::{
    apply_changes, collect_professional_info, configure_output_preferences, llm_defaults,
    normalize_profile_url, persist_setup, select_llm_provider, ConfigChanges, Prompter,
    SetupAnswers, DEFAULT_OUTPUT_DIR,
};

/// Result of a successful generation run
#[derive(Debug, Clone)]
pub struct GeneratedLetter {
    pub text: String,
    /// `None` when the letter was not written to disk
    pub path: Option<PathBuf>,
}

/// Answers supplied on the command line instead of through prompts
#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    pub non_interactive: bool,
    pub force: bool,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub format: Option<String>,
    pub output_dir: Option<String>,
}

impl SetupOptions {
    /// Flag values with the wizard's defaults filled in
    pub fn answers(&self) -> Result<SetupAnswers> {
        let provider: Provider = self.provider.as_deref().unwrap_or("openai").parse()?;
        let model = match &self.model {
            Some(model) => model.clone(),
            None => provider.models()[0].0.to_string(),
        };

        let config = apply_changes(
            Config::default(),
            &ConfigChanges {
                format: Some(self.format.clone().unwrap_or_else(|| "pdf".to_string())),
                output_dir: Some(
                    self.output_dir
                        .clone()
                        .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
                ),
                ..Default::default()
            },
        )?;
        let field = |value: &Option<String>| value.clone().unwrap_or_default();

        Ok(SetupAnswers {
            user: UserConfig {
                name: field(&self.name),
                email: field(&self.email),
                phone: field(&self.phone),
                title: field(&self.title),
                linkedin: normalize_profile_url(&field(&self.linkedin), "https://linkedin.com/in/"),
                github: normalize_profile_url(&field(&self.github), "https://github.com/"),
            },
            llm: llm_defaults(provider, &model),
            output: config.output.unwrap_or_default(),
        })
    }
}

/// A loaded, validated configuration with its ready generator
struct Session {
    config: Config,
    generator: CoverLetterGenerator,
}

/// Main orchestration engine for cover-me commands
pub struct Engine {
    resolver: ConfigResolver,
    clipboard: Box<dyn ClipboardSource>,
    renderer: DocumentRenderer,
}

impl Engine {
    /// Engine over the real environment, clipboard and PDF tools
    pub fn new(config_dir: Option<PathBuf>) -> Self {
        let env: SharedEnv = Arc::new(ProcessEnv);
        let paths = ConfigPaths::discover(config_dir, &env);
        Self::with_components(
            ConfigResolver::new(paths, env),
            Box::new(SystemClipboard),
            Box::new(SystemPdfBackend),
        )
    }

    pub fn with_components(
        resolver: ConfigResolver,
        clipboard: Box<dyn ClipboardSource>,
        pdf: Box<dyn PdfBackend>,
    ) -> Self {
        Self {
            resolver,
            clipboard,
            renderer: DocumentRenderer::new(pdf),
        }
    }

    #[cfg(test)]
    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    fn paths(&self) -> &ConfigPaths {
        self.resolver.paths()
    }

    /// Load, validate, build the client and read the prompt files
    async fn open_session(&self) -> Result<Session> {
        if !self.resolver.has_user_config() {
            return Err(CoverMeError::Config(format!(
                "No configuration found. Run 'cover-me setup' to get started.\n\
                 This will create your configuration in {}",
                self.paths().user_dir.display()
            )));
        }

        let config = self.resolver.load()?;
        self.resolver.validate(&config)?;
        debug!("Loaded configuration: {:?}", config);

        let client = create_client(config.llm()?, &self.resolver.credentials())?;
        let system_prompt = read_required(&self.paths().system_prompt_path())?;
        let professional_info = read_required(&self.paths().profile_path())?;

        Ok(Session {
            config,
            generator: CoverLetterGenerator::new(client, system_prompt, professional_info),
        })
    }

    /// Read the job description, generate, then persist the letter.
    /// Nothing is written unless generation succeeds.
    pub async fn generate(&self, input: &JobInput, output: Option<PathBuf>) -> Result<GeneratedLetter> {
        self.resolver.check_credentials_early()?;
        let session = self.open_session().await?;

        info!("Reading job description from {}", input.describe());
        let job_description = input.read(self.clipboard.as_ref(), session.config.clipboard_max_bytes())?;

        let text = session.generator.generate(&job_description).await?;

        // Clipboard runs always persist; file runs honour output.save_to_file
        let persist = output.is_some()
            || matches!(input, JobInput::Clipboard)
            || session.config.output()?.save_to_file;
        let path = if persist {
            Some(self.save_letter(&session.config, &text, output)?)
        } else {
            debug!("output.save_to_file is off, not writing the letter");
            None
        };

        Ok(GeneratedLetter { text, path })
    }

    fn save_letter(&self, config: &Config, text: &str, output: Option<PathBuf>) -> Result<PathBuf> {
        let format = config.output_format()?;
        let path = match output {
            Some(path) => path,
            None => default_output_path(&config.output_dir()?, format, Local::now()),
        };

        let target = match format {
            OutputFormat::Text => RenderTarget::Text,
            OutputFormat::Pdf => RenderTarget::Pdf {
                template: self.paths().template_path(config.template_name()),
            },
        };

        let variables = template_variables(config, Local::now().date_naive());
        self.renderer.render(text, &variables, &path, &target)
    }

    /// Probe the configured provider; failure is an API error
    pub async fn test_api(&self) -> Result<ProviderInfo> {
        let session = self.open_session().await?;
        let client = session.generator.client();
        let info = client.provider_info();

        println!("Provider: {}", info.provider);
        println!("Model: {}", info.model);
        println!("API Key: {}", info.masked_api_key);
        println!();

        if client.validate_api_key().await {
            println!("✓ API key is valid and working!");
            Ok(info)
        } else {
            Err(CoverMeError::Api(
                "API key validation failed. Check your API key and internet connection.".to_string(),
            ))
        }
    }

    /// Step-by-step health check behind `cover-me test`
    pub async fn diagnose(&self) -> Result<()> {
        println!("🧪 Testing Cover-Me Configuration");
        println!("{}", "=".repeat(35));

        println!("📁 Checking configuration...");
        let config_file = self.paths().user_config_file();
        if !self.resolver.has_user_config() {
            return Err(CoverMeError::Config(format!(
                "No user configuration found.\n   Expected location: {}",
                config_file.display()
            )));
        }
        println!("✅ Configuration found: {}", config_file.display());

        println!("\n🔧 Loading configuration...");
        let config = self.resolver.load()?;
        self.resolver.validate(&config)?;
        println!("✅ Configuration loaded and validated successfully");

        let llm = config.llm()?;
        let output = config.output()?;
        println!("\n⚙️ Current Configuration:");
        println!("   📡 Provider: {}", llm.provider.as_deref().unwrap_or_default());
        println!("   🧠 Model: {}", llm.model.as_deref().unwrap_or_default());
        println!("   📄 Output Format: {}", output.format);
        println!("   📂 Output Directory: {}", output.output_dir);

        println!("\n🔗 Testing API connection...");
        let client = create_client(llm, &self.resolver.credentials())?;
        let info = client.provider_info();
        println!("   🤖 Using {} with model {}", info.provider.display_name(), info.model);
        println!("   🔑 API Key: {}", info.masked_api_key);
        if !client.validate_api_key().await {
            return Err(CoverMeError::Api(
                "API connection failed. Check your API key and internet connection.".to_string(),
            ));
        }
        println!("✅ API connection successful!");

        println!("\n📝 Checking professional profile...");
        let profile = self.paths().profile_path();
        if !profile.exists() {
            return Err(CoverMeError::Setup(format!(
                "Profile file not found: {}\n   Run 'cover-me setup' to create your profile.",
                profile.display()
            )));
        }
        println!("✅ Profile found: {}", profile.display());
        if has_template_placeholders(&std::fs::read_to_string(&profile)?) {
            println!("⚠️  Profile contains template placeholders");
            println!("   Run 'cover-me profile' to customize your professional information");
        } else {
            println!("✅ Profile appears to be customized");
        }

        let system_prompt = self.paths().system_prompt_path();
        if system_prompt.exists() {
            println!("✅ System prompt found: {}", system_prompt.display());
        } else {
            println!("⚠️  System prompt not found, using defaults");
        }

        println!("\n🎉 All tests passed!");
        println!("Your Cover-Me setup is ready to use.");
        Ok(())
    }

    /// First-run wizard, or a flag-driven setup with `non_interactive`
    pub async fn setup(&self, options: &SetupOptions) -> Result<()> {
        let stdin = std::io::stdin();
        let mut prompter = Prompter::new(stdin.lock(), std::io::stdout());

        if self.resolver.has_user_config() && !options.force {
            let overwrite = !options.non_interactive
                && prompter.confirm("Configuration already exists. Do you want to overwrite it?", false)?;
            if !overwrite {
                return Err(CoverMeError::Setup(
                    "Configuration already exists. Re-run with --force to overwrite it.".to_string(),
                ));
            }
        }

        let answers = if options.non_interactive {
            options.answers()?
        } else {
            run_wizard(&mut prompter)?
        };

        self.check_api_key(answers.provider()?, answers.llm.model.as_deref().unwrap_or_default())
            .await?;

        let written = persist_setup(&self.resolver, &answers)?;
        println!("✅ Configuration saved to {}", written.display());
        println!("💡 Note: API keys are read from environment variables, not stored in config files");
        println!("\n📝 Next steps:");
        println!("   1. Edit your detailed professional profile: cover-me profile");
        println!("   2. Test your setup: cover-me test");
        println!("   3. Copy a job description to your clipboard, then run: cover-me");
        Ok(())
    }

    async fn check_api_key(&self, provider: Provider, model: &str) -> Result<()> {
        let credentials = self.resolver.credentials();
        if !credentials.is_present(provider) {
            return Err(CoverMeError::Setup(format!(
                "Setup cannot continue without a {} API key.\n\n{}",
                provider.display_name(),
                remediation(provider)
            )));
        }

        println!("✅ {} API key found in {}", provider.display_name(), provider.api_key_var());
        println!("🔄 Testing API connection...");
        let probe_config = LlmConfig {
            provider: Some(provider.as_str().to_string()),
            model: Some(model.to_string()),
            max_tokens: Some(10),
            ..Default::default()
        };
        let client = create_client(&probe_config, &credentials)?;
        if !client.validate_api_key().await {
            return Err(CoverMeError::Config(format!(
                "API key validation failed for {}",
                provider.display_name()
            )));
        }
        println!("✅ Success! API key is valid.");
        Ok(())
    }

    /// Apply flag-driven changes, or run the interactive editor when none given
    pub async fn configure(&self, changes: &ConfigChanges) -> Result<()> {
        if !self.resolver.has_user_config() {
            return Err(CoverMeError::Config(
                "No configuration found. Run 'cover-me setup' to create your initial configuration."
                    .to_string(),
            ));
        }
        let mut config = self.resolver.load()?;
        self.resolver.validate(&config)?;

        if changes.is_empty() {
            let stdin = std::io::stdin();
            let mut prompter = Prompter::new(stdin.lock(), std::io::stdout());
            config = self.configure_interactively(&mut prompter, config).await?;
        } else {
            config = apply_changes(config, changes)?;
        }

        if let Ok(dir) = config.output_dir() {
            if let Err(e) = std::fs::create_dir_all(&dir) {
                warn!("Cannot create output directory {}: {}", dir.display(), e);
            }
        }

        self.resolver.save(&config)?;
        println!("✅ Configuration saved!");
        Ok(())
    }

    async fn configure_interactively<R: BufRead, W: Write>(
        &self,
        prompter: &mut Prompter<R, W>,
        mut config: Config,
    ) -> Result<Config> {
        loop {
            self.show_config(prompter, &config)?;
            let choice = prompter.choose(
                "What would you like to change?",
                &[
                    "AI Provider and Model",
                    "API Key Management",
                    "Output Format",
                    "Output Directory",
                    "Test Configuration",
                    "Save and Exit",
                ],
            )?;

            match choice {
                0 => {
                    let llm = select_llm_provider(prompter)?;
                    config = apply_changes(
                        config,
                        &ConfigChanges { provider: llm.provider, model: llm.model, ..Default::default() },
                    )?;
                }
                1 => {
                    let provider = config.provider()?;
                    let status = if self.resolver.credentials().is_present(provider) {
                        format!("✅ {} is set", provider.api_key_var())
                    } else {
                        format!("❌ {} is not set", provider.api_key_var())
                    };
                    prompter.say(&status)?;
                    prompter.say(&remediation(provider))?;
                }
                2 => {
                    let format = prompter.choose("Select output format:", &["pdf", "text"])?;
                    let format = if format == 0 { "pdf" } else { "text" };
                    config = apply_changes(
                        config,
                        &ConfigChanges { format: Some(format.to_string()), ..Default::default() },
                    )?;
                }
                3 => {
                    let current = config.output()?.output_dir.clone();
                    let dir = prompter.ask("New output directory", Some(&current))?;
                    config = apply_changes(
                        config,
                        &ConfigChanges { output_dir: Some(dir), ..Default::default() },
                    )?;
                }
                4 => match self.probe(&config).await {
                    Ok(info) => prompter.say(&format!(
                        "✅ Configuration test successful! ({} / {} / {})",
                        info.provider, info.model, info.masked_api_key
                    ))?,
                    Err(e) => prompter.say(&format!("❌ Configuration test failed: {}", e))?,
                },
                _ => return Ok(config),
            }
        }
    }

    async fn probe(&self, config: &Config) -> Result<ProviderInfo> {
        let client = create_client(config.llm()?, &self.resolver.credentials())?;
        if client.validate_api_key().await {
            Ok(client.provider_info())
        } else {
            Err(CoverMeError::Api("API key validation failed!".to_string()))
        }
    }

    fn show_config<R: BufRead, W: Write>(&self, prompter: &mut Prompter<R, W>, config: &Config) -> Result<()> {
        let llm = config.llm()?;
        let output = config.output()?;
        prompter.say("\nCurrent Configuration:")?;
        prompter.say(&format!("  📡 AI Provider: {}", llm.provider.as_deref().unwrap_or_default()))?;
        prompter.say(&format!("  🧠 Model: {}", llm.model.as_deref().unwrap_or_default()))?;
        prompter.say(&format!("  📄 Output Format: {}", output.format))?;
        prompter.say(&format!("  📂 Output Directory: {}", output.output_dir))?;
        Ok(())
    }

    /// Open the user's profile in an editor
    pub fn profile(&self) -> Result<()> {
        let profile = self.paths().user_profile_file();
        if !profile.exists() {
            return Err(CoverMeError::Setup(format!(
                "Profile file not found at {}.\n\nRun 'cover-me setup' to create your profile.",
                profile.display()
            )));
        }

        let editor = detect_editor(self.resolver.env().as_ref());
        println!("📝 Opening {} in {}...", profile.display(), editor);
        if let Err(e) = open_in_editor(&editor, &profile) {
            eprintln!("❌ {}", e);
            eprintln!("\n{}", manual_edit_instructions(&profile));
            return Err(e);
        }
        println!("✅ Profile opened successfully!");
        println!("   Run 'cover-me test' to verify your setup after editing.");
        Ok(())
    }
}

fn run_wizard<R: BufRead, W: Write>(prompter: &mut Prompter<R, W>) -> Result<SetupAnswers> {
    prompter.say("🚀 Welcome to Cover-Me! Let's set up your profile and preferences.\n")?;
    prompter.say("📡 Step 1: AI Provider Setup")?;
    let llm = select_llm_provider(prompter)?;
    prompter.say("\n👤 Step 2: Professional Information")?;
    let user = collect_professional_info(prompter)?;
    prompter.say("\n📄 Step 3: Output Preferences")?;
    let output = configure_output_preferences(prompter)?;
    Ok(SetupAnswers { user, llm, output })
}

fn read_required(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map(|content| content.trim().to_string())
        .map_err(|_| CoverMeError::Config(format!("Required file not found: {}", path.display())))
}
