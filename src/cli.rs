use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use anyhow::Result;

use crate::core::{ConfigChanges, Engine, JobInput, SetupOptions};

#[derive(Parser)]
#[command(name = "cover-me")]
#[command(about = "Personalized cover letters from your profile and a job description")]
#[command(version)]
pub struct Cli {
    /// Directory holding config.yaml, profile.md and templates (default: ~/.cover-me)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a cover letter (the default command)
    Generate(GenerateArgs),

    /// Interactive first-time setup
    Setup(SetupArgs),

    /// Change provider, model or output settings
    Configure {
        /// LLM provider (openai, anthropic)
        #[arg(long)]
        provider: Option<String>,

        /// Model name
        #[arg(long)]
        model: Option<String>,

        /// Output format (pdf, text)
        #[arg(long)]
        format: Option<String>,

        /// Output directory
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Open your professional profile in an editor
    Profile,

    /// Check configuration, API key and profile
    Test,
}

#[derive(Args, Default)]
pub struct GenerateArgs {
    /// Read the job description from a file
    #[arg(short, long, conflicts_with = "clipboard")]
    pub file: Option<PathBuf>,

    /// Read the job description from the clipboard (default)
    #[arg(short, long)]
    pub clipboard: bool,

    /// Write the letter here instead of the configured output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only check that the configured API key works
    #[arg(long)]
    pub test_api: bool,
}

#[derive(Args)]
pub struct SetupArgs {
    /// Take every answer from flags instead of prompting
    #[arg(long)]
    pub non_interactive: bool,

    /// Overwrite an existing configuration without asking
    #[arg(long)]
    pub force: bool,

    #[arg(long)]
    pub provider: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    /// Professional title
    #[arg(long)]
    pub title: Option<String>,

    /// LinkedIn URL or handle
    #[arg(long)]
    pub linkedin: Option<String>,

    /// GitHub URL or handle
    #[arg(long)]
    pub github: Option<String>,

    /// Output format (pdf, text)
    #[arg(long)]
    pub format: Option<String>,

    #[arg(long)]
    pub output_dir: Option<String>,
}

impl From<SetupArgs> for SetupOptions {
    fn from(args: SetupArgs) -> Self {
        SetupOptions {
            non_interactive: args.non_interactive,
            force: args.force,
            provider: args.provider,
            model: args.model,
            name: args.name,
            email: args.email,
            phone: args.phone,
            title: args.title,
            linkedin: args.linkedin,
            github: args.github,
            format: args.format,
            output_dir: args.output_dir,
        }
    }
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command.unwrap_or_else(|| Commands::Generate(GenerateArgs::default())) {
            Commands::Generate(args) => generate(&engine, args).await,
            Commands::Setup(args) => Ok(engine.setup(&args.into()).await?),
            Commands::Configure { provider, model, format, output_dir } => {
                let changes = ConfigChanges {
                    provider,
                    model,
                    format,
                    output_dir: output_dir.map(|dir| dir.display().to_string()),
                };
                Ok(engine.configure(&changes).await?)
            }
            Commands::Profile => Ok(engine.profile()?),
            Commands::Test => Ok(engine.diagnose().await?),
        }
    }
}

async fn generate(engine: &Engine, args: GenerateArgs) -> Result<()> {
    if args.test_api {
        engine.test_api().await?;
        return Ok(());
    }

    let input = match args.file {
        Some(path) => JobInput::File(path),
        None => JobInput::Clipboard,
    };

    println!("📋 Reading job description from {}...", input.describe());
    println!("🤖 Generating cover letter...");
    let letter = engine.generate(&input, args.output).await?;

    println!(
        "✅ Cover letter generated successfully! ({} words)",
        letter.text.split_whitespace().count()
    );
    match letter.path {
        Some(path) => println!("📄 Saved to: {}", path.display()),
        None => println!("\n{}", letter.text),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_generate() {
        let cli = Cli::try_parse_from(["cover-me"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_file_conflicts_with_clipboard() {
        assert!(Cli::try_parse_from(["cover-me", "generate", "--file", "job.txt", "--clipboard"]).is_err());

        let cli = Cli::try_parse_from(["cover-me", "generate", "-f", "job.txt", "-o", "out.pdf"]).unwrap();
        match cli.command {
            Some(Commands::Generate(args)) => {
                assert_eq!(args.file, Some(PathBuf::from("job.txt")));
                assert_eq!(args.output, Some(PathBuf::from("out.pdf")));
                assert!(!args.test_api);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cover-me", "test", "--verbose", "--config-dir", "/tmp/cm"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/cm")));
    }

    #[test]
    fn test_setup_flags_map_to_options() {
        let cli = Cli::try_parse_from([
            "cover-me", "setup", "--non-interactive", "--provider", "anthropic", "--name", "Ann",
        ])
        .unwrap();
        let Some(Commands::Setup(args)) = cli.command else {
            panic!("expected setup");
        };
        let options: SetupOptions = args.into();
        assert!(options.non_interactive);
        assert!(!options.force);
        assert_eq!(options.provider.as_deref(), Some("anthropic"));
        assert_eq!(options.name.as_deref(), Some("Ann"));
    }
}
