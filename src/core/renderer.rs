use chrono::{DateTime, Local, NaiveDate};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

use crate::config::{Config, OutputFormat};
use crate::error::{CoverMeError, Result};

pub const CONTENT_VARIABLE: &str = "cover_letter_content";

/// How a letter is written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    Text,
    Pdf { template: PathBuf },
}

/// HTML-to-PDF conversion
pub trait PdfBackend: Send + Sync {
    fn render_pdf(&self, html: &str, output: &Path) -> Result<()>;
}

/// Converts through `wkhtmltopdf` or `weasyprint`, whichever is installed
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPdfBackend;

impl PdfBackend for SystemPdfBackend {
    fn render_pdf(&self, html: &str, output: &Path) -> Result<()> {
        let mut command = if let Ok(program) = which::which("wkhtmltopdf") {
            let mut cmd = Command::new(program);
            cmd.args(["--quiet", "--print-media-type", "--dpi", "300", "--image-quality", "85", "-"])
                .arg(output);
            cmd
        } else if let Ok(program) = which::which("weasyprint") {
            let mut cmd = Command::new(program);
            cmd.arg("--optimize-images").arg("-").arg(output);
            cmd
        } else {
            return Err(CoverMeError::Generation(
                "No PDF renderer found. Install wkhtmltopdf or weasyprint, \
                 or set output.format to text."
                    .to_string(),
            ));
        };

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(html.as_bytes())?;
        }

        let result = child.wait_with_output()?;
        if !result.status.success() {
            return Err(CoverMeError::Generation(format!(
                "Failed to create PDF: {}",
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Writes generated letters as text or templated PDF
pub struct DocumentRenderer {
    pdf: Box<dyn PdfBackend>,
    placeholder_regex: Regex,
    paragraph_break_regex: Regex,
}

impl DocumentRenderer {
    pub fn new(pdf: Box<dyn PdfBackend>) -> Self {
        Self {
            pdf,
            placeholder_regex: Regex::new(r"\{\{\s*([^}]+?)\s*\}\}")
                .expect("Invalid placeholder regex"),
            paragraph_break_regex: Regex::new(r"\r?\n[ \t]*\r?\n")
                .expect("Invalid paragraph regex"),
        }
    }

    /// Write `content` to `output_path` and return the path
    pub fn render(
        &self,
        content: &str,
        variables: &BTreeMap<String, String>,
        output_path: &Path,
        target: &RenderTarget,
    ) -> Result<PathBuf> {
        ensure_parent(output_path)?;

        match target {
            RenderTarget::Text => {
                std::fs::write(output_path, content)?;
            }
            RenderTarget::Pdf { template } => {
                self.render_pdf(content, variables, output_path, template)
                    .map_err(|e| CoverMeError::Generation(format!("Failed to generate PDF: {}", e)))?;
            }
        }

        info!("Wrote cover letter to {}", output_path.display());
        Ok(output_path.to_path_buf())
    }

    fn render_pdf(
        &self,
        content: &str,
        variables: &BTreeMap<String, String>,
        output_path: &Path,
        template: &Path,
    ) -> Result<()> {
        if !template.is_file() {
            return Err(CoverMeError::Generation(format!(
                "Template file not found: {}",
                template.display()
            )));
        }
        let html = std::fs::read_to_string(template)?;
        let html = self.assemble_html(&html, content, variables);
        debug!("Rendering PDF from template {}", template.display());
        self.pdf.render_pdf(&html, output_path)
    }

    /// Template with escaped variables and the formatted letter body substituted
    pub fn assemble_html(
        &self,
        template: &str,
        content: &str,
        variables: &BTreeMap<String, String>,
    ) -> String {
        let mut variables: BTreeMap<String, String> = variables
            .iter()
            .map(|(name, value)| (name.clone(), escape_html(value)))
            .collect();
        variables.insert(CONTENT_VARIABLE.to_string(), self.format_content_as_html(content));
        self.substitute_variables(template, &variables)
    }

    /// Replace `{{ name }}` placeholders; unknown names are left verbatim
    pub fn substitute_variables(&self, template: &str, variables: &BTreeMap<String, String>) -> String {
        self.placeholder_regex
            .replace_all(template, |caps: &Captures| match variables.get(caps[1].trim()) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// One `<p>` per blank-line separated block, inner whitespace collapsed
    pub fn format_content_as_html(&self, content: &str) -> String {
        self.paragraph_break_regex
            .split(content.trim())
            .map(|block| block.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|block| !block.is_empty())
            .map(|block| format!("<p>{}</p>", escape_html(&block)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Variables derived from the `user` section, overridden by `pdf.template_variables`
pub fn template_variables(config: &Config, date: NaiveDate) -> BTreeMap<String, String> {
    let user = config.user.clone().unwrap_or_default();
    let mut variables = BTreeMap::from([
        ("date".to_string(), date.format("%B %d, %Y").to_string()),
        ("applicant_name".to_string(), user.name),
        ("applicant_email".to_string(), user.email),
        ("applicant_phone".to_string(), user.phone),
        ("professional_title".to_string(), user.title),
    ]);
    if let Some(pdf) = &config.pdf {
        variables.extend(pdf.template_variables.clone());
    }
    variables
}

/// `<dir>/cover_letter_<YYYYMMDD_HHMMSS>.<ext>`
pub fn default_output_path(output_dir: &Path, format: OutputFormat, now: DateTime<Local>) -> PathBuf {
    output_dir.join(format!(
        "cover_letter_{}.{}",
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    ))
}
