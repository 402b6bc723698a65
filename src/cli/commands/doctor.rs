//! Doctor command - verify system requirements and configuration.

use crate::analysis::INTENT_TOKEN_ENV;
use crate::cli::Output;
use crate::config::Settings;
use crate::corpus::Corpus;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Advisor Doctor");
    println!();
    println!("Checking tokens, corpus and configuration...\n");

    let mut checks = Vec::new();

    // Check API tokens
    println!("{}", style("API Configuration").bold());
    let token_checks = vec![
        check_token("Generation", settings.generation.api_key_env(), true),
        check_token("Embedding", settings.embedding.api_key_env(), true),
        check_token("Intent", INTENT_TOKEN_ENV, false),
    ];
    for check in &token_checks {
        check.print();
    }
    checks.extend(token_checks);

    println!();

    // Check corpus
    println!("{}", style("Corpus").bold());
    let corpus_check = check_corpus(&settings.corpus_path());
    corpus_check.print();
    checks.push(corpus_check);

    println!();

    // Check configuration
    println!("{}", style("Configuration").bold());
    let config_check = check_config_file();
    config_check.print();
    checks.push(config_check);

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Advisor.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!(
            "All checks passed with {} warning(s).",
            warnings
        ));
    } else {
        Output::success("All checks passed! Advisor is ready to use.");
    }

    Ok(())
}

/// Check that a token variable is set. Optional tokens only warn.
fn check_token(purpose: &str, var: &str, required: bool) -> CheckResult {
    let name = format!("{} ({})", var, purpose.to_lowercase());
    let hint = format!("Set with: export {}='...'", var);

    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => {
            CheckResult::ok(&name, &format!("configured ({})", mask(&key)))
        }
        _ if required => CheckResult::error(&name, "not set", &hint),
        _ => CheckResult::warning(&name, "not set", &hint),
    }
}

/// Show only the ends of a secret.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Check that the corpus file exists and parses.
fn check_corpus(path: &Path) -> CheckResult {
    if !path.exists() {
        return CheckResult::error(
            "Corpus file",
            &format!("{} not found", path.display()),
            "Set [corpus] path in the config file",
        );
    }

    let size = std::fs::metadata(path)
        .map(|m| format_size(m.len()))
        .unwrap_or_else(|_| "unknown size".to_string());

    match Corpus::load(path) {
        Ok(corpus) if corpus.is_empty() => CheckResult::error(
            "Corpus file",
            &format!("{} has no records", path.display()),
            "Add rows with Name, Research_Areas and Summary columns",
        ),
        Ok(corpus) => CheckResult::ok(
            "Corpus file",
            &format!("{} ({} records, {})", path.display(), corpus.len(), size),
        ),
        Err(e) => CheckResult::error(
            "Corpus file",
            &format!("failed to load: {}", e),
            "Expected a CSV or JSON file with Name, Research_Areas and Summary",
        ),
    }
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            &format!("Create {} to override settings", config_path.display()),
        )
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
