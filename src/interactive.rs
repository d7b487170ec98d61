use crate::config::Config;
use console::style;
use dialoguer::{Confirm, Input};
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions the transcription API accepts as input.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "mp4", "mpeg", "mpga", "m4a", "wav", "webm"];

/// A media file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    pub size: u64,
}

pub fn print_header() {
    println!();
    println!(
        "{}",
        style("╔═══════════════════════════════════════════════════╗").cyan()
    );
    println!(
        "{}",
        style("║                TRANSCRIBER 3000                   ║").cyan()
    );
    println!(
        "{}",
        style("╚═══════════════════════════════════════════════════╝").cyan()
    );
    println!();
}

/// Make sure `config` carries an API key, prompting for one and saving it to
/// `config_path` when missing.
pub fn ensure_api_key(mut config: Config, config_path: Option<&Path>) -> anyhow::Result<Config> {
    if config.api_key.as_deref().is_some_and(|k| !k.trim().is_empty()) {
        println!("{} API key configured", style("✓").green());
        return Ok(config);
    }

    if !console::user_attended() {
        anyhow::bail!(
            "API key not found. Set OPENAI_API_KEY or add api_key to the config file"
        );
    }

    println!("{} API key not found", style("!").yellow());
    println!("  Create one at: https://platform.openai.com/api-keys\n");

    let api_key: String = Input::new()
        .with_prompt("Insert API key to continue")
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Invalid API key, insert a valid key to continue")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    config.api_key = Some(api_key.trim().to_string());

    match config_path {
        Some(path) => {
            Config::save_api_key(path, api_key.trim())?;
            println!(
                "{} API key saved to {}\n",
                style("✓").green(),
                path.display()
            );
        }
        None => println!(
            "{} No config directory available, key kept for this run only\n",
            style("!").yellow()
        ),
    }

    Ok(config)
}

/// Expand `path` into the supported media files it names.
///
/// A file is returned as-is when its extension is supported; a directory is
/// scanned (not recursively) and its supported files returned sorted by name.
pub fn discover_inputs(path: &Path) -> anyhow::Result<Vec<InputFile>> {
    if path.is_file() {
        if !is_supported(path) {
            anyhow::bail!(
                "Unsupported file type: {}. Supported extensions: {}",
                path.display(),
                SUPPORTED_EXTENSIONS.join(", ")
            );
        }
        return Ok(vec![InputFile {
            path: path.to_path_buf(),
            size: fs::metadata(path)?.len(),
        }]);
    }

    if !path.is_dir() {
        anyhow::bail!("Path error: {} is not a file or a folder", path.display());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let file_path = entry.path();

        if file_path.is_file() && is_supported(&file_path) {
            files.push(InputFile {
                size: entry.metadata()?.len(),
                path: file_path,
            });
        }
    }

    files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(files)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Print the discovered files as a numbered table.
pub fn print_file_table(files: &[InputFile]) {
    println!("\n{}", style("Supported file(s) found:").bold());
    println!("\n{:<5} {:<60} {:>10}", "No.", "File", "Size");
    println!("{}", "-".repeat(77));
    for (i, file) in files.iter().enumerate() {
        let name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("{:<5} {:<60} {:>10}", i + 1, name, format_size(file.size));
    }
    println!();
}

/// Ask whether to transcribe `count` files.
pub fn confirm_batch(count: usize) -> anyhow::Result<bool> {
    Ok(Confirm::new()
        .with_prompt(format!("Transcribe {count} file(s)?"))
        .default(true)
        .interact()?)
}

pub fn format_size(bytes: u64) -> String {
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
