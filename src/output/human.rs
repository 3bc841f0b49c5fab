// src/output/human.rs
//! Human-readable colored terminal output

use crate::output::OutputHandler;
use crate::types::MatchRecord;
use async_trait::async_trait;
use colored::Colorize;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

/// Human-readable output handler with colored terminal output
pub struct HumanOutput {
    writer: Mutex<Box<dyn Write + Send>>,
    use_colors: bool,
}

impl HumanOutput {
    /// Create a new HumanOutput that writes to stdout
    pub fn new() -> Self {
        Self {
            writer: Mutex::new(Box::new(io::stdout())),
            use_colors: is_terminal::is_terminal(std::io::stdout()),
        }
    }

    /// Create a new HumanOutput that writes to a file
    pub fn to_file(file: std::fs::File) -> Self {
        Self {
            writer: Mutex::new(Box::new(file)),
            use_colors: false, // No colors when writing to file
        }
    }

    fn writer(&self) -> anyhow::Result<MutexGuard<'_, Box<dyn Write + Send>>> {
        self.writer
            .lock()
            .map_err(|_| anyhow::anyhow!("output writer lock poisoned"))
    }
}

impl Default for HumanOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputHandler for HumanOutput {
    async fn emit_match(&self, record: &MatchRecord) -> anyhow::Result<()> {
        let mut writer = self.writer()?;

        if self.use_colors {
            writeln!(
                writer,
                "{} Keyword found in SSL certificate for IP: {}",
                "[+]".green().bold(),
                record.address.to_string().cyan().bold()
            )?;
            writeln!(
                writer,
                "    {} {}",
                "Matched:".dimmed(),
                record.matched_name.yellow()
            )?;
        } else {
            writeln!(
                writer,
                "[+] Keyword found in SSL certificate for IP: {}",
                record.address
            )?;
            writeln!(writer, "    Matched: {}", record.matched_name)?;
        }

        if record.alt_names.len() > 1 {
            writeln!(writer, "    All names: {}", record.alt_names.join(", "))?;
        }

        writer.flush()?;
        Ok(())
    }

    async fn flush(&self) -> anyhow::Result<()> {
        self.writer()?.flush()?;
        Ok(())
    }
}
