//! Plain-text transcript of a chat session.

use crate::core::message::{Message, Role};
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct LoggingState {
    file_path: Option<PathBuf>,
    is_active: bool,
}

impl LoggingState {
    /// Start logging to `log_file` right away when one is given.
    pub fn new(log_file: Option<PathBuf>) -> io::Result<Self> {
        let mut logging = LoggingState {
            file_path: None,
            is_active: false,
        };
        if let Some(path) = log_file {
            logging.set_log_file(path)?;
        }
        Ok(logging)
    }

    pub fn set_log_file(&mut self, path: PathBuf) -> io::Result<String> {
        // Fail early when the file cannot be created or appended to.
        OpenOptions::new().create(true).append(true).open(&path)?;

        let message = format!("Logging enabled to: {}", path.display());
        self.file_path = Some(path);
        self.is_active = true;
        Ok(message)
    }

    pub fn toggle_logging(&mut self, pause_message: &str) -> Result<String, String> {
        let Some(path) = self.file_path.clone() else {
            return Err("No log file specified. Start with --log <file> to enable logging.".into());
        };
        if self.is_active {
            self.log_message(&format!("## {pause_message}"))
                .map_err(|err| err.to_string())?;
            self.is_active = false;
            Ok(format!("Logging paused (file: {})", path.display()))
        } else {
            self.is_active = true;
            Ok(format!("Logging resumed to: {}", path.display()))
        }
    }

    /// Append a chat record: user turns are prefixed, assistant turns are written as-is.
    pub fn log_record(&self, message: &Message) -> io::Result<()> {
        match message.role {
            Role::User => self.log_message(&format!("You: {}", message.content)),
            Role::Assistant if !message.content.is_empty() => self.log_message(&message.content),
            Role::Assistant => Ok(()),
            Role::System => self.log_message(&format!("## System: {}", message.content)),
        }
    }

    pub fn log_message(&self, content: &str) -> io::Result<()> {
        match (&self.file_path, self.is_active) {
            (Some(path), true) => write_to_log(path, content),
            _ => Ok(()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn get_status_string(&self) -> String {
        let file_name = |path: &Path| {
            path.file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned()
        };
        match (&self.file_path, self.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), true) => format!("active ({})", file_name(path)),
            (Some(path), false) => format!("paused ({})", file_name(path)),
        }
    }
}

fn write_to_log(path: &Path, content: &str) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::with_capacity(64 * 1024, file);

    for line in content.lines() {
        writeln!(writer, "{line}")?;
    }
    // Blank line between messages.
    writeln!(writer)?;
    writer.flush()
}
