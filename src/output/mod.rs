//! Output formatting for operation responses

mod json;
mod terminal;

use std::io::Write;

use anyhow::Result;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::config::{Config, OutputFormat};
use crate::service::Response;

pub use json::JsonOutput;
pub use terminal::TerminalOutput;

/// Trait for output formatters
pub trait OutputFormatter {
    /// Render a response to a writer
    fn render(&self, response: &Response, writer: &mut dyn Write) -> Result<()>;
}

/// Factory for creating output formatters
pub struct OutputFactory;

impl OutputFactory {
    /// Create an output formatter for the configured format
    pub fn create(config: &Config) -> Box<dyn OutputFormatter> {
        match config.output_format {
            OutputFormat::Terminal => Box::new(TerminalOutput::new()),
            OutputFormat::Json if config.compact => Box::new(JsonOutput::compact()),
            OutputFormat::Json => Box::new(JsonOutput::new()),
        }
    }
}

/// Render a response to stdout
pub fn render_to_stdout(response: &Response, config: &Config) -> Result<()> {
    let formatter = OutputFactory::create(config);
    let mut stdout = std::io::stdout().lock();
    formatter.render(response, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}

/// Write a one-line colored status for the response to stderr
pub fn report_status(response: &Response) -> Result<()> {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    write_status(response, &mut stderr)
}

/// Write a one-line status for the response
pub fn write_status(response: &Response, writer: &mut dyn WriteColor) -> Result<()> {
    let (color, label, detail) = match response {
        Response::Accepted { result } => (Color::Green, "ok", result.operation().to_string()),
        Response::Rejected { message } => (Color::Yellow, "rejected", message.clone()),
        Response::Failed { message } => (Color::Red, "error", message.clone()),
    };

    writer.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(writer, "{}", label)?;
    writer.reset()?;
    writeln!(writer, ": {}", detail)?;
    Ok(())
}
