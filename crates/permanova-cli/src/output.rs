//! Destination and rendering of test results.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use anyhow::Context as _;
use permanova_stats::TestResults;

/// How a [`TestResults`] record is rendered.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub(crate) enum OutputFormat {
    /// Aligned key/value table.
    #[default]
    Text,
    /// Pretty-printed JSON object; a skipped p-value becomes `null`.
    Json,
}

/// Where results go: stdout, or a file created on open.
pub(crate) struct ResultSink {
    writer: Box<dyn Write>,
    target: String,
}

impl ResultSink {
    pub(crate) fn open(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self {
                writer: Box::new(io::stdout().lock()),
                target: "stdout".to_owned(),
            });
        };
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Self {
            writer: Box::new(BufWriter::new(file)),
            target: path.display().to_string(),
        })
    }

    pub(crate) fn write_results(
        mut self,
        results: &TestResults,
        format: OutputFormat,
    ) -> anyhow::Result<()> {
        render(&mut self.writer, results, format)
            .and_then(|()| self.writer.flush())
            .with_context(|| format!("Failed to write results to {}", self.target))?;
        tracing::debug!(target_path = %self.target, ?format, "wrote results");
        Ok(())
    }
}

fn render<W>(writer: &mut W, results: &TestResults, format: OutputFormat) -> io::Result<()>
where
    W: Write + ?Sized,
{
    match format {
        OutputFormat::Text => write!(writer, "{results}"),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, results)?;
            writeln!(writer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results() -> TestResults {
        TestResults::new("PERMANOVA", "pseudo-F", 10, 2, 4.5, 0.01, 99)
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_render_text() {
        let mut buf = vec![];
        render(&mut buf, &results(), OutputFormat::Text).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, results().to_string());
    }

    #[test]
    fn test_render_json() {
        let mut buf = vec![];
        render(&mut buf, &results(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["test_statistic_name"], "pseudo-F");
        assert_eq!(value["number_of_permutations"], 99);
        assert!(buf.ends_with(b"\n"));
    }

    #[test]
    fn test_write_results_to_file() {
        let path = std::env::temp_dir().join(format!("permanova-out-{}.json", std::process::id()));
        ResultSink::open(Some(path.clone()))
            .unwrap()
            .write_results(&results(), OutputFormat::Json)
            .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(written.contains("\"method_name\": \"PERMANOVA\""));
    }
}
