//! Rendering of command output in the selected format

use console::Term;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::OutputFormat;

/// Rows of strings under a header line
#[derive(Debug, Clone, Default)]
pub struct ReportTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Render for a row-oriented format
    ///
    /// JSON and YAML yield one object per row with string values.
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Auto if Term::stdout().is_term() => Ok(self.render_table(false)),
            OutputFormat::Auto | OutputFormat::Tsv => Ok(self.render_tsv()),
            OutputFormat::Md => Ok(self.render_table(true)),
            OutputFormat::Csv => self.render_csv(),
            OutputFormat::Json => {
                let mut out = serde_json::to_string_pretty(&self.records()).into_diagnostic()?;
                out.push('\n');
                Ok(out)
            }
            OutputFormat::Yaml => serde_yml::to_string(&self.records()).into_diagnostic(),
        }
    }

    fn render_table(&self, markdown: bool) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.headers.iter().map(String::as_str));
        for row in &self.rows {
            builder.push_record(row.iter().map(String::as_str));
        }

        let mut table = builder.build();
        if markdown {
            table.with(Style::markdown());
        } else {
            table.with(Style::rounded());
        }
        format!("{}\n", table)
    }

    fn render_tsv(&self) -> String {
        let mut out = self.headers.join("\t");
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.join("\t"));
            out.push('\n');
        }
        out
    }

    fn render_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers).into_diagnostic()?;
        for row in &self.rows {
            writer.write_record(row).into_diagnostic()?;
        }
        let bytes = writer.into_inner().into_diagnostic()?;
        String::from_utf8(bytes).into_diagnostic()
    }

    fn records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.headers
                    .iter()
                    .zip(row)
                    .map(|(h, v)| (h.clone(), serde_json::Value::String(v.clone())))
                    .collect()
            })
            .collect()
    }
}

/// Print typed data for JSON/YAML, otherwise the table built by `table`
pub fn emit<T, F>(format: OutputFormat, data: &T, table: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce() -> ReportTable,
{
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(data).into_diagnostic()?);
        }
        other => {
            print!("{}", table().render(other)?);
        }
    }
    Ok(())
}
