//! Rendering of export lines as browser text or CSV

use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use lcx_common::{Error, Result};

use super::{CopyrightLine, LicenseLine};

const LICENSE_HEADER: [&str; 3] = ["file path", "scan results", "concluded results"];
const COPYRIGHT_HEADER: [&str; 2] = ["file path", "copyright"];

/// CSV field delimiter and enclosure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvFormat {
    pub delimiter: u8,
    pub enclosure: u8,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            delimiter: b',',
            enclosure: b'"',
        }
    }
}

/// `path`, `path: findings` or `path: findings, conclusions`, one per line
pub fn display_licenses(lines: &[LicenseLine]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(&line.file_path);
        if let Some(findings) = &line.agent_findings {
            out.push_str(": ");
            out.push_str(&findings.join(" "));
            if let Some(conclusions) = &line.conclusions {
                out.push_str(", ");
                out.push_str(&conclusions.join(" "));
            }
        }
        out.push('\n');
    }
    out
}

/// `path: statement`, one per line, statement HTML-escaped
pub fn display_copyrights(lines: &[CopyrightLine]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(&line.file_path);
        out.push_str(": ");
        out.push_str(&html_escape(&line.content));
        out.push('\n');
    }
    out
}

/// Escape the characters HTML treats specially
pub fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn licenses_csv(lines: &[LicenseLine], format: CsvFormat) -> Result<Vec<u8>> {
    let mut writer = csv_writer(format);
    writer.write_record(LICENSE_HEADER)?;
    for line in lines {
        let findings = line
            .agent_findings
            .as_ref()
            .map(|f| f.join(" "))
            .unwrap_or_default();
        let conclusions = line
            .conclusions
            .as_ref()
            .map(|c| c.join(" "))
            .unwrap_or_default();
        writer.write_record([line.file_path.as_str(), findings.as_str(), conclusions.as_str()])?;
    }
    finish(writer)
}

pub fn copyrights_csv(lines: &[CopyrightLine], format: CsvFormat) -> Result<Vec<u8>> {
    let mut writer = csv_writer(format);
    writer.write_record(COPYRIGHT_HEADER)?;
    for line in lines {
        writer.write_record([line.file_path.as_str(), line.content.as_str()])?;
    }
    finish(writer)
}

/// `<item name>-<YYYYMMDD>-licenses.csv` or `...-copyrights.csv`
pub fn export_file_name(item_name: &str, date: NaiveDate, copyright: bool) -> String {
    let suffix = if copyright { "copyrights" } else { "licenses" };
    format!("{}-{}-{}.csv", item_name, date.format("%Y%m%d"), suffix)
}

fn csv_writer(format: CsvFormat) -> csv::Writer<Vec<u8>> {
    WriterBuilder::new()
        .delimiter(format.delimiter)
        .quote(format.enclosure)
        .quote_style(QuoteStyle::Always)
        .double_quote(true)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn license_line(path: &str, findings: Option<&[&str]>, conclusions: Option<&[&str]>) -> LicenseLine {
        let to_vec = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        LicenseLine {
            file_path: path.to_string(),
            agent_findings: findings.map(to_vec),
            conclusions: conclusions.map(to_vec),
        }
    }

    #[test]
    fn test_display_licenses() {
        let lines = vec![
            license_line("a.c", Some(&["MIT", "BSD-3-Clause"]), None),
            license_line("b.c", Some(&[]), Some(&["GPL-2.0"])),
            license_line("dir", None, None),
            license_line("d.c", None, Some(&["MIT"])),
        ];

        assert_eq!(
            display_licenses(&lines),
            "a.c: MIT BSD-3-Clause\nb.c: , GPL-2.0\ndir\nd.c\n"
        );
    }

    #[test]
    fn test_display_copyrights_escapes() {
        let lines = vec![CopyrightLine {
            file_path: "x/y.h".to_string(),
            content: "(c) Bob <bob@example.com> & \"Co\"".to_string(),
        }];

        assert_eq!(
            display_copyrights(&lines),
            "x/y.h: (c) Bob &lt;bob@example.com&gt; &amp; &quot;Co&quot;\n"
        );
    }

    #[test]
    fn test_licenses_csv_default_format() {
        let lines = vec![
            license_line("a.c", Some(&["MIT"]), None),
            license_line("dir", None, None),
        ];

        let csv = String::from_utf8(licenses_csv(&lines, CsvFormat::default()).unwrap()).unwrap();
        assert_eq!(
            csv,
            "\"file path\",\"scan results\",\"concluded results\"\n\
             \"a.c\",\"MIT\",\"\"\n\
             \"dir\",\"\",\"\"\n"
        );
    }

    #[test]
    fn test_custom_delimiter_and_enclosure() {
        let format = CsvFormat {
            delimiter: b';',
            enclosure: b'\'',
        };
        let lines = vec![license_line("it's.c", Some(&["MIT"]), Some(&["MIT"]))];

        let csv = String::from_utf8(licenses_csv(&lines, format).unwrap()).unwrap();
        let mut rows = csv.lines();
        assert_eq!(rows.next(), Some("'file path';'scan results';'concluded results'"));
        assert_eq!(rows.next(), Some("'it''s.c';'MIT';'MIT'"));
        assert_eq!(rows.next(), None);
    }

    #[test]
    fn test_copyrights_csv_keeps_raw_content() {
        let lines = vec![CopyrightLine {
            file_path: "a.c".to_string(),
            content: "Copyright <Alice>, \"2020\"".to_string(),
        }];

        let csv = String::from_utf8(copyrights_csv(&lines, CsvFormat::default()).unwrap()).unwrap();
        assert_eq!(
            csv,
            "\"file path\",\"copyright\"\n\"a.c\",\"Copyright <Alice>, \"\"2020\"\"\"\n"
        );
    }

    #[test]
    fn test_export_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(export_file_name("sample.tar", date, false), "sample.tar-20240307-licenses.csv");
        assert_eq!(export_file_name("src", date, true), "src-20240307-copyrights.csv");
    }
}
