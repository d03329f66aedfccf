// src/data.rs
use chrono::Local;
use csv::{Writer, WriterBuilder};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{AnalyzerError, Result};
use crate::pipeline::ScoreRecord;
use crate::stress::StressLevel;

/// Persisted column order. Downstream consumers depend on it.
pub const CSV_COLUMNS: [&str; 7] = [
    "timestamp",
    "eyebrow_raise",
    "lip_tension",
    "head_nod_intensity",
    "symmetry_delta",
    "blink_rate",
    "stress_score",
];

#[derive(Debug, Serialize)]
struct CsvRecord {
    timestamp: f64,
    eyebrow_raise: f64,
    lip_tension: f64,
    head_nod_intensity: f64,
    symmetry_delta: f64,
    blink_rate: f64,
    stress_score: f64,
}

impl From<&ScoreRecord> for CsvRecord {
    fn from(record: &ScoreRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            eyebrow_raise: record.features.eyebrow_raise,
            lip_tension: record.features.lip_tension,
            head_nod_intensity: record.features.head_nod_intensity,
            symmetry_delta: record.features.symmetry_delta,
            blink_rate: record.features.blink_rate,
            stress_score: record.stress_score,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    pub records: u64,
    pub missing_frames: u64,
    pub calm: u64,
    pub slight_stress: u64,
    pub high_stress: u64,
    pub peak_score: f64,
    score_sum: f64,
}

impl SessionSummary {
    pub fn add(&mut self, record: &ScoreRecord) {
        self.records += 1;
        self.score_sum += record.stress_score;
        self.peak_score = self.peak_score.max(record.stress_score);
        match record.level {
            StressLevel::Calm => self.calm += 1,
            StressLevel::SlightStress => self.slight_stress += 1,
            StressLevel::HighStress => self.high_stress += 1,
        }
    }

    pub fn mean_score(&self) -> f64 {
        if self.records == 0 {
            0.0
        } else {
            self.score_sum / self.records as f64
        }
    }

    pub fn count(&self, level: StressLevel) -> u64 {
        match level {
            StressLevel::Calm => self.calm,
            StressLevel::SlightStress => self.slight_stress,
            StressLevel::HighStress => self.high_stress,
        }
    }

    /// Share of records at `level`, in percent.
    pub fn share(&self, level: StressLevel) -> f64 {
        if self.records == 0 {
            0.0
        } else {
            self.count(level) as f64 / self.records as f64 * 100.0
        }
    }
}

/// Streams score records to CSV, one flushed row per frame.
pub struct SessionLogger<W: Write> {
    writer: Writer<W>,
    summary: SessionSummary,
}

impl<W: Write> SessionLogger<W> {
    pub fn from_writer(inner: W) -> Result<Self> {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(inner);
        writer.write_record(CSV_COLUMNS)?;
        writer.flush()?;
        Ok(Self {
            writer,
            summary: SessionSummary::default(),
        })
    }

    pub fn log(&mut self, record: &ScoreRecord) -> Result<()> {
        self.writer.serialize(CsvRecord::from(record))?;
        self.writer.flush()?;
        self.summary.add(record);
        Ok(())
    }

    /// Accounts for a frame without a face. A repeated record is written as a
    /// row but does not count towards the level statistics.
    pub fn record_missing(&mut self, repeated: Option<&ScoreRecord>) -> Result<()> {
        if let Some(record) = repeated {
            self.writer.serialize(CsvRecord::from(record))?;
            self.writer.flush()?;
        }
        self.summary.missing_frames += 1;
        Ok(())
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    pub fn finish(self) -> Result<(W, SessionSummary)> {
        let inner = self
            .writer
            .into_inner()
            .map_err(|e| AnalyzerError::Io(e.into_error()))?;
        Ok((inner, self.summary))
    }
}

/// Lays out one session directory holding the CSV log and the HTML report.
pub struct DataExporter {
    output_dir: PathBuf,
    session_name: String,
}

impl DataExporter {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn csv_path(&self) -> PathBuf {
        self.output_dir.join(&self.session_name).join("session.csv")
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(&self.session_name).join("report.html")
    }

    pub fn create_logger(&self) -> Result<SessionLogger<File>> {
        let csv_path = self.csv_path();
        if let Some(parent) = csv_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        SessionLogger::from_writer(File::create(&csv_path)?)
    }

    pub fn generate_report(&self, summary: &SessionSummary) -> Result<PathBuf> {
        let report_path = self.report_path();
        if let Some(parent) = report_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&report_path, self.create_html_report(summary))?;
        Ok(report_path)
    }

    fn create_html_report(&self, summary: &SessionSummary) -> String {
        let total_frames = summary.records + summary.missing_frames;
        let detection_rate = if total_frames == 0 {
            0.0
        } else {
            summary.records as f64 / total_frames as f64 * 100.0
        };

        let level_rows: String = StressLevel::ALL
            .iter()
            .map(|level| {
                format!(
                    r#"
        <div class="stat-item">
            <span class="stat-label">{} {}:</span>
            <span class="stat-value">{} frames ({:.1}%)</span>
        </div>"#,
                    level.icon(),
                    level.label(),
                    summary.count(*level),
                    summary.share(*level)
                )
            })
            .collect();

        format!(r#"
<!DOCTYPE html>
<html>
<head>
    <title>Stress Session Report - {}</title>
    <style>
        body {{ font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; margin: 40px; background: #f5f5f5; }}
        h1 {{ color: #333; }}
        .stats {{ background: white; padding: 20px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        .stat-item {{ margin: 10px 0; }}
        .stat-label {{ font-weight: bold; color: #666; }}
        .stat-value {{ color: #4682EA; font-size: 1.2em; }}
    </style>
</head>
<body>
    <h1>Micro-Expression Stress Report</h1>
    <div class="stats">
        <h2>Session: {}</h2>
        <div class="stat-item">
            <span class="stat-label">Total Frames:</span>
            <span class="stat-value">{}</span>
        </div>
        <div class="stat-item">
            <span class="stat-label">Face Detection Rate:</span>
            <span class="stat-value">{:.1}%</span>
        </div>
        <div class="stat-item">
            <span class="stat-label">Mean Stress Score:</span>
            <span class="stat-value">{:.2}</span>
        </div>
        <div class="stat-item">
            <span class="stat-label">Peak Stress Score:</span>
            <span class="stat-value">{:.2}</span>
        </div>{}
    </div>
</body>
</html>
"#,
            self.session_name,
            self.session_name,
            total_frames,
            detection_rate,
            summary.mean_score(),
            summary.peak_score,
            level_rows
        )
    }
}
