// src/main.rs
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stress_tracker::data::DataExporter;
use stress_tracker::landmarks::Detection;
use stress_tracker::mediapipe_bridge::{FaceMeshReplay, LandmarkSource, SimulatedFace};
use stress_tracker::{AnalyzerConfig, AnalyzerError, StressAnalyzer};

const SIMULATED_FRAMES: usize = 30 * 60;
const DASHBOARD_EVERY: u64 = 30;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match std::env::var_os("STRESS_TRACKER_CONFIG") {
        Some(path) => AnalyzerConfig::from_json_file(&path)
            .with_context(|| format!("loading config {}", PathBuf::from(&path).display()))?,
        None => AnalyzerConfig::default(),
    };
    let mut analyzer = StressAnalyzer::new(&config)?;

    let mut source: Box<dyn LandmarkSource> = match std::env::args_os().nth(1) {
        Some(path) => {
            let path = PathBuf::from(path);
            info!("Replaying face mesh recording {}", path.display());
            Box::new(
                FaceMeshReplay::open(
                    &path,
                    config.landmark_map.point_count,
                    config.min_detection_confidence,
                )
                .with_context(|| format!("opening recording {}", path.display()))?,
            )
        }
        None => {
            info!("No recording given, running simulated subject");
            Box::new(SimulatedFace::new(config.landmark_map.clone(), SIMULATED_FRAMES))
        }
    };

    let exporter = DataExporter::new(config.output_directory(), None);
    let mut logger = exporter
        .create_logger()
        .with_context(|| format!("creating {}", exporter.csv_path().display()))?;
    info!("Logging session {} to {}", exporter.session_name(), exporter.csv_path().display());

    let mut frame_index: u64 = 0;
    while let Some(frame) = source.next_frame()? {
        frame_index += 1;
        let missing = matches!(frame.detection, Detection::NoFace);

        match analyzer.process(&frame) {
            Ok(repeated) if missing => logger.record_missing(repeated.as_ref())?,
            Ok(Some(record)) => {
                logger.log(&record)?;
                if frame_index % DASHBOARD_EVERY == 0 {
                    let f = &record.features;
                    info!(
                        "{} | brow {:.3} lip {:.1} nod {:.3} sym {:.3} blink {:.0}/min",
                        record.formatted(),
                        f.eyebrow_raise,
                        f.lip_tension,
                        f.head_nod_intensity,
                        f.symmetry_delta,
                        f.blink_rate
                    );
                }
            }
            Ok(None) => {}
            Err(e @ AnalyzerError::OrderingViolation { .. }) => {
                warn!("Dropping frame {}: {}", frame_index, e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    let (_, summary) = logger.finish()?;
    let report = exporter.generate_report(&summary)?;
    info!(
        "Session finished: {} scored, {} without face, mean stress {:.2}, report at {}",
        summary.records,
        summary.missing_frames,
        summary.mean_score(),
        report.display()
    );
    Ok(())
}
