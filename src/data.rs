// src/data.rs - Per-tick debug records exported as CSV
use crate::app::{RigSession, TickReport};
use crate::error::{Result, SolveCategory};
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

/// Bones whose rotation is worth eyeballing in a spreadsheet.
const TRACED_BONES: [&str; 6] = [
    "spine",
    "neck",
    "leftUpperArm",
    "rightUpperArm",
    "leftHand",
    "rightHand",
];

#[derive(Debug, Clone, Serialize)]
struct TickRecord {
    timestamp: f64,
    tick: usize,
    mode: String,
    has_left_hand: bool,
    has_right_hand: bool,
    face: String,
    bones_driven: usize,
    idle_bones: usize,
    idle_time: f64,
    error_count: u64,
    stale_count: u64,

    // Last solve time per category, ms
    face_ms: Option<f64>,
    pose_ms: Option<f64>,
    left_hand_ms: Option<f64>,
    right_hand_ms: Option<f64>,

    // Rotation angle from rest, degrees
    spine_deg: Option<f64>,
    neck_deg: Option<f64>,
    left_upper_arm_deg: Option<f64>,
    right_upper_arm_deg: Option<f64>,
    left_hand_deg: Option<f64>,
    right_hand_deg: Option<f64>,

    aa: f64,
    blink_left: f64,
    blink_right: f64,
}

/// Default place for session output, as `Documents/RigDriver`.
pub fn default_output_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(|p| p.join("RigDriver")))
        .unwrap_or_else(|| PathBuf::from("./output"))
}

pub struct DebugRecorder {
    output_dir: PathBuf,
    session_name: String,
    records: Vec<TickRecord>,
}

impl DebugRecorder {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name =
            session_name.unwrap_or_else(|| format!("session_{}", Local::now().format("%Y%m%d_%H%M%S")));

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
            records: Vec::new(),
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&mut self, timestamp: f64, session: &RigSession, report: &TickReport) {
        let skeleton = session.skeleton();
        let hands = session.hand_state();
        let metrics = session.metrics();
        let angles: Vec<Option<f64>> = TRACED_BONES
            .iter()
            .map(|bone| skeleton.rotation(bone).map(|q| q.angle().to_degrees()))
            .collect();

        self.records.push(TickRecord {
            timestamp,
            tick: self.records.len(),
            mode: report.mode.to_string(),
            has_left_hand: hands.has_left_hand,
            has_right_hand: hands.has_right_hand,
            face: report.face.as_str().to_string(),
            bones_driven: report.bones_driven,
            idle_bones: report.idle_bones,
            idle_time: session.idle_time(),
            error_count: metrics.error_count,
            stale_count: metrics.stale_count,
            face_ms: metrics.last_process_ms(SolveCategory::Face),
            pose_ms: metrics.last_process_ms(SolveCategory::Pose),
            left_hand_ms: metrics.last_process_ms(SolveCategory::LeftHand),
            right_hand_ms: metrics.last_process_ms(SolveCategory::RightHand),
            spine_deg: angles[0],
            neck_deg: angles[1],
            left_upper_arm_deg: angles[2],
            right_upper_arm_deg: angles[3],
            left_hand_deg: angles[4],
            right_hand_deg: angles[5],
            aa: skeleton.expression("aa"),
            blink_left: skeleton.expression("blinkLeft"),
            blink_right: skeleton.expression("blinkRight"),
        });
    }

    /// Writes `<output_dir>/<session>/rig_ticks.csv`.
    pub fn export_csv(&self) -> Result<PathBuf> {
        let csv_path = self.output_dir.join(&self.session_name).join("rig_ticks.csv");

        if let Some(parent) = csv_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(&csv_path)?;
        let mut writer = Writer::from_writer(file);
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        info!("wrote {} tick records to {}", self.records.len(), csv_path.display());
        Ok(csv_path)
    }

    /// Writes the final debug snapshot next to the CSV.
    pub fn export_snapshot(&self, session: &RigSession) -> Result<PathBuf> {
        let path = self.output_dir.join(&self.session_name).join("snapshot.json");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, session.debug_snapshot().to_json()?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineSettings;
    use crate::skeleton::Skeleton;
    use crate::storage::MemoryStorage;

    #[test]
    fn exports_one_row_per_tick() {
        let dir = std::env::temp_dir().join(format!("rig-data-{}", uuid::Uuid::new_v4()));
        let mut session = RigSession::new(
            Skeleton::humanoid(),
            EngineSettings::default(),
            Box::new(MemoryStorage::new()),
        );
        let mut recorder = DebugRecorder::new(&dir, Some("test".into()));

        for i in 0..3 {
            let report = session.tick(0.016, false);
            recorder.record(i as f64 * 0.016, &session, &report);
        }
        let path = recorder.export_csv().unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "timestamp");
        assert!(headers.iter().any(|h| h == "left_upper_arm_deg"));
        assert!(headers.iter().any(|h| h == "pose_ms"));

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][2], "idle");

        assert!(recorder.export_snapshot(&session).unwrap().exists());
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn default_session_name_is_timestamped() {
        let recorder = DebugRecorder::new("/tmp", None);
        assert!(recorder.session_name().starts_with("session_"));
        assert!(recorder.is_empty());
    }
}
