//
// circlecmp - Circle detection and center-aligned image comparison
// Copyright (c) 2020 Filip Szczerek <ga.software@yahoo.com>
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! JSON hand-off files (`circle_info.json`, `complete_analysis.json`) and console summaries.
//!

use cgmath::Vector2;
use crate::circle::{CircleEstimate, CircleInfoTable, CircleStatistics};
use crate::compare::{AnalysisResult, PairMetrics};
use crate::logging::Logger;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CIRCLE_INFO_FILE: &str = "circle_info.json";
pub const ANALYSIS_FILE: &str = "complete_analysis.json";

#[derive(Debug)]
pub enum ReportError {
    Io{ file: PathBuf, source: std::io::Error },
    Json{ file: PathBuf, source: serde_json::Error },
    /// Hand-off file of a previous stage does not exist.
    MissingFile(PathBuf)
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Io{ file, source } => write!(f, "cannot access {}: {}", file.display(), source),
            ReportError::Json{ file, source } => write!(f, "invalid JSON in {}: {}", file.display(), source),
            ReportError::MissingFile(file) => write!(f, "file not found: {}", file.display())
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Io{ source, .. } => Some(source),
            ReportError::Json{ source, .. } => Some(source),
            ReportError::MissingFile(_) => None
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
struct PointRecord<T> {
    x: T,
    y: T
}

impl<T: Copy> From<Vector2<T>> for PointRecord<T> {
    fn from(v: Vector2<T>) -> PointRecord<T> { PointRecord{ x: v.x, y: v.y } }
}

impl<T> From<PointRecord<T>> for Vector2<T> {
    fn from(p: PointRecord<T>) -> Vector2<T> { Vector2{ x: p.x, y: p.y } }
}

#[derive(Debug, Serialize, Deserialize)]
struct CircleRecord {
    center: PointRecord<i32>,
    radius: i32
}

#[derive(Debug, Serialize, Deserialize)]
struct StatisticsRecord {
    average_center: PointRecord<f64>,
    average_radius: f64,
    std_center: PointRecord<f64>,
    std_radius: f64
}

#[derive(Debug, Serialize, Deserialize)]
struct CircleInfoRecord {
    #[serde(flatten)]
    entries: BTreeMap<String, CircleRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    statistics: Option<StatisticsRecord>
}

impl From<&CircleInfoTable> for CircleInfoRecord {
    fn from(table: &CircleInfoTable) -> CircleInfoRecord {
        CircleInfoRecord{
            entries: table.entries().iter().map(|(id, c)| {
                (id.clone(), CircleRecord{ center: c.center.into(), radius: c.radius })
            }).collect(),
            statistics: table.aggregate().map(|s| StatisticsRecord{
                average_center: s.average_center.into(),
                average_radius: s.average_radius,
                std_center: s.std_center.into(),
                std_radius: s.std_radius
            })
        }
    }
}

impl From<CircleInfoRecord> for CircleInfoTable {
    fn from(record: CircleInfoRecord) -> CircleInfoTable {
        CircleInfoTable::from_parts(
            record.entries.into_iter()
                .map(|(id, c)| (id, CircleEstimate{ center: c.center.into(), radius: c.radius }))
                .collect(),
            record.statistics.map(|s| CircleStatistics{
                average_center: s.average_center.into(),
                average_radius: s.average_radius,
                std_center: s.std_center.into(),
                std_radius: s.std_radius
            })
        )
    }
}

/// JSON has no infinity literal; +inf (identical images) is written as the string "Infinity".
fn serialize_psnr<S: serde::Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if *value == f64::INFINITY {
        serializer.serialize_str("Infinity")
    } else {
        serializer.serialize_f64(*value)
    }
}

#[derive(Debug, Serialize)]
struct ChannelDiffRecord {
    blue: f64,
    green: f64,
    red: f64
}

#[derive(Debug, Serialize)]
struct MetricsRecord {
    mse: f64,
    rmse: f64,
    mae: f64,
    #[serde(serialize_with = "serialize_psnr")]
    psnr: f64,
    diff_percentage: f64,
    channel_diff: ChannelDiffRecord
}

impl From<&PairMetrics> for MetricsRecord {
    fn from(m: &PairMetrics) -> MetricsRecord {
        let [red, green, blue] = m.channel_diff;
        MetricsRecord{
            mse: m.mse,
            rmse: m.rmse,
            mae: m.mae,
            psnr: m.psnr,
            diff_percentage: m.diff_percentage,
            channel_diff: ChannelDiffRecord{ blue, green, red }
        }
    }
}

#[derive(Debug, Serialize)]
struct AverageMetricsRecord {
    mse: f64,
    #[serde(serialize_with = "serialize_psnr")]
    psnr: f64,
    diff_percentage: f64
}

#[derive(Debug, Serialize)]
struct ComparisonRecord {
    metrics: MetricsRecord,
    aligned_image: String,
    diff_image: String
}

#[derive(Debug, Serialize)]
struct BaseRecord {
    average_metrics: AverageMetricsRecord,
    comparisons: BTreeMap<String, ComparisonRecord>
}

#[derive(Debug, Serialize)]
struct AnalysisRecord {
    best_reference_image: String,
    all_comparisons: BTreeMap<String, BaseRecord>
}

impl From<&AnalysisResult> for AnalysisRecord {
    fn from(result: &AnalysisResult) -> AnalysisRecord {
        AnalysisRecord{
            best_reference_image: result.best_reference_image.clone(),
            all_comparisons: result.all_comparisons.iter().map(|(base_id, summary)| {
                let avg = &summary.average_metrics;
                (base_id.clone(), BaseRecord{
                    average_metrics: AverageMetricsRecord{
                        mse: avg.mse, psnr: avg.psnr, diff_percentage: avg.diff_percentage
                    },
                    comparisons: summary.comparisons.iter().map(|(cand_id, c)| {
                        (cand_id.clone(), ComparisonRecord{
                            metrics: (&c.metrics).into(),
                            aligned_image: c.aligned_image.clone(),
                            diff_image: c.diff_image.clone()
                        })
                    }).collect()
                })
            }).collect()
        }
    }
}

/// Writes `value` as JSON indented with 4 spaces.
fn write_json<T: Serialize>(file: &Path, value: &T) -> Result<(), ReportError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer).map_err(|e| ReportError::Json{ file: file.to_path_buf(), source: e })?;

    std::fs::write(file, buf).map_err(|e| ReportError::Io{ file: file.to_path_buf(), source: e })
}

fn read_json<T: serde::de::DeserializeOwned>(file: &Path) -> Result<T, ReportError> {
    if !file.exists() {
        return Err(ReportError::MissingFile(file.to_path_buf()));
    }
    let contents = std::fs::read_to_string(file).map_err(|e| ReportError::Io{ file: file.to_path_buf(), source: e })?;
    serde_json::from_str(&contents).map_err(|e| ReportError::Json{ file: file.to_path_buf(), source: e })
}

pub fn save_circle_info(file: &Path, table: &CircleInfoTable) -> Result<(), ReportError> {
    write_json(file, &CircleInfoRecord::from(table))
}

/// The `"statistics"` key is loaded as the table's aggregate, never as an entry.
pub fn load_circle_info(file: &Path) -> Result<CircleInfoTable, ReportError> {
    read_json::<CircleInfoRecord>(file).map(CircleInfoTable::from)
}

pub fn save_analysis(file: &Path, result: &AnalysisResult) -> Result<(), ReportError> {
    write_json(file, &AnalysisRecord::from(result))
}

pub fn log_circle(logger: &Logger, id: &str, circle: &CircleEstimate) {
    logger.info(&format!(
        "{}: center ({}, {}), radius {}", id, circle.center.x, circle.center.y, circle.radius
    ));
}

pub fn log_statistics(logger: &Logger, stats: &CircleStatistics) {
    logger.info(&format!(
        "\nStatistics:\n\
         average center:         ({:.2}, {:.2})\n\
         std. dev. of center:    ({:.2}, {:.2})\n\
         average radius:         {:.2}\n\
         std. dev. of radius:    {:.2}",
        stats.average_center.x, stats.average_center.y,
        stats.std_center.x, stats.std_center.y,
        stats.average_radius,
        stats.std_radius
    ));
}

/// Prints average metrics of each base image (sorted by average MSE) and the best reference image.
pub fn log_analysis(logger: &Logger, result: &AnalysisResult) {
    logger.info("\nAverage metrics per base image:\n");
    logger.info(&format!("{:<24} {:>12} {:>12} {:>12}", "image", "MSE", "PSNR", "diff. %"));
    logger.info(&"-".repeat(63));
    for (id, summary) in result.ranking() {
        let avg = &summary.average_metrics;
        logger.info(&format!("{:<24} {:>12.2} {:>12.2} {:>12.2}", id, avg.mse, avg.psnr, avg.diff_percentage));
    }

    if let Some(best) = result.all_comparisons.get(&result.best_reference_image) {
        let avg = &best.average_metrics;
        logger.info(&format!(
            "\nBest reference image: {}\n\
             average MSE:            {:.2}\n\
             average PSNR:           {:.2} dB\n\
             average diff. %:        {:.2}%",
            result.best_reference_image, avg.mse, avg.psnr, avg.diff_percentage
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{AverageMetrics, BaseSummary, PairComparison};

    const STATISTICS_KEY: &str = "statistics";

    struct TempDir(PathBuf);

    impl TempDir {
        fn new(name: &str) -> TempDir {
            let dir = std::env::temp_dir().join(format!("circlecmp-report-{}-{}", name, std::process::id()));
            std::fs::create_dir_all(&dir).unwrap();
            TempDir(dir)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) { let _ = std::fs::remove_dir_all(&self.0); }
    }

    fn circle(x: i32, y: i32, radius: i32) -> CircleEstimate {
        CircleEstimate{ center: Vector2{ x, y }, radius }
    }

    fn analysis(psnr: f64) -> AnalysisResult {
        let metrics = PairMetrics{
            mse: 4.0, rmse: 2.0, mae: 1.0, psnr, diff_percentage: 12.5, channel_diff: [1.0, 2.0, 3.0]
        };
        let mut comparisons = BTreeMap::new();
        comparisons.insert("b.png".to_string(), PairComparison{
            metrics,
            aligned_image: "aligned_a_b.png".to_string(),
            diff_image: "diff_a_b.png".to_string()
        });
        let mut all_comparisons = BTreeMap::new();
        all_comparisons.insert("a.png".to_string(), BaseSummary{
            average_metrics: AverageMetrics{ mse: 4.0, psnr, diff_percentage: 12.5 },
            comparisons
        });

        AnalysisResult{ best_reference_image: "a.png".to_string(), all_comparisons }
    }

    #[test]
    fn given_table_save_and_load_circle_info() {
        let dir = TempDir::new("circles");
        let file = dir.0.join(CIRCLE_INFO_FILE);

        let mut entries = BTreeMap::new();
        entries.insert("img1.png".to_string(), circle(100, 120, 50));
        entries.insert("img2.jpg".to_string(), circle(104, 118, 52));
        let table = CircleInfoTable::new(entries);

        save_circle_info(&file, &table).unwrap();
        assert_eq!(table, load_circle_info(&file).unwrap());
    }

    #[test]
    fn given_circle_info_json_statistics_is_not_an_entry() {
        let json = r#"{
            "img1.png": { "center": { "x": 10, "y": 20 }, "radius": 5 },
            "statistics": {
                "average_center": { "x": 10.0, "y": 20.0 },
                "average_radius": 5.0,
                "std_center": { "x": 0.0, "y": 0.0 },
                "std_radius": 0.0
            },
            "img2.png": { "center": { "x": 12, "y": 22 }, "radius": 6 }
        }"#;
        let table: CircleInfoTable = serde_json::from_str::<CircleInfoRecord>(json).unwrap().into();

        assert_eq!(2, table.len());
        assert!(table.get(STATISTICS_KEY).is_none());
        assert_eq!(Some(&circle(12, 22, 6)), table.get("img2.png"));
        assert_eq!(5.0, table.aggregate().unwrap().average_radius);
    }

    #[test]
    fn given_empty_table_statistics_not_written() {
        let json = serde_json::to_value(CircleInfoRecord::from(&CircleInfoTable::new(BTreeMap::new()))).unwrap();
        assert_eq!(serde_json::json!({}), json);
    }

    #[test]
    fn given_table_json_layout_matches_hand_off_format() {
        let mut entries = BTreeMap::new();
        entries.insert("a.png".to_string(), circle(1, 2, 3));
        let json = serde_json::to_value(CircleInfoRecord::from(&CircleInfoTable::new(entries))).unwrap();

        assert_eq!(serde_json::json!({ "x": 1, "y": 2 }), json["a.png"]["center"]);
        assert_eq!(serde_json::json!(3), json["a.png"]["radius"]);
        assert_eq!(serde_json::json!(3.0), json[STATISTICS_KEY]["average_radius"]);
    }

    #[test]
    fn when_circle_info_missing_fail() {
        let dir = TempDir::new("missing");
        let result = load_circle_info(&dir.0.join(CIRCLE_INFO_FILE));
        assert!(matches!(result, Err(ReportError::MissingFile(_))));
    }

    #[test]
    fn when_circle_info_malformed_fail() {
        let dir = TempDir::new("malformed");
        let file = dir.0.join(CIRCLE_INFO_FILE);
        std::fs::write(&file, "{ \"a.png\": 5 }").unwrap();
        assert!(matches!(load_circle_info(&file), Err(ReportError::Json{ .. })));
    }

    #[test]
    fn given_infinite_psnr_write_infinity_string() {
        let json = serde_json::to_value(AnalysisRecord::from(&analysis(f64::INFINITY))).unwrap();

        let base = &json["all_comparisons"]["a.png"];
        assert_eq!(serde_json::json!("Infinity"), base["average_metrics"]["psnr"]);
        assert_eq!(serde_json::json!("Infinity"), base["comparisons"]["b.png"]["metrics"]["psnr"]);
    }

    #[test]
    fn given_channel_diff_write_blue_green_red() {
        let json = serde_json::to_value(AnalysisRecord::from(&analysis(30.0))).unwrap();

        let channel_diff = &json["all_comparisons"]["a.png"]["comparisons"]["b.png"]["metrics"]["channel_diff"];
        assert_eq!(serde_json::json!({ "blue": 3.0, "green": 2.0, "red": 1.0 }), *channel_diff);
        assert_eq!(serde_json::json!("a.png"), json["best_reference_image"]);
    }

    #[test]
    fn given_analysis_save_indented_json() {
        let dir = TempDir::new("analysis");
        let file = dir.0.join(ANALYSIS_FILE);

        save_analysis(&file, &analysis(31.5)).unwrap();
        let contents = std::fs::read_to_string(&file).unwrap();
        assert!(contents.starts_with("{\n    \"best_reference_image\": \"a.png\""), "{}", contents);

        let json: serde_json::Value = serde_json::from_str(&contents).unwrap();
        let metrics = &json["all_comparisons"]["a.png"]["comparisons"]["b.png"]["metrics"];
        assert_eq!(serde_json::json!(31.5), metrics["psnr"]);
        assert_eq!(serde_json::json!(4.0), metrics["mse"]);
        assert_eq!(serde_json::json!("diff_a_b.png"), json["all_comparisons"]["a.png"]["comparisons"]["b.png"]["diff_image"]);
    }
}
