//
// circlecmp - Circle detection and center-aligned image comparison
// Copyright (c) 2020 Filip Szczerek <ga.software@yahoo.com>
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Pairwise comparison of center-aligned images and selection of the best reference image.
//!

pub mod metrics;

pub use metrics::{align, metrics, PairMetrics};

use crate::circle::CircleInfoTable;
use crate::image::Image;
use crate::logging::Logger;
use crate::utils;
use rayon::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, PartialEq)]
pub enum CompareError {
    /// Fewer than 2 images have both pixel data and a circle estimate.
    NotEnoughImages{ found: usize }
}

impl std::fmt::Display for CompareError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareError::NotEnoughImages{ found } =>
                write!(f, "at least 2 images with a detected circle are needed for comparison, found {}", found)
        }
    }
}

impl std::error::Error for CompareError {}

/// Result of comparing a candidate with a base image.
#[derive(Clone, Debug, PartialEq)]
pub struct PairComparison {
    pub metrics: PairMetrics,
    /// File name of the aligned candidate.
    pub aligned_image: String,
    /// File name of the difference image.
    pub diff_image: String
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AverageMetrics {
    pub mse: f64,
    /// Mean of finite PSNR values; `f64::INFINITY` if all candidates match the base exactly.
    pub psnr: f64,
    pub diff_percentage: f64
}

impl AverageMetrics {
    /// Returns `None` if `metrics` is empty.
    pub fn compute<'a, I>(metrics: I) -> Option<AverageMetrics>
    where I: IntoIterator<Item=&'a PairMetrics>
    {
        let metrics: Vec<&PairMetrics> = metrics.into_iter().collect();
        if metrics.is_empty() {
            return None;
        }

        let count = metrics.len() as f64;
        let finite_psnr: Vec<f64> = metrics.iter().map(|m| m.psnr).filter(|p| p.is_finite()).collect();

        Some(AverageMetrics{
            mse: metrics.iter().map(|m| m.mse).sum::<f64>() / count,
            psnr: if finite_psnr.is_empty() {
                f64::INFINITY
            } else {
                finite_psnr.iter().sum::<f64>() / finite_psnr.len() as f64
            },
            diff_percentage: metrics.iter().map(|m| m.diff_percentage).sum::<f64>() / count
        })
    }
}

/// All comparisons in which an image was the base.
#[derive(Clone, Debug, PartialEq)]
pub struct BaseSummary {
    pub average_metrics: AverageMetrics,
    /// Keys: candidate identifiers.
    pub comparisons: BTreeMap<String, PairComparison>
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisResult {
    pub best_reference_image: String,
    /// Keys: base identifiers.
    pub all_comparisons: BTreeMap<String, BaseSummary>
}

impl AnalysisResult {
    /// Returns base images sorted by ascending average MSE; ties keep identifier order.
    pub fn ranking(&self) -> Vec<(&str, &BaseSummary)> {
        rank(&self.all_comparisons)
    }
}

fn rank(summaries: &BTreeMap<String, BaseSummary>) -> Vec<(&str, &BaseSummary)> {
    let mut ranking: Vec<(&str, &BaseSummary)> = summaries.iter().map(|(id, s)| (id.as_str(), s)).collect();
    // `sort_by` is stable
    ranking.sort_by(|(_, s1), (_, s2)| s1.average_metrics.mse.total_cmp(&s2.average_metrics.mse));
    ranking
}

/// Returns the base image with the lowest average MSE; on ties, the first one in identifier order.
pub fn select_best_reference(summaries: &BTreeMap<String, BaseSummary>) -> Option<&str> {
    rank(summaries).first().map(|(id, _)| *id)
}

/// Returns file names of the (aligned, difference) images of a pair.
pub fn artifact_names(base_id: &str, candidate_id: &str) -> (String, String) {
    let base = utils::file_stem(base_id);
    let candidate = utils::file_stem(candidate_id);
    (format!("aligned_{}_{}.png", base, candidate), format!("diff_{}_{}.png", base, candidate))
}

/// Compares every image with every other one after aligning their circle centers; multithreaded.
///
/// Only images present both in `images` and in `table` take part.
///
/// # Parameters
///
/// * `images` - Pixel data; keys: image identifiers (file names).
/// * `table` - Circle estimates.
/// * `artifact_handler` - Function to call for each aligned and difference image; parameters: artifact file name,
///     image. Called from worker threads, in no particular order.
///
pub fn compare<F>(
    images: &BTreeMap<String, Image>,
    table: &CircleInfoTable,
    artifact_handler: Option<F>,
    logger: &Logger
) -> Result<AnalysisResult, CompareError>
where F: Fn(&str, &Image) + Sync
{
    // identifier order determines the base order and the tie-breaking
    let valid: Vec<(&str, &Image, cgmath::Vector2<i32>)> = images.iter()
        .filter_map(|(id, image)| table.get(id).map(|circle| (id.as_str(), image, circle.center)))
        .collect();

    if valid.len() < 2 {
        return Err(CompareError::NotEnoughImages{ found: valid.len() });
    }

    let pairs: Vec<(usize, usize)> = (0..valid.len())
        .flat_map(|b| (0..valid.len()).filter(move |&c| c != b).map(move |c| (b, c)))
        .collect();

    logger.info(&format!("Comparing {} image pairs...", pairs.len()));

    let mut results: Vec<Option<PairComparison>> = vec![None; pairs.len()];

    results.par_iter_mut().enumerate().for_each(|(i, result)| {
        let (base_id, base, base_center) = valid[pairs[i].0];
        let (cand_id, candidate, cand_center) = valid[pairs[i].1];

        let (aligned, diff) = align(base, candidate, &base_center, &cand_center);
        let pair_metrics = metrics(base, &aligned, &diff);
        let (aligned_name, diff_name) = artifact_names(base_id, cand_id);

        logger.verbose(&format!(
            "{} vs. {}: MSE = {:.2}, PSNR = {:.2} dB, diff. = {:.2}%",
            base_id, cand_id, pair_metrics.mse, pair_metrics.psnr, pair_metrics.diff_percentage
        ));

        if let Some(handler) = &artifact_handler {
            handler(&aligned_name, &aligned);
            handler(&diff_name, &diff);
        }

        *result = Some(PairComparison{ metrics: pair_metrics, aligned_image: aligned_name, diff_image: diff_name });
    });

    let mut all_comparisons = BTreeMap::<String, BaseSummary>::new();
    for (base_idx, (base_id, _, _)) in valid.iter().enumerate() {
        let comparisons: BTreeMap<String, PairComparison> = pairs.iter().zip(results.iter_mut())
            .filter(|((b, _), _)| *b == base_idx)
            .filter_map(|((_, c), result)| result.take().map(|r| (valid[*c].0.to_string(), r)))
            .collect();

        // every base has at least one candidate here
        if let Some(average_metrics) = AverageMetrics::compute(comparisons.values().map(|c| &c.metrics)) {
            all_comparisons.insert(base_id.to_string(), BaseSummary{ average_metrics, comparisons });
        }
    }

    let best_reference_image = select_best_reference(&all_comparisons)
        .ok_or(CompareError::NotEnoughImages{ found: all_comparisons.len() })?
        .to_string();

    Ok(AnalysisResult{ best_reference_image, all_comparisons })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circle::{estimate, CircleEstimate, CircleStatistics, EdgeMask, RadiusRounding};
    use crate::image::PixelFormat;
    use crate::logging::Level;
    use cgmath::Vector2;
    use std::sync::Mutex;

    fn summary(mse: f64) -> BaseSummary {
        BaseSummary{
            average_metrics: AverageMetrics{ mse, psnr: 0.0, diff_percentage: 0.0 },
            comparisons: BTreeMap::new()
        }
    }

    fn pair_metrics(mse: f64, psnr: f64) -> PairMetrics {
        PairMetrics{ mse, rmse: mse.sqrt(), mae: 0.0, psnr, diff_percentage: 0.0, channel_diff: [0.0; 3] }
    }

    /// Returns a 4x4 `Mono8` image with a 2x2 block of `value` at (`x`, `y`).
    fn block_image(x: u32, y: u32, value: u8) -> Image {
        let mut image = Image::new(4, 4, PixelFormat::Mono8);
        for dy in 0..2 {
            for dx in 0..2 {
                image.pixel_mut::<u8>(x + dx, y + dy)[0] = value;
            }
        }
        image
    }

    fn no_handler() -> Option<fn(&str, &Image)> { None }

    #[test]
    fn given_tied_average_mse_select_first_in_identifier_order() {
        let mut summaries = BTreeMap::new();
        summaries.insert("c.png".to_string(), summary(5.0));
        summaries.insert("a.png".to_string(), summary(10.0));
        summaries.insert("b.png".to_string(), summary(5.0));

        assert_eq!(Some("b.png"), select_best_reference(&summaries));
        assert_eq!(None, select_best_reference(&BTreeMap::new()));
    }

    #[test]
    fn given_infinite_psnr_average_only_finite_values() {
        let avg = AverageMetrics::compute(&[pair_metrics(0.0, f64::INFINITY), pair_metrics(4.0, 30.0)]).unwrap();
        assert_eq!(2.0, avg.mse);
        assert_eq!(30.0, avg.psnr);

        let avg = AverageMetrics::compute(&[pair_metrics(0.0, f64::INFINITY), pair_metrics(0.0, f64::INFINITY)]).unwrap();
        assert_eq!(f64::INFINITY, avg.psnr);

        assert_eq!(None, AverageMetrics::compute(&Vec::<PairMetrics>::new()));
    }

    #[test]
    fn given_file_names_derive_artifact_names_from_stems() {
        assert_eq!(
            ("aligned_img1_img2.png".to_string(), "diff_img1_img2.png".to_string()),
            artifact_names("img1.jpg", "img2.png")
        );
    }

    #[test]
    fn when_fewer_than_2_images_fail() {
        let mut images = BTreeMap::new();
        images.insert("a.png".to_string(), block_image(0, 0, 255));
        images.insert("b.png".to_string(), block_image(1, 1, 255));

        let mut entries = BTreeMap::new();
        entries.insert("a.png".to_string(), CircleEstimate{ center: Vector2{ x: 0, y: 0 }, radius: 0 });
        // "c.png" has no pixel data
        entries.insert("c.png".to_string(), CircleEstimate{ center: Vector2{ x: 1, y: 1 }, radius: 0 });
        let table = CircleInfoTable::new(entries);

        assert_eq!(
            Err(CompareError::NotEnoughImages{ found: 1 }),
            compare(&images, &table, no_handler(), &Logger::new(Level::Quiet))
        );
    }

    #[test]
    fn given_three_blocks_compare_end_to_end() {
        let mut images = BTreeMap::new();
        images.insert("a.png".to_string(), block_image(0, 0, 255));
        images.insert("b.png".to_string(), block_image(1, 1, 200));
        images.insert("c.png".to_string(), block_image(2, 2, 100));

        let entries: BTreeMap<String, CircleEstimate> = images.iter().map(|(id, image)| {
            let mask = EdgeMask::from_image(image);
            (id.clone(), estimate(&mask, RadiusRounding::PerAxis).unwrap())
        }).collect();
        assert_eq!(Vector2{ x: 2, y: 2 }, entries["c.png"].center);
        let table = CircleInfoTable::new(entries);

        let artifacts = Mutex::new(vec![]);
        let result = compare(
            &images,
            &table,
            Some(|name: &str, _: &Image| artifacts.lock().unwrap().push(name.to_string())),
            &Logger::new(Level::Quiet)
        ).unwrap();

        assert_eq!(3, result.all_comparisons.len());
        for (base_id, summary) in &result.all_comparisons {
            assert_eq!(2, summary.comparisons.len());
            assert!(!summary.comparisons.contains_key(base_id));
            for comparison in summary.comparisons.values() {
                assert!(comparison.metrics.mse.is_finite() && comparison.metrics.mse > 0.0);
                assert!(comparison.metrics.psnr.is_finite());
            }
        }

        // blocks overlap exactly after alignment: MSE = (value difference)^2 * 4 / 16
        let a = &result.all_comparisons["a.png"];
        assert_eq!(756.25, a.comparisons["b.png"].metrics.mse);
        assert_eq!(6006.25, a.comparisons["c.png"].metrics.mse);
        assert_eq!(25.0, a.comparisons["b.png"].metrics.diff_percentage);
        assert_eq!(1628.125, result.all_comparisons["b.png"].average_metrics.mse);
        assert_eq!("b.png", result.best_reference_image);
        assert_eq!(vec!["b.png", "a.png", "c.png"], result.ranking().iter().map(|(id, _)| *id).collect::<Vec<_>>());

        assert_eq!("aligned_a_b.png", a.comparisons["b.png"].aligned_image);
        assert_eq!("diff_a_b.png", a.comparisons["b.png"].diff_image);

        let mut artifacts = artifacts.into_inner().unwrap();
        artifacts.sort();
        assert_eq!(12, artifacts.len());
        assert_eq!("aligned_a_b.png", artifacts[0]);
        assert_eq!("diff_c_b.png", artifacts[11]);
    }

    #[test]
    fn given_table_with_statistics_compare_only_entries() {
        let mut images = BTreeMap::new();
        let mut entries = BTreeMap::new();
        for (i, id) in ["img1.png", "img2.png", "img3.png", "img4.png"].iter().enumerate() {
            images.insert(id.to_string(), block_image(i as u32 % 3, 1, 50 * i as u8 + 10));
            entries.insert(id.to_string(), CircleEstimate{ center: Vector2{ x: i as i32 % 3, y: 1 }, radius: 0 });
        }
        // an image named like the aggregate key, but without a circle estimate
        images.insert("statistics".to_string(), block_image(0, 0, 1));

        let stats = CircleStatistics::compute(entries.values());
        assert!(stats.is_some());
        let table = CircleInfoTable::from_parts(entries, stats);

        let result = compare(&images, &table, no_handler(), &Logger::new(Level::Quiet)).unwrap();

        let num_comparisons: usize = result.all_comparisons.values().map(|s| s.comparisons.len()).sum();
        assert_eq!(4 * 3, num_comparisons);
        assert!(!result.all_comparisons.contains_key("statistics"));
        assert!(result.all_comparisons.values().all(|s| !s.comparisons.contains_key("statistics")));
    }

    #[test]
    fn given_identical_images_psnr_average_is_infinite() {
        let mut images = BTreeMap::new();
        let mut entries = BTreeMap::new();
        for id in &["x.png", "y.png"] {
            images.insert(id.to_string(), block_image(1, 1, 77));
            entries.insert(id.to_string(), CircleEstimate{ center: Vector2{ x: 1, y: 1 }, radius: 0 });
        }

        let result = compare(&images, &CircleInfoTable::new(entries), no_handler(), &Logger::new(Level::Quiet)).unwrap();

        let x = &result.all_comparisons["x.png"];
        assert_eq!(f64::INFINITY, x.comparisons["y.png"].metrics.psnr);
        assert_eq!(f64::INFINITY, x.average_metrics.psnr);
        assert_eq!(0.0, x.average_metrics.mse);
        assert_eq!("x.png", result.best_reference_image);
    }

    #[test]
    fn given_two_images_each_is_base_of_one_comparison() {
        let mut images = BTreeMap::new();
        images.insert("p.png".to_string(), block_image(0, 0, 40));
        images.insert("q.png".to_string(), block_image(2, 2, 80));

        let mut entries = BTreeMap::new();
        entries.insert("p.png".to_string(), CircleEstimate{ center: Vector2{ x: 0, y: 0 }, radius: 1 });
        entries.insert("q.png".to_string(), CircleEstimate{ center: Vector2{ x: 2, y: 2 }, radius: 1 });

        let result = compare(&images, &CircleInfoTable::new(entries), no_handler(), &Logger::new(Level::Quiet)).unwrap();

        assert_eq!(vec!["p.png", "q.png"], result.all_comparisons.keys().collect::<Vec<_>>());
        let p = &result.all_comparisons["p.png"];
        let q = &result.all_comparisons["q.png"];
        assert_eq!(vec!["q.png"], p.comparisons.keys().collect::<Vec<_>>());
        assert_eq!(p.comparisons["q.png"].metrics.mse, p.average_metrics.mse);
        // symmetric difference: the tie goes to the first identifier
        assert_eq!(p.average_metrics.mse, q.average_metrics.mse);
        assert_eq!("p.png", result.best_reference_image);
    }
}
