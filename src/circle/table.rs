//
// circlecmp - Circle detection and center-aligned image comparison
// Copyright (c) 2020 Filip Szczerek <ga.software@yahoo.com>
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Per-image circle estimates and their aggregate statistics.
//!

use cgmath::Vector2;
use crate::circle::CircleEstimate;
use std::collections::BTreeMap;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CircleStatistics {
    pub average_center: Vector2<f64>,
    pub average_radius: f64,
    /// Population standard deviation.
    pub std_center: Vector2<f64>,
    /// Population standard deviation.
    pub std_radius: f64
}

impl CircleStatistics {
    /// Returns `None` if there are no estimates.
    pub fn compute<'a, I>(estimates: I) -> Option<CircleStatistics>
    where I: IntoIterator<Item=&'a CircleEstimate>
    {
        let estimates: Vec<&CircleEstimate> = estimates.into_iter().collect();
        if estimates.is_empty() {
            return None;
        }

        let xs: Vec<f64> = estimates.iter().map(|e| e.center.x as f64).collect();
        let ys: Vec<f64> = estimates.iter().map(|e| e.center.y as f64).collect();
        let radii: Vec<f64> = estimates.iter().map(|e| e.radius as f64).collect();

        Some(CircleStatistics{
            average_center: Vector2{ x: mean(&xs), y: mean(&ys) },
            average_radius: mean(&radii),
            std_center: Vector2{ x: std_dev(&xs), y: std_dev(&ys) },
            std_radius: std_dev(&radii)
        })
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    let avg = mean(values);
    (values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// Circle estimates of all images in which a circle was found, keyed by image file name.
///
/// The statistics are kept apart from the entries and are never an image identifier.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CircleInfoTable {
    entries: BTreeMap<String, CircleEstimate>,
    aggregate: Option<CircleStatistics>
}

impl CircleInfoTable {
    /// Creates the table and computes the statistics of `entries`.
    pub fn new(entries: BTreeMap<String, CircleEstimate>) -> CircleInfoTable {
        let aggregate = CircleStatistics::compute(entries.values());
        CircleInfoTable{ entries, aggregate }
    }

    /// Creates the table with previously computed (e.g. loaded) statistics.
    pub fn from_parts(entries: BTreeMap<String, CircleEstimate>, aggregate: Option<CircleStatistics>) -> CircleInfoTable {
        CircleInfoTable{ entries, aggregate }
    }

    /// Entries in ascending identifier order.
    pub fn entries(&self) -> &BTreeMap<String, CircleEstimate> { &self.entries }

    pub fn aggregate(&self) -> Option<&CircleStatistics> { self.aggregate.as_ref() }

    pub fn get(&self, id: &str) -> Option<&CircleEstimate> { self.entries.get(id) }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}
