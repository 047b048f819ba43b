//! Histogram payloads returned by the processing service.
//!
//! The service answers `histogram/get` and `histogram/equalize` with either
//! per-channel (`r`, `g`, `b`) or single-channel (`gray`) bucket arrays of
//! 256 entries, optionally accompanied by cumulative sums of the same shape.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::RgbRaster;

/// Number of intensity buckets per channel.
pub const BUCKETS: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistogramError {
    #[error("Histogram channel '{channel}' has {actual} buckets, expected 256")]
    WrongLength { channel: &'static str, actual: usize },

    #[error("Cumulative histogram shape does not match the histogram")]
    ShapeMismatch,
}

/// Bucket counts for one image, colour or greyscale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelHistograms {
    Color { r: Vec<u64>, g: Vec<u64>, b: Vec<u64> },
    Gray { gray: Vec<u64> },
}

impl ChannelHistograms {
    /// Named channels in display order.
    pub fn channels(&self) -> Vec<(&'static str, &[u64])> {
        match self {
            ChannelHistograms::Color { r, g, b } => {
                vec![("r", r.as_slice()), ("g", g.as_slice()), ("b", b.as_slice())]
            }
            ChannelHistograms::Gray { gray } => vec![("gray", gray.as_slice())],
        }
    }

    fn validate(&self) -> Result<(), HistogramError> {
        for (channel, buckets) in self.channels() {
            if buckets.len() != BUCKETS {
                return Err(HistogramError::WrongLength {
                    channel,
                    actual: buckets.len(),
                });
            }
        }
        Ok(())
    }

    /// Running sums of every channel.
    pub fn cumulative(&self) -> Self {
        let running = |buckets: &[u64]| {
            buckets
                .iter()
                .scan(0u64, |acc, &v| {
                    *acc += v;
                    Some(*acc)
                })
                .collect()
        };
        match self {
            ChannelHistograms::Color { r, g, b } => ChannelHistograms::Color {
                r: running(r),
                g: running(g),
                b: running(b),
            },
            ChannelHistograms::Gray { gray } => ChannelHistograms::Gray {
                gray: running(gray),
            },
        }
    }

    /// Largest bucket across channels, for chart scaling.
    pub fn max_value(&self) -> u64 {
        self.channels()
            .iter()
            .flat_map(|(_, buckets)| buckets.iter().copied())
            .max()
            .unwrap_or(0)
    }

    fn same_shape(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (ChannelHistograms::Color { .. }, ChannelHistograms::Color { .. })
                | (ChannelHistograms::Gray { .. }, ChannelHistograms::Gray { .. })
        )
    }
}

/// A validated histogram response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramReport {
    pub histograms: ChannelHistograms,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cumulative_histograms: Option<ChannelHistograms>,
}

impl HistogramReport {
    /// Per-channel histograms of a raster, with cumulative sums.
    ///
    /// Single pass over the pixel data.
    pub fn from_raster(raster: &RgbRaster) -> Self {
        let mut r = vec![0u64; BUCKETS];
        let mut g = vec![0u64; BUCKETS];
        let mut b = vec![0u64; BUCKETS];
        for chunk in raster.pixels.chunks_exact(3) {
            r[chunk[0] as usize] += 1;
            g[chunk[1] as usize] += 1;
            b[chunk[2] as usize] += 1;
        }
        let histograms = ChannelHistograms::Color { r, g, b };
        Self {
            cumulative_histograms: Some(histograms.cumulative()),
            histograms,
        }
    }

    /// Check bucket counts and that the cumulative part matches in shape.
    pub fn validate(&self) -> Result<(), HistogramError> {
        self.histograms.validate()?;
        if let Some(cumulative) = &self.cumulative_histograms {
            if !self.histograms.same_shape(cumulative) {
                return Err(HistogramError::ShapeMismatch);
            }
            cumulative.validate()?;
        }
        Ok(())
    }

    /// The cumulative histograms, computed locally when the service omitted them.
    pub fn cumulative(&self) -> ChannelHistograms {
        self.cumulative_histograms
            .clone()
            .unwrap_or_else(|| self.histograms.cumulative())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_payload() -> String {
        let mut gray = vec![0u64; BUCKETS];
        gray[10] = 4;
        gray[200] = 6;
        serde_json::json!({ "histograms": { "gray": gray } }).to_string()
    }

    #[test]
    fn test_parse_gray_report() {
        let report: HistogramReport = serde_json::from_str(&gray_payload()).unwrap();
        assert!(report.validate().is_ok());
        assert!(matches!(report.histograms, ChannelHistograms::Gray { .. }));
        assert_eq!(report.histograms.max_value(), 6);
    }

    #[test]
    fn test_parse_color_report_with_cumulative() {
        let ones = vec![1u64; BUCKETS];
        let sums: Vec<u64> = (1..=BUCKETS as u64).collect();
        let json = serde_json::json!({
            "histograms": { "r": ones, "g": ones, "b": ones },
            "cumulative_histograms": { "r": sums, "g": sums, "b": sums },
        });
        let report: HistogramReport = serde_json::from_value(json).unwrap();
        assert!(report.validate().is_ok());
        assert_eq!(report.cumulative(), report.histograms.cumulative());
    }

    #[test]
    fn test_cumulative_computed_when_missing() {
        let report: HistogramReport = serde_json::from_str(&gray_payload()).unwrap();
        let ChannelHistograms::Gray { gray } = report.cumulative() else {
            panic!("expected gray cumulative histogram");
        };
        assert_eq!(gray[9], 0);
        assert_eq!(gray[10], 4);
        assert_eq!(gray[255], 10);
    }

    #[test]
    fn test_from_raster_counts_channels() {
        let raster = RgbRaster::new(2, 1, vec![255, 0, 0, 255, 128, 0]);
        let report = HistogramReport::from_raster(&raster);
        assert!(report.validate().is_ok());
        let ChannelHistograms::Color { r, g, b } = &report.histograms else {
            panic!("expected colour histograms");
        };
        assert_eq!(r[255], 2);
        assert_eq!(g[0], 1);
        assert_eq!(g[128], 1);
        assert_eq!(b[0], 2);
        assert_eq!(report.cumulative().max_value(), 2);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let report = HistogramReport {
            histograms: ChannelHistograms::Color {
                r: vec![0; BUCKETS],
                g: vec![0; 255],
                b: vec![0; BUCKETS],
            },
            cumulative_histograms: None,
        };
        assert_eq!(
            report.validate(),
            Err(HistogramError::WrongLength {
                channel: "g",
                actual: 255
            })
        );
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let report = HistogramReport {
            histograms: ChannelHistograms::Gray {
                gray: vec![0; BUCKETS],
            },
            cumulative_histograms: Some(ChannelHistograms::Color {
                r: vec![0; BUCKETS],
                g: vec![0; BUCKETS],
                b: vec![0; BUCKETS],
            }),
        };
        assert_eq!(report.validate(), Err(HistogramError::ShapeMismatch));
    }
}
