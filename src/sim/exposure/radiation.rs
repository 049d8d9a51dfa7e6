use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DecodeError;
use super::tregenza::{NUM_PATCHES, TregenzaScheme};

/// Weights converting Radiance RGB radiance to a single broadband value.
pub const RGB_WEIGHTS: [f64; 3] = [0.265074126, 0.670114631, 0.064811243];

/// Hours in a non-leap year.
pub const HOURS_PER_YEAR: f64 = 8760.0;

/// Sky radiation component produced by the sky-matrix tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkyComponent {
    Direct,
    Diffuse,
}

impl SkyComponent {
    /// Command-line flag selecting the component in the sky-matrix tool.
    pub fn flag(&self) -> &'static str {
        match self {
            SkyComponent::Direct => "-d",
            SkyComponent::Diffuse => "-s",
        }
    }
}

impl fmt::Display for SkyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkyComponent::Direct => f.write_str("direct"),
            SkyComponent::Diffuse => f.write_str("diffuse"),
        }
    }
}

/// Layout of the sky-matrix text in front of the sky patches.
///
/// A Radiance header block (`#?RADIANCE` up to the first blank line) is
/// always skipped. `gendaymtx -h` writes none, so by default only the ground
/// row is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderSettings {
    /// Extra raw lines skipped after any Radiance header block.
    pub header_lines: usize,
    /// Data rows between the header and the first sky patch (the ground patch).
    pub leading_ground_rows: usize,
}

impl Default for DecoderSettings {
    fn default() -> Self {
        Self {
            header_lines: 0,
            leading_ground_rows: 1,
        }
    }
}

/// One irradiance value per direction for a single period (kWh/m²).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchIrradiance {
    values: Vec<f64>,
}

impl PatchIrradiance {
    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sky part (first 145 values).
    pub fn sky(&self) -> &[f64] {
        &self.values[..NUM_PATCHES.min(self.values.len())]
    }

    /// Element-wise sum, e.g. direct + diffuse.
    ///
    /// Returns `None` if the lengths differ.
    pub fn combine(&self, other: &Self) -> Option<Self> {
        crate::vecutils::add(&self.values, &other.values).map(Self::from_values)
    }

    /// Appends `constant` once per sky patch for the ground directions.
    pub fn with_ground(mut self, constant: f64) -> Self {
        self.values.extend(std::iter::repeat_n(constant, NUM_PATCHES));
        self
    }
}

/// Decodes the per-patch RGB text written by the sky-matrix tool.
pub struct RadiationDecoder<'a> {
    scheme: &'a TregenzaScheme,
    settings: DecoderSettings,
}

impl<'a> RadiationDecoder<'a> {
    pub fn new(scheme: &'a TregenzaScheme, settings: DecoderSettings) -> Self {
        Self { scheme, settings }
    }

    /// Decodes one period.
    ///
    /// Each patch value is `(RGB · RGB_WEIGHTS) * row_weight * duration_hours / 1000`.
    /// Rows are assigned by cumulative patch counts. Blank lines are ignored.
    /// Any malformed line, a missing patch or an extra data line fails the
    /// whole period.
    pub fn decode(&self, text: &str, duration_hours: f64) -> Result<PatchIrradiance, DecodeError> {
        let weights = self.scheme.row_weights();
        let mut values = Vec::with_capacity(NUM_PATCHES);
        let mut ground_rows_left = self.settings.leading_ground_rows;

        let skip = radiance_header_len(text) + self.settings.header_lines;
        for (i, line) in text.lines().enumerate().skip(skip) {
            let line_no = i + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if ground_rows_left > 0 {
                ground_rows_left -= 1;
                continue;
            }
            if values.len() == NUM_PATCHES {
                return Err(DecodeError::TrailingData {
                    expected: NUM_PATCHES,
                    line: line_no,
                });
            }

            let rgb = parse_rgb(trimmed, line_no)?;
            let broadband: f64 = rgb.iter().zip(RGB_WEIGHTS.iter()).map(|(c, w)| c * w).sum();
            // Patch indices stay below NUM_PATCHES here
            let row = self.scheme.row_of(values.len()).unwrap_or(weights.len() - 1);
            values.push(broadband * weights[row] * duration_hours / 1000.0);
        }

        if values.len() < NUM_PATCHES {
            return Err(DecodeError::Truncated {
                expected: NUM_PATCHES,
                found: values.len(),
            });
        }

        Ok(PatchIrradiance::from_values(values))
    }
}

/// Number of lines taken by a leading Radiance header, blank line included.
fn radiance_header_len(text: &str) -> usize {
    let mut lines = text.lines();
    if !lines.next().is_some_and(|l| l.starts_with("#?RADIANCE")) {
        return 0;
    }
    match lines.position(|l| l.trim().is_empty()) {
        Some(pos) => pos + 2,
        None => text.lines().count(),
    }
}

fn parse_rgb(line: &str, line_no: usize) -> Result<[f64; 3], DecodeError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != 3 {
        return Err(DecodeError::TokenCount {
            line: line_no,
            found: tokens.len(),
        });
    }
    let mut rgb = [0.0; 3];
    for (slot, token) in rgb.iter_mut().zip(tokens) {
        *slot = token
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| DecodeError::NotANumber {
                line: line_no,
                token: token.to_string(),
            })?;
    }
    Ok(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::exposure::tregenza::NUM_ROWS;
    use approx::assert_relative_eq;

    fn raw_settings() -> DecoderSettings {
        DecoderSettings {
            header_lines: 0,
            leading_ground_rows: 0,
        }
    }

    fn uniform_text(line: &str, n: usize) -> String {
        vec![line; n].join("\n")
    }

    #[test]
    fn test_rgb_weights_sum_to_one() {
        assert_relative_eq!(RGB_WEIGHTS.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_uniform_input_equal_weights() {
        let w = 0.05;
        let scheme = TregenzaScheme::with_row_weights([w; NUM_ROWS]);
        let decoder = RadiationDecoder::new(&scheme, raw_settings());
        let text = uniform_text("1 1 1", NUM_PATCHES);
        let irr = decoder.decode(&text, HOURS_PER_YEAR).unwrap();
        assert_eq!(irr.len(), NUM_PATCHES);
        for v in irr.values() {
            assert_relative_eq!(*v, w * 8760.0 / 1000.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_row_weights_by_cumulative_counts() {
        let scheme = TregenzaScheme::new();
        let decoder = RadiationDecoder::new(&scheme, raw_settings());
        let text = uniform_text("2 2 2", NUM_PATCHES);
        let irr = decoder.decode(&text, 100.0).unwrap();
        let weights = scheme.row_weights();
        assert_relative_eq!(irr.values()[29], 2.0 * weights[0] * 0.1, epsilon = 1e-12);
        assert_relative_eq!(irr.values()[30], 2.0 * weights[1] * 0.1, epsilon = 1e-12);
        assert_relative_eq!(irr.values()[144], 2.0 * weights[7] * 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_gendaymtx_layout() {
        let scheme = TregenzaScheme::new();
        let decoder = RadiationDecoder::new(&scheme, DecoderSettings::default());
        let mut text = String::from(
            "#?RADIANCE\ngendaymtx -m 1 -d -A -h sky.wea\nLATLONG= 52 -13\nNROWS=146\nNCOLS=1\nNCOMP=3\nFORMAT=ascii\n\n",
        );
        // Ground row carries a marker value that must be skipped
        text.push_str("99 99 99\n\n");
        for _ in 0..NUM_PATCHES {
            text.push_str("1 0 0\n\n");
        }
        let irr = decoder.decode(&text, HOURS_PER_YEAR).unwrap();
        assert_eq!(irr.len(), NUM_PATCHES);
        let expected = RGB_WEIGHTS[0] * scheme.row_weights()[0] * 8.76;
        assert_relative_eq!(irr.values()[0], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_headerless_output() {
        // `gendaymtx -h`: ground row first, every row followed by a blank line
        let scheme = TregenzaScheme::new();
        let decoder = RadiationDecoder::new(&scheme, DecoderSettings::default());
        let mut text = String::from("99 99 99\n\n");
        for _ in 0..NUM_PATCHES {
            text.push_str("0 1 0\n\n");
        }
        let irr = decoder.decode(&text, HOURS_PER_YEAR).unwrap();
        assert_eq!(irr.len(), NUM_PATCHES);
        let expected = RGB_WEIGHTS[1] * scheme.row_weights()[0] * 8.76;
        assert_relative_eq!(irr.values()[0], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_header_without_blank_line() {
        let scheme = TregenzaScheme::new();
        let decoder = RadiationDecoder::new(&scheme, raw_settings());
        assert_eq!(
            decoder.decode("#?RADIANCE\nNROWS=146", HOURS_PER_YEAR),
            Err(DecodeError::Truncated {
                expected: 145,
                found: 0
            })
        );
    }

    #[test]
    fn test_truncated() {
        let scheme = TregenzaScheme::new();
        let decoder = RadiationDecoder::new(&scheme, raw_settings());
        let text = uniform_text("1 1 1", 144);
        assert_eq!(
            decoder.decode(&text, HOURS_PER_YEAR),
            Err(DecodeError::Truncated {
                expected: 145,
                found: 144
            })
        );
    }

    #[test]
    fn test_trailing_data() {
        let scheme = TregenzaScheme::new();
        let decoder = RadiationDecoder::new(&scheme, raw_settings());
        let text = uniform_text("1 1 1", 146);
        assert_eq!(
            decoder.decode(&text, HOURS_PER_YEAR),
            Err(DecodeError::TrailingData {
                expected: 145,
                line: 146
            })
        );
    }

    #[test]
    fn test_wrong_token_count() {
        let scheme = TregenzaScheme::new();
        let decoder = RadiationDecoder::new(&scheme, raw_settings());
        let mut lines = vec!["1 1 1"; NUM_PATCHES];
        lines[10] = "1 1";
        let err = decoder.decode(&lines.join("\n"), HOURS_PER_YEAR).unwrap_err();
        assert_eq!(err, DecodeError::TokenCount { line: 11, found: 2 });
    }

    #[test]
    fn test_non_numeric() {
        let scheme = TregenzaScheme::new();
        let decoder = RadiationDecoder::new(&scheme, raw_settings());
        let mut lines = vec!["1 1 1"; NUM_PATCHES];
        lines[0] = "1 x 1";
        lines[1] = "1 nan 1";
        let err = decoder.decode(&lines.join("\n"), HOURS_PER_YEAR).unwrap_err();
        assert_eq!(
            err,
            DecodeError::NotANumber {
                line: 1,
                token: "x".to_string()
            }
        );
        lines[0] = "1 1 1";
        let err = decoder.decode(&lines.join("\n"), HOURS_PER_YEAR).unwrap_err();
        assert!(matches!(err, DecodeError::NotANumber { line: 2, .. }));
    }

    #[test]
    fn test_combine_and_ground() {
        let a = PatchIrradiance::from_values(vec![1.0; NUM_PATCHES]);
        let b = PatchIrradiance::from_values(vec![2.0; NUM_PATCHES]);
        let total = a.combine(&b).unwrap();
        assert!(total.values().iter().all(|&v| v == 3.0));
        let with_ground = total.with_ground(0.5);
        assert_eq!(with_ground.len(), 2 * NUM_PATCHES);
        assert_eq!(with_ground.sky().len(), NUM_PATCHES);
        assert_eq!(with_ground.values()[NUM_PATCHES], 0.5);
        assert!(a.combine(&with_ground).is_none());
    }
}
