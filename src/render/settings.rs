// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::{anyhow, Context as _};
use serde::Deserialize;

use crate::temperature::Temperature;

use super::palette;
use super::{Palette, RangeMode, RangeState};

/// One end of the intensity range.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub(crate) enum RawLimit {
    /// A value in raw sensor units (hundredths of a Kelvin, give or take).
    Raw(u16),

    /// A temperature, converted to raw sensor units.
    Temperature(Temperature),
}

impl RawLimit {
    pub(crate) fn to_raw(&self) -> anyhow::Result<u16> {
        match self {
            Self::Raw(raw) => Ok(*raw),
            Self::Temperature(temperature) => temperature
                .to_raw()
                .ok_or_else(|| anyhow!("{:#} is outside of the sensor's range", temperature)),
        }
    }
}

fn default_range_min() -> RawLimit {
    RawLimit::Raw(27300)
}

fn default_range_max() -> RawLimit {
    RawLimit::Raw(31500)
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub(crate) struct RenderSettings {
    /// The value mapped to the first palette entry (or the starting point when auto-ranging).
    #[serde(default = "default_range_min", alias = "rangeMin")]
    pub(crate) range_min: RawLimit,

    /// The value mapped to the last palette entry (or the starting point when auto-ranging).
    #[serde(default = "default_range_max", alias = "rangeMax")]
    pub(crate) range_max: RawLimit,

    /// Follow the coldest sample of each frame.
    #[serde(default, alias = "autoRangeMin")]
    pub(crate) auto_range_min: bool,

    /// Follow the hottest sample of each frame.
    #[serde(default, alias = "autoRangeMax")]
    pub(crate) auto_range_max: bool,

    #[serde(default, deserialize_with = "palette::deserialize")]
    pub(crate) palette: Palette,
}

impl RenderSettings {
    pub(crate) fn range_mode(&self) -> RangeMode {
        RangeMode::new(self.auto_range_min, self.auto_range_max)
    }

    /// The range in effect before any frames have been seen.
    pub(crate) fn initial_range(&self) -> anyhow::Result<RangeState> {
        let min = self.range_min.to_raw().context("Invalid range_min")?;
        let max = self.range_max.to_raw().context("Invalid range_max")?;
        Ok(RangeState::new(min, max)?)
    }

    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        self.initial_range().map(|_| ())
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            range_min: default_range_min(),
            range_max: default_range_max(),
            auto_range_min: false,
            auto_range_max: false,
            palette: Palette::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{RawLimit, RenderSettings};
    use crate::render::palette::Palette;
    use crate::render::range::{RangeMode, RangeState};
    use crate::temperature::Temperature;

    #[test]
    fn defaults() {
        let parsed: Result<RenderSettings, _> = toml::from_str("");
        assert!(
            parsed.is_ok(),
            "Failed to parse empty TOML: {}",
            parsed.unwrap_err()
        );
        let parsed = parsed.unwrap();
        assert_eq!(parsed, RenderSettings::default());
        assert_eq!(parsed.range_mode(), RangeMode::Fixed);
        assert_eq!(
            parsed.initial_range().unwrap(),
            RangeState::new(27300, 31500).unwrap()
        );
        assert_eq!(parsed.palette, Palette::ironblack());
    }

    #[test]
    fn raw_limits() {
        let parsed: RenderSettings =
            toml::from_str("range_min = 28000\nrange_max = 30000").expect("raw limits");
        let expected = RenderSettings {
            range_min: RawLimit::Raw(28000),
            range_max: RawLimit::Raw(30000),
            ..RenderSettings::default()
        };
        assert_eq!(parsed, expected);
    }

    #[test]
    fn temperature_limits() {
        let parsed: RenderSettings = toml::from_str(
            "range_min = { celsius = 7.0 }\nrange_max = { fahrenheit = 107.6 }",
        )
        .expect("temperature limits");
        assert_eq!(
            parsed.range_min,
            RawLimit::Temperature(Temperature::Celsius(7.0))
        );
        assert_eq!(
            parsed.initial_range().unwrap(),
            RangeState::new(28000, 31500).unwrap()
        );
    }

    #[test]
    fn camel_case() {
        let parsed: RenderSettings = toml::from_str(
            "rangeMin = 27000\nrangeMax = 32000\nautoRangeMin = true\nautoRangeMax = true",
        )
        .expect("camelCase aliases");
        let expected = RenderSettings {
            range_min: RawLimit::Raw(27000),
            range_max: RawLimit::Raw(32000),
            auto_range_min: true,
            auto_range_max: true,
            ..RenderSettings::default()
        };
        assert_eq!(parsed, expected);
        assert_eq!(parsed.range_mode(), RangeMode::Auto);
    }

    #[test]
    fn auto_max_only() {
        let parsed: RenderSettings = toml::from_str("auto_range_max = true").expect("auto max");
        assert_eq!(parsed.range_mode(), RangeMode::AutoMax);
    }

    #[test]
    fn inverted_range_rejected() {
        let parsed: RenderSettings =
            toml::from_str("range_min = 31500\nrange_max = 27300").expect("inverted range");
        assert!(parsed.validate().is_err());
        let equal: RenderSettings =
            toml::from_str("range_min = 30000\nrange_max = 30000").expect("equal range");
        assert!(equal.validate().is_err());
    }

    #[test]
    fn unrepresentable_temperature() {
        let parsed: RenderSettings =
            toml::from_str("range_min = { celsius = -300.0 }").expect("cold limit");
        assert!(parsed.initial_range().is_err());
    }

    #[test]
    fn negative_raw_rejected() {
        let parsed: Result<RenderSettings, _> = toml::from_str("range_min = -5");
        assert!(parsed.is_err());
    }

    #[test]
    fn gradient_palette() {
        let parsed: RenderSettings = toml::from_str("palette = \"turbo\"").expect("palette");
        assert_eq!(parsed.palette.name(), "turbo");
    }

    #[test]
    fn unknown_palette() {
        let parsed: Result<RenderSettings, _> = toml::from_str("palette = \"plaid\"");
        assert!(parsed.is_err());
    }
}
