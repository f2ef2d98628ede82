// SPDX-License-Identifier: GPL-3.0-or-later
use std::cmp;
use std::fmt;

use num_traits::Float;
use serde::Deserialize;

/// Sensor readings are in hundredths of a degree.
const RAW_PER_DEGREE: f64 = 100.0;

/// The sensor scale is offset from Celsius by (roughly) absolute zero.
const RAW_CELSIUS_OFFSET: f64 = 273.0;

/// Convert a raw sensor reading to degrees Celsius.
pub(crate) fn celsius_from_raw(raw: u16) -> f32 {
    (f64::from(raw) / RAW_PER_DEGREE - RAW_CELSIUS_OFFSET) as f32
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(match self {
            TemperatureUnit::Celsius => "C",
            TemperatureUnit::Fahrenheit => "F",
        })
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(from = "SerializedTemperature<T>")]
pub enum Temperature<T = f32>
where
    T: Float,
{
    Celsius(T),
    Fahrenheit(T),
}

impl Temperature<f32> {
    /// The temperature a raw sensor reading stands for.
    pub fn from_raw(raw: u16) -> Self {
        Self::Celsius(celsius_from_raw(raw))
    }

    /// The raw sensor reading for this temperature, if the sensor can represent it.
    pub fn to_raw(&self) -> Option<u16> {
        let raw = ((f64::from(self.in_celsius()) + RAW_CELSIUS_OFFSET) * RAW_PER_DEGREE).round();
        if (0.0..=f64::from(u16::MAX)).contains(&raw) {
            Some(raw as u16)
        } else {
            None
        }
    }
}

impl<T> Temperature<T>
where
    T: Float,
{
    /// Get the temperature in Celsius.
    pub fn in_celsius(&self) -> T {
        match self {
            Self::Celsius(_) => self.value(),
            Self::Fahrenheit(_) => {
                (self.value() - T::from(32).expect("32 to be able to be represented by a float"))
                    * T::from(5).expect("5 to be able to be represented by a float")
                    / T::from(9).expect("9 to be able to be represented by a float")
            }
        }
    }

    pub fn unit(&self) -> TemperatureUnit {
        match self {
            Temperature::Celsius(_) => TemperatureUnit::Celsius,
            Temperature::Fahrenheit(_) => TemperatureUnit::Fahrenheit,
        }
    }

    fn value(&self) -> T {
        let value = match self {
            Temperature::Celsius(c) => *c,
            Temperature::Fahrenheit(f) => *f,
        };
        // NaN and negative zero are normalized to positive zero.
        if value.is_nan() || (value.is_zero() && value.is_sign_negative()) {
            T::zero()
        } else {
            value
        }
    }
}

impl<T> cmp::PartialEq<Self> for Temperature<T>
where
    T: Float,
{
    fn eq(&self, other: &Self) -> bool {
        // Always compare in celsius.
        self.in_celsius().eq(&other.in_celsius())
    }
}

impl<T> fmt::Display for Temperature<T>
where
    T: Float,
    T: fmt::Display,
{
    /// Format the temperature value like a numeric value. If the alternate formatting flag (`#`)
    /// is specified, the degree symbol and the unit (ex: `°C`) are also printed.
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value().fmt(fmt)?;
        if fmt.alternate() {
            write!(fmt, "°{}", self.unit())?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SerializedTemperature<T = f32>
where
    T: Float,
{
    #[serde(alias = "c", alias = "C")]
    Celsius(T),

    #[serde(alias = "f", alias = "F")]
    Fahrenheit(T),
}

impl<T> From<SerializedTemperature<T>> for Temperature<T>
where
    T: Float,
{
    fn from(value: SerializedTemperature<T>) -> Self {
        match value {
            SerializedTemperature::Celsius(c) => Self::Celsius(c),
            SerializedTemperature::Fahrenheit(f) => Self::Fahrenheit(f),
        }
    }
}

#[cfg(test)]
mod test {
    use serde::Deserialize;

    use super::{celsius_from_raw, Temperature, TemperatureUnit};
    use float_cmp::{approx_eq, F32Margin};

    #[test]
    fn raw_to_celsius() {
        assert_eq!(celsius_from_raw(28000), 7.0);
        assert_eq!(celsius_from_raw(27300), 0.0);
        assert_eq!(celsius_from_raw(31500), 42.0);
        assert_eq!(celsius_from_raw(0), -273.0);
    }

    #[test]
    fn raw_round_trip() {
        assert_eq!(Temperature::from_raw(29815).to_raw(), Some(29815));
        assert_eq!(Temperature::Celsius(7.0f32).to_raw(), Some(28000));
    }

    #[test]
    fn fahrenheit_to_raw() {
        // 44.6°F is 7°C
        assert_eq!(Temperature::Fahrenheit(44.6f32).to_raw(), Some(28000));
    }

    #[test]
    fn unrepresentable_raw() {
        assert_eq!(Temperature::Celsius(-300.0f32).to_raw(), None);
        assert_eq!(Temperature::Celsius(400.0f32).to_raw(), None);
    }

    #[test]
    fn fahrenheit_in_celsius() {
        assert!(approx_eq!(
            f32,
            Temperature::Fahrenheit(-40.0).in_celsius(),
            -40.0,
            F32Margin::default()
        ));
        assert!(approx_eq!(
            f32,
            Temperature::Fahrenheit(212.0).in_celsius(),
            100.0,
            F32Margin::default()
        ));
    }

    #[test]
    fn display_alternate() {
        assert_eq!(format!("{:#.1}", Temperature::Celsius(7.0f32)), "7.0°C");
        assert_eq!(format!("{:.1}", Temperature::Fahrenheit(44.6f32)), "44.6");
    }

    #[derive(Debug, Deserialize)]
    struct TemperatureTest {
        temp: Temperature,
    }

    #[test]
    fn deserialize_celsius() {
        let wrapper: TemperatureTest = toml::from_str(r#"temp = { "celsius" = -40.0 }"#)
            .expect("A map of Celsius to a float to deserialize");
        assert_eq!(wrapper.temp.unit(), TemperatureUnit::Celsius);
        assert_eq!(wrapper.temp.in_celsius(), -40.0);
    }

    #[test]
    fn deserialize_fahrenheit_alias() {
        let wrapper: TemperatureTest = toml::from_str(r#"temp = { f = 32.0 }"#)
            .expect("A map of F to a float to deserialize");
        assert_eq!(wrapper.temp.unit(), TemperatureUnit::Fahrenheit);
        assert_eq!(wrapper.temp.in_celsius(), 0.0);
    }
}
