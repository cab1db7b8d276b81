//! Attributes configurable on a trigger-capable sensor.

/// Kind of attribute that can be set with
/// [`TriggerDevice::set_attribute()`](crate::TriggerDevice::set_attribute).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum AttributeKind {
    /// Threshold above which a [`Delta`](crate::TriggerKind::Delta) trigger fires, in the
    /// physical unit of the sensor (e.g., rad/s for a gyroscope).
    SlopeThreshold,
    /// Number of consecutive samples that must exceed the slope threshold.
    SlopeDuration,
    /// Full-scale measurement range, in the native unit of the range setting of the sensor
    /// (e.g., °/s for a gyroscope).
    FullScale,
}

impl core::fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SlopeThreshold => write!(f, "slope threshold"),
            Self::SlopeDuration => write!(f, "slope duration"),
            Self::FullScale => write!(f, "full scale"),
        }
    }
}

/// Value of an attribute.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorValue {
    /// Plain integer, for counts and enumerated settings.
    Int(i32),
    /// Fixed-point physical value: `integer + micro · 10⁻⁶`.
    ///
    /// Both parts carry the sign of the value, e.g., -1.5 is `{ integer: -1, micro: -500_000 }`.
    IntPlusMicro { integer: i32, micro: i32 },
}

impl SensorValue {
    const MICRO_PER_UNIT: i64 = 1_000_000;

    /// Returns the value as millionths of its unit.
    ///
    /// Returns `None` if this is not an [`IntPlusMicro`](SensorValue::IntPlusMicro) value or if
    /// its fractional part is not smaller than one unit.
    #[must_use]
    pub fn as_micro(&self) -> Option<i64> {
        match *self {
            Self::IntPlusMicro { integer, micro } => {
                if i64::from(micro).abs() >= Self::MICRO_PER_UNIT {
                    return None;
                }
                Some(i64::from(integer) * Self::MICRO_PER_UNIT + i64::from(micro))
            }
            Self::Int(_) => None,
        }
    }

    /// Returns the value if this is an [`Int`](SensorValue::Int).
    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match *self {
            Self::Int(value) => Some(value),
            Self::IntPlusMicro { .. } => None,
        }
    }
}

/// Converts an angular rate in millionths of rad/s to whole °/s, discarding the sign.
#[must_use]
pub fn micro_rad_to_degrees(micro_rad: i64) -> u64 {
    // π, in millionths.
    const PI_MICRO: u64 = 3_141_592;

    micro_rad.unsigned_abs() * 180 / PI_MICRO
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn micro_parts_carry_the_sign() {
        let value = SensorValue::IntPlusMicro {
            integer: -1,
            micro: -500_000,
        };
        assert_eq!(value.as_micro(), Some(-1_500_000));
        assert_eq!(value.as_int(), None);
    }

    #[test]
    fn reject_oversized_fraction() {
        let value = SensorValue::IntPlusMicro {
            integer: 0,
            micro: 1_000_000,
        };
        assert_eq!(value.as_micro(), None);
        assert_eq!(SensorValue::Int(3).as_micro(), None);
    }

    #[test]
    fn rad_to_degrees() {
        assert_eq!(micro_rad_to_degrees(3_141_592), 180);
        assert_eq!(micro_rad_to_degrees(-3_141_592), 180);
        // 2.18 rad/s is just below 125 °/s
        assert_eq!(micro_rad_to_degrees(2_180_000), 124);
        assert_eq!(micro_rad_to_degrees(0), 0);
    }
}
