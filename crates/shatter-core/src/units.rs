//! Unit newtypes for air-handling quantities.
//!
//! Zone data mixes temperatures in °F, concentrations in ppm, volumes in ft³,
//! airflows in CFM and heat in watts. Keeping them as bare `f64` makes it easy
//! to pass a CO2 setpoint where a temperature setpoint belongs, so the data
//! model wraps each in a `#[repr(transparent)]` newtype.
//!
//! # Usage
//!
//! ```
//! use shatter_core::units::{Celsius, Fahrenheit, Watts};
//!
//! let setpoint = Fahrenheit(75.2);
//! assert!((setpoint.to_celsius().value() - 24.0).abs() < 1e-9);
//!
//! let gain = Watts(120.0) + Watts(80.0);
//! assert_eq!(gain, Watts(200.0));
//! // let wrong = setpoint + gain; // does not compile
//! # let _ = Celsius(0.0);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Implements arithmetic and helpers shared by every unit type
macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4} {}", self.0, $unit_name)
            }
        }

        impl $type {
            /// Create a new value
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Get the raw numeric value
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Check if value is finite
            #[inline]
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl std::iter::Sum for $type {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

/// Temperature in degrees Fahrenheit
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Fahrenheit(pub f64);

impl_unit_ops!(Fahrenheit, "°F");

impl Fahrenheit {
    /// Affine conversion `(F - 32) / 1.8`.
    pub fn to_celsius(self) -> Celsius {
        Celsius((self.0 - 32.0) / 1.8)
    }
}

/// Temperature in degrees Celsius
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Celsius(pub f64);

impl_unit_ops!(Celsius, "°C");

/// CO2 concentration in parts per million
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Ppm(pub f64);

impl_unit_ops!(Ppm, "ppm");

/// Zone air volume in cubic feet
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct CubicFeet(pub f64);

impl_unit_ops!(CubicFeet, "ft³");

/// Volumetric airflow in cubic feet per minute
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Cfm(pub f64);

impl_unit_ops!(Cfm, "CFM");

/// Heat rate in watts
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Watts(pub f64);

impl_unit_ops!(Watts, "W");

/// Energy cost in the configured currency
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Currency(pub f64);

impl_unit_ops!(Currency, "$");
