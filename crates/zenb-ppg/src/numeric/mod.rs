//! Numerical methods
//!
//! Stateless primitives shared by every pipeline stage. None of these
//! functions panic or return NaN on short, flat or singular input: they
//! degrade to a neutral value (zeros, the last iterate, a skipped pivot).
//!
//! - `interpolation` - Lagrange, Newton, natural cubic spline
//! - `differentiation` - forward/backward/central, five-point, second derivative
//! - `integration` - trapezoid, Simpson 1/3 and 3/8, Romberg, cumulative
//! - `roots` - Newton-Raphson, bisection, secant
//! - `regression` - linear, polynomial, exponential, power
//! - `linalg` - Gaussian elimination, LU, Gauss-Jordan inverse
//! - `spectral` - FFT/IFFT, PSD, Welch, spectral descriptors
//! - `smoothing` - Savitzky-Golay, moving averages, median, Kalman
//! - `peaks` - derivative peak detection with prominence
//! - `stats` - moments, quantiles, normalization, correlation, resampling

pub mod differentiation;
pub mod integration;
pub mod interpolation;
pub mod linalg;
pub mod peaks;
pub mod regression;
pub mod roots;
pub mod smoothing;
pub mod spectral;
pub mod stats;

/// Guard for ratios whose denominator may vanish
pub const EPSILON: f64 = 1e-10;

/// Pivot magnitude below which elimination treats a column as singular
pub const PIVOT_EPSILON: f64 = 1e-12;

pub use interpolation::CubicSpline;
pub use peaks::Peak;
pub use regression::{CurveFit, LinearFit, PolynomialFit};
pub use roots::RootResult;
pub use smoothing::KalmanFilter1d;
pub use spectral::{PowerSpectrum, Spectrum};
