use gpu::GpuError;

#[derive(Debug, Clone, PartialEq)]
pub enum SensorError {
    /// Half-angles must be finite and within `[0, pi]`.
    InvalidHalfAngle { axis: char, value: f64 },
    /// Radius must be non-negative; `+inf` is allowed.
    InvalidRadius(f64),
    InvalidSliceCount(u32),
    InvalidScanPlaneRate(f64),
    InvalidIntersectionWidth(f64),
    InvalidModelMatrix,
    /// `update` or `destroy` called after `destroy`.
    Destroyed,
    Gpu(GpuError),
}

impl std::fmt::Display for SensorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorError::InvalidHalfAngle { axis, value } => {
                write!(f, "{axis} half-angle must be in [0, pi]: got {value}")
            }
            SensorError::InvalidRadius(r) => write!(f, "radius must be >= 0: got {r}"),
            SensorError::InvalidSliceCount(n) => {
                write!(f, "slice count must be in [1, {}]: got {n}", crate::MAX_SLICE_COUNT)
            }
            SensorError::InvalidScanPlaneRate(r) => {
                write!(f, "scan plane rate must be finite: got {r}")
            }
            SensorError::InvalidIntersectionWidth(w) => {
                write!(f, "intersection width must be finite and >= 0: got {w}")
            }
            SensorError::InvalidModelMatrix => write!(f, "model matrix must be finite"),
            SensorError::Destroyed => write!(f, "sensor volume used after destroy()"),
            SensorError::Gpu(e) => write!(f, "gpu: {e}"),
        }
    }
}

impl std::error::Error for SensorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SensorError::Gpu(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GpuError> for SensorError {
    fn from(e: GpuError) -> Self {
        SensorError::Gpu(e)
    }
}
