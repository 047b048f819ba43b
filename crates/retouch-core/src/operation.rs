//! Destructive operations executed by the processing service.
//!
//! The pixel work happens remotely; this module only describes each
//! operation, checks its parameters, and builds the request body. Parameter
//! ranges mirror the editor controls: kernel sizes are odd between 3 and 9,
//! noise density is a percentage between 1 and 50.

use serde::Serialize;

use crate::geometry::ValidationError;

pub const MIN_KERNEL_SIZE: u8 = 3;
pub const MAX_KERNEL_SIZE: u8 = 9;
pub const MIN_NOISE_DENSITY: u8 = 1;
pub const MAX_NOISE_DENSITY: u8 = 50;

/// Gradient direction of a Sobel filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SobelDirection {
    X,
    Y,
    #[default]
    Both,
}

impl SobelDirection {
    fn as_str(self) -> &'static str {
        match self {
            SobelDirection::X => "x",
            SobelDirection::Y => "y",
            SobelDirection::Both => "both",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Sobel(SobelDirection),
    Laplace,
    Gaussian,
}

impl FilterKind {
    fn as_str(self) -> &'static str {
        match self {
            FilterKind::Sobel(_) => "sobel",
            FilterKind::Laplace => "laplace",
            FilterKind::Gaussian => "gaussian",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseKind {
    SaltPepper,
    Periodic,
}

impl NoiseKind {
    fn as_str(self) -> &'static str {
        match self {
            NoiseKind::SaltPepper => "salt-pepper",
            NoiseKind::Periodic => "periodic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenoiseKind {
    Median,
    Notch,
    BandReject,
}

impl DenoiseKind {
    fn as_str(self) -> &'static str {
        match self {
            DenoiseKind::Median => "median",
            DenoiseKind::Notch => "notch",
            DenoiseKind::BandReject => "band",
        }
    }
}

/// A named remote operation together with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedOperation {
    Filter { kind: FilterKind, kernel_size: u8 },
    AddNoise { kind: NoiseKind, density: u8 },
    RemoveNoise { kind: DenoiseKind, kernel_size: u8 },
    HistogramGet,
    HistogramEqualize,
}

/// JSON body sent to an operation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationRequest<'a> {
    pub filename: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_size: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub density: Option<u8>,
}

impl NamedOperation {
    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            NamedOperation::Filter { .. } => "filter",
            NamedOperation::AddNoise { .. } => "add-noise",
            NamedOperation::RemoveNoise { .. } => "remove-noise",
            NamedOperation::HistogramGet => "histogram",
            NamedOperation::HistogramEqualize => "equalize",
        }
    }

    /// Endpoint path relative to the service base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            NamedOperation::Filter { .. } => "/filters/apply",
            NamedOperation::AddNoise { .. } => "/noise/add",
            NamedOperation::RemoveNoise { .. } => "/noise/remove",
            NamedOperation::HistogramGet => "/histogram/get",
            NamedOperation::HistogramEqualize => "/histogram/equalize",
        }
    }

    /// Whether the operation produces a new processed image.
    pub fn modifies_image(&self) -> bool {
        !matches!(self, NamedOperation::HistogramGet)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match *self {
            NamedOperation::Filter { kernel_size, .. }
            | NamedOperation::RemoveNoise { kernel_size, .. } => {
                check_kernel_size(self.name(), kernel_size)
            }
            NamedOperation::AddNoise { density, .. } => {
                if (MIN_NOISE_DENSITY..=MAX_NOISE_DENSITY).contains(&density) {
                    Ok(())
                } else {
                    Err(ValidationError::InvalidOperationParameter {
                        operation: self.name(),
                        name: "density",
                        reason: format!(
                            "{density} is outside {MIN_NOISE_DENSITY}..={MAX_NOISE_DENSITY}"
                        ),
                    })
                }
            }
            NamedOperation::HistogramGet | NamedOperation::HistogramEqualize => Ok(()),
        }
    }

    /// Request body addressing the remote asset `filename`.
    pub fn request<'a>(&self, filename: &'a str) -> OperationRequest<'a> {
        let mut request = OperationRequest {
            filename,
            filter_type: None,
            kernel_size: None,
            direction: None,
            noise_type: None,
            density: None,
        };
        match *self {
            NamedOperation::Filter { kind, kernel_size } => {
                request.filter_type = Some(kind.as_str());
                request.kernel_size = Some(kernel_size);
                if let FilterKind::Sobel(direction) = kind {
                    request.direction = Some(direction.as_str());
                }
            }
            NamedOperation::AddNoise { kind, density } => {
                request.noise_type = Some(kind.as_str());
                request.density = Some(density);
            }
            NamedOperation::RemoveNoise { kind, kernel_size } => {
                request.filter_type = Some(kind.as_str());
                request.kernel_size = Some(kernel_size);
            }
            NamedOperation::HistogramGet | NamedOperation::HistogramEqualize => {}
        }
        request
    }
}

fn check_kernel_size(operation: &'static str, size: u8) -> Result<(), ValidationError> {
    if (MIN_KERNEL_SIZE..=MAX_KERNEL_SIZE).contains(&size) && size % 2 == 1 {
        return Ok(());
    }
    Err(ValidationError::InvalidOperationParameter {
        operation,
        name: "kernel_size",
        reason: format!("{size} must be odd and within {MIN_KERNEL_SIZE}..={MAX_KERNEL_SIZE}"),
    })
}
