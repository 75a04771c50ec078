use std::fmt;

use super::structs::{ResourceKind, ShaderStages};

/// Recoverable misuse reported synchronously at the call that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    ResourceCountMismatch {
        expected: usize,
        actual: usize,
    },
    ResourceKindMismatch {
        slot: usize,
        expected: ResourceKind,
        actual: &'static str,
    },
    SlotOutOfRange {
        index: usize,
        count: usize,
    },
    UnsupportedStages {
        slot: usize,
        kind: ResourceKind,
        stages: ShaderStages,
        backend: &'static str,
    },
    DynamicOffsetCountMismatch {
        expected: usize,
        actual: usize,
    },
    /// A resource set was bound before any pipeline of that kind.
    NoActivePipeline {
        bind_point: &'static str,
    },
    SetSlotOutOfRange {
        slot: u32,
        layouts: usize,
    },
    /// The bound set's layout has a different element count than the
    /// pipeline's layout at `slot`.
    IncompatibleSetLength {
        slot: u32,
        expected: usize,
        actual: usize,
    },
    IncompatibleSetElement {
        slot: u32,
        element: usize,
        expected: ResourceKind,
        actual: ResourceKind,
    },
    MisalignedDynamicOffset {
        element: usize,
        offset: u64,
        alignment: u32,
    },
    BufferRangeOutOfBounds {
        offset: u64,
        size: u64,
        buffer_size: u64,
    },
    /// Data recorded into a list has to fit a `u32` byte count.
    DataTooLarge {
        size: usize,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::ResourceCountMismatch { expected, actual } => write!(
                f,
                "resource set holds {} resources but its layout declares {}",
                actual, expected
            ),
            ValidationError::ResourceKindMismatch {
                slot,
                expected,
                actual,
            } => write!(
                f,
                "resource at slot {} must be {:?}, but {} was given",
                slot, expected, actual
            ),
            ValidationError::SlotOutOfRange { index, count } => write!(
                f,
                "slot {} is out of range for a layout with {} elements",
                index, count
            ),
            ValidationError::UnsupportedStages {
                slot,
                kind,
                stages,
                backend,
            } => write!(
                f,
                "slot {}: {:?} is not usable from stages {:?} on the {} backend",
                slot, kind, stages, backend
            ),
            ValidationError::DynamicOffsetCountMismatch { expected, actual } => write!(
                f,
                "{} dynamic offsets were expected, but {} were provided",
                expected, actual
            ),
            ValidationError::NoActivePipeline { bind_point } => write!(
                f,
                "a {} pipeline must be set before binding resource sets",
                bind_point
            ),
            ValidationError::SetSlotOutOfRange { slot, layouts } => write!(
                f,
                "cannot bind resource set to slot {}, the active pipeline has {} resource layouts",
                slot, layouts
            ),
            ValidationError::IncompatibleSetLength {
                slot,
                expected,
                actual,
            } => write!(
                f,
                "resource set for slot {} has {} elements, the active pipeline expects {}",
                slot, actual, expected
            ),
            ValidationError::IncompatibleSetElement {
                slot,
                element,
                expected,
                actual,
            } => write!(
                f,
                "resource set for slot {}: element {} is {:?}, the active pipeline expects {:?}",
                slot, element, actual, expected
            ),
            ValidationError::MisalignedDynamicOffset {
                element,
                offset,
                alignment,
            } => write!(
                f,
                "effective offset {} of element {} is not a multiple of {}",
                offset, element, alignment
            ),
            ValidationError::BufferRangeOutOfBounds {
                offset,
                size,
                buffer_size,
            } => write!(
                f,
                "{} bytes at offset {} do not fit a buffer of {} bytes",
                size, offset, buffer_size
            ),
            ValidationError::DataTooLarge { size } => {
                write!(f, "{} bytes exceed the recordable size", size)
            }
        }
    }
}

/// Encoder and decoder disagree about the stream. Replay stops at the first
/// fault and the list has to be reset before it is useful again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayFault {
    InvalidEntryId { id: u8, entry: u32 },
    InvalidPayload { id: u8, entry: u32 },
    UnresolvedHandle { index: u32, expected: &'static str },
    Truncated { entry: u32 },
}

impl fmt::Display for ReplayFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayFault::InvalidEntryId { id, entry } => {
                write!(f, "invalid entry id {} at entry {}", id, entry)
            }
            ReplayFault::InvalidPayload { id, entry } => {
                write!(f, "malformed payload for entry id {} at entry {}", id, entry)
            }
            ReplayFault::UnresolvedHandle { index, expected } => {
                write!(f, "tracked index {} does not resolve to a {}", index, expected)
            }
            ReplayFault::Truncated { entry } => {
                write!(f, "entry stream ended early at entry {}", entry)
            }
        }
    }
}

#[derive(Debug)]
pub enum GpuError {
    Validation(ValidationError),
    Fault(ReplayFault),
    Backend(String),
    Config(String),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::Validation(e) => write!(f, "Validation Error: {}", e),
            GpuError::Fault(e) => write!(f, "Replay Fault: {}", e),
            GpuError::Backend(msg) => write!(f, "Backend Error: {}", msg),
            GpuError::Config(msg) => write!(f, "Config Error: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}
impl std::error::Error for ReplayFault {}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::Validation(e) => Some(e),
            GpuError::Fault(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for GpuError {
    fn from(e: ValidationError) -> Self {
        return GpuError::Validation(e);
    }
}

impl From<ReplayFault> for GpuError {
    fn from(e: ReplayFault) -> Self {
        return GpuError::Fault(e);
    }
}
