use std::fmt::{Display, Formatter};

use crate::firestore::error::{FirestoreError, FirestoreErrorCode, FirestoreResult};

/// gRPC status codes (<https://grpc.github.io/grpc/core/md_doc_statuscodes.html>).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GrpcStatusCode {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

impl GrpcStatusCode {
    /// Values outside the canonical range map to `Unknown`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Ok,
            1 => Self::Cancelled,
            2 => Self::Unknown,
            3 => Self::InvalidArgument,
            4 => Self::DeadlineExceeded,
            5 => Self::NotFound,
            6 => Self::AlreadyExists,
            7 => Self::PermissionDenied,
            8 => Self::ResourceExhausted,
            9 => Self::FailedPrecondition,
            10 => Self::Aborted,
            11 => Self::OutOfRange,
            12 => Self::Unimplemented,
            13 => Self::Internal,
            14 => Self::Unavailable,
            15 => Self::DataLoss,
            16 => Self::Unauthenticated,
            _ => Self::Unknown,
        }
    }

    /// The domain error code for a failed call, or `None` for `Ok`.
    pub fn error_code(self) -> Option<FirestoreErrorCode> {
        let code = match self {
            Self::Ok => return None,
            Self::Cancelled => FirestoreErrorCode::Cancelled,
            Self::Unknown => FirestoreErrorCode::Unknown,
            Self::InvalidArgument => FirestoreErrorCode::InvalidArgument,
            Self::DeadlineExceeded => FirestoreErrorCode::DeadlineExceeded,
            Self::NotFound => FirestoreErrorCode::NotFound,
            Self::AlreadyExists => FirestoreErrorCode::AlreadyExists,
            Self::PermissionDenied => FirestoreErrorCode::PermissionDenied,
            Self::ResourceExhausted => FirestoreErrorCode::ResourceExhausted,
            Self::FailedPrecondition => FirestoreErrorCode::FailedPrecondition,
            Self::Aborted => FirestoreErrorCode::Aborted,
            Self::OutOfRange => FirestoreErrorCode::OutOfRange,
            Self::Unimplemented => FirestoreErrorCode::Unimplemented,
            Self::Internal => FirestoreErrorCode::Internal,
            Self::Unavailable => FirestoreErrorCode::Unavailable,
            Self::DataLoss => FirestoreErrorCode::DataLoss,
            Self::Unauthenticated => FirestoreErrorCode::Unauthenticated,
        };
        Some(code)
    }
}

impl Display for GrpcStatusCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::Aborted => "ABORTED",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::Unimplemented => "UNIMPLEMENTED",
            Self::Internal => "INTERNAL",
            Self::Unavailable => "UNAVAILABLE",
            Self::DataLoss => "DATA_LOSS",
            Self::Unauthenticated => "UNAUTHENTICATED",
        };
        f.write_str(name)
    }
}

/// The final status of a call, as reported by its Finish completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrpcStatus {
    code: GrpcStatusCode,
    message: String,
}

impl GrpcStatus {
    pub fn new(code: GrpcStatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn ok() -> Self {
        Self::new(GrpcStatusCode::Ok, "")
    }

    pub fn code(&self) -> GrpcStatusCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_ok(&self) -> bool {
        self.code == GrpcStatusCode::Ok
    }

    pub fn to_error(&self) -> Option<FirestoreError> {
        self.code
            .error_code()
            .map(|code| FirestoreError::new(code, self.message.clone()))
    }

    pub fn into_result(self) -> FirestoreResult<()> {
        match self.to_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for GrpcStatus {
    fn default() -> Self {
        Self::ok()
    }
}

impl Display for GrpcStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl From<FirestoreError> for GrpcStatus {
    fn from(err: FirestoreError) -> Self {
        let code = match err.code {
            FirestoreErrorCode::Cancelled => GrpcStatusCode::Cancelled,
            FirestoreErrorCode::Unknown => GrpcStatusCode::Unknown,
            FirestoreErrorCode::InvalidArgument => GrpcStatusCode::InvalidArgument,
            FirestoreErrorCode::DeadlineExceeded => GrpcStatusCode::DeadlineExceeded,
            FirestoreErrorCode::NotFound => GrpcStatusCode::NotFound,
            FirestoreErrorCode::AlreadyExists => GrpcStatusCode::AlreadyExists,
            FirestoreErrorCode::PermissionDenied => GrpcStatusCode::PermissionDenied,
            FirestoreErrorCode::ResourceExhausted => GrpcStatusCode::ResourceExhausted,
            FirestoreErrorCode::FailedPrecondition => GrpcStatusCode::FailedPrecondition,
            FirestoreErrorCode::Aborted => GrpcStatusCode::Aborted,
            FirestoreErrorCode::OutOfRange => GrpcStatusCode::OutOfRange,
            FirestoreErrorCode::Unimplemented => GrpcStatusCode::Unimplemented,
            FirestoreErrorCode::Internal => GrpcStatusCode::Internal,
            FirestoreErrorCode::Unavailable => GrpcStatusCode::Unavailable,
            FirestoreErrorCode::DataLoss => GrpcStatusCode::DataLoss,
            FirestoreErrorCode::Unauthenticated => GrpcStatusCode::Unauthenticated,
        };
        Self::new(code, err.message())
    }
}
