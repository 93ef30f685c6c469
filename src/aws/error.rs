//! AWS SDK error classification.
//!
//! Every capability funnels SDK failures through [`classify`] so not-found,
//! already-exists, transient and fatal conditions are recognised the same
//! way across S3, SQS, SNS and DynamoDB.

use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;

use crate::capability::{CapabilityError, ErrorKind};

/// Error codes meaning "the resource does not exist".
const NOT_FOUND_CODES: &[&str] = &[
    "NoSuchBucket",
    "NoSuchKey",
    "NotFound",
    "AWS.SimpleQueueService.NonExistentQueue",
    "QueueDoesNotExist",
    "ResourceNotFoundException",
    "NotFoundException",
];

/// Error codes meaning "already there", tolerated by provisioning.
const ALREADY_EXISTS_CODES: &[&str] = &[
    "BucketAlreadyOwnedByYou",
    "ResourceInUseException",
    "QueueAlreadyExists",
];

const TRANSIENT_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestThrottled",
    "RequestThrottledException",
    "TooManyRequestsException",
    "ProvisionedThroughputExceededException",
    "RequestLimitExceeded",
    "ServiceUnavailable",
    "InternalError",
    "InternalFailure",
    "InternalServerError",
    "SlowDown",
    "RequestTimeout",
    "AWS.SimpleQueueService.QueueDeletedRecently",
];

const ARGUMENT_CODES: &[&str] = &[
    "ValidationException",
    "ValidationError",
    "InvalidParameter",
    "InvalidParameterValue",
    "InvalidParameterException",
    "InvalidBucketName",
];

/// Classify an SDK failure.
pub fn classify<E: ProvideErrorMetadata>(err: &SdkError<E, HttpResponse>) -> ErrorKind {
    match err {
        SdkError::ConstructionFailure(_) => ErrorKind::Argument,
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            ErrorKind::Transient
        }
        SdkError::ServiceError(ctx) => {
            classify_code(ctx.err().code(), Some(ctx.raw().status().as_u16()))
        }
        _ => ErrorKind::Fatal,
    }
}

/// Classify a service error from its code and HTTP status.
///
/// Codes win over status; status is the fallback for bodiless responses
/// such as S3 HEAD requests.
pub fn classify_code(code: Option<&str>, status: Option<u16>) -> ErrorKind {
    if let Some(code) = code {
        if NOT_FOUND_CODES.contains(&code) {
            return ErrorKind::NotFound;
        }
        if ALREADY_EXISTS_CODES.contains(&code) {
            return ErrorKind::AlreadyExists;
        }
        if TRANSIENT_CODES.contains(&code) {
            return ErrorKind::Transient;
        }
        if ARGUMENT_CODES.contains(&code) {
            return ErrorKind::Argument;
        }
    }

    match status {
        Some(404) => ErrorKind::NotFound,
        Some(429) => ErrorKind::Transient,
        Some(s) if (500..600).contains(&s) => ErrorKind::Transient,
        _ => ErrorKind::Fatal,
    }
}

/// Wrap an SDK failure with the operation and resource it affected.
pub fn provider_error<E>(
    operation: &'static str,
    resource: &str,
    err: SdkError<E, HttpResponse>,
) -> CapabilityError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let kind = classify(&err);
    let code = match &err {
        SdkError::ServiceError(ctx) => ctx.err().code().map(str::to_string),
        _ => None,
    };
    let message = DisplayErrorContext(&err).to_string();

    CapabilityError::Provider {
        operation,
        resource: resource.to_string(),
        kind,
        code,
        message,
        source: Some(Box::new(err)),
    }
}
