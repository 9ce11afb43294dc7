//! Input validation for arguments handed to the engine binary.

use super::error::{EngineError, EngineResult};

/// Validate a Docker/OCI image reference.
///
/// References follow the pattern: `[registry/][namespace/]name[:tag][@digest]`
/// Valid characters: alphanumeric, `.`, `-`, `_`, `/`, `:`, `@`
///
/// Examples:
/// - `ubuntu:latest`
/// - `myregistry.io/myimage:v1.0`
/// - `library/nginx`
pub fn validate_image_reference(image: &str) -> EngineResult<()> {
    if image.is_empty() {
        return Err(EngineError::InvalidInput(
            "image reference cannot be empty".to_string(),
        ));
    }

    if image.len() > 256 {
        return Err(EngineError::InvalidInput(
            "image reference exceeds maximum length of 256 characters".to_string(),
        ));
    }

    if image.starts_with('-') {
        return Err(EngineError::InvalidInput(format!(
            "image reference '{}' cannot start with '-'",
            image
        )));
    }

    let valid_chars = |c: char| {
        c.is_ascii_alphanumeric()
            || c == '.'
            || c == '-'
            || c == '_'
            || c == '/'
            || c == ':'
            || c == '@'
    };

    if !image.chars().all(valid_chars) {
        return Err(EngineError::InvalidInput(format!(
            "image reference '{}' contains invalid characters; only alphanumeric, '.', '-', '_', '/', ':', '@' are allowed",
            image
        )));
    }

    if image.contains("..") {
        return Err(EngineError::InvalidInput(
            "image reference cannot contain '..'".to_string(),
        ));
    }

    Ok(())
}

/// Validate a container name.
///
/// Names must be alphanumeric with `-`, `_` and `.`, starting with an
/// alphanumeric character or underscore.
pub fn validate_container_name(name: &str) -> EngineResult<()> {
    let Some(first_char) = name.chars().next() else {
        return Err(EngineError::InvalidInput(
            "container name cannot be empty".to_string(),
        ));
    };

    if name.len() > 128 {
        return Err(EngineError::InvalidInput(
            "container name exceeds maximum length of 128 characters".to_string(),
        ));
    }

    if !first_char.is_ascii_alphanumeric() && first_char != '_' {
        return Err(EngineError::InvalidInput(
            "container name must start with an alphanumeric character or underscore".to_string(),
        ));
    }

    let valid_chars = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.';
    if !name.chars().all(valid_chars) {
        return Err(EngineError::InvalidInput(format!(
            "container name '{}' contains invalid characters; only alphanumeric, '-', '_', '.' are allowed",
            name
        )));
    }

    Ok(())
}

/// Validate a container ID or name passed to start/inspect/stop/rm.
///
/// Container IDs are hex strings (12 or 64 chars for docker/podman).
pub fn validate_container_id(id: &str) -> EngineResult<()> {
    if id.is_empty() {
        return Err(EngineError::InvalidInput(
            "container ID or name cannot be empty".to_string(),
        ));
    }

    if id.len() > 128 {
        return Err(EngineError::InvalidInput(
            "container ID or name exceeds maximum length".to_string(),
        ));
    }

    if id.starts_with('-') {
        return Err(EngineError::InvalidInput(format!(
            "container ID or name '{}' cannot start with '-'",
            id
        )));
    }

    let valid_chars = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.';
    if !id.chars().all(valid_chars) {
        return Err(EngineError::InvalidInput(format!(
            "container ID or name '{}' contains invalid characters",
            id
        )));
    }

    Ok(())
}

/// Validate a `KEY=VALUE` environment entry.
///
/// Keys follow POSIX conventions; the value is passed through untouched.
pub fn validate_env_entry(entry: &str) -> EngineResult<()> {
    let key = entry.split_once('=').map_or(entry, |(key, _)| key);

    let Some(first_char) = key.chars().next() else {
        return Err(EngineError::InvalidInput(format!(
            "environment entry '{}' has an empty key",
            entry
        )));
    };

    if key.len() > 256 {
        return Err(EngineError::InvalidInput(
            "environment variable key exceeds maximum length of 256 characters".to_string(),
        ));
    }

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(EngineError::InvalidInput(format!(
            "environment variable key '{}' must start with a letter or underscore",
            key
        )));
    }

    let valid_chars = |c: char| c.is_ascii_alphanumeric() || c == '_';
    if !key.chars().all(valid_chars) {
        return Err(EngineError::InvalidInput(format!(
            "environment variable key '{}' contains invalid characters; only alphanumeric and '_' are allowed",
            key
        )));
    }

    if entry.contains('\0') {
        return Err(EngineError::InvalidInput(
            "environment entry cannot contain null bytes".to_string(),
        ));
    }

    Ok(())
}

/// Validate an exposed port string such as `8080`, `8080/tcp` or `7000-7010/udp`.
///
/// No protocol is assumed when the suffix is missing.
pub fn validate_port_spec(port: &str) -> EngineResult<()> {
    if port.is_empty() {
        return Err(EngineError::InvalidInput(
            "exposed port cannot be empty".to_string(),
        ));
    }

    if !port.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(EngineError::InvalidInput(format!(
            "exposed port '{}' must start with a port number",
            port
        )));
    }

    let valid_chars = |c: char| c.is_ascii_alphanumeric() || c == '/' || c == '-' || c == ':';
    if !port.chars().all(valid_chars) {
        return Err(EngineError::InvalidInput(format!(
            "exposed port '{}' contains invalid characters",
            port
        )));
    }

    Ok(())
}
