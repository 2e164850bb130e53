/// HTTP middleware
///
/// - `rate_limit`: token-bucket limiter for the login endpoint
/// - `security`: security-related response headers

pub mod rate_limit;
pub mod security;
