//config
pub const CONTRACT_NOT_SET: &str = "Target contract is empty!";
pub const BASE_URL_INVALID: &str = "Base URL is not a valid http(s) URL";
pub const REQUEST_TIMEOUT_ZERO: &str = "Request timeout must be greater than zero";

//http
pub const HTTP_CLIENT_BUILD_FAILED: &str = "Failed to build HTTP client";
