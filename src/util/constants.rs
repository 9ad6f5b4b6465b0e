#[derive(Debug, Clone, Copy)]
pub struct Constants {
    pub sdk_version: &'static str,
    /// Value of the `x-goog-api-client` header sent with every request.
    pub api_client: &'static str,
}

pub const CONSTANTS: Constants = Constants {
    sdk_version: env!("CARGO_PKG_VERSION"),
    api_client: concat!("gl-rust/ fire/", env!("CARGO_PKG_VERSION")),
};
