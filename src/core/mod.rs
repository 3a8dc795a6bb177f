pub(crate) mod batch;
pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod models;
pub(crate) mod verifier;

#[cfg(test)]
pub(crate) mod test_support;
