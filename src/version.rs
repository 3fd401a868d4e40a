use std::sync::LazyLock;

/// Version of the software: the Cargo package version, with the git commit appended when
/// `FGRG_GIT_HASH` was set at build time.
pub static VERSION: LazyLock<String> = LazyLock::new(|| match option_env!("FGRG_GIT_HASH") {
    Some(hash) if !hash.is_empty() => format!("{}-{hash}", env!("CARGO_PKG_VERSION")),
    _ => env!("CARGO_PKG_VERSION").to_string(),
});
