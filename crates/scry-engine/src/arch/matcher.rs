/// Returns whether a binary of architecture `token` runs natively on a
/// host reporting `host_arch`.
///
/// The relation is deliberately conservative and not symmetric: an empty
/// or unrecognized input never matches.
pub fn archs_match(host_arch: &str, token: &str) -> bool {
    if host_arch.is_empty() || token.is_empty() {
        return false;
    }

    let host = host_arch.to_lowercase();
    let token = token.to_lowercase();

    match host.as_str() {
        "x86_64" | "amd64" => token.contains("x86-64"),
        "aarch64" | "arm64" => token.contains("aarch64"),
        h if h.starts_with("arm") => token.contains("arm") && !token.contains("aarch64"),
        h if h.starts_with("mips") => token.contains("mips"),
        _ => false,
    }
}
