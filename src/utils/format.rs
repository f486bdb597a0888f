use regex::Regex;
use std::sync::LazyLock;

static RESOURCE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\(|（)v(\d+)(?:\)|）)$").expect("valid regex"));

static SIZE_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{\{.*_?SIZE *\}\}").expect("valid regex"));

const SI_UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];

/// Reads the trailing `(vN)` / `（vN）` marker of a resource name.
pub fn extract_version_from_resource_name(name: &str) -> Option<u32> {
    RESOURCE_VERSION
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Resource name with the trailing version marker removed.
pub fn strip_version_suffix(name: &str) -> &str {
    match RESOURCE_VERSION.find(name) {
        Some(m) => name[..m.start()].trim_end(),
        None => name.trim_end(),
    }
}

/// Replaces a `${{ SIZE }}` style placeholder with a human readable byte size.
pub fn replace_size(s: &str, size: u64) -> String {
    let human = humanize_bytes(size);
    SIZE_PLACEHOLDER
        .replace_all(s, regex::NoExpand(&human))
        .into_owned()
}

/// SI byte size: `5 B`, `1.5 kB`, `83 MB`.
pub fn humanize_bytes(size: u64) -> String {
    if size < 10 {
        return format!("{} B", size);
    }

    let mut exp = 0usize;
    let mut unit = 1u64;
    while exp + 1 < SI_UNITS.len() && size / unit >= 1000 {
        unit *= 1000;
        exp += 1;
    }

    let val = ((size as f64 / unit as f64) * 10.0 + 0.5).floor() / 10.0;
    if val < 10.0 {
        format!("{:.1} {}", val, SI_UNITS[exp])
    } else {
        format!("{:.0} {}", val, SI_UNITS[exp])
    }
}
