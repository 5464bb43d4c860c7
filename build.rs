use std::{env, fs, path::Path};

/// Constants generated into `$OUT_DIR/pkg_info.rs`: (const name, path under
/// `[package]`, fallback).
const GENERATED: &[(&str, &[&str], &str)] = &[
    ("PKG_NAME", &["name"], "roadmap-planner"),
    ("PKG_VERSION", &["version"], "0.0.0"),
    ("PKG_DESCRIPTION", &["description"], ""),
    (
        "EXPORT_FORMAT_VERSION",
        &["metadata", "roadmap", "export-format"],
        "2",
    ),
];

fn lookup<'a>(table: &'a toml::Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(table, |value, key| value.get(*key))
        .and_then(|v| v.as_str())
}

fn main() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    let manifest = Path::new(&manifest_dir).join("Cargo.toml");
    println!("cargo:rerun-if-changed={}", manifest.display());

    let content = fs::read_to_string(&manifest)
        .unwrap_or_else(|e| panic!("Failed to read Cargo.toml: {e}"));
    let parsed: toml::Value =
        toml::from_str(&content).unwrap_or_else(|e| panic!("Failed to parse Cargo.toml: {e}"));
    let package = parsed.get("package").expect("Cargo.toml missing [package]");

    let contents: String = GENERATED
        .iter()
        .map(|(name, path, fallback)| {
            let value = lookup(package, path).unwrap_or(fallback);
            format!("pub const {name}: &str = {value:?};\n")
        })
        .collect();

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    fs::write(Path::new(&out_dir).join("pkg_info.rs"), contents)
        .expect("Failed to write pkg_info.rs");
}
