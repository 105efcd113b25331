//! Gradle build scripts and Spring `application.yml`.

use std::sync::LazyLock;

use camino::Utf8Path;
use regex::{Captures, Regex};
use semver::Version;
use tracing::debug;

use super::{FileResult, read_optional, read_required, write_atomic};
use crate::detect::GradleDialect;
use crate::version::parse_triple;

static ASSIGN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^([ \t]*)version[ \t]*=[ \t]*['"]\d+\.\d+\.\d+(?:-[^'"\r\n]+)?['"]"#)
        .expect("hardcoded regex must compile")
});

static METHOD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^([ \t]*)version[ \t]+['"]\d+\.\d+\.\d+(?:-[^'"\r\n]+)?['"]"#)
        .expect("hardcoded regex must compile")
});

static ANY_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*version(?:[ \t]*=|[ \t]+['"])"#).expect("hardcoded regex must compile")
});

static READ_ASSIGN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*version[ \t]*=[ \t]*['"](\d+\.\d+\.\d+)(?:-[^'"\r\n]+)?['"]"#)
        .expect("hardcoded regex must compile")
});

static READ_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*version[ \t]+['"](\d+\.\d+\.\d+)(?:-[^'"\r\n]+)?['"]"#)
        .expect("hardcoded regex must compile")
});

static YAML_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^([ \t]*)version[ \t]*:[ \t]*["']?\d+\.\d+\.\d+["']?"#)
        .expect("hardcoded regex must compile")
});

/// Rewrite every version declaration in a build script.
///
/// Assignments (`version = "x.y.z[-suffix]"`) are rewritten in both dialects;
/// the Groovy method form (`version 'x.y.z'`) only in Groovy, normalized to
/// an assignment. Literals use the dialect's quote. A script with no
/// declaration at all gets one appended.
#[must_use]
pub fn replace_version(content: &str, version: &Version, dialect: GradleDialect) -> String {
    let q = dialect.quote();
    let rewrite = |caps: &Captures<'_>| format!("{}version = {q}{version}{q}", &caps[1]);

    let mut out = ASSIGN_PATTERN.replace_all(content, rewrite).into_owned();
    if dialect == GradleDialect::Groovy {
        out = METHOD_PATTERN.replace_all(&out, rewrite).into_owned();
    }

    if !ANY_DECLARATION.is_match(&out) {
        let body = out.trim_end();
        out = if body.is_empty() {
            format!("version = {q}{version}{q}\n")
        } else {
            format!("{body}\nversion = {q}{version}{q}\n")
        };
    }
    out
}

/// Read the declared version, ignoring any `-suffix`.
pub fn read_version(content: &str) -> Option<Version> {
    READ_ASSIGN
        .captures(content)
        .or_else(|| READ_METHOD.captures(content))
        .and_then(|caps| parse_triple(&caps[1]).ok())
}

/// Replace the first `version:` key in YAML text, or append one.
#[must_use]
pub fn replace_yaml_version(content: &str, version: &Version) -> String {
    if YAML_VERSION.is_match(content) {
        return YAML_VERSION
            .replace(content, |caps: &Captures<'_>| {
                format!("{}version: {version}", &caps[1])
            })
            .into_owned();
    }
    let body = content.trim_end();
    if body.is_empty() {
        format!("version: {version}\n")
    } else {
        format!("{body}\nversion: {version}\n")
    }
}

/// Rewrite the version in a build script on disk.
///
/// Returns whether the file content changed.
pub fn update_build_script(path: &Utf8Path, version: &Version) -> FileResult<bool> {
    let current = read_required(path)?;
    let updated = replace_version(&current, version, GradleDialect::from_path(path));
    if updated == current {
        debug!(%path, "build script already at target version");
        return Ok(false);
    }
    write_atomic(path, &updated)?;
    Ok(true)
}

/// Rewrite the version in an `application.yml`, if the file exists.
///
/// Returns `false` without writing when the file is absent.
pub fn update_application_yaml(path: &Utf8Path, version: &Version) -> FileResult<bool> {
    let Some(current) = read_optional(path)? else {
        debug!(%path, "application yaml not present, skipping");
        return Ok(false);
    };
    let updated = replace_yaml_version(&current, version);
    write_atomic(path, &updated)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn kotlin_assignment_keeps_double_quotes() {
        let content = "plugins {\n    id(\"java\")\n}\n\ngroup = \"com.example\"\nversion = \"0.9.0\"\n";
        let updated = replace_version(content, &v("1.0.0"), GradleDialect::Kotlin);
        assert!(updated.contains("version = \"1.0.0\""));
        assert!(!updated.contains("0.9.0"));
        assert!(updated.starts_with("plugins {"));
    }

    #[test]
    fn groovy_method_form_is_normalized() {
        let content = "group = 'com.example'\nversion '0.9.0'\n";
        let updated = replace_version(content, &v("1.0.0"), GradleDialect::Groovy);
        assert_eq!(updated, "group = 'com.example'\nversion = '1.0.0'\n");
    }

    #[test]
    fn groovy_assignment_uses_single_quotes() {
        let content = "version = \"2.0.0-SNAPSHOT\"\n";
        let updated = replace_version(content, &v("2.0.1"), GradleDialect::Groovy);
        assert_eq!(updated, "version = '2.0.1'\n");
    }

    #[test]
    fn kotlin_ignores_method_form() {
        let content = "version \"0.9.0\"\n";
        let updated = replace_version(content, &v("1.0.0"), GradleDialect::Kotlin);
        assert_eq!(updated, content);
    }

    #[test]
    fn indentation_is_preserved() {
        let content = "allprojects {\n    version = '1.1.1'\n}\n";
        let updated = replace_version(content, &v("1.2.0"), GradleDialect::Groovy);
        assert_eq!(updated, "allprojects {\n    version = '1.2.0'\n}\n");
    }

    #[test]
    fn missing_declaration_is_appended_in_dialect_quotes() {
        let groovy = replace_version("group = 'x'\n\n", &v("0.1.0"), GradleDialect::Groovy);
        assert_eq!(groovy, "group = 'x'\nversion = '0.1.0'\n");

        let kotlin = replace_version("", &v("0.1.0"), GradleDialect::Kotlin);
        assert_eq!(kotlin, "version = \"0.1.0\"\n");
    }

    #[test]
    fn read_version_tolerates_suffix() {
        assert_eq!(read_version("version = '1.0.2-SNAPSHOT'"), Some(v("1.0.2")));
        assert_eq!(read_version("  version \"3.4.5\"\n"), Some(v("3.4.5")));
        assert_eq!(read_version("group = 'x'"), None);
    }

    #[test]
    fn yaml_first_key_replaced() {
        let content = "app:\n  version: \"0.1.0\"\n  name: demo\nversion: 9.9.9\n";
        let updated = replace_yaml_version(content, &v("0.2.0"));
        assert_eq!(updated, "app:\n  version: 0.2.0\n  name: demo\nversion: 9.9.9\n");
    }

    #[test]
    fn yaml_key_appended_when_absent() {
        let updated = replace_yaml_version("spring:\n  application:\n    name: demo\n", &v("1.0.0"));
        assert!(updated.ends_with("    name: demo\nversion: 1.0.0\n"));
    }

    #[test]
    fn application_yaml_absent_is_untouched() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(tmp.path().join("application.yml")).unwrap();
        assert!(!update_application_yaml(&path, &v("1.0.0")).unwrap());
        assert!(!path.exists());
    }
}
