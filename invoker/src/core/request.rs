//! Per-item invocation requests.
//!
//! A [`RequestTemplate`] holds the static build configuration; every item gets
//! its own [`InvocationRequest`] with the placeholder substituted. Requests are
//! never mutated after they are built.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::core::placeholder::{replace_placeholder, resolve_working_directory};

/// Boolean build-tool switches copied into every request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildFlags {
    pub offline: bool,
    pub batch_mode: bool,
    pub debug: bool,
    pub show_errors: bool,
    pub update_snapshots: bool,
    pub quiet: bool,
}

/// Static configuration every per-item request is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplate {
    pub placeholder: String,
    /// Working directory, possibly containing the placeholder.
    pub working_directory: Option<PathBuf>,
    /// Directory used when no working directory is configured.
    pub default_directory: PathBuf,
    /// Local repository, resolved once per run and shared by all items.
    pub local_repository: Option<PathBuf>,
    pub pom_file: Option<PathBuf>,
    pub goals: Vec<String>,
    pub profiles: Vec<String>,
    pub properties: BTreeMap<String, String>,
    pub flags: BuildFlags,
}

/// Everything needed to run the build tool once for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    pub item: String,
    pub goals: Vec<String>,
    pub profiles: Vec<String>,
    pub properties: BTreeMap<String, String>,
    pub working_directory: PathBuf,
    pub local_repository: Option<PathBuf>,
    pub pom_file: Option<PathBuf>,
    pub flags: BuildFlags,
}

/// Build the request for `item`. Never fails.
pub fn build_request(template: &RequestTemplate, item: &str) -> InvocationRequest {
    let placeholder = template.placeholder.as_str();
    let substitute = |value: &String| replace_placeholder(value, placeholder, item);

    let working_directory = resolve_working_directory(
        template.working_directory.as_deref(),
        placeholder,
        item,
    )
    .unwrap_or_else(|| template.default_directory.clone());
    let pom_file = resolve_working_directory(template.pom_file.as_deref(), placeholder, item);

    InvocationRequest {
        item: item.to_string(),
        goals: template.goals.iter().map(substitute).collect(),
        profiles: template.profiles.iter().map(substitute).collect(),
        properties: template
            .properties
            .iter()
            .map(|(key, value)| (key.clone(), substitute(value)))
            .collect(),
        working_directory,
        local_repository: template.local_repository.clone(),
        pom_file,
        flags: template.flags,
    }
}

impl InvocationRequest {
    /// Build-tool arguments in a stable order: options, profiles, properties, goals.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(pom) = &self.pom_file {
            args.push("-f".to_string());
            args.push(pom.display().to_string());
        }
        if let Some(repo) = &self.local_repository {
            args.push(format!("-Dmaven.repo.local={}", repo.display()));
        }
        let switches = [
            (self.flags.offline, "-o"),
            (self.flags.batch_mode, "-B"),
            (self.flags.debug, "-X"),
            (self.flags.show_errors, "-e"),
            (self.flags.update_snapshots, "-U"),
            (self.flags.quiet, "-q"),
        ];
        args.extend(
            switches
                .iter()
                .filter(|(enabled, _)| *enabled)
                .map(|(_, flag)| flag.to_string()),
        );
        if !self.profiles.is_empty() {
            args.push("-P".to_string());
            args.push(self.profiles.join(","));
        }
        args.extend(
            self.properties
                .iter()
                .map(|(key, value)| format!("-D{key}={value}")),
        );
        args.extend(self.goals.iter().cloned());
        args
    }

    /// Human-readable command line, for logs and reports.
    pub fn command_line(&self, program: &str) -> String {
        std::iter::once(program.to_string())
            .chain(self.to_args())
            .map(|arg| quote_for_display(&arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_for_display(arg: &str) -> String {
    if arg.is_empty() || arg.chars().any(char::is_whitespace) {
        format!("'{}'", arg.replace('\'', r"'\''"))
    } else {
        arg.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::placeholder::DEFAULT_PLACEHOLDER;

    fn template() -> RequestTemplate {
        let mut properties = BTreeMap::new();
        properties.insert("revision".to_string(), "@item@".to_string());
        properties.insert("skipTests".to_string(), "true".to_string());
        RequestTemplate {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            working_directory: Some(PathBuf::from("/work/@item@")),
            default_directory: PathBuf::from("/work"),
            local_repository: Some(PathBuf::from("/cache/repo")),
            pom_file: None,
            goals: vec!["clean".to_string(), "install".to_string()],
            profiles: vec!["@item@".to_string()],
            properties,
            flags: BuildFlags {
                batch_mode: true,
                ..BuildFlags::default()
            },
        }
    }

    #[test]
    fn substitutes_item_into_request() {
        let request = build_request(&template(), "jdk17");
        assert_eq!(request.item, "jdk17");
        assert_eq!(request.working_directory, PathBuf::from("/work/jdk17"));
        assert_eq!(request.profiles, vec!["jdk17".to_string()]);
        assert_eq!(request.properties["revision"], "jdk17");
        assert_eq!(request.properties["skipTests"], "true");
        assert_eq!(request.local_repository, Some(PathBuf::from("/cache/repo")));
    }

    #[test]
    fn falls_back_to_default_directory() {
        let template = RequestTemplate {
            working_directory: None,
            ..template()
        };
        let request = build_request(&template, "a");
        assert_eq!(request.working_directory, PathBuf::from("/work"));
    }

    #[test]
    fn renders_args_in_stable_order() {
        let request = build_request(&template(), "v1");
        assert_eq!(
            request.to_args(),
            vec![
                "-Dmaven.repo.local=/cache/repo",
                "-B",
                "-P",
                "v1",
                "-Drevision=v1",
                "-DskipTests=true",
                "clean",
                "install",
            ]
        );
    }

    #[test]
    fn pom_file_comes_first_with_item_substituted() {
        let template = RequestTemplate {
            pom_file: Some(PathBuf::from("/work/poms/@item@.xml")),
            ..template()
        };
        let request = build_request(&template, "v3");
        assert_eq!(request.pom_file, Some(PathBuf::from("/work/poms/v3.xml")));
        let args = request.to_args();
        assert_eq!(
            args[..3],
            ["-f", "/work/poms/v3.xml", "-Dmaven.repo.local=/cache/repo"]
        );
    }

    #[test]
    fn minimal_template_still_builds_a_request() {
        let template = RequestTemplate {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            working_directory: None,
            default_directory: PathBuf::from("."),
            local_repository: None,
            pom_file: None,
            goals: Vec::new(),
            profiles: Vec::new(),
            properties: BTreeMap::new(),
            flags: BuildFlags::default(),
        };
        let request = build_request(&template, "x");
        assert!(request.to_args().is_empty());
        assert_eq!(request.command_line("mvn"), "mvn");
    }

    #[test]
    fn command_line_quotes_whitespace() {
        let mut template = template();
        template.goals = vec!["exec:java".to_string()];
        template
            .properties
            .insert("exec.args".to_string(), "--name @item@".to_string());
        let line = build_request(&template, "v2").command_line("mvn");
        assert!(line.starts_with("mvn -Dmaven.repo.local=/cache/repo -B -P v2"));
        assert!(line.contains("'-Dexec.args=--name v2'"));
        assert!(line.ends_with("exec:java"));
    }
}
