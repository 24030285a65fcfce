//! Shell command synthesis for staged source files
//
// The command is fixed when the container is created but the files are copied
// in afterwards, so the existence check has to live inside the script itself.

use super::registry::{RuntimeDescriptor, RuntimeFamily};

pub const SHELL: &str = "/bin/sh";

#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    work_dir: String,
    announce: bool,
}

impl CommandSynthesizer {
    pub fn new(work_dir: impl Into<String>) -> Self {
        let work_dir = work_dir.into();
        let trimmed = work_dir.trim_end_matches('/');
        Self {
            work_dir: if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() },
            announce: false,
        }
    }

    /// Print a confirmation line inside the container before running the file.
    pub fn with_announce(mut self, announce: bool) -> Self {
        self.announce = announce;
        self
    }

    fn in_work_dir(&self, name: &str) -> String {
        if self.work_dir == "/" {
            format!("/{}", name)
        } else {
            format!("{}/{}", self.work_dir, name)
        }
    }

    /// Build the script that runs `filename` for the given runtime.
    ///
    /// Returns an empty string when the runtime has no command template; the
    /// caller must treat that as a configuration error.
    pub fn build(&self, filename: &str, runtime: &RuntimeDescriptor) -> String {
        let source = self.in_work_dir(filename);
        let run = match &runtime.family {
            RuntimeFamily::Interpreted {
                program,
                extra_files,
            } => {
                let mut parts = vec![program.clone(), shell_quote(&source)];
                parts.extend(
                    extra_files
                        .iter()
                        .map(|extra| shell_quote(&self.in_work_dir(extra))),
                );
                parts.join(" ")
            }
            RuntimeFamily::Compiled { compiler } => {
                let binary = shell_quote(&self.in_work_dir(binary_name(filename, runtime)));
                format!("{} {} -o {} && {}", compiler, shell_quote(&source), binary, binary)
            }
            RuntimeFamily::Unknown => return String::new(),
        };

        let mut script = format!("if [ -f {} ]; then\n", shell_quote(&source));
        if self.announce {
            script.push_str("    echo '✓ File exists'\n");
        }
        script.push_str(&format!("    {}\n", run));
        script.push_str("else\n");
        script.push_str("    echo '✗ File not found!'\n");
        script.push_str(&format!("    ls -la {}\n", shell_quote(&self.work_dir)));
        script.push_str("    exit 1\n");
        script.push_str("fi\n");
        script
    }
}

/// Full container command line for a synthesized script.
pub fn shell_invocation(script: &str) -> Vec<String> {
    vec![SHELL.to_string(), "-c".to_string(), script.to_string()]
}

/// Output binary for compiled runtimes: the file name with its extension stripped.
fn binary_name<'a>(filename: &'a str, runtime: &RuntimeDescriptor) -> &'a str {
    let suffix = format!(".{}", runtime.extension);
    match filename.strip_suffix(suffix.as_str()) {
        Some(stem) if !runtime.extension.is_empty() && !stem.is_empty() => stem,
        _ => filename.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(filename),
    }
}

fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | '+'));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
