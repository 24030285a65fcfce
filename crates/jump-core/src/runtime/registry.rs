//! Static table mapping source-file extensions to runtime images

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a runtime turns a staged source file into a running program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuntimeFamily {
    /// The program runs the source file directly. `extra_files` are staged
    /// companions appended to the invocation, relative to the work dir.
    Interpreted {
        program: String,
        #[serde(default)]
        extra_files: Vec<String>,
    },
    /// The source is compiled to a binary named after the file stem, then run.
    Compiled { compiler: String },
    /// No command template; only produced by an empty descriptor.
    #[serde(skip)]
    Unknown,
}

impl RuntimeFamily {
    pub fn interpreted(program: &str) -> Self {
        RuntimeFamily::Interpreted {
            program: program.to_string(),
            extra_files: Vec::new(),
        }
    }

    pub fn compiled(compiler: &str) -> Self {
        RuntimeFamily::Compiled {
            compiler: compiler.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeDescriptor {
    pub name: String,
    pub image: String,
    pub extension: String,
    pub family: RuntimeFamily,
}

impl RuntimeDescriptor {
    pub fn new(name: &str, image: &str, extension: &str, family: RuntimeFamily) -> Self {
        Self {
            name: name.to_string(),
            image: image.to_string(),
            extension: extension.to_string(),
            family,
        }
    }

    /// Descriptor returned for extensions the registry does not know.
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            image: String::new(),
            extension: String::new(),
            family: RuntimeFamily::Unknown,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeRegistry {
    entries: BTreeMap<String, RuntimeDescriptor>,
}

impl Default for RuntimeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuntimeRegistry {
    /// Registry with the languages the harness ships with.
    pub fn builtin() -> Self {
        let node = RuntimeDescriptor::new(
            "javascript",
            "node:alpine",
            "js",
            RuntimeFamily::interpreted("node"),
        );

        let entries = [
            RuntimeDescriptor::new("cpp", "gcc:trixie", "cpp", RuntimeFamily::compiled("g++")),
            RuntimeDescriptor::new(
                "golang",
                "golang:alpine",
                "go",
                RuntimeFamily::Interpreted {
                    program: "go run".to_string(),
                    extra_files: vec!["test_runner.go".to_string()],
                },
            ),
            RuntimeDescriptor::new(
                "java",
                "openjdk:26-trixie",
                "java",
                RuntimeFamily::interpreted("java"),
            ),
            node.clone(),
            RuntimeDescriptor::new(
                "python",
                "python:alpine",
                "py",
                RuntimeFamily::interpreted("python3"),
            ),
            RuntimeDescriptor::new("rust", "rust:alpine", "rs", RuntimeFamily::compiled("rustc")),
        ];

        let mut entries: BTreeMap<String, RuntimeDescriptor> = entries
            .into_iter()
            .map(|descriptor| (descriptor.extension.clone(), descriptor))
            .collect();
        // Alias kept so `node` resolves to the same runtime as `js`.
        entries.insert("node".to_string(), node);

        Self { entries }
    }

    /// Add or replace the descriptor for an extension.
    pub fn insert(&mut self, key: &str, descriptor: RuntimeDescriptor) {
        self.entries.insert(key.to_ascii_lowercase(), descriptor);
    }

    pub fn get(&self, extension: &str) -> Option<&RuntimeDescriptor> {
        let key = extension.trim_start_matches('.').to_ascii_lowercase();
        self.entries.get(&key)
    }

    /// Look up a descriptor, yielding the empty descriptor when unmapped.
    pub fn lookup(&self, extension: &str) -> RuntimeDescriptor {
        self.get(extension)
            .cloned()
            .unwrap_or_else(RuntimeDescriptor::empty)
    }

    /// Distinct runtimes, one per language name.
    pub fn languages(&self) -> Vec<&RuntimeDescriptor> {
        let mut seen = std::collections::BTreeSet::new();
        self.entries
            .values()
            .filter(|descriptor| seen.insert(descriptor.name.as_str()))
            .collect()
    }
}
