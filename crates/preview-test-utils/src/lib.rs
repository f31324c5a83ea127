//! Testing utilities for the react-preview workspace
//!
//! Temporary React project fixtures.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Entry file content that every session must restore
pub const ORIGINAL_ENTRY: &str = "import React from 'react';\nimport App from './App';\n// original entry\n";

pub fn component_source(name: &str) -> String {
    format!("export default function {name}(props) {{\n  return <div>{{props.label}}</div>;\n}}\n")
}

/// Throwaway project directory laid out like a create-react-app project
#[derive(Debug)]
pub struct ReactProject {
    dir: TempDir,
}

impl Default for ReactProject {
    fn default() -> Self {
        Self::new()
    }
}

impl ReactProject {
    /// JavaScript project with an empty `src/`
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("package.json"), "{\"name\": \"fixture\"}\n").unwrap();
        Self { dir }
    }

    /// TypeScript project: `tsconfig.json` at the root
    pub fn typescript() -> Self {
        let project = Self::new();
        project.write("tsconfig.json", "{}\n");
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn src(&self) -> PathBuf {
        self.root().join("src")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root().join("preview")
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    /// Component file exporting a component called `name`
    pub fn with_component(self, relative: &str, name: &str) -> Self {
        self.write(relative, &component_source(name));
        self
    }

    pub fn with_config(self, relative: &str, yaml: &str) -> Self {
        self.write(relative, yaml);
        self
    }

    /// `src/<file>` holding [`ORIGINAL_ENTRY`]
    pub fn with_entry(self, file: &str) -> Self {
        self.write(&format!("src/{file}"), ORIGINAL_ENTRY);
        self
    }

    /// Card component with a matching `preview.yaml` under `src/components`
    pub fn with_card(self) -> Self {
        self.with_component("src/components/Card.tsx", "Card").with_config(
            "src/components/preview.yaml",
            "source: Card.tsx\nprops:\n  label: {kind: string, value: Hi}\n",
        )
    }
}
