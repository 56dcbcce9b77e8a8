#![allow(dead_code)]

use declgraph::frontend::{NodeKind, SourceNode};
use declgraph::{
    BuildOutput, CppFrontend, Declaration, ReflectionDatabase, ReflectionPipeline, Settings,
    SourceLocation, TranslationUnit, TypeDescriptor,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub struct TestProject {
    pub dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn add_file(&self, path: &str, content: &str) -> PathBuf {
        let file_path = self.dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&file_path, content).expect("Failed to write file");
        file_path
    }

    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }
}

/// Single-threaded settings so diagnostics come back in a stable order.
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.build.parallel_threads = 1;
    settings
}

pub fn parse(name: &str, code: &str) -> TranslationUnit {
    let mut frontend = CppFrontend::new().expect("Failed to create C++ front-end");
    frontend
        .parse_unit(name, code)
        .expect("Failed to parse translation unit")
}

/// Parse `code` as one unit and run the full pipeline over it.
pub fn reflect(code: &str) -> BuildOutput {
    reflect_units(&[("unit.cpp", code)])
}

pub fn reflect_units(sources: &[(&str, &str)]) -> BuildOutput {
    reflect_with(test_settings(), sources)
}

pub fn reflect_with(settings: Settings, sources: &[(&str, &str)]) -> BuildOutput {
    let units = sources
        .iter()
        .map(|(name, code)| parse(name, code))
        .collect();
    ReflectionPipeline::new(Arc::new(settings))
        .run(units)
        .expect("Reflection build failed")
}

pub fn reflect_nodes(nodes: Vec<SourceNode>) -> BuildOutput {
    ReflectionPipeline::new(Arc::new(test_settings()))
        .run(vec![TranslationUnit::new("unit.cpp", nodes)])
        .expect("Reflection build failed")
}

pub fn find<'a>(db: &'a ReflectionDatabase, name: &str) -> &'a Declaration {
    db.find_declaration(name)
        .unwrap_or_else(|| panic!("Declaration '{name}' not found"))
}

pub fn member_names(db: &ReflectionDatabase, aggregate: &str) -> Vec<String> {
    db.list_members(find(db, aggregate))
        .expect("Not an aggregate")
        .iter()
        .map(|member| member.segment().to_string())
        .collect()
}

pub fn node(kind: NodeKind, name: &str, line: u32) -> SourceNode {
    let name = if name.is_empty() { None } else { Some(name) };
    SourceNode::new(kind, name, SourceLocation::new("unit.cpp", line, 1))
}

pub fn field(name: &str, ty: &str, line: u32) -> SourceNode {
    let mut field = node(NodeKind::Field, name, line);
    field.ty = Some(TypeDescriptor::named(ty));
    field
}
