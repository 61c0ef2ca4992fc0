use std::fmt;
use std::path::Path;

use roxmltree::{Document, Node};
use serde::Serialize;

use crate::error::ManifestError;
use crate::package::VersionRange;

/// Schema namespaces used by nuspec descriptors in the wild.
///
/// Elements are matched by local name, so descriptors under any of these
/// (or an unknown one) parse the same way.
pub const NUSPEC_NAMESPACES: &[&str] = &[
    "http://schemas.microsoft.com/packaging/2010/07/nuspec.xsd",
    "http://schemas.microsoft.com/packaging/2011/08/nuspec.xsd",
    "http://schemas.microsoft.com/packaging/2012/06/nuspec.xsd",
    "http://schemas.microsoft.com/packaging/2013/01/nuspec.xsd",
    "http://schemas.microsoft.com/packaging/2013/05/nuspec.xsd",
];

/// A dependency declared in a package descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyDescriptor {
    pub id: String,
    /// Raw version constraint as written in the descriptor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Target framework of the enclosing group, `None` for a flat list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_framework: Option<String>,
}

impl DependencyDescriptor {
    /// Human-readable constraint: `any` when unconstrained.
    pub fn version_display(&self) -> String {
        match self.version.as_deref() {
            None => "any".to_string(),
            Some(raw) => VersionRange::parse(raw)
                .map(|range| range.to_string())
                .unwrap_or_else(|| raw.to_string()),
        }
    }
}

impl fmt::Display for DependencyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Version: {})", self.id, self.version_display())
    }
}

/// The parts of a nuspec this tool cares about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Nuspec {
    pub id: Option<String>,
    pub version: Option<String>,
    pub dependencies: Vec<DependencyDescriptor>,
}

/// Parse nuspec XML. `path` is only used in error messages.
pub fn parse_nuspec(xml: &str, path: &Path) -> Result<Nuspec, ManifestError> {
    let xml = xml.trim_start_matches('\u{feff}');
    let doc = Document::parse(xml).map_err(|source| ManifestError::Xml {
        path: path.to_path_buf(),
        source,
    })?;

    let root = doc.root_element();
    if let Some(ns) = root.tag_name().namespace() {
        if !NUSPEC_NAMESPACES.contains(&ns) {
            log::debug!("Unrecognized nuspec namespace {} in {}", ns, path.display());
        }
    }

    let metadata = child(root, "metadata")
        .ok_or_else(|| ManifestError::MissingMetadata { path: path.to_path_buf() })?;

    let mut nuspec = Nuspec {
        id: child_text(metadata, "id"),
        version: child_text(metadata, "version"),
        dependencies: Vec::new(),
    };

    let Some(dependencies) = child(metadata, "dependencies") else {
        return Ok(nuspec);
    };

    for node in dependencies.children().filter(Node::is_element) {
        match node.tag_name().name() {
            "dependency" => {
                nuspec.dependencies.extend(descriptor(node, None));
            }
            "group" => {
                let framework = node.attribute("targetFramework").map(str::to_string);
                for dep in node.children().filter(|n| is_named(*n, "dependency")) {
                    nuspec.dependencies.extend(descriptor(dep, framework.clone()));
                }
            }
            other => log::trace!("Ignoring <{}> in dependencies of {}", other, path.display()),
        }
    }

    Ok(nuspec)
}

fn descriptor(node: Node, target_framework: Option<String>) -> Option<DependencyDescriptor> {
    let id = node.attribute("id")?.trim();
    if id.is_empty() {
        return None;
    }
    Some(DependencyDescriptor {
        id: id.to_string(),
        version: node
            .attribute("version")
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string),
        target_framework,
    })
}

fn is_named(node: Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| is_named(*n, name))
}

fn child_text(node: Node, name: &str) -> Option<String> {
    child(node, name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
