// PromptShelf — Language and project-type inference

use std::path::Path;

/// How many directories above the starting point are checked for markers.
const MAX_ANCESTORS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectType {
    Rust,
    Node,
    Python,
    Go,
    Java,
    DotNet,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Rust => "rust",
            ProjectType::Node => "node",
            ProjectType::Python => "python",
            ProjectType::Go => "go",
            ProjectType::Java => "java",
            ProjectType::DotNet => "dotnet",
        }
    }

    /// Words a prompt may use to say it targets this kind of project.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            ProjectType::Rust => &["rust", "cargo"],
            ProjectType::Node => &["node", "npm", "javascript", "typescript"],
            ProjectType::Python => &["python", "pip"],
            ProjectType::Go => &["golang", "go"],
            ProjectType::Java => &["java", "maven", "gradle"],
            ProjectType::DotNet => &["dotnet", ".net", "csharp"],
        }
    }

    /// Find a project marker in `start` or one of its ancestors.
    pub fn detect(start: &Path) -> Option<ProjectType> {
        for dir in start.ancestors().take(MAX_ANCESTORS) {
            if let Some(found) = Self::from_markers(dir) {
                return Some(found);
            }
        }
        None
    }

    fn from_markers(dir: &Path) -> Option<ProjectType> {
        let has = |name: &str| dir.join(name).is_file();
        if has("Cargo.toml") {
            return Some(ProjectType::Rust);
        }
        if has("package.json") {
            return Some(ProjectType::Node);
        }
        if has("pyproject.toml") || has("requirements.txt") || has("setup.py") {
            return Some(ProjectType::Python);
        }
        if has("go.mod") {
            return Some(ProjectType::Go);
        }
        if has("pom.xml") || has("build.gradle") || has("build.gradle.kts") {
            return Some(ProjectType::Java);
        }
        let csproj = std::fs::read_dir(dir).ok()?.filter_map(|e| e.ok()).any(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext == "csproj" || ext == "sln")
        });
        csproj.then_some(ProjectType::DotNet)
    }
}

/// Editor language id for a file name, `plaintext` when unknown.
pub fn language_from_path(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "rs" => "rust",
        "py" | "pyi" => "python",
        "js" | "mjs" | "cjs" | "jsx" => "javascript",
        "ts" | "tsx" | "mts" => "typescript",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "cs" => "csharp",
        "c" => "c",
        "cc" | "cpp" | "cxx" | "h" | "hpp" => "cpp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "sh" | "bash" | "zsh" => "shellscript",
        "sql" => "sql",
        "html" | "htm" => "html",
        "css" | "scss" => "css",
        "md" => "markdown",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        _ => "plaintext",
    }
}
