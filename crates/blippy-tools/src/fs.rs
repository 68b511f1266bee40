//! Per-root filesystem tools with path-safety enforcement.
//!
//! The four tools (`fs_view`, `fs_create`, `fs_str_replace`, `fs_insert`)
//! are synthesized per turn from the roots an agent is granted. Every
//! invocation resolves its path inside the root: absolute paths and
//! `..`-leading normalized paths are rejected, and both target and root go
//! through symlink resolution before the containment check.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::{Result, ToolError};
use crate::traits::{AgentTool, FilesystemRoot, ToolContext};

/// Maximum file size `fs_view` will return.
const MAX_VIEW_SIZE: u64 = 500 * 1024;

/// The fs tool names an agent root config may enable.
pub const FS_TOOL_NAMES: &[&str] = &["fs_view", "fs_create", "fs_str_replace", "fs_insert"];

/// Build the fs tool with the given name over the given roots.
///
/// Returns `None` for names outside [`FS_TOOL_NAMES`].
#[must_use]
pub fn build_fs_tool(name: &str, roots: Vec<FilesystemRoot>) -> Option<Box<dyn AgentTool>> {
    match name {
        "fs_view" => Some(Box::new(FsViewTool { roots })),
        "fs_create" => Some(Box::new(FsCreateTool { roots })),
        "fs_str_replace" => Some(Box::new(FsStrReplaceTool { roots })),
        "fs_insert" => Some(Box::new(FsInsertTool { roots })),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Path safety
// ─────────────────────────────────────────────────────────────────────────────

/// Lexically normalize a relative path, rejecting absolute paths and any
/// path whose normalized form climbs out of the root.
fn clean_relative(path: &str) -> Result<PathBuf> {
    let p = Path::new(path);
    if p.is_absolute() {
        return Err(ToolError::failed("absolute paths are not allowed"));
    }

    let mut cleaned = PathBuf::new();
    for component in p.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => cleaned.push(part),
            Component::ParentDir => {
                // A ".." that cannot be cancelled lexically escapes the root.
                if !cleaned.pop() {
                    return Err(ToolError::failed("path traversal is not allowed"));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ToolError::failed("absolute paths are not allowed"));
            }
        }
    }
    Ok(cleaned)
}

/// Resolve `relative` inside `root`, requiring the symlink-resolved target
/// to be the resolved root or a descendant of it.
async fn resolve_path(root: &str, relative: &str) -> Result<PathBuf> {
    let cleaned = clean_relative(relative)?;

    let joined = Path::new(root).join(&cleaned);
    let resolved = tokio::fs::canonicalize(&joined)
        .await
        .map_err(|e| ToolError::failed(format!("resolve path: {e}")))?;
    let abs_root = tokio::fs::canonicalize(root)
        .await
        .map_err(|e| ToolError::failed(format!("resolve root: {e}")))?;

    if !resolved.starts_with(&abs_root) {
        return Err(ToolError::failed("path escapes root directory"));
    }
    Ok(resolved)
}

/// Resolve a path for file creation. The file itself may not exist, so the
/// nearest existing ancestor is resolved and validated instead; this lets
/// `fs_create` make intermediate directories.
async fn resolve_path_for_create(root: &str, relative: &str) -> Result<PathBuf> {
    let cleaned = clean_relative(relative)?;

    let abs_root = tokio::fs::canonicalize(root)
        .await
        .map_err(|e| ToolError::failed(format!("resolve root: {e}")))?;

    let target = abs_root.join(&cleaned);
    let mut ancestor = target.parent().unwrap_or(&abs_root).to_path_buf();
    while ancestor != abs_root && tokio::fs::metadata(&ancestor).await.is_err() {
        match ancestor.parent() {
            Some(parent) => ancestor = parent.to_path_buf(),
            None => break,
        }
    }

    let resolved_ancestor = tokio::fs::canonicalize(&ancestor)
        .await
        .map_err(|e| ToolError::failed(format!("resolve ancestor: {e}")))?;
    if !resolved_ancestor.starts_with(&abs_root) {
        return Err(ToolError::failed("path escapes root directory"));
    }

    Ok(target)
}

fn find_root<'a>(roots: &'a [FilesystemRoot], name: &str) -> Result<&'a FilesystemRoot> {
    roots
        .iter()
        .find(|r| r.name == name)
        .ok_or_else(|| ToolError::failed(format!("filesystem root {name:?} not found")))
}

fn root_enum(roots: &[FilesystemRoot]) -> Vec<&str> {
    roots.iter().map(|r| r.name.as_str()).collect()
}

fn root_descriptions(roots: &[FilesystemRoot]) -> String {
    let parts: Vec<String> = roots
        .iter()
        .map(|r| {
            if r.description.is_empty() {
                r.name.clone()
            } else {
                format!("{}: {}", r.name, r.description)
            }
        })
        .collect();
    parts.join("; ")
}

// ─────────────────────────────────────────────────────────────────────────────
// fs_view
// ─────────────────────────────────────────────────────────────────────────────

struct FsViewTool {
    roots: Vec<FilesystemRoot>,
}

#[derive(Deserialize)]
struct ViewArgs {
    root: String,
    path: String,
    #[serde(default)]
    view_range: Option<Vec<i64>>,
}

#[async_trait]
impl AgentTool for FsViewTool {
    fn name(&self) -> &str {
        "fs_view"
    }

    fn description(&self) -> String {
        format!(
            "View file contents or list directory entries. Available roots: {}",
            root_descriptions(&self.roots)
        )
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "root": {"type": "string", "enum": root_enum(&self.roots), "description": "Filesystem root name"},
                "path": {"type": "string", "description": "Relative path within the root"},
                "view_range": {
                    "type": "array",
                    "items": {"type": "integer"},
                    "minItems": 2,
                    "maxItems": 2,
                    "description": "Optional [start_line, end_line] range (1-indexed)"
                }
            },
            "required": ["root", "path"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let args: ViewArgs = serde_json::from_value(args)?;
        let root = find_root(&self.roots, &args.root)?;
        let resolved = resolve_path(&root.path, &args.path).await?;

        let meta = tokio::fs::metadata(&resolved)
            .await
            .map_err(|e| ToolError::failed(format!("stat: {e}")))?;

        if meta.is_dir() {
            let mut entries = Vec::new();
            let mut dir = tokio::fs::read_dir(&resolved)
                .await
                .map_err(|e| ToolError::failed(format!("read dir: {e}")))?;
            while let Some(entry) = dir
                .next_entry()
                .await
                .map_err(|e| ToolError::failed(format!("read dir: {e}")))?
            {
                let mut name = entry.file_name().to_string_lossy().into_owned();
                if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                    name.push('/');
                }
                entries.push(name);
            }
            entries.sort();
            return Ok(entries.join("\n"));
        }

        if meta.len() > MAX_VIEW_SIZE {
            return Err(ToolError::failed(format!(
                "file too large ({} bytes, max {MAX_VIEW_SIZE})",
                meta.len()
            )));
        }

        let data = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| ToolError::failed(format!("read file: {e}")))?;
        let lines: Vec<&str> = data.split('\n').collect();

        let (start, end) = match args.view_range.as_deref() {
            Some([start, end]) => {
                let start = (*start).max(1) as usize;
                let end = (*end).min(lines.len() as i64).max(0) as usize;
                if start > lines.len() {
                    return Err(ToolError::failed(format!(
                        "start line {start} exceeds file length {}",
                        lines.len()
                    )));
                }
                // An inverted range yields an empty slice, not a panic.
                (start, end.max(start - 1))
            }
            _ => (1, lines.len()),
        };

        let numbered: Vec<String> = lines[start - 1..end]
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{:6}\t{line}", start + i))
            .collect();
        Ok(numbered.join("\n"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// fs_create
// ─────────────────────────────────────────────────────────────────────────────

struct FsCreateTool {
    roots: Vec<FilesystemRoot>,
}

#[derive(Deserialize)]
struct CreateArgs {
    root: String,
    path: String,
    file_text: String,
}

#[async_trait]
impl AgentTool for FsCreateTool {
    fn name(&self) -> &str {
        "fs_create"
    }

    fn description(&self) -> String {
        format!(
            "Create a new file. Fails if the file already exists. Available roots: {}",
            root_descriptions(&self.roots)
        )
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "root": {"type": "string", "enum": root_enum(&self.roots), "description": "Filesystem root name"},
                "path": {"type": "string", "description": "Relative path for the new file"},
                "file_text": {"type": "string", "description": "Content of the new file"}
            },
            "required": ["root", "path", "file_text"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let args: CreateArgs = serde_json::from_value(args)?;
        let root = find_root(&self.roots, &args.root)?;
        let resolved = resolve_path_for_create(&root.path, &args.path).await?;

        if tokio::fs::metadata(&resolved).await.is_ok() {
            return Err(ToolError::failed(format!("file already exists: {}", args.path)));
        }

        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::failed(format!("create directories: {e}")))?;
        }
        tokio::fs::write(&resolved, args.file_text.as_bytes())
            .await
            .map_err(|e| ToolError::failed(format!("write file: {e}")))?;

        Ok("File created successfully.".into())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// fs_str_replace
// ─────────────────────────────────────────────────────────────────────────────

struct FsStrReplaceTool {
    roots: Vec<FilesystemRoot>,
}

#[derive(Deserialize)]
struct StrReplaceArgs {
    root: String,
    path: String,
    old_str: String,
    new_str: String,
}

#[async_trait]
impl AgentTool for FsStrReplaceTool {
    fn name(&self) -> &str {
        "fs_str_replace"
    }

    fn description(&self) -> String {
        format!(
            "Replace an exact string occurrence in a file. The old_str must appear exactly once. Available roots: {}",
            root_descriptions(&self.roots)
        )
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "root": {"type": "string", "enum": root_enum(&self.roots), "description": "Filesystem root name"},
                "path": {"type": "string", "description": "Relative path within the root"},
                "old_str": {"type": "string", "description": "Exact string to find (must match exactly once)"},
                "new_str": {"type": "string", "description": "Replacement string"}
            },
            "required": ["root", "path", "old_str", "new_str"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let args: StrReplaceArgs = serde_json::from_value(args)?;
        let root = find_root(&self.roots, &args.root)?;
        let resolved = resolve_path(&root.path, &args.path).await?;

        let content = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| ToolError::failed(format!("read file: {e}")))?;

        let count = content.matches(&args.old_str).count();
        if count == 0 {
            return Err(ToolError::failed("old_str not found in file"));
        }
        if count > 1 {
            return Err(ToolError::failed(format!("old_str appears {count} times, must be unique")));
        }

        let updated = content.replacen(&args.old_str, &args.new_str, 1);
        tokio::fs::write(&resolved, updated.as_bytes())
            .await
            .map_err(|e| ToolError::failed(format!("write file: {e}")))?;

        Ok("File updated successfully.".into())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// fs_insert
// ─────────────────────────────────────────────────────────────────────────────

struct FsInsertTool {
    roots: Vec<FilesystemRoot>,
}

#[derive(Deserialize)]
struct InsertArgs {
    root: String,
    path: String,
    insert_line: i64,
    new_str: String,
}

#[async_trait]
impl AgentTool for FsInsertTool {
    fn name(&self) -> &str {
        "fs_insert"
    }

    fn description(&self) -> String {
        format!(
            "Insert text after a specific line in a file. Use insert_line=0 to insert at the beginning. Available roots: {}",
            root_descriptions(&self.roots)
        )
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "root": {"type": "string", "enum": root_enum(&self.roots), "description": "Filesystem root name"},
                "path": {"type": "string", "description": "Relative path within the root"},
                "insert_line": {"type": "integer", "description": "Line number to insert after (0 = beginning of file)"},
                "new_str": {"type": "string", "description": "Text to insert"}
            },
            "required": ["root", "path", "insert_line", "new_str"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let args: InsertArgs = serde_json::from_value(args)?;
        let root = find_root(&self.roots, &args.root)?;
        let resolved = resolve_path(&root.path, &args.path).await?;

        let content = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| ToolError::failed(format!("read file: {e}")))?;
        let lines: Vec<&str> = content.split('\n').collect();

        if args.insert_line < 0 || args.insert_line as usize > lines.len() {
            return Err(ToolError::failed(format!(
                "insert_line {} out of range (0..{})",
                args.insert_line,
                lines.len()
            )));
        }
        let at = args.insert_line as usize;

        let mut result: Vec<&str> = Vec::with_capacity(lines.len() + 1);
        result.extend_from_slice(&lines[..at]);
        result.extend(args.new_str.split('\n'));
        result.extend_from_slice(&lines[at..]);

        tokio::fs::write(&resolved, result.join("\n").as_bytes())
            .await
            .map_err(|e| ToolError::failed(format!("write file: {e}")))?;

        Ok("Text inserted successfully.".into())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn root_for(dir: &tempfile::TempDir) -> FilesystemRoot {
        FilesystemRoot {
            id: "r1".into(),
            name: "proj".into(),
            path: dir.path().to_string_lossy().into_owned(),
            description: "Project files".into(),
        }
    }

    #[tokio::test]
    async fn view_numbers_lines() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha\nbeta").unwrap();
        let tool = build_fs_tool("fs_view", vec![root_for(&dir)]).unwrap();

        let out = tool
            .execute(serde_json::json!({"root": "proj", "path": "a.txt"}), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(out, "     1\talpha\n     2\tbeta");
    }

    #[tokio::test]
    async fn view_range_is_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "l1\nl2\nl3\nl4").unwrap();
        let tool = build_fs_tool("fs_view", vec![root_for(&dir)]).unwrap();

        let out = tool
            .execute(
                serde_json::json!({"root": "proj", "path": "a.txt", "view_range": [2, 3]}),
                &ToolContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(out, "     2\tl2\n     3\tl3");
    }

    #[tokio::test]
    async fn view_range_start_out_of_bounds() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "only").unwrap();
        let tool = build_fs_tool("fs_view", vec![root_for(&dir)]).unwrap();

        let err = tool
            .execute(
                serde_json::json!({"root": "proj", "path": "a.txt", "view_range": [5, 9]}),
                &ToolContext::default(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exceeds file length"));
    }

    #[tokio::test]
    async fn view_lists_directories_with_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("file.txt"), "x").unwrap();
        let tool = build_fs_tool("fs_view", vec![root_for(&dir)]).unwrap();

        let out = tool
            .execute(serde_json::json!({"root": "proj", "path": "."}), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(out, "file.txt\nsub/");
    }

    #[tokio::test]
    async fn view_refuses_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.txt"), vec![b'x'; (MAX_VIEW_SIZE + 1) as usize])
            .unwrap();
        let tool = build_fs_tool("fs_view", vec![root_for(&dir)]).unwrap();

        let err = tool
            .execute(serde_json::json!({"root": "proj", "path": "big.txt"}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("file too large"));
    }

    #[tokio::test]
    async fn create_writes_and_makes_parents() {
        let dir = tempfile::tempdir().unwrap();
        let tool = build_fs_tool("fs_create", vec![root_for(&dir)]).unwrap();

        let out = tool
            .execute(
                serde_json::json!({"root": "proj", "path": "nested/dir/new.txt", "file_text": "hello"}),
                &ToolContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(out, "File created successfully.");
        let content = std::fs::read_to_string(dir.path().join("nested/dir/new.txt")).unwrap();
        assert_eq!(content, "hello");
    }

    #[tokio::test]
    async fn create_fails_if_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        let tool = build_fs_tool("fs_create", vec![root_for(&dir)]).unwrap();

        let err = tool
            .execute(
                serde_json::json!({"root": "proj", "path": "a.txt", "file_text": "y"}),
                &ToolContext::default(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn create_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let tool = build_fs_tool("fs_create", vec![root_for(&dir)]).unwrap();

        let err = tool
            .execute(
                serde_json::json!({"root": "proj", "path": "../../etc/evil", "file_text": "x"}),
                &ToolContext::default(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("traversal"));
        assert!(!dir.path().parent().unwrap().join("etc/evil").exists());
    }

    #[tokio::test]
    async fn create_rejects_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let tool = build_fs_tool("fs_create", vec![root_for(&dir)]).unwrap();

        let err = tool
            .execute(
                serde_json::json!({"root": "proj", "path": "/etc/evil", "file_text": "x"}),
                &ToolContext::default(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[tokio::test]
    async fn interior_dotdot_that_stays_inside_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.txt"), "top").unwrap();
        let tool = build_fs_tool("fs_view", vec![root_for(&dir)]).unwrap();

        let out = tool
            .execute(
                serde_json::json!({"root": "proj", "path": "sub/../a.txt"}),
                &ToolContext::default(),
            )
            .await
            .unwrap();
        assert!(out.contains("top"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_escape_is_rejected() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "secret").unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret.txt"), dir.path().join("link"))
            .unwrap();
        let tool = build_fs_tool("fs_view", vec![root_for(&dir)]).unwrap();

        let err = tool
            .execute(serde_json::json!({"root": "proj", "path": "link"}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("escapes root"));
    }

    #[tokio::test]
    async fn str_replace_requires_unique_match() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x x").unwrap();
        let tool = build_fs_tool("fs_str_replace", vec![root_for(&dir)]).unwrap();

        let err = tool
            .execute(
                serde_json::json!({"root": "proj", "path": "a.txt", "old_str": "x", "new_str": "y"}),
                &ToolContext::default(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("2 times"));
    }

    #[tokio::test]
    async fn str_replace_replaces_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello world").unwrap();
        let tool = build_fs_tool("fs_str_replace", vec![root_for(&dir)]).unwrap();

        let out = tool
            .execute(
                serde_json::json!({"root": "proj", "path": "a.txt", "old_str": "world", "new_str": "blippy"}),
                &ToolContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(out, "File updated successfully.");
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "hello blippy");
    }

    #[tokio::test]
    async fn insert_at_top_and_past_end() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "b\nc").unwrap();
        let tool = build_fs_tool("fs_insert", vec![root_for(&dir)]).unwrap();

        let _ = tool
            .execute(
                serde_json::json!({"root": "proj", "path": "a.txt", "insert_line": 0, "new_str": "a"}),
                &ToolContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "a\nb\nc");

        let err = tool
            .execute(
                serde_json::json!({"root": "proj", "path": "a.txt", "insert_line": 99, "new_str": "z"}),
                &ToolContext::default(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[tokio::test]
    async fn unknown_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = build_fs_tool("fs_view", vec![root_for(&dir)]).unwrap();

        let err = tool
            .execute(serde_json::json!({"root": "other", "path": "a"}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn schema_advertises_root_enum() {
        let dir = tempfile::tempdir().unwrap();
        let tool = build_fs_tool("fs_create", vec![root_for(&dir)]).unwrap();
        let schema = tool.parameters();
        assert_eq!(schema["properties"]["root"]["enum"], serde_json::json!(["proj"]));
    }

    #[test]
    fn build_unknown_fs_tool_is_none() {
        assert!(build_fs_tool("fs_delete", Vec::new()).is_none());
    }
}
