// PromptShelf — Use-prompt flow and output sinks
//
// find -> resolve variables -> substitute -> deliver -> record usage.
// Preferences are only written after delivery succeeded.

use crate::config::OutputConfig;
use crate::context::EditorContext;
use crate::error::{Result, ShelfError};
use crate::preferences::PreferencesStore;
use crate::store::PromptStore;
use crate::variables::{resolve_all, substitute, VariableInput};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Clipboard programs tried in order when none is configured.
const CLIPBOARD_CANDIDATES: &[(&str, &[&str])] = &[
    ("pbcopy", &[]),
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("clip.exe", &[]),
    ("clip", &[]),
];

/// Destination for a processed prompt.
#[async_trait]
pub trait OutputSink: Send + Sync {
    fn name(&self) -> &str;
    async fn deliver(&self, text: &str) -> anyhow::Result<()>;
}

/// Writes the prompt to standard output.
pub struct StdoutSink;

#[async_trait]
impl OutputSink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn deliver(&self, text: &str) -> anyhow::Result<()> {
        let mut out = tokio::io::stdout();
        out.write_all(text.as_bytes()).await?;
        if !text.ends_with('\n') {
            out.write_all(b"\n").await?;
        }
        out.flush().await?;
        Ok(())
    }
}

/// Pipes the prompt into an external program's stdin.
#[derive(Debug, Clone)]
pub struct CommandSink {
    name: String,
    program: String,
    args: Vec<String>,
}

impl CommandSink {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
        }
    }

    /// Split a whitespace-separated command line such as `xclip -selection clipboard`.
    pub fn from_command_line(name: &str, line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| ShelfError::InvalidInput(format!("command for '{}' is empty", name)))?;
        Ok(Self::new(name, program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl OutputSink for CommandSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, text: &str) -> anyhow::Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| anyhow::anyhow!("failed to start '{}': {}", self.program, e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow::anyhow!("failed to open stdin of '{}'", self.program))?;
        stdin.write_all(text.as_bytes()).await?;
        // closing stdin lets the program finish
        drop(stdin);

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            anyhow::bail!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        tracing::debug!(sink = %self.name, program = %self.program, "Prompt delivered");
        Ok(())
    }
}

fn find_on_path(program: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

/// The configured clipboard command, or the first known one found on `PATH`.
pub fn clipboard_sink(cfg: &OutputConfig) -> Result<CommandSink> {
    if !cfg.clipboard_command.trim().is_empty() {
        return CommandSink::from_command_line("clipboard", &cfg.clipboard_command);
    }
    CLIPBOARD_CANDIDATES
        .iter()
        .find(|(program, _)| find_on_path(program).is_some())
        .map(|(program, args)| {
            CommandSink::new(
                "clipboard",
                *program,
                args.iter().map(|a| a.to_string()).collect(),
            )
        })
        .ok_or_else(|| {
            ShelfError::Other(
                "no clipboard program found, set output.clipboard_command in the config".into(),
            )
        })
}

/// A named chat command from the config.
pub fn chat_sink(cfg: &OutputConfig, name: &str) -> Result<CommandSink> {
    let line = cfg.chat_commands.get(name).ok_or_else(|| {
        ShelfError::InvalidInput(format!(
            "unknown chat command '{}' (configured: {})",
            name,
            cfg.chat_commands
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })?;
    CommandSink::from_command_line(name, line)
}

/// Everything needed to turn a stored prompt into delivered text.
pub struct UseRequest<'a> {
    pub id: &'a str,
    pub context: Option<&'a EditorContext>,
    pub presets: &'a HashMap<String, String>,
}

/// Run the full use-prompt flow. Returns the delivered text.
///
/// Cancellation during variable input or a failed delivery leaves the
/// preferences untouched.
pub async fn use_prompt(
    store: &PromptStore,
    request: UseRequest<'_>,
    input: &mut dyn VariableInput,
    sink: &dyn OutputSink,
    prefs: &dyn PreferencesStore,
) -> Result<String> {
    let prompt = store
        .prompt(request.id)
        .ok_or_else(|| ShelfError::NotFound(request.id.to_string()))?;

    let values = resolve_all(&prompt.body, request.context, request.presets, input)?;
    let text = substitute(&prompt.body, &values);

    sink.deliver(&text)
        .await
        .map_err(|e| ShelfError::Other(format!("delivery to {} failed: {}", sink.name(), e)))?;

    let mut current = prefs
        .load()
        .map_err(|e| ShelfError::Other(format!("failed to load preferences: {}", e)))?;
    current.record_use(&prompt.id);
    prefs
        .save(&current)
        .map_err(|e| ShelfError::Other(format!("failed to save preferences: {}", e)))?;

    tracing::info!(id = %prompt.id, sink = sink.name(), variables = values.len(), "Prompt used");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::{MemoryPreferencesStore, Preferences};
    use crate::prompt::{CategoryKind, CategoryRecord, GroupRecord, Prompt, PromptDocument};
    use crate::store::StorePaths;
    use crate::variables::ScriptedInput;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl OutputSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn deliver(&self, text: &str) -> anyhow::Result<()> {
            self.delivered.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct BrokenSink;

    #[async_trait]
    impl OutputSink for BrokenSink {
        fn name(&self) -> &str {
            "broken"
        }

        async fn deliver(&self, _text: &str) -> anyhow::Result<()> {
            anyhow::bail!("pipe closed")
        }
    }

    async fn store(tmp: &TempDir) -> PromptStore {
        let system = tmp.path().join("system.json");
        PromptDocument::new(vec![CategoryRecord {
            id: "1".into(),
            label: "Docs".into(),
            kind: CategoryKind::System,
            groups: vec![GroupRecord {
                id: "2".into(),
                label: "Explain".into(),
                prompts: vec![Prompt::new(
                    "3",
                    "Explain for audience",
                    "Explain {{function}} to {{audience}} at {{level}} level",
                    ["docs"],
                )],
            }],
        }])
        .write(&system)
        .await
        .unwrap();

        PromptStore::open(
            StorePaths {
                system,
                user: tmp.path().join("user.json"),
            },
            None,
            Duration::from_secs(1),
        )
        .await
        .unwrap()
    }

    fn request<'a>(presets: &'a HashMap<String, String>) -> UseRequest<'a> {
        UseRequest {
            id: "3",
            context: None,
            presets,
        }
    }

    #[tokio::test]
    async fn test_use_prompt_delivers_and_records() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp).await;
        let prefs = MemoryPreferencesStore::default();
        let sink = RecordingSink::default();
        let presets = HashMap::from([("function".to_string(), "parse".to_string())]);
        let mut input = ScriptedInput::new([Some("students"), Some("")]);

        let text = use_prompt(&store, request(&presets), &mut input, &sink, &prefs)
            .await
            .unwrap();

        assert_eq!(text, "Explain parse to students at intermediate level");
        assert_eq!(sink.delivered.lock().unwrap().as_slice(), &[text.clone()]);
        let saved = prefs.load().unwrap();
        assert_eq!(saved.recent_rank("3"), Some(0));
        assert_eq!(saved.use_count("3"), 1);
    }

    #[tokio::test]
    async fn test_cancel_leaves_preferences_untouched() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp).await;
        let mut initial = Preferences::default();
        initial.toggle_favorite("3");
        let prefs = MemoryPreferencesStore::new(initial.clone());
        let sink = RecordingSink::default();
        let presets = HashMap::new();
        let mut input = ScriptedInput::new([Some("parse"), None::<&str>]);

        let err = use_prompt(&store, request(&presets), &mut input, &sink, &prefs)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(sink.delivered.lock().unwrap().is_empty());
        assert_eq!(prefs.load().unwrap(), initial);
    }

    #[tokio::test]
    async fn test_failed_delivery_leaves_preferences_untouched() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp).await;
        let prefs = MemoryPreferencesStore::default();
        let presets = HashMap::from([
            ("function".to_string(), "f".to_string()),
            ("audience".to_string(), "a".to_string()),
            ("level".to_string(), "l".to_string()),
        ]);
        let mut input = ScriptedInput::default();

        let err = use_prompt(&store, request(&presets), &mut input, &BrokenSink, &prefs)
            .await
            .unwrap_err();
        assert!(!err.is_cancelled());
        assert_eq!(prefs.load().unwrap(), Preferences::default());
    }

    #[tokio::test]
    async fn test_unknown_prompt() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp).await;
        let presets = HashMap::new();
        let err = use_prompt(
            &store,
            UseRequest {
                id: "404",
                context: None,
                presets: &presets,
            },
            &mut ScriptedInput::default(),
            &RecordingSink::default(),
            &MemoryPreferencesStore::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ShelfError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_command_sink_pipes_stdin() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out.txt");
        let sink = CommandSink::new(
            "capture",
            "sh",
            vec!["-c".into(), format!("cat > '{}'", out.display())],
        );
        sink.deliver("hello prompt").await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "hello prompt");

        let failing = CommandSink::new("fail", "sh", vec!["-c".into(), "exit 3".into()]);
        assert!(failing.deliver("x").await.is_err());
    }

    #[test]
    fn test_chat_sink_lookup() {
        let mut cfg = OutputConfig::default();
        cfg.chat_commands.insert("ask".into(), "llm chat --continue".into());
        let sink = chat_sink(&cfg, "ask").unwrap();
        assert_eq!(sink.program(), "llm");
        assert!(matches!(chat_sink(&cfg, "nope"), Err(ShelfError::InvalidInput(_))));
    }

    #[test]
    fn test_configured_clipboard_wins() {
        let cfg = OutputConfig {
            clipboard_command: "my-copy --flag".into(),
            ..Default::default()
        };
        assert_eq!(clipboard_sink(&cfg).unwrap().program(), "my-copy");
    }
}
