// PromptShelf — Compose a reviewer email for a user prompt
//
// Nothing is sent from here. The result is a pre-filled message the user can
// open in their mail client or copy.

use crate::config::SubmissionConfig;
use crate::error::{Result, ShelfError};
use crate::store::PromptStore;
use std::process::Stdio;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Build the submission for user prompt `id`.
pub fn compose(store: &PromptStore, id: &str, cfg: &SubmissionConfig) -> Result<Submission> {
    let prompt = store
        .prompt(id)
        .ok_or_else(|| ShelfError::NotFound(id.to_string()))?;
    if !store.is_mutable(id) {
        return Err(ShelfError::NotShareable(id.to_string()));
    }

    let location: Vec<&str> = store
        .tree()
        .ancestors(id)
        .iter()
        .filter_map(|a| store.find_by_id(a).map(|e| e.label()))
        .collect();
    let tags = if prompt.tags.is_empty() {
        "(none)".to_string()
    } else {
        prompt.tags.iter().cloned().collect::<Vec<_>>().join(", ")
    };

    let mut body = format!(
        "Label: {}\nTags: {}\nId: {}\nLocation: {}\n",
        prompt.label,
        tags,
        prompt.id,
        location.join(" / "),
    );
    if let Some(score) = &prompt.evaluation {
        body.push_str(&format!(
            "Score: {} (clarity {}, specificity {}, context {}, efficiency {}, relevance {})\n",
            score.overall_score,
            score.clarity,
            score.specificity,
            score.context,
            score.efficiency,
            score.relevance,
        ));
    }
    body.push_str("\n--- Prompt ---\n");
    body.push_str(&prompt.body);
    body.push('\n');

    Ok(Submission {
        recipient: cfg.recipient.trim().to_string(),
        subject: format!("{}: {}", cfg.subject_prefix, prompt.label),
        body,
    })
}

/// Escape the characters that would break a query pair. The rest is
/// percent-encoded by `Url::set_query`.
fn escape_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '%' => out.push_str("%25"),
            '&' => out.push_str("%26"),
            '=' => out.push_str("%3D"),
            '+' => out.push_str("%2B"),
            '#' => out.push_str("%23"),
            '\n' => out.push_str("%0D%0A"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

impl Submission {
    /// A `mailto:` URL with subject and body filled in.
    pub fn mailto(&self) -> Result<Url> {
        let mut url = Url::parse(&format!("mailto:{}", self.recipient))
            .map_err(|e| ShelfError::InvalidInput(format!("bad recipient '{}': {}", self.recipient, e)))?;
        url.set_query(Some(&format!(
            "subject={}&body={}",
            escape_component(&self.subject),
            escape_component(&self.body)
        )));
        Ok(url)
    }

    /// Plain text form, for copying when no mail client is available.
    pub fn as_text(&self) -> String {
        let to = if self.recipient.is_empty() {
            "(fill in)"
        } else {
            self.recipient.as_str()
        };
        format!("To: {}\nSubject: {}\n\n{}", to, self.subject, self.body)
    }
}

/// Hand `url` to the platform opener.
pub async fn open_url(url: &Url) -> anyhow::Result<()> {
    let (program, args): (&str, Vec<&str>) = if cfg!(target_os = "macos") {
        ("open", vec![url.as_str()])
    } else if cfg!(target_os = "windows") {
        ("cmd", vec!["/C", "start", "", url.as_str()])
    } else {
        ("xdg-open", vec![url.as_str()])
    };

    let status = tokio::process::Command::new(program)
        .args(&args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| anyhow::anyhow!("failed to run {}: {}", program, e))?;
    if !status.success() {
        anyhow::bail!("{} exited with {}", program, status);
    }
    Ok(())
}
