//! Claude Code CLI capability implementation.
//!
//! Spawns the agent CLI in non-interactive print mode, one process per
//! capability call, and parses the structured verdict the prompt asks for.
//! Resolution phases run inside the item's worktree; discovery and
//! classification run against the repository itself.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::domain::models::config::AgentConfig;
use crate::domain::models::resolution::ResolutionPhase;
use crate::domain::ports::capability::{
    Capability, CapabilityError, CapabilityResult, Classification, ClassifyContext,
    DiscoveryContext, DiscoveryReport, EntrypointSuggestion, ImplementOutcome, PhaseContext,
    RefineOutcome, ReviewVerdict, SuggestContext, WriteTestsOutcome,
};

pub struct ClaudeCodeCapability {
    config: AgentConfig,
    /// Repository root discovery and classification operate on
    repo_dir: PathBuf,
}

impl ClaudeCodeCapability {
    pub fn new(config: AgentConfig, repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            repo_dir: repo_dir.into(),
        }
    }

    fn build_args(&self, model: &str, prompt: &str) -> Vec<String> {
        let mut args = vec![
            "--print".to_string(),
            "--output-format".to_string(),
            "json".to_string(),
            "--max-turns".to_string(),
            self.config.max_turns.to_string(),
            "--model".to_string(),
            model.to_string(),
        ];
        args.extend(self.config.extra_flags.clone());
        args.push("-p".to_string());
        args.push(prompt.to_string());
        args
    }

    async fn invoke(&self, model: &str, dir: &Path, prompt: &str) -> CapabilityResult<String> {
        let args = self.build_args(model, prompt);
        debug!(binary = %self.config.binary_path, dir = %dir.display(), "spawning agent");

        let output = Command::new(&self.config.binary_path)
            .args(&args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| CapabilityError::CallFailed(format!("failed to spawn agent: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CapabilityError::CallFailed(format!(
                "agent exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        // --output-format json wraps the transcript; the final text lives
        // in the `result` field
        let envelope: serde_json::Value = serde_json::from_str(stdout.trim())
            .map_err(|e| CapabilityError::Unparsable(format!("agent output envelope: {e}")))?;
        envelope
            .get("result")
            .and_then(|r| r.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                CapabilityError::Unparsable("agent output envelope has no result field".into())
            })
    }

    /// Pull the verdict object out of the agent's final text, which may
    /// surround the JSON with prose or a code fence.
    fn extract_json<T: serde::de::DeserializeOwned>(text: &str) -> CapabilityResult<T> {
        let start = text
            .find('{')
            .ok_or_else(|| CapabilityError::Unparsable("no JSON object in agent reply".into()))?;
        let end = text
            .rfind('}')
            .ok_or_else(|| CapabilityError::Unparsable("no JSON object in agent reply".into()))?;
        serde_json::from_str(&text[start..=end])
            .map_err(|e| CapabilityError::Unparsable(e.to_string()))
    }

    fn known_items_section(known_items: &[String]) -> String {
        if known_items.is_empty() {
            return "No findings are tracked yet.".to_string();
        }
        format!(
            "Already tracked (do not report these again):\n{}",
            known_items.join("\n")
        )
    }

    fn phase_prompt(ctx: &PhaseContext) -> String {
        let instructions = match ctx.phase {
            ResolutionPhase::WriteTests => ctx.profile.write_tests_instructions(),
            ResolutionPhase::Implement => ctx.profile.implement_instructions(),
            ResolutionPhase::Refine => ctx.profile.refine_instructions(),
            ResolutionPhase::Review => ctx.profile.review_instructions(),
            ResolutionPhase::Done => "",
        };
        let history = if ctx.rejection_history.is_empty() {
            String::new()
        } else {
            format!(
                "\n\nEarlier review rejections, oldest first:\n{}",
                ctx.rejection_history.join("\n")
            )
        };
        let schema = match ctx.phase {
            ResolutionPhase::WriteTests => {
                r#"{"status": "PREPARED", "test_reference": "<path or test name>", "notes": "..."}
or {"status": "DISCARDED", "reason": "..."}"#
            }
            ResolutionPhase::Implement => {
                r#"{"status": "READY", "description": "<what the change does>", "commits": ["<sha>", ...], "notes": "..."}
or {"status": "DISCARDED", "reason": "..."}"#
            }
            ResolutionPhase::Refine => r#"{"refined": true, "notes": "..."}"#,
            ResolutionPhase::Review | ResolutionPhase::Done => {
                r#"{"status": "APPROVED", "notes": "..."}
or {"status": "REJECTED", "reason": "...", "notes": "..."}"#
            }
        };
        format!(
            "You are working on {id}: {description}\n\n\
             Relevant files: {files}\n\n\
             Accumulated notes:\n{details}{history}\n\n\
             {instructions}\n\n\
             Commit your changes. End your reply with exactly one JSON object:\n{schema}",
            id = ctx.item_id,
            description = ctx.description,
            files = ctx.relevant_files.join(", "),
            details = ctx.details,
        )
    }
}

#[async_trait]
impl Capability for ClaudeCodeCapability {
    async fn suggest_entrypoints(
        &self,
        ctx: &SuggestContext,
    ) -> CapabilityResult<EntrypointSuggestion> {
        let prompt = format!(
            "Survey this repository and pick the modules or files most likely to \
             harbor defects: complex logic, heavy state, recent churn, sparse tests.\n\n\
             {known}\n\n\
             End your reply with exactly one JSON object:\n\
             {{\"entrypoints\": [\"<path>\", ...], \"reasoning\": \"...\"}}",
            known = Self::known_items_section(&ctx.known_items),
        );
        let text = self
            .invoke(&self.config.model, &self.repo_dir, &prompt)
            .await?;
        Self::extract_json(&text)
    }

    async fn discover(&self, ctx: &DiscoveryContext) -> CapabilityResult<DiscoveryReport> {
        let prompt = format!(
            "Explore the code reachable from `{entrypoint}` and hunt for real defects: \
             logic errors, unhandled edge cases, races, resource leaks. Report at most \
             {max} findings, highest severity first.\n\n\
             {known}\n\n\
             End your reply with exactly one JSON object:\n\
             {{\"findings\": [{{\"short_description\": \"...\", \"severity\": \
             \"HIGH\"|\"MEDIUM\"|\"LOW\", \"relevant_files\": [\"<path>\"], \
             \"details\": \"<full context and reproduction steps>\"}}], \
             \"summary\": \"...\"}}",
            entrypoint = ctx.entrypoint,
            max = ctx.max_findings,
            known = Self::known_items_section(&ctx.known_items),
        );
        let text = self
            .invoke(&self.config.model, &self.repo_dir, &prompt)
            .await?;
        Self::extract_json(&text)
    }

    async fn classify(&self, ctx: &ClassifyContext) -> CapabilityResult<Classification> {
        let prompt = format!(
            "Classify how this defect can be reproduced.\n\n\
             {id}: {description}\nRelevant files: {files}\n\nDetails:\n{details}\n\n\
             End your reply with exactly one JSON object:\n\
             {{\"approach\": \"UNIT_TEST\"|\"MANUAL\"|\"INTEGRATION_TEST\", \
             \"chance\": \"EASY\"|\"MEDIUM\"|\"HARD\", \"reasoning\": \"...\"}}",
            id = ctx.item.id,
            description = ctx.item.short_description,
            files = ctx.item.relevant_files.join(", "),
            details = ctx.details,
        );
        let text = self
            .invoke(&self.config.classify_model, &self.repo_dir, &prompt)
            .await?;
        Self::extract_json(&text)
    }

    async fn write_tests(&self, ctx: &PhaseContext) -> CapabilityResult<WriteTestsOutcome> {
        let text = self
            .invoke(&self.config.model, &ctx.workspace, &Self::phase_prompt(ctx))
            .await?;
        Self::extract_json(&text)
    }

    async fn implement(&self, ctx: &PhaseContext) -> CapabilityResult<ImplementOutcome> {
        let text = self
            .invoke(&self.config.model, &ctx.workspace, &Self::phase_prompt(ctx))
            .await?;
        Self::extract_json(&text)
    }

    async fn refine(&self, ctx: &PhaseContext) -> CapabilityResult<RefineOutcome> {
        let text = self
            .invoke(&self.config.model, &ctx.workspace, &Self::phase_prompt(ctx))
            .await?;
        Self::extract_json(&text)
    }

    async fn review(&self, ctx: &PhaseContext) -> CapabilityResult<ReviewVerdict> {
        let text = self
            .invoke(&self.config.model, &ctx.workspace, &Self::phase_prompt(ctx))
            .await?;
        Self::extract_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::resolution::TaskProfile;

    #[test]
    fn test_extract_json_ignores_surrounding_prose() {
        let text = "All done, here is the verdict:\n```json\n\
                    {\"status\": \"APPROVED\", \"notes\": \"clean fix\"}\n```";
        let verdict: ReviewVerdict = ClaudeCodeCapability::extract_json(text).unwrap();
        assert!(matches!(verdict, ReviewVerdict::Approved { .. }));
    }

    #[test]
    fn test_implement_reply_without_commits_still_parses() {
        let text = r#"{"status": "READY", "description": "guard the empty case", "notes": "done"}"#;
        let outcome: ImplementOutcome = ClaudeCodeCapability::extract_json(text).unwrap();
        assert!(matches!(
            outcome,
            ImplementOutcome::Ready { commits, .. } if commits.is_empty()
        ));
    }

    #[test]
    fn test_extract_json_without_object_is_unparsable() {
        let err = ClaudeCodeCapability::extract_json::<ReviewVerdict>("no json here").unwrap_err();
        assert!(matches!(err, CapabilityError::Unparsable(_)));
    }

    #[test]
    fn test_phase_prompt_carries_rejection_history() {
        let ctx = PhaseContext {
            item_id: "BH-001".into(),
            profile: TaskProfile::BugFix,
            phase: ResolutionPhase::Implement,
            description: "Null deref in parser".into(),
            details: String::new(),
            relevant_files: vec!["src/parser.rs".into()],
            rejection_history: vec!["misses the empty-input case".into()],
            workspace: PathBuf::from("/tmp/ws"),
        };
        let prompt = ClaudeCodeCapability::phase_prompt(&ctx);
        assert!(prompt.contains("misses the empty-input case"));
        assert!(prompt.contains("BH-001"));
    }

    #[test]
    fn test_build_args_put_prompt_last() {
        let capability = ClaudeCodeCapability::new(AgentConfig::default(), "/repo");
        let args = capability.build_args("sonnet", "find bugs");
        assert_eq!(args[0], "--print");
        assert_eq!(args.last().map(String::as_str), Some("find bugs"));
        assert!(args.contains(&"--model".to_string()));
    }
}
