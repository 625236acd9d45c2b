use std::collections::BTreeMap;

use tracker_core::UsageRecord;

use crate::dedup::RecentIds;
use crate::events::{LifecycleEvent, MessageInfo, ToolPart};
use crate::paths::project_name_from_worktree;
use crate::tools::extract_file_changes;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct PendingChange {
    additions: f64,
    deletions: f64,
    is_write: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// An assistant turn finished and produced a record.
    Record(UsageRecord),
    /// A tool call was folded into the pending file changes.
    Accumulated { files: usize },
    /// A point at which deferred notifications may be shown.
    Checkpoint,
    Ignored,
}

/// Per-session extraction state.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    project_name: String,
    seen_calls: RecentIds,
    seen_messages: RecentIds,
    changes: BTreeMap<String, PendingChange>,
}

impl SessionTracker {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            seen_calls: RecentIds::default(),
            seen_messages: RecentIds::default(),
            changes: BTreeMap::new(),
        }
    }

    pub fn for_worktree(worktree: &str) -> Self {
        Self::new(project_name_from_worktree(worktree))
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn pending_files(&self) -> usize {
        self.changes.len()
    }

    pub fn handle(&mut self, event: &LifecycleEvent) -> EventOutcome {
        match event {
            LifecycleEvent::SessionCreated => EventOutcome::Checkpoint,
            LifecycleEvent::MessageUpdated { info } => self.on_message(info),
            LifecycleEvent::ToolCompleted(part) => self.on_tool(part),
            LifecycleEvent::PartUpdated | LifecycleEvent::Other(_) => EventOutcome::Ignored,
        }
    }

    fn on_tool(&mut self, part: &ToolPart) -> EventOutcome {
        if !self.seen_calls.insert(&part.call_id) {
            return EventOutcome::Ignored;
        }
        let changes = extract_file_changes(part);
        for change in &changes {
            let entry = self.changes.entry(change.file.clone()).or_default();
            entry.additions += change.additions;
            entry.deletions += change.deletions;
            entry.is_write |= change.is_write;
        }
        EventOutcome::Accumulated {
            files: changes.len(),
        }
    }

    fn on_message(&mut self, info: &MessageInfo) -> EventOutcome {
        if !info.is_assistant() || !info.is_completed() {
            return EventOutcome::Ignored;
        }
        let Some(tokens) = info.tokens.as_ref() else {
            return EventOutcome::Ignored;
        };
        if let Some(id) = info.id.as_deref()
            && !self.seen_messages.insert(id)
        {
            return EventOutcome::Ignored;
        }

        let (additions, deletions) = self
            .changes
            .values()
            .fold((0.0, 0.0), |(adds, dels), change| {
                (adds + change.additions, dels + change.deletions)
            });
        let record = UsageRecord {
            project_name: self.project_name.clone(),
            agent_name: info.agent_name(),
            model: info.model_name(),
            input_tokens: tokens.input,
            output_tokens: tokens.output,
            reasoning_tokens: tokens.reasoning,
            cache_read_tokens: tokens.cache.read,
            cache_write_tokens: tokens.cache.write,
            additions,
            deletions,
            files_changed: self.changes.len() as f64,
        };
        self.changes.clear();
        EventOutcome::Record(record)
    }
}
