use std::io::BufRead;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{IngestError, Result};

/// Token counts attached to an assistant message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageTokens {
    #[serde(default)]
    pub input: f64,
    #[serde(default)]
    pub output: f64,
    #[serde(default)]
    pub reasoning: f64,
    #[serde(default)]
    pub cache: CacheTokens,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheTokens {
    #[serde(default)]
    pub read: f64,
    #[serde(default)]
    pub write: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageTime {
    pub created: Option<f64>,
    pub completed: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageInfo {
    pub id: Option<String>,
    pub role: Option<String>,
    pub agent: Option<String>,
    #[serde(rename = "providerID")]
    pub provider_id: Option<String>,
    #[serde(rename = "modelID")]
    pub model_id: Option<String>,
    pub tokens: Option<MessageTokens>,
    pub time: Option<MessageTime>,
}

impl MessageInfo {
    pub fn is_assistant(&self) -> bool {
        self.role.as_deref() == Some("assistant")
    }

    /// A message without timing data is treated as finished.
    pub fn is_completed(&self) -> bool {
        match &self.time {
            Some(time) => time.completed.is_some(),
            None => true,
        }
    }

    /// `provider/model`, with `unknown` standing in for missing parts.
    pub fn model_name(&self) -> String {
        let provider = non_empty(self.provider_id.as_deref()).unwrap_or("unknown");
        let model = non_empty(self.model_id.as_deref()).unwrap_or("unknown");
        format!("{provider}/{model}")
    }

    pub fn agent_name(&self) -> String {
        non_empty(self.agent.as_deref())
            .unwrap_or("unknown")
            .to_string()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// State of a tool call that finished successfully.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletedState {
    #[serde(default)]
    pub output: String,
    pub title: Option<String>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct RawToolState {
    status: String,
    #[serde(flatten)]
    rest: CompletedState,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawToolPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "callID", default)]
    call_id: Option<String>,
    #[serde(default)]
    tool: String,
    state: Option<RawToolState>,
}

/// A tool part; only parts whose state is `completed` are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolPart {
    pub call_id: String,
    pub tool: String,
    pub state: CompletedState,
}

#[derive(Debug, Clone, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    properties: Value,
}

/// Agent lifecycle events the tracker reacts to.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawEvent")]
pub enum LifecycleEvent {
    SessionCreated,
    MessageUpdated { info: MessageInfo },
    ToolCompleted(ToolPart),
    /// A part that is not a tool, or a tool call still running.
    PartUpdated,
    Other(String),
}

impl From<RawEvent> for LifecycleEvent {
    fn from(raw: RawEvent) -> Self {
        match raw.kind.as_str() {
            "session.created" => LifecycleEvent::SessionCreated,
            "message.updated" => match raw.properties.get("info") {
                Some(info) => match serde_json::from_value::<MessageInfo>(info.clone()) {
                    Ok(info) => LifecycleEvent::MessageUpdated { info },
                    Err(err) => {
                        tracing::debug!(error = %err, "unreadable message info");
                        LifecycleEvent::Other(raw.kind)
                    }
                },
                None => LifecycleEvent::Other(raw.kind),
            },
            "message.part.updated" => raw
                .properties
                .get("part")
                .and_then(|part| serde_json::from_value::<RawToolPart>(part.clone()).ok())
                .and_then(completed_tool)
                .map(LifecycleEvent::ToolCompleted)
                .unwrap_or(LifecycleEvent::PartUpdated),
            _ => LifecycleEvent::Other(raw.kind),
        }
    }
}

fn completed_tool(part: RawToolPart) -> Option<ToolPart> {
    if part.kind != "tool" {
        return None;
    }
    let state = part.state?;
    if state.status != "completed" {
        return None;
    }
    Some(ToolPart {
        call_id: part.call_id?,
        tool: part.tool,
        state: state.rest,
    })
}

/// Reads one event per line, skipping blank lines.
pub fn events_from_reader<R: BufRead>(reader: R) -> Result<Vec<LifecycleEvent>> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line).map_err(|source| IngestError::Json {
            line: index + 1,
            source,
        })?;
        events.push(event);
    }
    Ok(events)
}
