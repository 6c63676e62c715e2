//! Built-in system plugin: help, status and exit.

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::Arc;

use shivai_protocols::{
    CommandHandler, HandlerContext, HandlerError, Intent, IntentCategory, PluginManifest,
};
use shivai_workqueue::Scheduler;

pub const SYSTEM_PLUGIN: &str = "system";
pub const SYSTEM_ENTRY: &str = "builtin::system";
pub const SYSTEM_CAPABILITY: &str = "system";

const HELP_TEXT: &str = "You can ask me to open or close apps, build an app, run a workflow, \
learn or run a pattern, lock or unlock the phone, take a screenshot, check the battery, \
set the volume, organize files, take a note, or say 'status' and 'exit'.";

/// Manifest under which the system handler is registered.
pub fn system_manifest() -> PluginManifest {
    PluginManifest::new(SYSTEM_PLUGIN, SYSTEM_ENTRY)
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_description("Built-in help, status and exit commands")
        .with_capability(SYSTEM_CAPABILITY)
}

/// Answers system intents and explains unrecognized ones.
pub struct SystemHandler {
    scheduler: Arc<OnceCell<Scheduler>>,
}

impl SystemHandler {
    /// `scheduler` is filled in once the agent has started its scheduler;
    /// until then `status` reports history only.
    pub fn new(scheduler: Arc<OnceCell<Scheduler>>) -> Self {
        Self { scheduler }
    }

    fn status(&self, ctx: &HandlerContext) -> Value {
        let history = ctx.snapshot.stats;
        let mut reply = format!(
            "{} commands handled, {:.0}% succeeded.",
            history.total,
            history.success_rate() * 100.0
        );
        let scheduler = self.scheduler.get().map(|s| s.stats());
        if let Some(stats) = &scheduler {
            reply.push_str(&format!(
                " {} queued, {} running.",
                stats.queued, stats.running
            ));
        }
        json!({
            "reply": reply,
            "history": history,
            "scheduler": scheduler,
        })
    }
}

#[async_trait]
impl CommandHandler for SystemHandler {
    fn capabilities(&self) -> BTreeSet<String> {
        BTreeSet::from([SYSTEM_CAPABILITY.to_string()])
    }

    async fn handle(&self, intent: &Intent, ctx: &HandlerContext) -> Result<Value, HandlerError> {
        match intent.category() {
            IntentCategory::Help => {
                let commands: Vec<&str> = IntentCategory::ALL
                    .iter()
                    .filter(|c| !c.is_unknown())
                    .map(|c| c.as_str())
                    .collect();
                Ok(json!({ "reply": HELP_TEXT, "commands": commands }))
            }
            IntentCategory::Status => Ok(self.status(ctx)),
            IntentCategory::Exit => Ok(json!({ "reply": "Goodbye.", "exit": true })),
            IntentCategory::Unknown => Ok(json!({
                "reply": format!(
                    "I did not understand \"{}\". Say 'help' to hear what I can do.",
                    intent.raw_text()
                ),
                "understood": false,
            })),
            other => Err(HandlerError::InvalidInput(format!(
                "the system plugin does not handle {}",
                other
            ))),
        }
    }
}
