// darkness-build/src/hooks.rs

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    TaskStart { task_name: String },
    TaskEnd { task_name: String, success: bool, elapsed_ms: u64 },
}

#[async_trait]
pub trait TaskHook: Send + Sync {
    fn name(&self) -> &'static str;
    async fn on_event(&self, event: &TaskEvent) -> Result<()>;
}

#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<Vec<Arc<dyn TaskHook>>>,
}
impl HookRegistry {
    pub fn new() -> Self { Self { hooks: RwLock::new(Vec::new()) } }
    pub async fn register(&self, hook: Arc<dyn TaskHook>) { self.hooks.write().await.push(hook); }

    /// Deliver to every hook; a failing hook is logged and never stops the task.
    pub async fn emit(&self, event: &TaskEvent) {
        let hooks = self.hooks.read().await.clone();
        for h in hooks {
            if let Err(e) = h.on_event(event).await {
                error!("hook {} failed: {e:#}", h.name());
            }
        }
    }
}

/// Logs task lifecycle lines.
pub struct LogHook;

#[async_trait]
impl TaskHook for LogHook {
    fn name(&self) -> &'static str { "log" }
    async fn on_event(&self, event: &TaskEvent) -> Result<()> {
        match event {
            TaskEvent::TaskStart { task_name } => info!("Starting '{task_name}'..."),
            TaskEvent::TaskEnd { task_name, success: true, elapsed_ms } =>
                info!("Finished '{task_name}' after {elapsed_ms} ms"),
            TaskEvent::TaskEnd { task_name, success: false, elapsed_ms } =>
                error!("'{task_name}' errored after {elapsed_ms} ms"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Failing;
    #[async_trait]
    impl TaskHook for Failing {
        fn name(&self) -> &'static str { "failing" }
        async fn on_event(&self, _: &TaskEvent) -> Result<()> { anyhow::bail!("boom") }
    }

    struct Recorder(Mutex<Vec<TaskEvent>>);
    #[async_trait]
    impl TaskHook for Recorder {
        fn name(&self) -> &'static str { "recorder" }
        async fn on_event(&self, event: &TaskEvent) -> Result<()> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    #[test]
    fn events_round_trip_through_json() {
        let ev = TaskEvent::TaskEnd { task_name: "cws:zip".into(), success: true, elapsed_ms: 1234 };
        let text = serde_json::to_string(&ev).unwrap();
        assert!(text.contains(r#""type":"task_end""#));
        assert_eq!(serde_json::from_str::<TaskEvent>(&text).unwrap(), ev);
    }

    #[tokio::test]
    async fn failing_hook_does_not_block_later_hooks() {
        let reg = HookRegistry::new();
        let rec = Arc::new(Recorder(Mutex::new(vec![])));
        reg.register(Arc::new(Failing)).await;
        reg.register(rec.clone()).await;
        reg.emit(&TaskEvent::TaskStart { task_name: "cws".into() }).await;
        assert_eq!(rec.0.lock().unwrap().len(), 1);
    }
}
