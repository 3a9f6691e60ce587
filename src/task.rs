// darkness-build/src/task.rs

use anyhow::Result;
use std::{collections::{BTreeMap, BTreeSet}, time::Instant};

use crate::{
    error::TaskError,
    hooks::{HookRegistry, TaskEvent},
    project::Project,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskAction {
    Replicate,
    Cleanup,
    Zip,
    Archive,
    SassCleanup,
    SassCompile,
    SassWatch,
    Install,
    SkinCreate,
}

#[derive(Clone, Debug)]
pub struct TaskSpec {
    pub name: String,
    pub prerequisites: Vec<String>,
    /// `None` for pure aggregates such as `cws`.
    pub action: Option<TaskAction>,
    pub about: String,
}

impl TaskSpec {
    pub fn new(name: &str, prerequisites: &[&str], action: Option<TaskAction>, about: &str) -> Self {
        Self {
            name: name.into(),
            prerequisites: prerequisites.iter().map(|s| s.to_string()).collect(),
            action,
            about: about.into(),
        }
    }
}

/// Named tasks and their prerequisite edges.
#[derive(Clone, Debug)]
pub struct TaskGraph {
    tasks: Vec<TaskSpec>,
    index: BTreeMap<String, usize>,
}

impl TaskGraph {
    /// Rejects duplicate names and edges to undeclared tasks. Cycles are found at plan time.
    pub fn new(tasks: Vec<TaskSpec>) -> Result<Self, TaskError> {
        let mut index = BTreeMap::new();
        for (i, t) in tasks.iter().enumerate() {
            if index.insert(t.name.clone(), i).is_some() {
                return Err(TaskError::Duplicate(t.name.clone()));
            }
        }
        for t in &tasks {
            if let Some(p) = t.prerequisites.iter().find(|p| !index.contains_key(*p)) {
                return Err(TaskError::MissingPrerequisite(t.name.clone(), p.clone()));
            }
        }
        Ok(Self { tasks, index })
    }

    /// The Darkness build tasks.
    pub fn standard() -> Self {
        use TaskAction::*;
        let tasks = vec![
            TaskSpec::new("cws", &["cws:replicate", "cws:cleanup", "cws:zip", "cws:archive"], None,
                "build the Chrome Web Store zip and its versioned archive copy"),
            TaskSpec::new("cws:replicate", &[], Some(Replicate), "copy the development tree to production"),
            TaskSpec::new("cws:cleanup", &["cws:replicate"], Some(Cleanup), "strip sources and maps from production"),
            TaskSpec::new("cws:zip", &["cws:cleanup"], Some(Zip), "zip the production tree"),
            TaskSpec::new("cws:archive", &["cws:zip"], Some(Archive), "copy the zip to a versioned, timestamped name"),
            TaskSpec::new("sass:cleanup", &[], Some(SassCleanup), "delete all compiled .css and .css.map files"),
            TaskSpec::new("sass:compile", &[], Some(SassCompile), "compile all .scss files to .css and .css.map"),
            TaskSpec::new("sass:watch", &[], Some(SassWatch), "compile, then recompile whenever sources change"),
            TaskSpec::new("install", &[], Some(Install), "clean and compile stylesheets once"),
            TaskSpec::new("skin:create", &[], Some(SkinCreate), "scaffold a new website skin (--key=<key>)"),
        ];
        match Self::new(tasks) {
            Ok(g) => g,
            Err(e) => unreachable!("standard task graph is malformed: {e}"),
        }
    }

    pub fn tasks(&self) -> &[TaskSpec] { &self.tasks }
    pub fn get(&self, name: &str) -> Option<&TaskSpec> { self.index.get(name).map(|&i| &self.tasks[i]) }

    /// Execution order for `requested`: prerequisites first, in declaration
    /// order, every task at most once.
    pub fn plan<S: AsRef<str>>(&self, requested: &[S]) -> Result<Vec<&TaskSpec>, TaskError> {
        let mut order = vec![];
        let mut done = BTreeSet::new();
        let mut stack = vec![];
        for name in requested {
            let name = name.as_ref();
            if !self.index.contains_key(name) { return Err(TaskError::Unknown(name.to_string())); }
            self.visit(name, &mut stack, &mut done, &mut order)?;
        }
        Ok(order)
    }

    fn visit<'g>(
        &'g self,
        name: &str,
        stack: &mut Vec<String>,
        done: &mut BTreeSet<String>,
        order: &mut Vec<&'g TaskSpec>,
    ) -> Result<(), TaskError> {
        if done.contains(name) { return Ok(()); }
        if let Some(pos) = stack.iter().position(|s| s == name) {
            let mut cycle = stack[pos..].to_vec();
            cycle.push(name.to_string());
            return Err(TaskError::Cycle(cycle));
        }
        let task = self.get(name).ok_or_else(|| TaskError::Unknown(name.to_string()))?;
        stack.push(name.to_string());
        for p in &task.prerequisites {
            self.visit(p, stack, done, order)?;
        }
        stack.pop();
        done.insert(name.to_string());
        order.push(task);
        Ok(())
    }
}

pub struct TaskRunner<'a> {
    pub graph: &'a TaskGraph,
    pub project: &'a Project,
    pub hooks: &'a HookRegistry,
}

impl<'a> TaskRunner<'a> {
    /// Run the requested tasks. The whole plan is resolved before anything
    /// runs; the first failing action aborts the rest.
    pub async fn run<S: AsRef<str>>(&self, requested: &[S]) -> Result<()> {
        let plan = self.graph.plan(requested)?;
        for task in plan {
            self.hooks.emit(&TaskEvent::TaskStart { task_name: task.name.clone() }).await;
            let started = Instant::now();
            let res = match task.action {
                Some(action) => self.project.execute(action).await,
                None => Ok(()),
            };
            self.hooks.emit(&TaskEvent::TaskEnd {
                task_name: task.name.clone(),
                success: res.is_ok(),
                elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            }).await;
            res.map_err(|e| e.context(format!("task '{}' failed", task.name)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(plan: Vec<&TaskSpec>) -> Vec<&str> { plan.into_iter().map(|t| t.name.as_str()).collect() }

    #[test]
    fn cws_runs_the_chain_once_in_order() {
        let g = TaskGraph::standard();
        assert_eq!(
            names(g.plan(&["cws"]).unwrap()),
            vec!["cws:replicate", "cws:cleanup", "cws:zip", "cws:archive", "cws"]
        );
    }

    #[test]
    fn substep_pulls_in_its_prerequisites() {
        let g = TaskGraph::standard();
        assert_eq!(names(g.plan(&["cws:zip"]).unwrap()), vec!["cws:replicate", "cws:cleanup", "cws:zip"]);
        assert_eq!(
            names(g.plan(&["sass:cleanup", "sass:compile", "sass:cleanup"]).unwrap()),
            vec!["sass:cleanup", "sass:compile"]
        );
    }

    #[test]
    fn unknown_task_is_rejected() {
        let g = TaskGraph::standard();
        assert_eq!(g.plan(&["deploy"]).unwrap_err(), TaskError::Unknown("deploy".into()));
    }

    #[test]
    fn cycles_and_dangling_edges_are_rejected() {
        let g = TaskGraph::new(vec![
            TaskSpec::new("a", &["b"], None, ""),
            TaskSpec::new("b", &["a"], None, ""),
        ]).unwrap();
        assert_eq!(g.plan(&["a"]).unwrap_err(), TaskError::Cycle(vec!["a".into(), "b".into(), "a".into()]));

        let err = TaskGraph::new(vec![TaskSpec::new("a", &["zzz"], None, "")]).unwrap_err();
        assert_eq!(err, TaskError::MissingPrerequisite("a".into(), "zzz".into()));

        let err = TaskGraph::new(vec![TaskSpec::new("a", &[], None, ""), TaskSpec::new("a", &[], None, "")]).unwrap_err();
        assert_eq!(err, TaskError::Duplicate("a".into()));
    }
}
