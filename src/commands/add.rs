//! Implementation of the `agency add` command.
//!
//! Appends a pending task with the next free `task-NNN` id. Scope and type
//! come from the flags; when either is omitted and `classifier_command` is
//! configured, the classifier fills the gap.

use crate::classify::{Classification, Classifier, CommandClassifier};
use crate::cli::AddArgs;
use crate::context::AgencyContext;
use crate::error::{AgencyError, Result};
use crate::events::{Event, EventAction, EventLog, Notifier};
use crate::task::{Scope, Task, TaskList, TaskStore, TaskType};
use chrono::Utc;
use serde_json::json;

pub fn cmd_add(ctx: &AgencyContext, args: AddArgs) -> Result<()> {
    let config = super::load_config(ctx)?;
    let mut classifier = config.classifier_command.clone().map(CommandClassifier::new);

    let task = add_task(
        ctx,
        args,
        classifier.as_mut().map(|c| c as &mut dyn Classifier),
    )?;

    println!("Added {} [{} / {}]: {}", task.id, task.task_type, task.scope, task.title);
    Ok(())
}

pub(crate) fn add_task(
    ctx: &AgencyContext,
    args: AddArgs,
    classifier: Option<&mut dyn Classifier>,
) -> Result<Task> {
    let title = args.title.trim();
    if title.is_empty() {
        return Err(AgencyError::UserError("task title must not be empty".to_string()));
    }

    let scope = args.scope.as_deref().map(parse_scope).transpose()?;
    let task_type = args.task_type.as_deref().map(parse_task_type).transpose()?;

    let classification = match (scope, task_type, classifier) {
        (Some(_), Some(_), _) | (_, _, None) => Classification::default(),
        (_, _, Some(classifier)) => classifier.classify(title, &args.description),
    };

    ctx.ensure_dirs()?;
    let store = TaskStore::new(ctx.tasks_path());
    let mut list = load_for_write(&store)?;

    let mut task = Task::new(list.next_id(), title);
    task.description = args.description;
    task.scope = scope.unwrap_or(classification.scope);
    task.task_type = task_type.unwrap_or(classification.task_type);
    task.created_at = Some(Utc::now());

    list.add(task.clone())?;
    store.save(&list)?;

    EventLog::new(ctx.notifications_path()).notify(
        Event::new(EventAction::TaskAdded, super::COMPONENT)
            .with_task(&task.id)
            .with_details(json!({
                "title": task.title,
                "scope": task.scope.as_str(),
                "task_type": task.task_type.as_str(),
            })),
    );

    Ok(task)
}

/// A missing store starts empty; an unreadable one is never overwritten.
fn load_for_write(store: &TaskStore) -> Result<TaskList> {
    if !store.path().exists() {
        return Ok(TaskList::default());
    }
    store.load().ok_or_else(|| {
        AgencyError::UserError(format!(
            "task store '{}' is unreadable; fix it or run `agency reset --yes`",
            store.path().display()
        ))
    })
}

fn parse_scope(value: &str) -> Result<Scope> {
    Scope::from_str(value).ok_or_else(|| {
        AgencyError::UserError(format!(
            "invalid scope '{}': expected full, backend_only, frontend_only, doc_only or unknown",
            value
        ))
    })
}

fn parse_task_type(value: &str) -> Result<TaskType> {
    TaskType::from_str(value).ok_or_else(|| {
        AgencyError::UserError(format!(
            "invalid task type '{}': expected FEATURE, FIX, DOC, VERIFY, EXPLORE or UNKNOWN",
            value
        ))
    })
}
