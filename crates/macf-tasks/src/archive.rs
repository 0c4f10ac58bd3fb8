//! Archive and restore (spec §4.5).

use std::path::{Path, PathBuf};

use chrono::Utc;
use macf_types::{Breadcrumb, Task, TaskMetadata, TaskStatus, TaskUpdate};

use crate::error::{Error, Result};
use crate::store::TaskStore;

/// Collect `id` and every task whose `parent_id` chain leads back to it.
fn descendants_of(tasks: &[Task], id: &str) -> Vec<Task> {
    let mut result = Vec::new();
    let mut frontier = vec![id.to_string()];
    while let Some(current) = frontier.pop() {
        for task in tasks {
            if task.id == current {
                continue;
            }
            let parent = task.metadata().ok().flatten().and_then(|m| m.parent_id);
            if parent.as_deref() == Some(current.as_str()) {
                frontier.push(task.id.clone());
                result.push(task.clone());
            }
        }
    }
    result
}

/// Copy `id` (and, if `cascade`, its descendants) into a dated archive
/// directory under `archive_dir`, stamping each copy with archive
/// metadata, then mark the originals `archived`.
pub fn archive(store: &TaskStore, archive_dir: &Path, id: &str, cascade: bool) -> Result<Vec<Task>> {
    let root = store.read(id)?;
    let all = store.read_all()?;
    let mut to_archive = vec![root];
    if cascade {
        to_archive.extend(descendants_of(&all, id));
    }

    let dated_dir = archive_dir.join(Utc::now().format("%Y%m%d").to_string());
    std::fs::create_dir_all(&dated_dir)?;

    let mut archived = Vec::with_capacity(to_archive.len());
    for mut task in to_archive {
        let mut metadata = task.metadata()?.unwrap_or_default();
        metadata.archived = true;
        metadata.archived_at = Some(Utc::now().to_rfc3339());
        task.description = metadata.upsert_into(&task.description)?;
        task.status = TaskStatus::Archived;

        let archived_copy_path = dated_dir.join(format!("{}.json", task.id));
        std::fs::write(&archived_copy_path, serde_json::to_string_pretty(&task)?)?;

        store.update(&task.id, |t| {
            t.status = TaskStatus::Archived;
            t.description = task.description.clone();
        })?;
        archived.push(task);
    }
    Ok(archived)
}

/// An archive reference: the dated directory plus the id within it.
pub struct ArchiveRef {
    pub dated_dir: PathBuf,
    pub id: String,
}

/// Load an archived task, clear its archive metadata, allocate a new id,
/// reset status to `pending`, and append a restoration note citing the
/// original id and date.
pub fn restore(store: &TaskStore, archive_ref: &ArchiveRef, breadcrumb: &Breadcrumb, agent: &str) -> Result<Task> {
    let archived_path = archive_ref.dated_dir.join(format!("{}.json", archive_ref.id));
    let contents = std::fs::read_to_string(&archived_path)
        .map_err(|_| Error::NotFound(archive_ref.id.clone()))?;
    let mut task: Task = serde_json::from_str(&contents)?;

    let mut metadata = task.metadata()?.unwrap_or_default();
    metadata.archived = false;
    metadata.archived_at = None;
    let original_id = task.id.clone();
    let dated = archive_ref
        .dated_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    metadata.updates.push(TaskUpdate {
        breadcrumb: breadcrumb.format(),
        description: format!("Restored from archive of {original_id} ({dated})"),
        agent: agent.to_string(),
    });

    let new_id = store.next_id()?;
    task.id = new_id.clone();
    task.status = TaskStatus::Pending;
    task.description = metadata.upsert_into(&task.description)?;

    store_new(store, &task)?;
    Ok(task)
}

fn store_new(store: &TaskStore, task: &Task) -> Result<()> {
    // Round-trips through `update` by first writing the file directly: a
    // restored task has no prior on-disk entry for `update` to patch.
    let _guard = crate::guard::DirectoryGuard::unprotect(store.dir())?;
    let path = store.dir().join(format!("{}.json", task.id));
    std::fs::write(path, serde_json::to_string_pretty(task)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use macf_eventlog::EventLog;
    use macf_types::TaskType;
    use tempfile::tempdir;

    #[test]
    fn archive_marks_task_archived_and_writes_dated_copy() {
        let dir = tempdir().unwrap();
        let store = TaskStore::new(dir.path().join("tasks"));
        let log = EventLog::new(dir.path().join("events.jsonl"));
        let breadcrumb = Breadcrumb::new(1, "s");
        let task = store
            .create_task(&log, TaskType::Bug, "fix it", None, None, &breadcrumb, 1, "agent")
            .unwrap();

        let archive_dir = dir.path().join("archive");
        let archived = archive(&store, &archive_dir, &task.id, true).unwrap();
        assert_eq!(archived.len(), 1);
        let reread = store.read(&task.id).unwrap();
        assert_eq!(reread.status, TaskStatus::Archived);
    }

    #[test]
    fn restore_allocates_new_id_and_resets_status() {
        let dir = tempdir().unwrap();
        let store = TaskStore::new(dir.path().join("tasks"));
        let log = EventLog::new(dir.path().join("events.jsonl"));
        let breadcrumb = Breadcrumb::new(1, "s");
        let task = store
            .create_task(&log, TaskType::Bug, "fix it", None, None, &breadcrumb, 1, "agent")
            .unwrap();
        let archive_dir = dir.path().join("archive");
        archive(&store, &archive_dir, &task.id, false).unwrap();

        let dated_dir = std::fs::read_dir(&archive_dir)
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        let archive_ref = ArchiveRef { dated_dir, id: task.id.clone() };
        let restored = restore(&store, &archive_ref, &breadcrumb, "agent").unwrap();
        assert_ne!(restored.id, task.id);
        assert_eq!(restored.status, TaskStatus::Pending);
    }
}
