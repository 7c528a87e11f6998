//! In-process todo backend.
//!
//! # Responsibility
//! - Serve the `TodoRepository` contract without a database file.
//! - Maintain `by_user`, `by_title` and `by_is_completed` equality indexes.
//!
//! # Invariants
//! - Records and indexes change under one write lock, so readers never see
//!   an index entry without its record (or the reverse).
//! - Insertion sequence numbers are never reused, which keeps list order
//!   stable and matches creation order.

use crate::model::todo::{NewTodo, Todo, TodoId, TodoPatch};
use crate::repo::todo_repo::{RepoError, RepoResult, TodoListQuery, TodoRepository};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

type Seq = u64;

/// Thread-safe in-memory todo repository.
#[derive(Debug, Default)]
pub struct MemoryTodoRepository {
    state: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_seq: Seq,
    last_created_at: i64,
    records: BTreeMap<Seq, Todo>,
    seq_by_id: HashMap<TodoId, Seq>,
    by_user: HashMap<String, BTreeSet<Seq>>,
    by_title: HashMap<String, BTreeSet<Seq>>,
    by_is_completed: [BTreeSet<Seq>; 2],
}

impl MemoryTodoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records.
    pub fn len(&self) -> RepoResult<usize> {
        Ok(self.read()?.records.len())
    }

    pub fn is_empty(&self) -> RepoResult<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| RepoError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| RepoError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl MemoryState {
    fn index(&mut self, seq: Seq, todo: &Todo) {
        self.by_user
            .entry(todo.user_id.clone())
            .or_default()
            .insert(seq);
        self.by_title
            .entry(todo.title.clone())
            .or_default()
            .insert(seq);
        self.by_is_completed[usize::from(todo.is_completed)].insert(seq);
    }

    fn unindex(&mut self, seq: Seq, todo: &Todo) {
        remove_entry(&mut self.by_user, &todo.user_id, seq);
        remove_entry(&mut self.by_title, &todo.title, seq);
        self.by_is_completed[usize::from(todo.is_completed)].remove(&seq);
    }

    fn next_created_at(&mut self) -> i64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| {
                i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
            });
        self.last_created_at = now.max(self.last_created_at);
        self.last_created_at
    }

    /// Smallest candidate set for `query`, narrowed further by `matches`.
    fn candidates(&self, query: &TodoListQuery) -> Option<&BTreeSet<Seq>> {
        let mut best = self.by_user.get(&query.user_id)?;
        if let Some(flag) = query.is_completed {
            let set = &self.by_is_completed[usize::from(flag)];
            if set.len() < best.len() {
                best = set;
            }
        }
        if let Some(title) = query.title.as_ref() {
            let set = self.by_title.get(title)?;
            if set.len() < best.len() {
                best = set;
            }
        }
        Some(best)
    }
}

fn remove_entry(index: &mut HashMap<String, BTreeSet<Seq>>, key: &str, seq: Seq) {
    if let Some(set) = index.get_mut(key) {
        set.remove(&seq);
        if set.is_empty() {
            index.remove(key);
        }
    }
}

impl TodoRepository for MemoryTodoRepository {
    fn insert_todo(&self, todo: &NewTodo) -> RepoResult<Todo> {
        let mut state = self.write()?;
        let seq = state.next_seq;
        state.next_seq += 1;

        let created_at = state.next_created_at();
        let stored = todo.clone().into_todo(TodoId::new(), created_at);
        state.index(seq, &stored);
        state.seq_by_id.insert(stored.id, seq);
        state.records.insert(seq, stored.clone());

        Ok(stored)
    }

    fn get_todo(&self, id: TodoId) -> RepoResult<Option<Todo>> {
        let state = self.read()?;
        Ok(state
            .seq_by_id
            .get(&id)
            .and_then(|seq| state.records.get(seq))
            .cloned())
    }

    fn patch_todo(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<Todo> {
        let mut state = self.write()?;
        let seq = *state.seq_by_id.get(&id).ok_or(RepoError::NotFound(id))?;
        let Some(current) = state.records.get(&seq).cloned() else {
            return Err(RepoError::InvalidData(format!(
                "index entry for {id} has no record"
            )));
        };

        let mut updated = current.clone();
        patch.apply_to(&mut updated);
        state.unindex(seq, &current);
        state.index(seq, &updated);
        state.records.insert(seq, updated.clone());

        Ok(updated)
    }

    fn delete_todo(&self, id: TodoId) -> RepoResult<()> {
        let mut state = self.write()?;
        let seq = state.seq_by_id.remove(&id).ok_or(RepoError::NotFound(id))?;
        if let Some(removed) = state.records.remove(&seq) {
            state.unindex(seq, &removed);
        }
        Ok(())
    }

    fn list_todos(&self, query: &TodoListQuery) -> RepoResult<Vec<Todo>> {
        let state = self.read()?;
        let Some(candidates) = state.candidates(query) else {
            return Ok(Vec::new());
        };

        Ok(candidates
            .iter()
            .filter_map(|seq| state.records.get(seq))
            .filter(|todo| query.matches(todo))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryTodoRepository;
    use crate::model::todo::{NewTodo, TodoId, TodoPatch};
    use crate::repo::todo_repo::{ErrorKind, RepoError, TodoListQuery, TodoRepository};
    use crate::service::todo_service::TodoStore;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn indexes_follow_patched_fields() {
        let repo = MemoryTodoRepository::new();
        let todo = repo.insert_todo(&NewTodo::new("u", "old", false)).unwrap();

        repo.patch_todo(todo.id, &TodoPatch::completion(true).with_title("new"))
            .unwrap();

        let by_old_title = repo
            .list_todos(&TodoListQuery::for_user("u").with_title("old"))
            .unwrap();
        assert!(by_old_title.is_empty());

        let by_new_title = repo
            .list_todos(
                &TodoListQuery::for_user("u")
                    .with_title("new")
                    .with_completion(Some(true)),
            )
            .unwrap();
        assert_eq!(by_new_title.len(), 1);
        assert_eq!(by_new_title[0].id, todo.id);
    }

    #[test]
    fn delete_drops_every_index_entry() {
        let repo = MemoryTodoRepository::new();
        let todo = repo.insert_todo(&NewTodo::new("u", "t", true)).unwrap();
        repo.delete_todo(todo.id).unwrap();

        let state = repo.state.read().unwrap();
        assert!(state.records.is_empty());
        assert!(state.seq_by_id.is_empty());
        assert!(state.by_user.is_empty());
        assert!(state.by_title.is_empty());
        assert!(state.by_is_completed.iter().all(|set| set.is_empty()));
    }

    #[test]
    fn created_at_never_goes_backwards() {
        let repo = MemoryTodoRepository::new();
        let first = repo.insert_todo(&NewTodo::new("u", "a", false)).unwrap();
        let second = repo.insert_todo(&NewTodo::new("u", "b", false)).unwrap();
        assert!(second.created_at >= first.created_at);
        assert_eq!(repo.len().unwrap(), 2);
    }

    #[test]
    fn poisoned_lock_reports_unavailable() {
        let repo = MemoryTodoRepository::new();
        let stored = repo.insert_todo(&NewTodo::new("u", "t", false)).unwrap();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let _guard = repo.state.write().unwrap();
            panic!("writer died mid-update");
        }));
        assert!(outcome.is_err());

        assert!(matches!(
            repo.insert_todo(&NewTodo::new("u", "x", false)),
            Err(RepoError::Unavailable(_))
        ));
        assert!(matches!(
            repo.list_todos(&TodoListQuery::for_user("u")),
            Err(RepoError::Unavailable(_))
        ));
        assert!(matches!(repo.len(), Err(RepoError::Unavailable(_))));

        let store = TodoStore::new(&repo);
        let err = store
            .update(stored.id, &TodoPatch::completion(true))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(
            store.delete(TodoId::new()).unwrap_err().kind(),
            ErrorKind::Storage
        );
    }
}
