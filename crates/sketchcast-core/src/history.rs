//! Snapshot-based undo/redo driven by scene events.

use crate::scene::{ObserverId, SceneDocument, SceneEvent, SceneGraph, SceneObserver};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Errors from restoring a history snapshot.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Corrupt snapshot: {0}")]
    Corrupt(String),
}

/// Undo/redo stacks of serialized scenes.
///
/// `current` is the snapshot of the live scene; the undo stack holds the states
/// before it and the redo stack the states undone after it.
#[derive(Debug, Default)]
pub struct HistoryManager {
    undo_stack: Vec<String>,
    redo_stack: Vec<String>,
    current: Option<String>,
    suppressed: bool,
    limit: Option<usize>,
}

impl HistoryManager {
    pub fn new(baseline: Option<String>, limit: Option<usize>) -> Self {
        Self {
            current: baseline,
            limit,
            ..Default::default()
        }
    }

    /// Record a committed state. Identical consecutive snapshots are dropped.
    /// Returns true if the snapshot was recorded.
    pub fn record(&mut self, snapshot: String) -> bool {
        if self.suppressed {
            return false;
        }
        if self.current.as_deref() == Some(snapshot.as_str()) {
            log::trace!("Skipping duplicate history snapshot");
            return false;
        }
        if let Some(previous) = self.current.replace(snapshot) {
            self.undo_stack.push(previous);
            if let Some(limit) = self.limit {
                while self.undo_stack.len() > limit {
                    self.undo_stack.remove(0);
                }
            }
        }
        self.redo_stack.clear();
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of states that can be undone.
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Forget everything and start again from `baseline`.
    pub fn reset(&mut self, baseline: Option<String>) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current = baseline;
    }

    fn peek(stack: &[String]) -> Result<Option<(String, SceneDocument)>, HistoryError> {
        let Some(snapshot) = stack.last() else {
            return Ok(None);
        };
        let document = SceneDocument::from_snapshot(snapshot)
            .map_err(|e| HistoryError::Corrupt(e.to_string()))?;
        Ok(Some((snapshot.clone(), document)))
    }

    fn commit_undo(&mut self, target: String) {
        self.undo_stack.pop();
        if let Some(current) = self.current.replace(target) {
            self.redo_stack.push(current);
        }
    }

    fn commit_redo(&mut self, target: String) {
        self.redo_stack.pop();
        if let Some(current) = self.current.replace(target) {
            self.undo_stack.push(current);
        }
    }
}

impl SceneObserver for HistoryManager {
    fn on_scene_event(&mut self, event: &SceneEvent, document: &SceneDocument) {
        if self.suppressed || !event.is_mutation() {
            return;
        }
        match document.to_snapshot() {
            Ok(snapshot) => {
                self.record(snapshot);
            }
            Err(e) => log::warn!("Failed to snapshot scene after {:?}: {}", event, e),
        }
    }
}

/// Sets the suppression flag for as long as it lives.
struct SuppressGuard<'a>(&'a RefCell<HistoryManager>);

impl<'a> SuppressGuard<'a> {
    fn new(manager: &'a RefCell<HistoryManager>) -> Self {
        manager.borrow_mut().suppressed = true;
        Self(manager)
    }
}

impl Drop for SuppressGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut manager) = self.0.try_borrow_mut() {
            manager.suppressed = false;
        }
    }
}

enum Direction {
    Undo,
    Redo,
}

/// A [`HistoryManager`] subscribed to a scene.
///
/// Restores go through the scene while the manager is flagged as suppressed,
/// so replaying a snapshot is never itself recorded.
#[derive(Clone)]
pub struct History {
    inner: Rc<RefCell<HistoryManager>>,
    observer: Option<ObserverId>,
}

impl History {
    /// Subscribe to `scene`, taking its current state as the baseline.
    pub fn attach(scene: &mut SceneGraph, limit: Option<usize>) -> Self {
        let baseline = match scene.document().to_snapshot() {
            Ok(s) => Some(s),
            Err(e) => {
                log::warn!("No history baseline: {}", e);
                None
            }
        };
        let inner = Rc::new(RefCell::new(HistoryManager::new(baseline, limit)));
        let observer = scene.subscribe(inner.clone());
        Self {
            inner,
            observer: Some(observer),
        }
    }

    /// Stop recording changes from `scene`.
    pub fn detach(&mut self, scene: &mut SceneGraph) {
        if let Some(id) = self.observer.take() {
            scene.unsubscribe(id);
        }
    }

    pub fn can_undo(&self) -> bool {
        self.inner.borrow().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.inner.borrow().can_redo()
    }

    pub fn undo_len(&self) -> usize {
        self.inner.borrow().undo_len()
    }

    pub fn redo_len(&self) -> usize {
        self.inner.borrow().redo_len()
    }

    /// Snapshot of the state history considers live.
    pub fn current(&self) -> Option<String> {
        self.inner.borrow().current().map(str::to_owned)
    }

    /// Record an externally produced snapshot.
    pub fn record(&self, snapshot: String) -> bool {
        self.inner.borrow_mut().record(snapshot)
    }

    /// Step back one state. Returns true if the scene changed.
    /// Empty stack is a no-op; a corrupt snapshot is logged and leaves everything untouched.
    pub fn undo(&self, scene: &mut SceneGraph) -> bool {
        self.step(scene, Direction::Undo)
    }

    /// Step forward one state. Same failure rules as [`History::undo`].
    pub fn redo(&self, scene: &mut SceneGraph) -> bool {
        self.step(scene, Direction::Redo)
    }

    /// Record the live scene if it drifted from the last committed snapshot,
    /// e.g. through silent edits nobody committed yet.
    fn sync_live(&self, scene: &SceneGraph) {
        let live = match scene.document().to_snapshot() {
            Ok(live) => live,
            Err(e) => {
                log::warn!("Failed to snapshot live scene: {}", e);
                return;
            }
        };
        let mut manager = self.inner.borrow_mut();
        if manager.current.as_deref() != Some(live.as_str()) {
            log::debug!("Recording uncommitted scene state before restore");
            manager.record(live);
        }
    }

    fn step(&self, scene: &mut SceneGraph, direction: Direction) -> bool {
        self.sync_live(scene);
        let peeked = {
            let manager = self.inner.borrow();
            match direction {
                Direction::Undo => HistoryManager::peek(&manager.undo_stack),
                Direction::Redo => HistoryManager::peek(&manager.redo_stack),
            }
        };
        let (snapshot, document) = match peeked {
            Ok(Some(target)) => target,
            Ok(None) => return false,
            Err(e) => {
                log::error!("History restore aborted: {}", e);
                return false;
            }
        };

        {
            let _guard = SuppressGuard::new(&self.inner);
            scene.restore(document);
        }

        let mut manager = self.inner.borrow_mut();
        match direction {
            Direction::Undo => manager.commit_undo(snapshot),
            Direction::Redo => manager.commit_redo(snapshot),
        }
        true
    }
}
