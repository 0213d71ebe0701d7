//! Scene graph: the document, selection/edit state, observers and render requests.

use crate::background::{BackgroundLayer, BackgroundPolicy};
use crate::shapes::{Freehand, Shape, ShapeId};
use kurbo::{Affine, Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Errors from serializing or restoring the scene.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    #[error("Object not found: {0}")]
    NotFound(ShapeId),
}

/// Everything that is drawn: surface size, background, objects back-to-front.
///
/// Objects are kept in a `Vec` so that two equal scenes always serialize to the
/// same string, which history deduplication relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub background: Option<BackgroundLayer>,
    #[serde(default)]
    pub objects: Vec<Shape>,
}

impl SceneDocument {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            background: None,
            objects: Vec::new(),
        }
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.objects.iter().find(|s| s.id() == id)
    }

    pub fn get_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.objects.iter_mut().find(|s| s.id() == id)
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Whether there is anything worth streaming.
    pub fn has_content(&self) -> bool {
        self.background.is_some() || !self.objects.is_empty()
    }

    pub fn surface_size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Serialize to a history snapshot.
    pub fn to_snapshot(&self) -> Result<String, SceneError> {
        serde_json::to_string(self).map_err(|e| SceneError::Serialization(e.to_string()))
    }

    /// Parse a history snapshot.
    pub fn from_snapshot(snapshot: &str) -> Result<Self, SceneError> {
        serde_json::from_str(snapshot).map_err(|e| SceneError::Deserialization(e.to_string()))
    }
}

/// What changed in the scene.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    ObjectAdded(ShapeId),
    ObjectRemoved(ShapeId),
    ObjectModified(ShapeId),
    /// A freehand stroke was completed.
    PathCreated(ShapeId),
    BackgroundChanged,
    Cleared,
    /// The whole document was replaced from a snapshot.
    Restored,
}

impl SceneEvent {
    /// Whether the event represents a user mutation that history should record.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, SceneEvent::Restored)
    }
}

/// Receives scene change notifications.
pub trait SceneObserver {
    fn on_scene_event(&mut self, event: &SceneEvent, document: &SceneDocument);
}

/// Handle returned by [`SceneGraph::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Tracks whether the surface needs repainting.
#[derive(Debug, Clone, Default)]
pub struct RenderRequests {
    dirty: bool,
    continuous: bool,
}

impl RenderRequests {
    pub fn request(&mut self) {
        self.dirty = true;
    }

    /// Continuous mode paints every frame regardless of changes.
    pub fn set_continuous(&mut self, continuous: bool) {
        self.continuous = continuous;
        self.dirty = true;
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    pub fn is_pending(&self) -> bool {
        self.dirty || self.continuous
    }

    /// Consume the pending request. Returns true if a frame should be drawn.
    pub fn take(&mut self) -> bool {
        let draw = self.is_pending();
        self.dirty = false;
        draw
    }
}

/// The retained-mode scene: owns all objects and emits change events.
pub struct SceneGraph {
    document: SceneDocument,
    selection: Option<ShapeId>,
    editing: Option<ShapeId>,
    observers: Vec<(ObserverId, Rc<RefCell<dyn SceneObserver>>)>,
    next_observer: u64,
    render: RenderRequests,
}

impl SceneGraph {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            document: SceneDocument::new(width, height),
            selection: None,
            editing: None,
            observers: Vec::new(),
            next_observer: 0,
            render: RenderRequests::default(),
        }
    }

    pub fn document(&self) -> &SceneDocument {
        &self.document
    }

    pub fn objects(&self) -> &[Shape] {
        &self.document.objects
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.document.get(id)
    }

    pub fn len(&self) -> usize {
        self.document.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.is_empty()
    }

    pub fn surface_size(&self) -> Size {
        self.document.surface_size()
    }

    pub fn render_requests(&mut self) -> &mut RenderRequests {
        &mut self.render
    }

    pub fn request_render(&mut self) {
        self.render.request();
    }

    /// Register an observer. Observers are notified in subscription order.
    pub fn subscribe(&mut self, observer: Rc<RefCell<dyn SceneObserver>>) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, observer));
        id
    }

    /// Remove an observer. Returns false if it was not subscribed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn emit(&mut self, event: SceneEvent) {
        self.render.request();
        for (id, observer) in &self.observers {
            match observer.try_borrow_mut() {
                Ok(mut observer) => observer.on_scene_event(&event, &self.document),
                Err(_) => log::warn!("Observer {:?} busy, dropped {:?}", id, event),
            }
        }
    }

    // --- Mutations ---

    /// Insert an object on top of the stack.
    pub fn insert(&mut self, shape: Shape) -> ShapeId {
        let id = shape.id();
        self.document.objects.push(shape);
        self.emit(SceneEvent::ObjectAdded(id));
        id
    }

    /// Insert a completed freehand stroke.
    pub fn insert_path(&mut self, stroke: Freehand) -> ShapeId {
        let shape = Shape::Freehand(stroke);
        let id = shape.id();
        self.document.objects.push(shape);
        self.emit(SceneEvent::PathCreated(id));
        id
    }

    /// Remove an object, clearing selection/editing state that referenced it.
    pub fn remove(&mut self, id: ShapeId) -> Option<Shape> {
        let index = self.document.objects.iter().position(|s| s.id() == id)?;
        let shape = self.document.objects.remove(index);
        if self.selection == Some(id) {
            self.selection = None;
        }
        if self.editing == Some(id) {
            self.editing = None;
        }
        self.emit(SceneEvent::ObjectRemoved(id));
        Some(shape)
    }

    /// Mutate an object and emit a modification event.
    pub fn modify<F>(&mut self, id: ShapeId, f: F) -> Result<(), SceneError>
    where
        F: FnOnce(&mut Shape),
    {
        self.modify_silently(id, f)?;
        self.emit(SceneEvent::ObjectModified(id));
        Ok(())
    }

    /// Mutate an object without notifying observers (used mid-gesture).
    /// Follow up with [`SceneGraph::commit_modified`] when the gesture ends.
    pub fn modify_silently<F>(&mut self, id: ShapeId, f: F) -> Result<(), SceneError>
    where
        F: FnOnce(&mut Shape),
    {
        let shape = self.document.get_mut(id).ok_or(SceneError::NotFound(id))?;
        f(shape);
        self.render.request();
        Ok(())
    }

    /// Emit the modification event for an object changed silently.
    pub fn commit_modified(&mut self, id: ShapeId) -> Result<(), SceneError> {
        if !self.document.contains(id) {
            return Err(SceneError::NotFound(id));
        }
        self.emit(SceneEvent::ObjectModified(id));
        Ok(())
    }

    pub fn transform(&mut self, id: ShapeId, affine: Affine) -> Result<(), SceneError> {
        self.modify(id, |shape| shape.transform(affine))
    }

    /// Install a background, resizing the surface to its display size.
    pub fn set_background(&mut self, layer: BackgroundLayer, policy: BackgroundPolicy) {
        if policy == BackgroundPolicy::ClearObjects {
            self.document.objects.clear();
            self.selection = None;
            self.editing = None;
        }
        self.document.width = layer.display_width as f64;
        self.document.height = layer.display_height as f64;
        self.document.background = Some(layer);
        self.emit(SceneEvent::BackgroundChanged);
    }

    /// Remove all objects and the background.
    pub fn clear(&mut self) {
        self.document.objects.clear();
        self.document.background = None;
        self.selection = None;
        self.editing = None;
        self.emit(SceneEvent::Cleared);
    }

    /// Replace the whole document. Selection survives only if its object still exists.
    pub fn restore(&mut self, document: SceneDocument) {
        self.document = document;
        if self.selection.is_some_and(|id| !self.document.contains(id)) {
            self.selection = None;
        }
        if self.editing.is_some_and(|id| !self.document.contains(id)) {
            self.editing = None;
        }
        self.emit(SceneEvent::Restored);
    }

    // --- Selection and editing ---

    /// Make `id` the sole selection. Returns false if it is missing or not selectable.
    pub fn select(&mut self, id: ShapeId) -> bool {
        match self.document.get(id) {
            Some(shape) if shape.flags().selectable => {
                if self.selection != Some(id) {
                    self.selection = Some(id);
                    self.render.request();
                }
                true
            }
            _ => false,
        }
    }

    pub fn clear_selection(&mut self) {
        if self.selection.take().is_some() {
            self.render.request();
        }
        self.editing = None;
    }

    pub fn selection(&self) -> Option<ShapeId> {
        self.selection
    }

    pub fn selected_shape(&self) -> Option<&Shape> {
        self.selection.and_then(|id| self.document.get(id))
    }

    pub fn selected_bounds(&self) -> Option<Rect> {
        self.selected_shape().map(Shape::bounds)
    }

    pub fn enter_text_editing(&mut self, id: ShapeId) -> bool {
        let is_text = self.document.get(id).is_some_and(|s| s.as_text().is_some());
        if is_text {
            self.editing = Some(id);
            self.render.request();
        }
        is_text
    }

    pub fn exit_text_editing(&mut self) {
        if self.editing.take().is_some() {
            self.render.request();
        }
    }

    pub fn editing(&self) -> Option<ShapeId> {
        self.editing
    }

    /// Topmost object under `point` that receives pointer events.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> Option<ShapeId> {
        self.document
            .objects
            .iter()
            .rev()
            .find(|s| s.flags().evented && s.hit_test(point, tolerance))
            .map(Shape::id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{InitialGeometry, ShapeKind};

    #[derive(Default)]
    struct Recorder {
        events: Vec<SceneEvent>,
        sizes: Vec<usize>,
    }

    impl SceneObserver for Recorder {
        fn on_scene_event(&mut self, event: &SceneEvent, document: &SceneDocument) {
            self.events.push(event.clone());
            self.sizes.push(document.len());
        }
    }

    fn rect() -> Shape {
        Shape::with_defaults(ShapeKind::Rectangle, &InitialGeometry::default()).unwrap()
    }

    #[test]
    fn test_insert_and_remove_emit_events() {
        let mut scene = SceneGraph::new(800.0, 600.0);
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        scene.subscribe(recorder.clone());

        let id = scene.insert(rect());
        scene.select(id);
        assert!(scene.remove(id).is_some());
        assert_eq!(scene.selection(), None);

        let rec = recorder.borrow();
        assert_eq!(
            rec.events,
            vec![SceneEvent::ObjectAdded(id), SceneEvent::ObjectRemoved(id)]
        );
        assert_eq!(rec.sizes, vec![1, 0]);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let mut scene = SceneGraph::new(800.0, 600.0);
        let a = Rc::new(RefCell::new(Recorder::default()));
        let b = Rc::new(RefCell::new(Recorder::default()));
        let a_id = scene.subscribe(a.clone());
        scene.subscribe(b.clone());

        scene.insert(rect());
        assert!(scene.unsubscribe(a_id));
        assert!(!scene.unsubscribe(a_id));
        scene.insert(rect());

        assert_eq!(a.borrow().events.len(), 1);
        assert_eq!(b.borrow().events.len(), 2);
    }

    #[test]
    fn test_busy_observer_is_skipped() {
        let mut scene = SceneGraph::new(800.0, 600.0);
        let rec = Rc::new(RefCell::new(Recorder::default()));
        scene.subscribe(rec.clone());
        let _held = rec.borrow_mut();
        scene.insert(rect());
    }

    #[test]
    fn test_silent_modify_then_commit() {
        let mut scene = SceneGraph::new(800.0, 600.0);
        let rec = Rc::new(RefCell::new(Recorder::default()));
        let id = scene.insert(rect());
        scene.subscribe(rec.clone());

        scene
            .modify_silently(id, |s| s.transform(Affine::translate((5.0, 0.0))))
            .unwrap();
        assert!(rec.borrow().events.is_empty());
        scene.commit_modified(id).unwrap();
        assert_eq!(rec.borrow().events, vec![SceneEvent::ObjectModified(id)]);
    }

    #[test]
    fn test_modify_missing_object() {
        let mut scene = SceneGraph::new(800.0, 600.0);
        let missing = uuid::Uuid::new_v4();
        assert!(matches!(
            scene.modify(missing, |_| {}),
            Err(SceneError::NotFound(_))
        ));
    }

    #[test]
    fn test_hit_test_topmost_and_evented() {
        let mut scene = SceneGraph::new(800.0, 600.0);
        let bottom = scene.insert(rect());
        let top = scene.insert(rect());
        let p = Point::new(150.0, 140.0);
        assert_eq!(scene.hit_test(p, 0.0), Some(top));

        scene.modify(top, |s| s.flags_mut().evented = false).unwrap();
        assert_eq!(scene.hit_test(p, 0.0), Some(bottom));
    }

    #[test]
    fn test_unselectable_object() {
        let mut scene = SceneGraph::new(800.0, 600.0);
        let id = scene.insert(rect());
        scene.modify(id, |s| s.flags_mut().selectable = false).unwrap();
        assert!(!scene.select(id));
        assert_eq!(scene.selection(), None);
    }

    #[test]
    fn test_snapshot_is_stable() {
        let mut scene = SceneGraph::new(800.0, 600.0);
        scene.insert(rect());
        scene.insert(Shape::with_defaults(ShapeKind::Polygon, &InitialGeometry::default()).unwrap());
        let first = scene.document().to_snapshot().unwrap();
        let restored = SceneDocument::from_snapshot(&first).unwrap();
        assert_eq!(restored.to_snapshot().unwrap(), first);
        assert!(SceneDocument::from_snapshot("{not json").is_err());
    }

    #[test]
    fn test_restore_drops_stale_selection() {
        let mut scene = SceneGraph::new(800.0, 600.0);
        let empty = scene.document().clone();
        let id = scene.insert(rect());
        scene.select(id);
        scene.restore(empty);
        assert_eq!(scene.selection(), None);
        assert!(scene.is_empty());
    }

    #[test]
    fn test_render_requests() {
        let mut scene = SceneGraph::new(800.0, 600.0);
        scene.render_requests().take();
        assert!(!scene.render_requests().is_pending());
        scene.insert(rect());
        assert!(scene.render_requests().take());
        assert!(!scene.render_requests().take());

        scene.render_requests().set_continuous(true);
        assert!(scene.render_requests().take());
        assert!(scene.render_requests().take());
    }

    #[test]
    fn test_restored_is_not_a_mutation() {
        assert!(!SceneEvent::Restored.is_mutation());
        assert!(SceneEvent::BackgroundChanged.is_mutation());
    }
}
