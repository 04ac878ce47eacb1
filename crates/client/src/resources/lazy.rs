//! Viewport-triggered loading of deferred resources.
//!
//! Elements carrying a deferred resource are registered with a
//! [`VisibilityObserver`]. Once an element enters the viewport (expanded by
//! a root margin) the loader hands it out exactly once and stops observing it.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub type ElementId = u64;

/// Which in-page cache a deferred resource lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image,
    Component,
    General,
}

/// An element whose resource is fetched only when it becomes visible.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredElement {
    pub id: ElementId,
    pub kind: AssetKind,
    pub src: String,
}

/// Axis-aligned rectangle in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn expand(&self, margin: f32) -> Self {
        Self {
            x: self.x - margin,
            y: self.y - margin,
            width: self.width + 2.0 * margin,
            height: self.height + 2.0 * margin,
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// Capability that reports which observed elements have become visible.
pub trait VisibilityObserver: Send {
    fn observe(&mut self, element: &DeferredElement);

    fn unobserve(&mut self, id: ElementId);

    /// Observed elements currently inside the (margin-expanded) viewport.
    fn visible(&mut self) -> Vec<ElementId>;
}

#[derive(Debug, Default)]
struct ViewportState {
    viewport: Rect,
    bounds: HashMap<ElementId, Rect>,
    observed: BTreeSet<ElementId>,
}

/// Geometry-based observer: element rectangles against a viewport rectangle.
///
/// Clones share state, so a layout collaborator can keep one handle to feed
/// geometry while the loader owns another.
#[derive(Debug, Clone, Default)]
pub struct ViewportObserver {
    root_margin: f32,
    state: Arc<Mutex<ViewportState>>,
}

impl ViewportObserver {
    pub fn new(root_margin: f32) -> Self {
        Self { root_margin, state: Arc::default() }
    }

    pub fn set_viewport(&self, viewport: Rect) {
        if let Ok(mut state) = self.state.lock() {
            state.viewport = viewport;
        }
    }

    pub fn set_bounds(&self, id: ElementId, bounds: Rect) {
        if let Ok(mut state) = self.state.lock() {
            state.bounds.insert(id, bounds);
        }
    }

    pub fn is_observing(&self, id: ElementId) -> bool {
        self.state.lock().map(|s| s.observed.contains(&id)).unwrap_or(false)
    }
}

impl VisibilityObserver for ViewportObserver {
    fn observe(&mut self, element: &DeferredElement) {
        if let Ok(mut state) = self.state.lock() {
            state.observed.insert(element.id);
        }
    }

    fn unobserve(&mut self, id: ElementId) {
        if let Ok(mut state) = self.state.lock() {
            state.observed.remove(&id);
            state.bounds.remove(&id);
        }
    }

    fn visible(&mut self) -> Vec<ElementId> {
        let Ok(state) = self.state.lock() else {
            return Vec::new();
        };
        let region = state.viewport.expand(self.root_margin);
        state
            .observed
            .iter()
            .filter(|id| state.bounds.get(id).is_some_and(|b| b.intersects(&region)))
            .copied()
            .collect()
    }
}

/// Tracks deferred elements until they are handed out for loading.
pub struct LazyLoader {
    observer: Box<dyn VisibilityObserver>,
    pending: HashMap<ElementId, DeferredElement>,
    loaded: HashSet<ElementId>,
}

impl LazyLoader {
    pub fn new(observer: Box<dyn VisibilityObserver>) -> Self {
        Self { observer, pending: HashMap::new(), loaded: HashSet::new() }
    }

    /// Start observing an element. Already loaded or pending ids are ignored.
    pub fn register(&mut self, element: DeferredElement) -> bool {
        if self.loaded.contains(&element.id) || self.pending.contains_key(&element.id) {
            return false;
        }
        self.observer.observe(&element);
        self.pending.insert(element.id, element);
        true
    }

    /// Take every pending element that has entered the viewport.
    ///
    /// Each element is returned once; it is marked loaded and no longer
    /// observed.
    pub fn take_entered(&mut self) -> Vec<DeferredElement> {
        let mut entered = Vec::new();
        for id in self.observer.visible() {
            if let Some(element) = self.pending.remove(&id) {
                self.observer.unobserve(id);
                self.loaded.insert(id);
                entered.push(element);
            }
        }
        entered
    }

    pub fn is_loaded(&self, id: ElementId) -> bool {
        self.loaded.contains(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Forget load marks so elements can be registered again.
    pub fn reset_loaded(&mut self) {
        self.loaded.clear();
    }
}
