//! Sequential preloading of slides adjacent to the current one.
//!
//! A navigation enqueues the previous slide and the next two, skipping slides
//! already loaded, queued or in flight. Items are handed out one at a time;
//! the manager paces them so preloads never run in parallel.
//!
//! Navigating away drops queued slides that left the adjacency window and
//! signals cancellation to an in-flight preload whose slide left it.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Notify;

/// Content model collaborator: slide count, per-slide resources, and the
/// rendered slides that can be unloaded under memory pressure.
pub trait SlideDeck: Send + Sync {
    fn slide_count(&self) -> usize;

    /// URLs a slide needs to render.
    fn slide_resources(&self, index: usize) -> Vec<String>;

    /// Tear down rendered slides farther than `distance` from `current`.
    ///
    /// Returns the indices that were unloaded.
    fn unload_distant(&self, current: usize, distance: usize) -> Vec<usize>;
}

#[derive(Debug, Clone)]
pub struct PreloadQueueItem {
    pub slide_index: usize,
    pub enqueued_at: Instant,
}

/// Handle to the preload currently being executed.
#[derive(Debug, Clone)]
pub struct InFlight {
    pub slide_index: usize,
    pub cancel: Arc<Notify>,
}

/// Slides worth preloading around `current`, in priority order:
/// previous, next, the one after next.
pub fn adjacent_slides(current: usize, total: usize) -> Vec<usize> {
    [current.checked_sub(1), current.checked_add(1), current.checked_add(2)]
        .into_iter()
        .flatten()
        .filter(|&i| i < total)
        .collect()
}

#[derive(Debug, Default)]
pub struct PreloadScheduler {
    queue: VecDeque<PreloadQueueItem>,
    loaded: HashSet<usize>,
    in_flight: Option<InFlight>,
}

impl PreloadScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// React to a navigation. Returns the newly enqueued indices.
    pub fn on_navigate(&mut self, current: usize, total: usize) -> Vec<usize> {
        let window = adjacent_slides(current, total);

        let before = self.queue.len();
        self.queue.retain(|item| window.contains(&item.slide_index));
        let dropped = before - self.queue.len();

        if let Some(in_flight) = &self.in_flight
            && !window.contains(&in_flight.slide_index)
        {
            tracing::debug!(slide = in_flight.slide_index, "cancelling preload outside window");
            in_flight.cancel.notify_one();
        }

        let mut enqueued = Vec::new();
        for index in window {
            let in_flight = self.in_flight.as_ref().is_some_and(|f| f.slide_index == index);
            let queued = self.queue.iter().any(|item| item.slide_index == index);
            if self.loaded.contains(&index) || in_flight || queued {
                continue;
            }
            self.queue.push_back(PreloadQueueItem { slide_index: index, enqueued_at: Instant::now() });
            enqueued.push(index);
        }

        tracing::debug!(current, ?enqueued, dropped, "preload queue updated");
        enqueued
    }

    /// Pop the next item and mark it in flight.
    ///
    /// Returns `None` while another item is in flight or the queue is empty.
    pub fn next(&mut self) -> Option<(PreloadQueueItem, InFlight)> {
        if self.in_flight.is_some() {
            return None;
        }
        let item = self.queue.pop_front()?;
        let in_flight = InFlight { slide_index: item.slide_index, cancel: Arc::new(Notify::new()) };
        self.in_flight = Some(in_flight.clone());
        Some((item, in_flight))
    }

    /// Finish the in-flight item; a successful preload marks the slide loaded.
    pub fn complete(&mut self, slide_index: usize, loaded: bool) {
        if self.in_flight.as_ref().is_some_and(|f| f.slide_index == slide_index) {
            self.in_flight = None;
        }
        if loaded {
            self.loaded.insert(slide_index);
        }
    }

    pub fn mark_loaded(&mut self, slide_index: usize) {
        self.loaded.insert(slide_index);
    }

    pub fn is_loaded(&self, slide_index: usize) -> bool {
        self.loaded.contains(&slide_index)
    }

    /// Forget load marks, e.g. after slides were unloaded.
    pub fn forget(&mut self, slides: &[usize]) {
        for index in slides {
            self.loaded.remove(index);
        }
    }

    pub fn queued(&self) -> Vec<usize> {
        self.queue.iter().map(|item| item.slide_index).collect()
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Drop the queue and every load mark, cancelling any in-flight preload.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.loaded.clear();
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.cancel.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacent_slides_middle() {
        assert_eq!(adjacent_slides(5, 9), vec![4, 6, 7]);
    }

    #[test]
    fn test_adjacent_slides_edges() {
        assert_eq!(adjacent_slides(0, 9), vec![1, 2]);
        assert_eq!(adjacent_slides(8, 9), vec![7]);
        assert_eq!(adjacent_slides(7, 9), vec![6, 8]);
        assert!(adjacent_slides(0, 1).is_empty());
    }

    #[test]
    fn test_navigate_enqueues_in_priority_order() {
        let mut scheduler = PreloadScheduler::new();
        assert_eq!(scheduler.on_navigate(5, 9), vec![4, 6, 7]);
        assert_eq!(scheduler.queued(), vec![4, 6, 7]);
    }

    #[test]
    fn test_navigate_skips_loaded() {
        let mut scheduler = PreloadScheduler::new();
        scheduler.mark_loaded(6);
        assert_eq!(scheduler.on_navigate(5, 9), vec![4, 7]);
    }

    #[test]
    fn test_loaded_never_reenqueued() {
        let mut scheduler = PreloadScheduler::new();
        scheduler.on_navigate(5, 9);
        while let Some((item, _)) = scheduler.next() {
            scheduler.complete(item.slide_index, true);
        }
        assert!(scheduler.on_navigate(5, 9).is_empty());
        assert_eq!(scheduler.on_navigate(6, 9), vec![5, 8]);
    }

    #[test]
    fn test_repeat_navigation_does_not_duplicate() {
        let mut scheduler = PreloadScheduler::new();
        scheduler.on_navigate(5, 9);
        assert!(scheduler.on_navigate(5, 9).is_empty());
        assert_eq!(scheduler.queued().len(), 3);
    }

    #[test]
    fn test_next_is_sequential() {
        let mut scheduler = PreloadScheduler::new();
        scheduler.on_navigate(5, 9);
        let (first, _) = scheduler.next().unwrap();
        assert_eq!(first.slide_index, 4);
        assert!(scheduler.next().is_none());

        scheduler.complete(4, true);
        assert_eq!(scheduler.next().unwrap().0.slide_index, 6);
    }

    #[test]
    fn test_navigation_drops_stale_queue_items() {
        let mut scheduler = PreloadScheduler::new();
        scheduler.on_navigate(2, 20);
        assert_eq!(scheduler.on_navigate(10, 20), vec![9, 11, 12]);
        assert_eq!(scheduler.queued(), vec![9, 11, 12]);
    }

    #[tokio::test]
    async fn test_navigation_cancels_in_flight_outside_window() {
        let mut scheduler = PreloadScheduler::new();
        scheduler.on_navigate(2, 20);
        let (_, in_flight) = scheduler.next().unwrap();
        assert_eq!(in_flight.slide_index, 1);

        scheduler.on_navigate(10, 20);
        tokio::time::timeout(std::time::Duration::from_millis(100), in_flight.cancel.notified())
            .await
            .expect("in-flight preload should be cancelled");
    }

    #[test]
    fn test_failed_preload_can_be_retried() {
        let mut scheduler = PreloadScheduler::new();
        scheduler.on_navigate(5, 9);
        let (item, _) = scheduler.next().unwrap();
        scheduler.complete(item.slide_index, false);
        assert!(!scheduler.is_loaded(4));
        assert_eq!(scheduler.on_navigate(5, 9), vec![4]);
    }

    #[test]
    fn test_reset() {
        let mut scheduler = PreloadScheduler::new();
        scheduler.mark_loaded(1);
        scheduler.on_navigate(5, 9);
        scheduler.reset();
        assert!(scheduler.queued().is_empty());
        assert_eq!(scheduler.loaded_count(), 0);
    }
}
