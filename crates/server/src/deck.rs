//! Slide deck backed by the configured slide list.
//!
//! Rendering happens outside this process, so the deck only remembers which
//! slides the front-end reported as rendered and forgets the distant ones
//! under memory pressure.

use std::collections::BTreeSet;
use std::sync::Mutex;

use slidecache_client::SlideDeck;

pub struct ConfiguredDeck {
    slides: Vec<Vec<String>>,
    rendered: Mutex<BTreeSet<usize>>,
}

impl ConfiguredDeck {
    pub fn new(slides: Vec<Vec<String>>) -> Self {
        Self { slides, rendered: Mutex::new(BTreeSet::new()) }
    }

    pub fn mark_rendered(&self, index: usize) {
        if let Ok(mut rendered) = self.rendered.lock() {
            rendered.insert(index);
        }
    }
}

impl SlideDeck for ConfiguredDeck {
    fn slide_count(&self) -> usize {
        self.slides.len()
    }

    fn slide_resources(&self, index: usize) -> Vec<String> {
        self.slides.get(index).cloned().unwrap_or_default()
    }

    fn unload_distant(&self, current: usize, distance: usize) -> Vec<usize> {
        let Ok(mut rendered) = self.rendered.lock() else {
            return Vec::new();
        };
        let distant: Vec<usize> = rendered.iter().copied().filter(|i| i.abs_diff(current) > distance).collect();
        for index in &distant {
            rendered.remove(index);
        }
        distant
    }
}
