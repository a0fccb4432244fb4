use parking_lot::Mutex;
use std::{collections::VecDeque, path::Path};
use tracing::{debug, info};

use crate::audio::clip::Clip;

/// FIFO of clips waiting to be played in one guild.
///
/// Any task may append; only the owning [`AudioSession`] takes clips out.
///
/// [`AudioSession`]: crate::audio::session::AudioSession
#[derive(Debug, Default)]
pub struct ClipQueue {
    items: Mutex<VecDeque<Clip>>,
}

impl ClipQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a clip at the back.
    pub fn push(&self, clip: Clip) {
        debug!("➕ En cola: {}", clip.clip_id());
        self.items.lock().push_back(clip);
    }

    /// Takes the oldest clip (strict FIFO).
    pub fn pop(&self) -> Option<Clip> {
        self.items.lock().pop_front()
    }

    /// Empties the queue, returning how many clips were dropped.
    pub fn clear(&self) -> usize {
        let mut items = self.items.lock();
        let dropped = items.len();
        items.clear();
        if dropped > 0 {
            info!("🗑️ Descartados {} clips en cola", dropped);
        }
        dropped
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Whether a queued clip still points at `path`.
    pub fn references(&self, path: &Path) -> bool {
        self.items.lock().iter().any(|clip| clip.audio_path() == path)
    }

    /// Clip ids in play order.
    pub fn clip_ids(&self) -> Vec<String> {
        self.items.lock().iter().map(Clip::clip_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::clip::ClipKind;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn clip(name: &str) -> Clip {
        Clip::new(ClipKind::Local, name, format!("clips/{name}.mp3"))
    }

    #[test]
    fn test_fifo_order() {
        let queue = ClipQueue::new();
        queue.push(clip("a"));
        queue.push(clip("b"));
        queue.push(clip("c"));

        assert_eq!(queue.clip_ids(), vec!["local:a", "local:b", "local:c"]);
        assert_eq!(queue.pop().map(|c| c.clip_id()), Some("local:a".to_string()));
        assert_eq!(queue.pop().map(|c| c.clip_id()), Some("local:b".to_string()));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_clear_reports_dropped() {
        let queue = ClipQueue::new();
        assert_eq!(queue.clear(), 0);
        queue.push(clip("a"));
        queue.push(clip("b"));
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_references_path() {
        let queue = ClipQueue::new();
        queue.push(clip("a"));
        assert!(queue.references(Path::new("clips/a.mp3")));
        assert!(!queue.references(Path::new("clips/b.mp3")));
    }

    #[test]
    fn test_concurrent_producers_keep_every_clip() {
        let queue = Arc::new(ClipQueue::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        queue.push(clip(&format!("{t}-{i}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(queue.len(), 100);

        // los clips de cada productor mantienen su orden
        let ids = queue.clip_ids();
        for t in 0..4 {
            let mine: Vec<_> = ids.iter().filter(|id| id.starts_with(&format!("local:{t}-"))).collect();
            let expected: Vec<_> = (0..25).map(|i| format!("local:{t}-{i}")).collect();
            assert_eq!(mine.into_iter().cloned().collect::<Vec<_>>(), expected);
        }
    }
}
