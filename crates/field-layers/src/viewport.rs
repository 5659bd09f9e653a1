//! Viewport change notifications.

use tokio::sync::watch;

pub use field_common::Viewport;

/// Publishes pan/zoom/resize to every subscriber (layers, playback windows).
#[derive(Debug)]
pub struct ViewportWatch {
    tx: watch::Sender<Viewport>,
}

impl ViewportWatch {
    pub fn new(viewport: Viewport) -> Self {
        let (tx, _) = watch::channel(viewport);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Viewport> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Viewport {
        *self.tx.borrow()
    }

    /// Replace the viewport. Subscribers see the change even when none were
    /// listening at the time of the previous update.
    pub fn set(&self, viewport: Viewport) {
        self.tx.send_replace(viewport);
    }

    pub fn pan(&self, dx_deg: f64, dy_deg: f64) {
        self.set(self.current().panned(dx_deg, dy_deg));
    }

    pub fn zoom(&self, factor: f64) {
        self.set(self.current().zoomed(factor));
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.set(self.current().resized(width, height));
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_common::BoundingBox;

    fn watch() -> ViewportWatch {
        ViewportWatch::new(Viewport::new(100, 50, BoundingBox::new(0.0, 0.0, 10.0, 5.0)))
    }

    #[test]
    fn test_pan_and_resize() {
        let vp = watch();
        vp.pan(1.0, -1.0);
        vp.resize(200, 80);
        let current = vp.current();
        assert_eq!(current.bounds, BoundingBox::new(1.0, -1.0, 11.0, 4.0));
        assert_eq!((current.width, current.height), (200, 80));
    }

    #[test]
    fn test_subscriber_sees_change() {
        let vp = watch();
        let mut rx = vp.subscribe();
        assert!(!rx.has_changed().unwrap());
        vp.zoom(0.5);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().bounds, BoundingBox::new(2.5, 1.25, 7.5, 3.75));
    }

    #[test]
    fn test_subscriber_count() {
        let vp = watch();
        let rx = vp.subscribe();
        assert_eq!(vp.subscriber_count(), 1);
        drop(rx);
        assert_eq!(vp.subscriber_count(), 0);
    }
}
