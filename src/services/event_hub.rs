use crate::events::{PointerMove, PointerRelease};
use crate::services::browser::PointerLockBackend;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// PointerEventHub republishes page-level pointer events as broadcast feeds.
///
/// Responsibilities (strict):
/// - Attach exactly one move listener and one release listener to the page, once.
/// - Keep those listeners alive for as long as the hub lives, independent of any session.
/// - Do NOT know about capture sessions or capture targets; filtering belongs to sessions.
///
/// Some engines drop motion events for listeners attached after capture begins,
/// so the listeners are attached ahead of any capture request.
pub struct PointerEventHub {
    move_tx: broadcast::Sender<PointerMove>,
    release_tx: broadcast::Sender<PointerRelease>,
}

impl PointerEventHub {
    pub fn attach(backend: &dyn PointerLockBackend, capacity: usize) -> Arc<Self> {
        info!("Подключение PointerEventHub к событиям страницы (ёмкость: {})", capacity);

        let (move_tx, _) = broadcast::channel(capacity);
        let (release_tx, _) = broadcast::channel(capacity);

        let tx = move_tx.clone();
        backend.add_pointer_move_listener(Box::new(move |event| {
            // Ошибка означает отсутствие подписчиков - событие никому не нужно
            let _ = tx.send(event);
        }));

        let tx = release_tx.clone();
        backend.add_pointer_up_listener(Box::new(move |event| {
            let _ = tx.send(event);
        }));

        Arc::new(Self {
            move_tx,
            release_tx,
        })
    }

    pub fn on_pointer_move(&self) -> broadcast::Receiver<PointerMove> {
        self.move_tx.subscribe()
    }

    pub fn on_pointer_release(&self) -> broadcast::Receiver<PointerRelease> {
        self.release_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PointerButton;
    use crate::services::browser::SimulatedBrowser;

    #[test]
    fn fans_out_to_every_subscriber() {
        let browser = SimulatedBrowser::default();
        let hub = PointerEventHub::attach(&browser, 16);

        let mut first = hub.on_pointer_move();
        let mut second = hub.on_pointer_move();
        browser.move_by(5.0, -3.0);

        assert_eq!(first.try_recv().unwrap().delta().x, 5.0);
        assert_eq!(second.try_recv().unwrap().delta().y, -3.0);
    }

    #[test]
    fn does_not_replay_past_events() {
        let browser = SimulatedBrowser::default();
        let hub = PointerEventHub::attach(&browser, 16);

        browser.move_by(1.0, 1.0);
        browser.release_button(PointerButton::Primary);

        let mut moves = hub.on_pointer_move();
        let mut releases = hub.on_pointer_release();
        assert!(moves.try_recv().is_err());
        assert!(releases.try_recv().is_err());

        browser.release_button(PointerButton::Secondary);
        assert_eq!(releases.try_recv().unwrap().button, PointerButton::Secondary);
    }

    #[test]
    fn attaches_one_listener_per_feed() {
        let browser = SimulatedBrowser::default();
        let hub = PointerEventHub::attach(&browser, 16);

        assert_eq!(browser.listener_count(), 2);

        let mut moves = hub.on_pointer_move();
        browser.move_by(1.0, 0.0);
        assert_eq!(moves.try_recv().unwrap().delta().x, 1.0);
        assert!(moves.try_recv().is_err());
    }
}
