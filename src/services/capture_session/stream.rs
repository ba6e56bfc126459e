use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::warn;

use super::session::{CaptureSession, MotionItem, SessionId, SessionSetup};

enum StreamState {
    Pending(Box<SessionSetup>),
    Running(mpsc::UnboundedReceiver<MotionItem>),
    Finished,
}

/// Ленивый поток смещений одной сессии захвата.
///
/// Сессия стартует при первом `next()` (или явном `start()`). Поток выдаёт
/// смещения, затем не более одной ошибки, затем `None`. Удаление потока -
/// отмена со стороны потребителя: сессия освобождает захват. Повторно не запускается.
pub struct MotionStream {
    id: SessionId,
    inner: StreamState,
}

impl MotionStream {
    pub(crate) fn new(setup: SessionSetup) -> Self {
        Self {
            id: setup.id,
            inner: StreamState::Pending(Box::new(setup)),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Запустить сессию, не дожидаясь первого `next()`. Повторный вызов - no-op.
    ///
    /// Сессии нужен tokio runtime (watchdog и задача сессии). Вне runtime
    /// поток выдаёт одну ошибку `Backend` и закрывается, запрос не отправляется.
    pub fn start(&mut self) {
        self.inner = match std::mem::replace(&mut self.inner, StreamState::Finished) {
            StreamState::Pending(setup) => match Handle::try_current() {
                Ok(_) => StreamState::Running(CaptureSession::start(*setup)),
                Err(e) => {
                    warn!("{}: запуск вне tokio runtime: {}", setup.id, e);
                    let (output, receiver) = mpsc::unbounded_channel();
                    let _ = output.send(Err(crate::pointer_lock_error!(
                        backend,
                        "{} запущена вне tokio runtime: {}",
                        setup.id,
                        e
                    )));
                    StreamState::Running(receiver)
                }
            },
            other => other,
        };
    }

    pub fn is_started(&self) -> bool {
        !matches!(self.inner, StreamState::Pending(_))
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.inner, StreamState::Finished)
    }

    pub async fn next(&mut self) -> Option<MotionItem> {
        self.start();

        let StreamState::Running(receiver) = &mut self.inner else {
            return None;
        };

        match receiver.recv().await {
            Some(Ok(delta)) => Some(Ok(delta)),
            Some(Err(error)) => {
                // Ошибка всегда последняя
                self.inner = StreamState::Finished;
                Some(Err(error))
            }
            None => {
                self.inner = StreamState::Finished;
                None
            }
        }
    }

    /// Явная отмена; эквивалентна удалению потока
    pub fn cancel(self) {
        drop(self);
    }
}
