use crate::debug_if_enabled;
use crate::error::{PointerLockError, Result};
use crate::events::{CaptureChange, CaptureTarget, MotionDelta, PointerMove, PointerRelease};
use crate::services::browser::PointerLockBackend;
use crate::services::event_hub::PointerEventHub;
use crate::trace_if_enabled;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{mpsc, Notify};
use tokio::time::{sleep, Sleep};
use tracing::{debug, info, warn};

use super::state::{Effect, SessionEvent, SessionState};

/// Элемент выходного потока сессии
pub type MotionItem = Result<MotionDelta>;

/// Живые сессии сервиса и их сигналы принудительного завершения
pub type SessionRegistry = Arc<DashMap<SessionId, Arc<Notify>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Подсказка режима окна. Ядро её не интерпретирует
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowMode {
    #[default]
    Windowed,
    Fullscreen,
}

/// Подсказка вида курсора. Ядро её не интерпретирует
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CursorIcon {
    #[default]
    Default,
    Hidden,
    Crosshair,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub window: WindowMode,
    pub cursor: CursorIcon,
    /// Освобождать захват при отпускании основной кнопки
    pub release_on_pointer_up: bool,
}

impl SessionConfig {
    pub fn with_release_on_pointer_up(mut self, release: bool) -> Self {
        self.release_on_pointer_up = release;
        self
    }
}

/// Всё, что нужно для запуска сессии; создаётся сервисом
pub(crate) struct SessionSetup {
    pub id: SessionId,
    pub target: CaptureTarget,
    pub config: SessionConfig,
    pub confirm_timeout: Duration,
    pub backend: Arc<dyn PointerLockBackend>,
    pub hub: Arc<PointerEventHub>,
    pub registry: SessionRegistry,
}

/// Причина пробуждения цикла сессии
enum Wake {
    Shutdown,
    ConsumerGone,
    Change(std::result::Result<CaptureChange, RecvError>),
    Watchdog,
    Release(std::result::Result<PointerRelease, RecvError>),
    Move(std::result::Result<PointerMove, RecvError>),
}

/// Один жизненный цикл захвата: запрос, подтверждение или таймаут, ретрансляция, завершение.
///
/// Все ресурсы (подписки, watchdog, выходной канал) освобождаются в `terminate`,
/// который безопасно вызывать повторно.
pub struct CaptureSession {
    id: SessionId,
    target: CaptureTarget,
    confirm_timeout: Duration,
    state: SessionState,
    backend: Arc<dyn PointerLockBackend>,
    registry: SessionRegistry,
    shutdown: Arc<Notify>,
    watchdog: Option<Pin<Box<Sleep>>>,
    moves: Option<broadcast::Receiver<PointerMove>>,
    releases: Option<broadcast::Receiver<PointerRelease>>,
    changes: Option<broadcast::Receiver<CaptureChange>>,
    output: Option<mpsc::UnboundedSender<MotionItem>>,
}

impl CaptureSession {
    /// Синхронно открывает подписки, взводит watchdog и отправляет запрос захвата.
    ///
    /// Должен вызываться внутри tokio runtime. Возвращает приёмник выходного потока.
    pub(crate) fn start(setup: SessionSetup) -> mpsc::UnboundedReceiver<MotionItem> {
        let SessionSetup {
            id,
            target,
            config,
            confirm_timeout,
            backend,
            hub,
            registry,
        } = setup;

        info!(
            "Запуск {} для {} (окно: {:?}, курсор: {:?}, release_on_pointer_up: {})",
            id, target, config.window, config.cursor, config.release_on_pointer_up
        );

        let (output, receiver) = mpsc::unbounded_channel();

        // Подписки оформляются до запроса: уведомление может прийти синхронно
        let moves = hub.on_pointer_move();
        let releases = config
            .release_on_pointer_up
            .then(|| hub.on_pointer_release());
        let changes = backend.subscribe_lock_change();

        let shutdown = Arc::new(Notify::new());
        registry.insert(id, shutdown.clone());

        let mut session = Self {
            id,
            target,
            confirm_timeout,
            state: SessionState::Requesting,
            backend,
            registry,
            shutdown,
            watchdog: Some(Box::pin(sleep(confirm_timeout))),
            moves: Some(moves),
            releases,
            changes: Some(changes),
            output: Some(output),
        };

        if let Err(e) = session.backend.request_pointer_lock(target) {
            warn!("{}: запрос захвата завершился ошибкой: {}", id, e);
            let reason = match e {
                PointerLockError::RequestDenied(reason) => reason,
                other => other.to_string(),
            };
            session.handle(SessionEvent::RequestFailed(reason));
            return receiver;
        }

        tokio::spawn(session.run());
        receiver
    }

    async fn run(mut self) {
        debug!("{}: ожидание подтверждения захвата ({}мс)", self.id, self.confirm_timeout.as_millis());

        while !self.state.is_terminated() {
            let wake = self.wait().await;
            if let Some(event) = self.translate(wake) {
                self.handle(event);
            }
        }

        debug!("{}: цикл сессии завершён", self.id);
    }

    async fn wait(&mut self) -> Wake {
        let Self {
            shutdown,
            output,
            changes,
            watchdog,
            releases,
            moves,
            ..
        } = self;

        tokio::select! {
            biased;
            _ = shutdown.notified() => Wake::Shutdown,
            _ = consumer_gone(output) => Wake::ConsumerGone,
            change = recv_from(changes) => Wake::Change(change),
            _ = watchdog_fired(watchdog) => Wake::Watchdog,
            release = recv_from(releases) => Wake::Release(release),
            event = recv_from(moves) => Wake::Move(event),
        }
    }

    /// Перевод сырого пробуждения в событие автомата с фильтрацией по живой цели
    fn translate(&mut self, wake: Wake) -> Option<SessionEvent> {
        match wake {
            Wake::Shutdown => {
                info!("{}: принудительное завершение", self.id);
                Some(SessionEvent::Cancel)
            }
            Wake::ConsumerGone => {
                debug!("{}: потребитель перестал читать поток", self.id);
                Some(SessionEvent::Cancel)
            }
            Wake::Watchdog => {
                self.watchdog = None;
                Some(SessionEvent::Timeout(self.confirm_timeout))
            }
            Wake::Change(Ok(change)) => match (change.target, self.state) {
                (Some(target), _) if target == self.target => Some(SessionEvent::Confirmed),
                // Захват ушёл к другой цели или пропал - для активной сессии это потеря
                (_, SessionState::Active) => {
                    debug!("{}: {}, захват потерян", self.id, change);
                    Some(SessionEvent::Lost)
                }
                // До подтверждения чужие смены не наши: решает watchdog
                _ => {
                    debug!("{}: {} до подтверждения, игнорируем", self.id, change);
                    None
                }
            },
            Wake::Change(Err(RecvError::Lagged(skipped))) => {
                warn!("{}: пропущено {} уведомлений о смене захвата", self.id, skipped);
                self.resync()
            }
            Wake::Move(Ok(event)) => {
                if self.owns_capture() {
                    trace_if_enabled!("{}: {}", self.id, event);
                    Some(SessionEvent::Motion(event.delta()))
                } else {
                    None
                }
            }
            Wake::Release(Ok(event)) => {
                if event.button.is_primary() && self.owns_capture() {
                    debug!("{}: отпускание основной кнопки, освобождаем захват", self.id);
                    Some(SessionEvent::Release)
                } else {
                    None
                }
            }
            Wake::Move(Err(RecvError::Lagged(skipped)))
            | Wake::Release(Err(RecvError::Lagged(skipped))) => {
                warn!("{}: отставание от событий страницы, пропущено {}", self.id, skipped);
                None
            }
            Wake::Change(Err(RecvError::Closed))
            | Wake::Move(Err(RecvError::Closed))
            | Wake::Release(Err(RecvError::Closed)) => {
                warn!("{}: источник событий закрыт", self.id);
                Some(SessionEvent::Lost)
            }
        }
    }

    /// Восстановить состояние по живой цели, если уведомления потеряны
    fn resync(&self) -> Option<SessionEvent> {
        match (self.backend.pointer_lock_element(), self.state) {
            (Some(target), SessionState::Requesting) if target == self.target => {
                Some(SessionEvent::Confirmed)
            }
            (owner, SessionState::Active) if owner != Some(self.target) => {
                Some(SessionEvent::Lost)
            }
            _ => None,
        }
    }

    fn owns_capture(&self) -> bool {
        self.backend.pointer_lock_element() == Some(self.target)
    }

    fn handle(&mut self, event: SessionEvent) {
        let previous = self.state;
        let transition = self.state.on_event(event);
        self.state = transition.next;

        if previous != self.state {
            debug!("{}: {} -> {}", self.id, previous, self.state);
        }

        for effect in transition.effects {
            self.apply(effect);
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::DisarmWatchdog => {
                self.watchdog = None;
                info!("{}: захват подтверждён для {}", self.id, self.target);
            }
            Effect::Emit(delta) => {
                debug_if_enabled!("{}: {}", self.id, delta);
                if let Some(output) = &self.output {
                    // Закрытый канал обработает ветка ConsumerGone
                    let _ = output.send(Ok(delta));
                }
            }
            Effect::Fail(error) => {
                warn!("{}: {}", self.id, error);
                if let Some(output) = &self.output {
                    // Без потребителя ошибку некому доставить, дальше Terminate
                    let _ = output.send(Err(error));
                }
            }
            Effect::ReleaseCapture => self.release_capture(),
            Effect::Terminate => self.terminate(),
        }
    }

    /// Попытка освободить захват без учёта результата.
    ///
    /// Ошибка здесь ожидаема (захват мог уже исчезнуть) и ничего не меняет:
    /// сессия завершается в любом случае. Чужой захват не трогаем.
    fn release_capture(&self) {
        match self.backend.pointer_lock_element() {
            Some(owner) if owner != self.target => {
                debug!("{}: захват принадлежит {}, освобождение пропущено", self.id, owner);
            }
            _ => {
                if let Err(e) = self.backend.exit_pointer_lock() {
                    debug!("{}: ошибка освобождения захвата проигнорирована: {}", self.id, e);
                }
            }
        }
    }

    /// Единственный путь завершения. Повторный вызов - no-op
    fn terminate(&mut self) {
        let Some(output) = self.output.take() else {
            return;
        };

        self.watchdog = None;
        self.moves = None;
        self.releases = None;
        self.changes = None;
        self.registry.remove(&self.id);

        // Закрытие выходного потока
        drop(output);
        info!("{} завершена", self.id);
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        // Задача могла быть снята вместе с runtime до завершения сессии
        if !self.state.is_terminated() {
            self.handle(SessionEvent::Cancel);
        }
    }
}

async fn recv_from<T: Clone>(
    receiver: &mut Option<broadcast::Receiver<T>>,
) -> std::result::Result<T, RecvError> {
    match receiver {
        Some(receiver) => receiver.recv().await,
        None => pending().await,
    }
}

async fn watchdog_fired(watchdog: &mut Option<Pin<Box<Sleep>>>) {
    match watchdog {
        Some(deadline) => deadline.as_mut().await,
        None => pending().await,
    }
}

async fn consumer_gone(output: &Option<mpsc::UnboundedSender<MotionItem>>) {
    match output {
        Some(output) => output.closed().await,
        None => pending().await,
    }
}
