use crate::config::SimulationConfig;
use crate::error::{PointerLockError, Result};
use crate::events::{
    CaptureChange, CaptureTarget, PointerButton, PointerMove, PointerRelease, ScreenPosition,
};
use parking_lot::RwLock;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info};

use super::r#trait::{PageListener, PointerLockBackend};

/// Как эмулируемый браузер отвечает на запрос захвата
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPolicy {
    /// Захват выдаётся сразу с уведомлением о смене
    Grant,
    /// Запрос молча игнорируется (отказ политики, нет фокуса страницы)
    Ignore,
    /// Запрос завершается синхронной ошибкой
    Throw,
}

impl FromStr for LockPolicy {
    type Err = PointerLockError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "grant" => Ok(LockPolicy::Grant),
            "ignore" => Ok(LockPolicy::Ignore),
            "throw" => Ok(LockPolicy::Throw),
            other => Err(crate::pointer_lock_error!(
                internal,
                "Неизвестная политика эмуляции: {}",
                other
            )),
        }
    }
}

#[derive(Debug)]
struct SimulatedState {
    lock_element: Option<CaptureTarget>,
    policy: LockPolicy,
    last_exit: Option<Instant>,
    fail_exit: bool,
}

/// Эмуляция браузера в процессе: dry-run запуск и тесты.
///
/// Уведомления о смене захвата рассылаются синхронно внутри вызовов,
/// поэтому подписки должны существовать до запроса.
pub struct SimulatedBrowser {
    state: RwLock<SimulatedState>,
    release_cooldown: Duration,
    screen_position: ScreenPosition,
    change_tx: RwLock<Option<broadcast::Sender<CaptureChange>>>,
    move_listeners: RwLock<Vec<PageListener<PointerMove>>>,
    up_listeners: RwLock<Vec<PageListener<PointerRelease>>>,
    request_count: AtomicUsize,
    exit_count: AtomicUsize,
}

impl Default for SimulatedBrowser {
    fn default() -> Self {
        Self::new(LockPolicy::Grant)
    }
}

impl SimulatedBrowser {
    pub fn new(policy: LockPolicy) -> Self {
        Self::with_cooldown(policy, Duration::ZERO)
    }

    pub fn with_cooldown(policy: LockPolicy, release_cooldown: Duration) -> Self {
        info!(
            "Инициализация SimulatedBrowser (политика: {:?}, задержка после освобождения: {}мс)",
            policy,
            release_cooldown.as_millis()
        );

        let (change_tx, _) = broadcast::channel(64);

        Self {
            state: RwLock::new(SimulatedState {
                lock_element: None,
                policy,
                last_exit: None,
                fail_exit: false,
            }),
            release_cooldown,
            screen_position: ScreenPosition::new(0, 0),
            change_tx: RwLock::new(Some(change_tx)),
            move_listeners: RwLock::new(Vec::new()),
            up_listeners: RwLock::new(Vec::new()),
            request_count: AtomicUsize::new(0),
            exit_count: AtomicUsize::new(0),
        }
    }

    pub fn with_screen_position(mut self, position: ScreenPosition) -> Self {
        self.screen_position = position;
        self
    }

    pub fn set_policy(&self, policy: LockPolicy) {
        self.state.write().policy = policy;
    }

    /// Заставить `exit_pointer_lock` завершаться ошибкой
    pub fn set_fail_exit(&self, fail: bool) {
        self.state.write().fail_exit = fail;
    }

    /// Браузер выдал захват элементу `target`
    pub fn grant(&self, target: CaptureTarget) {
        self.state.write().lock_element = Some(target);
        debug!("[SIM] Захват выдан {}", target);
        self.notify(CaptureChange::locked(target));
    }

    /// Браузер или ОС отозвали захват без участия потребителя
    pub fn revoke(&self) {
        {
            let mut state = self.state.write();
            state.lock_element = None;
            state.last_exit = Some(Instant::now());
        }
        debug!("[SIM] Захват отозван");
        self.notify(CaptureChange::lost());
    }

    pub fn move_by(&self, movement_x: f64, movement_y: f64) {
        let event = PointerMove::new(movement_x, movement_y);
        for listener in self.move_listeners.read().iter() {
            listener(event);
        }
    }

    pub fn release_button(&self, button: PointerButton) {
        let event = PointerRelease::new(button);
        for listener in self.up_listeners.read().iter() {
            listener(event);
        }
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn exit_count(&self) -> usize {
        self.exit_count.load(Ordering::Relaxed)
    }

    pub fn listener_count(&self) -> usize {
        self.move_listeners.read().len() + self.up_listeners.read().len()
    }

    /// Закрыть ленту смен захвата: подписчики получают `Closed`
    pub fn close_change_feed(&self) {
        if self.change_tx.write().take().is_some() {
            debug!("[SIM] Лента смен захвата закрыта");
        }
    }

    fn notify(&self, change: CaptureChange) {
        // Без подписчиков уведомление просто теряется, как и в браузере
        if let Some(tx) = self.change_tx.read().as_ref() {
            let _ = tx.send(change);
        }
    }
}

impl PointerLockBackend for SimulatedBrowser {
    fn request_pointer_lock(&self, target: CaptureTarget) -> Result<()> {
        self.request_count.fetch_add(1, Ordering::Relaxed);

        let policy = {
            let state = self.state.read();
            if let Some(last_exit) = state.last_exit {
                if last_exit.elapsed() < self.release_cooldown {
                    return Err(crate::pointer_lock_error!(
                        request_denied,
                        "запрос через {}мс после освобождения",
                        last_exit.elapsed().as_millis()
                    ));
                }
            }
            state.policy
        };

        match policy {
            LockPolicy::Grant => {
                self.grant(target);
                Ok(())
            }
            LockPolicy::Ignore => {
                debug!("[SIM] Запрос захвата для {} молча проигнорирован", target);
                Ok(())
            }
            LockPolicy::Throw => Err(crate::pointer_lock_error!(
                request_denied,
                "эмуляция отказа для {}",
                target
            )),
        }
    }

    fn exit_pointer_lock(&self) -> Result<()> {
        self.exit_count.fetch_add(1, Ordering::Relaxed);

        let was_locked = {
            let mut state = self.state.write();
            if state.fail_exit {
                return PointerLockError::backend("exitPointerLock завершился ошибкой (эмуляция)");
            }
            let was_locked = state.lock_element.take().is_some();
            if was_locked {
                state.last_exit = Some(Instant::now());
            }
            was_locked
        };

        if was_locked {
            self.notify(CaptureChange::lost());
        }
        Ok(())
    }

    fn pointer_lock_element(&self) -> Option<CaptureTarget> {
        self.state.read().lock_element
    }

    fn subscribe_lock_change(&self) -> broadcast::Receiver<CaptureChange> {
        match self.change_tx.read().as_ref() {
            Some(tx) => tx.subscribe(),
            // Отправитель уже удалён - приёмник сразу закрыт
            None => broadcast::channel(1).1,
        }
    }

    fn add_pointer_move_listener(&self, listener: PageListener<PointerMove>) {
        self.move_listeners.write().push(listener);
    }

    fn add_pointer_up_listener(&self, listener: PageListener<PointerRelease>) {
        self.up_listeners.write().push(listener);
    }

    fn window_screen_position(&self) -> Result<ScreenPosition> {
        Ok(self.screen_position)
    }
}

/// Создать эмулятор браузера по настройкам из конфигурации
pub fn create_simulated_browser(config: &SimulationConfig) -> Result<Arc<SimulatedBrowser>> {
    let policy = config.policy.parse::<LockPolicy>()?;
    Ok(Arc::new(SimulatedBrowser::with_cooldown(
        policy,
        config.release_cooldown(),
    )))
}
