use crate::config::CaptureConfig;
use crate::error::{PointerLockError, Result};
use crate::events::{CaptureTarget, ScreenPosition};
use crate::services::browser::PointerLockBackend;
use crate::services::capture_session::{
    MotionStream, SessionConfig, SessionId, SessionRegistry, SessionSetup,
};
use crate::services::event_hub::PointerEventHub;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Внешняя поверхность захвата указателя для платформенного слоя и приложения.
///
/// Хаб событий передаётся сессиям явно: один сервис - один хаб.
pub struct PointerLockService {
    backend: Arc<dyn PointerLockBackend>,
    config: CaptureConfig,
    hub: OnceCell<Arc<PointerEventHub>>,
    sessions: SessionRegistry,
    next_id: AtomicU64,
}

impl PointerLockService {
    pub fn new(backend: Arc<dyn PointerLockBackend>, config: CaptureConfig) -> Self {
        info!(
            "Инициализация PointerLockService (таймаут подтверждения: {}мс)",
            config.confirm_timeout_ms
        );

        Self {
            backend,
            config,
            hub: OnceCell::new(),
            sessions: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Идемпотентно подключает хаб к событиям страницы
    pub fn ensure_initialized(&self) {
        self.hub.get_or_init(|| {
            PointerEventHub::attach(self.backend.as_ref(), self.config.feed_capacity)
        });
    }

    pub fn is_initialized(&self) -> bool {
        self.hub.get().is_some()
    }

    /// Создать ленивую сессию захвата для `target`.
    ///
    /// Без предварительного `ensure_initialized()` возвращает `NotInitialized`.
    pub fn create_session(
        &self,
        target: CaptureTarget,
        config: SessionConfig,
    ) -> Result<MotionStream> {
        let hub = self.hub.get().ok_or(PointerLockError::NotInitialized)?;
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        debug!("Создана {} для {}", id, target);

        Ok(MotionStream::new(SessionSetup {
            id,
            target,
            config,
            confirm_timeout: self.config.confirm_timeout(),
            backend: self.backend.clone(),
            hub: hub.clone(),
            registry: self.sessions.clone(),
        }))
    }

    /// Скрытие курсора в браузере не требуется - no-op
    pub fn hide_pointer(&self) -> Result<()> {
        Ok(())
    }

    pub fn show_pointer(&self) -> Result<()> {
        Ok(())
    }

    pub fn pointer_position_on_screen(&self) -> Result<ScreenPosition> {
        self.backend.window_screen_position()
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Принудительно завершить все живые сессии через путь освобождения захвата
    pub fn release_all(&self) -> usize {
        let signals: Vec<(SessionId, _)> = self
            .sessions
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        if !signals.is_empty() {
            info!("Освобождение {} активных сессий захвата", signals.len());
        }

        for (id, shutdown) in &signals {
            debug!("Сигнал завершения для {}", id);
            shutdown.notify_one();
        }

        signals.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::browser::{LockPolicy, SimulatedBrowser};

    fn service(browser: &Arc<SimulatedBrowser>) -> PointerLockService {
        PointerLockService::new(browser.clone(), Config::default().capture)
    }

    #[test]
    fn create_session_requires_initialization() {
        let browser = Arc::new(SimulatedBrowser::default());
        let service = service(&browser);

        let result = service.create_session(CaptureTarget::new(1), SessionConfig::default());
        assert!(matches!(result, Err(PointerLockError::NotInitialized)));
        assert_eq!(browser.request_count(), 0);
    }

    #[test]
    fn ensure_initialized_is_idempotent() {
        let browser = Arc::new(SimulatedBrowser::default());
        let service = service(&browser);

        service.ensure_initialized();
        service.ensure_initialized();
        service.ensure_initialized();

        assert!(service.is_initialized());
        assert_eq!(browser.listener_count(), 2);
    }

    #[test]
    fn sessions_are_lazy() {
        let browser = Arc::new(SimulatedBrowser::new(LockPolicy::Grant));
        let service = service(&browser);
        service.ensure_initialized();

        let first = service
            .create_session(CaptureTarget::new(1), SessionConfig::default())
            .unwrap();
        let second = service
            .create_session(CaptureTarget::new(1), SessionConfig::default())
            .unwrap();

        assert_ne!(first.id(), second.id());
        assert!(!first.is_started());
        assert_eq!(browser.request_count(), 0);
        assert_eq!(service.active_sessions(), 0);
    }

    #[test]
    fn session_started_outside_runtime_reports_backend_error() {
        let browser = Arc::new(SimulatedBrowser::new(LockPolicy::Grant));
        let service = service(&browser);
        service.ensure_initialized();

        let mut stream = service
            .create_session(CaptureTarget::new(1), SessionConfig::default())
            .unwrap();
        stream.start();
        assert!(stream.is_started());

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            assert!(matches!(
                stream.next().await,
                Some(Err(PointerLockError::Backend(_)))
            ));
            assert!(stream.next().await.is_none());
        });

        assert_eq!(browser.request_count(), 0);
        assert_eq!(service.active_sessions(), 0);
    }

    #[test]
    fn pointer_surface_outside_core() {
        let browser = Arc::new(
            SimulatedBrowser::default().with_screen_position(ScreenPosition::new(120, 80)),
        );
        let service = service(&browser);

        assert!(service.hide_pointer().is_ok());
        assert!(service.show_pointer().is_ok());
        assert_eq!(
            service.pointer_position_on_screen().unwrap(),
            ScreenPosition::new(120, 80)
        );
    }
}
