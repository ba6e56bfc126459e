use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PointerLockError {
    /// Сессия создана до `ensure_initialized()` - ошибка использования API
    #[error("PointerLockService не инициализирован: вызовите ensure_initialized() до создания сессии захвата")]
    NotInitialized,

    #[error("Браузер отклонил запрос захвата указателя ({0}). Попробуйте ещё раз через мгновение")]
    RequestDenied(String),

    #[error(
        "Захват указателя не подтверждён за {}мс. Возможные причины: запрос отклонён пользователем или браузером; \
         повторный запрос слишком рано после предыдущего освобождения; страница не в фокусе",
        .0.as_millis()
    )]
    ConfirmationTimeout(Duration),

    #[error("Ошибка браузера: {0}")]
    Backend(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl PointerLockError {
    pub fn backend<T>(msg: impl Into<String>) -> Result<T> {
        Err(PointerLockError::Backend(msg.into()))
    }

    /// Ошибка, которая завершает сессию захвата (доставляется в выходной поток)
    pub fn is_session_failure(&self) -> bool {
        matches!(
            self,
            PointerLockError::RequestDenied(_) | PointerLockError::ConfirmationTimeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PointerLockError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! pointer_lock_error {
    (request_denied, $($arg:tt)*) => {
        $crate::error::PointerLockError::RequestDenied(format!($($arg)*))
    };
    (backend, $($arg:tt)*) => {
        $crate::error::PointerLockError::Backend(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::PointerLockError::Internal(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_lists_causes() {
        let err = PointerLockError::ConfirmationTimeout(Duration::from_millis(100));
        let message = err.to_string();

        assert!(message.contains("100мс"));
        assert!(message.contains("отклонён"));
        assert!(message.contains("слишком рано"));
        assert!(message.contains("не в фокусе"));
        assert!(err.is_session_failure());
    }

    #[test]
    fn test_request_denied_message() {
        let err = crate::pointer_lock_error!(request_denied, "код {}", 7);
        assert!(err.to_string().contains("код 7"));
        assert!(err.to_string().contains("через мгновение"));
        assert!(!PointerLockError::NotInitialized.is_session_failure());
    }
}
