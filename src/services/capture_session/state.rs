use crate::error::PointerLockError;
use crate::events::MotionDelta;
use smallvec::{smallvec, SmallVec};
use std::fmt;
use std::time::Duration;

/// Состояние сессии захвата. `Terminated` - поглощающее состояние
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Запрос отправлен, watchdog взведён, подтверждения ещё нет
    Requesting,
    /// Браузер подтвердил захват для цели этой сессии
    Active,
    Terminated,
}

/// Типизированные события, которые двигают автомат сессии
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Запрос захвата завершился синхронной ошибкой
    RequestFailed(String),
    /// Браузер сообщил, что захват принадлежит цели сессии
    Confirmed,
    /// Браузер сообщил, что захвата больше нет
    Lost,
    /// Движение, прошедшее фильтр по живой цели захвата
    Motion(MotionDelta),
    /// Отпускание основной кнопки при политике release-on-pointer-up
    Release,
    /// Потребитель перестал читать поток
    Cancel,
    /// Watchdog сработал, несёт исходный срок для сообщения об ошибке
    Timeout(Duration),
}

/// Побочные эффекты перехода, исполняемые драйвером сессии по порядку
#[derive(Debug)]
pub enum Effect {
    DisarmWatchdog,
    Emit(MotionDelta),
    Fail(PointerLockError),
    /// Попытка освободить захват; результат намеренно игнорируется
    ReleaseCapture,
    Terminate,
}

#[derive(Debug)]
pub struct Transition {
    pub next: SessionState,
    pub effects: SmallVec<[Effect; 2]>,
}

impl Transition {
    fn stay(state: SessionState) -> Self {
        Self {
            next: state,
            effects: SmallVec::new(),
        }
    }

    fn to(next: SessionState, effects: SmallVec<[Effect; 2]>) -> Self {
        Self { next, effects }
    }
}

impl SessionState {
    pub fn is_terminated(&self) -> bool {
        matches!(self, SessionState::Terminated)
    }

    /// Единственная функция переходов автомата
    pub fn on_event(self, event: SessionEvent) -> Transition {
        use SessionEvent::*;
        use SessionState::*;

        match (self, event) {
            // Повторное завершение и поздние события - no-op
            (Terminated, _) => Transition::stay(Terminated),

            (Requesting, Confirmed) => Transition::to(Active, smallvec![Effect::DisarmWatchdog]),
            (Active, Confirmed) => Transition::stay(Active),

            // Живая цель уже наша, уведомление о смене ещё в очереди
            (Requesting, Motion(delta)) => Transition::to(
                Active,
                smallvec![Effect::DisarmWatchdog, Effect::Emit(delta)],
            ),
            (Active, Motion(delta)) => Transition::to(Active, smallvec![Effect::Emit(delta)]),

            (Requesting, Timeout(deadline)) => Transition::to(
                Terminated,
                smallvec![
                    Effect::Fail(PointerLockError::ConfirmationTimeout(deadline)),
                    Effect::Terminate
                ],
            ),
            // Watchdog снят при подтверждении
            (Active, Timeout(_)) => Transition::stay(Active),

            (_, RequestFailed(reason)) => Transition::to(
                Terminated,
                smallvec![
                    Effect::Fail(PointerLockError::RequestDenied(reason)),
                    Effect::Terminate
                ],
            ),

            (_, Lost) | (_, Release) | (_, Cancel) => Transition::to(
                Terminated,
                smallvec![Effect::ReleaseCapture, Effect::Terminate],
            ),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Requesting => write!(f, "requesting"),
            SessionState::Active => write!(f, "active"),
            SessionState::Terminated => write!(f, "terminated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEADLINE: Duration = Duration::from_millis(100);

    fn kinds(transition: &Transition) -> Vec<&'static str> {
        transition
            .effects
            .iter()
            .map(|effect| match effect {
                Effect::DisarmWatchdog => "disarm",
                Effect::Emit(_) => "emit",
                Effect::Fail(_) => "fail",
                Effect::ReleaseCapture => "release",
                Effect::Terminate => "terminate",
            })
            .collect()
    }

    #[test]
    fn confirmation_disarms_watchdog() {
        let t = SessionState::Requesting.on_event(SessionEvent::Confirmed);
        assert_eq!(t.next, SessionState::Active);
        assert_eq!(kinds(&t), vec!["disarm"]);
    }

    #[test]
    fn timeout_before_confirmation_fails() {
        let t = SessionState::Requesting.on_event(SessionEvent::Timeout(DEADLINE));
        assert_eq!(t.next, SessionState::Terminated);
        assert_eq!(kinds(&t), vec!["fail", "terminate"]);
        assert!(matches!(
            t.effects[0],
            Effect::Fail(PointerLockError::ConfirmationTimeout(d)) if d == DEADLINE
        ));
    }

    #[test]
    fn timeout_after_confirmation_is_ignored() {
        let t = SessionState::Active.on_event(SessionEvent::Timeout(DEADLINE));
        assert_eq!(t.next, SessionState::Active);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn motion_while_requesting_counts_as_confirmation() {
        let delta = MotionDelta::new(5.0, -3.0);
        let t = SessionState::Requesting.on_event(SessionEvent::Motion(delta));
        assert_eq!(t.next, SessionState::Active);
        assert_eq!(kinds(&t), vec!["disarm", "emit"]);
    }

    #[test]
    fn motion_while_active_is_emitted() {
        let delta = MotionDelta::new(1.0, 1.0);
        let t = SessionState::Active.on_event(SessionEvent::Motion(delta));
        assert_eq!(t.next, SessionState::Active);
        assert!(matches!(t.effects[0], Effect::Emit(d) if d == delta));
    }

    #[test]
    fn request_failure_is_terminal() {
        let t = SessionState::Requesting.on_event(SessionEvent::RequestFailed("busy".into()));
        assert_eq!(t.next, SessionState::Terminated);
        assert!(matches!(
            t.effects[0],
            Effect::Fail(PointerLockError::RequestDenied(ref reason)) if reason == "busy"
        ));
    }

    #[test]
    fn lost_release_and_cancel_take_release_path() {
        for state in [SessionState::Requesting, SessionState::Active] {
            for event in [SessionEvent::Lost, SessionEvent::Release, SessionEvent::Cancel] {
                let t = state.on_event(event);
                assert_eq!(t.next, SessionState::Terminated);
                assert_eq!(kinds(&t), vec!["release", "terminate"]);
            }
        }
    }

    #[test]
    fn terminated_absorbs_everything() {
        let events = [
            SessionEvent::RequestFailed("late".into()),
            SessionEvent::Confirmed,
            SessionEvent::Lost,
            SessionEvent::Motion(MotionDelta::new(1.0, 0.0)),
            SessionEvent::Release,
            SessionEvent::Cancel,
            SessionEvent::Timeout(DEADLINE),
        ];
        for event in events {
            let t = SessionState::Terminated.on_event(event);
            assert!(t.next.is_terminated());
            assert!(t.effects.is_empty());
        }
    }

    #[test]
    fn watchdog_and_confirmation_are_exclusive() {
        // Подтверждение первым: таймаут больше не даёт ошибки
        let confirmed = SessionState::Requesting.on_event(SessionEvent::Confirmed).next;
        let after = confirmed.on_event(SessionEvent::Timeout(DEADLINE));
        assert!(!after.effects.iter().any(|e| matches!(e, Effect::Fail(_))));

        // Таймаут первым: движения больше не выдаются
        let timed_out = SessionState::Requesting
            .on_event(SessionEvent::Timeout(DEADLINE))
            .next;
        let after = timed_out.on_event(SessionEvent::Motion(MotionDelta::new(1.0, 1.0)));
        assert!(after.effects.is_empty());
    }
}
