//! Session duration policy

use sandlease_api::ClampNotice;
use sandlease_config::SessionConfig;

/// Outcome of applying plan limits to a requested duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationDecision {
    /// Minutes the session will actually run for
    pub minutes: u32,

    /// Present when the request was reduced
    pub clamp: Option<ClampNotice>,
}

impl DurationDecision {
    fn exact(minutes: u32) -> Self {
        Self {
            minutes,
            clamp: None,
        }
    }
}

/// Resolve the effective session length.
///
/// Absent or zero requests use the default. Non-privileged accounts are
/// capped at the default, everyone else at the configured maximum.
pub fn resolve_duration(config: &SessionConfig, requested: Option<u32>) -> DurationDecision {
    let requested = match requested {
        Some(minutes) if minutes > 0 => minutes,
        _ => return DurationDecision::exact(config.default_duration_minutes),
    };

    if !config.is_pro && requested > config.default_duration_minutes {
        return DurationDecision {
            minutes: config.default_duration_minutes,
            clamp: Some(ClampNotice::PlanLimit {
                requested,
                allowed: config.default_duration_minutes,
                max: config.max_duration_minutes,
            }),
        };
    }

    if requested > config.max_duration_minutes {
        return DurationDecision {
            minutes: config.max_duration_minutes,
            clamp: Some(ClampNotice::MaxLimit {
                requested,
                allowed: config.max_duration_minutes,
            }),
        };
    }

    DurationDecision::exact(requested)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(is_pro: bool) -> SessionConfig {
        SessionConfig {
            is_pro,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn clamping_table() {
        // (is_pro, requested, expected minutes, clamped?)
        let cases = [
            (false, None, 59, false),
            (false, Some(0), 59, false),
            (false, Some(30), 30, false),
            (false, Some(59), 59, false),
            (false, Some(120), 59, true),
            (true, None, 59, false),
            (true, Some(0), 59, false),
            (true, Some(120), 120, false),
            (true, Some(1439), 1439, false),
            (true, Some(2000), 1439, true),
        ];

        for (is_pro, requested, minutes, clamped) in cases {
            let decision = resolve_duration(&config(is_pro), requested);
            assert_eq!(
                decision.minutes, minutes,
                "pro={} requested={:?}",
                is_pro, requested
            );
            assert_eq!(
                decision.clamp.is_some(),
                clamped,
                "pro={} requested={:?}",
                is_pro, requested
            );
        }
    }

    #[test]
    fn non_pro_notice_mentions_plan_ceiling() {
        let decision = resolve_duration(&config(false), Some(120));
        assert_eq!(
            decision.clamp,
            Some(ClampNotice::PlanLimit {
                requested: 120,
                allowed: 59,
                max: 1439,
            })
        );
    }

    #[test]
    fn pro_notice_mentions_absolute_max() {
        let decision = resolve_duration(&config(true), Some(2000));
        assert_eq!(
            decision.clamp,
            Some(ClampNotice::MaxLimit {
                requested: 2000,
                allowed: 1439,
            })
        );
    }
}
