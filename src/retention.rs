use crate::model::{now_ms, Session};
use crate::store::{Store, KEY_CURRENT_SESSION, KEY_SESSIONS};

/// Keep only this many archived sessions after age pruning.
pub const MAX_SESSIONS: usize = 10;
/// Archived sessions older than this are dropped regardless of count.
pub const SESSION_EXPIRY_DAYS: i64 = 7;
/// A current-session slot older than this is considered abandoned.
pub const CURRENT_SESSION_MAX_AGE_HOURS: i64 = 24;

const MS_PER_HOUR: i64 = 60 * 60 * 1000;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    pub expired_removed: usize,
    pub over_limit_removed: usize,
    pub current_session_cleared: bool,
}

/// Prune stored session history. Only the sessions collection and the
/// current-session slot are ever touched; authored content (questions,
/// categories, saved quizzes) is never a cleanup candidate. Idempotent:
/// running twice in a row changes nothing the second time.
pub fn cleanup(store: &mut dyn Store) -> CleanupSummary {
    cleanup_at(store, now_ms())
}

/// Deterministic core, split out so tests can fix the clock.
pub fn cleanup_at(store: &mut dyn Store, now: i64) -> CleanupSummary {
    let mut summary = CleanupSummary::default();

    let sessions = read_sessions(store);
    let before = sessions.len();

    let expiry = now - SESSION_EXPIRY_DAYS * MS_PER_DAY;
    let mut kept: Vec<Session> = sessions
        .into_iter()
        .filter(|s| s.start_time > expiry)
        .collect();
    summary.expired_removed = before - kept.len();

    if kept.len() > MAX_SESSIONS {
        kept.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        summary.over_limit_removed = kept.len() - MAX_SESSIONS;
        kept.truncate(MAX_SESSIONS);
    }

    if summary.expired_removed > 0 || summary.over_limit_removed > 0 {
        match serde_json::to_string(&kept) {
            Ok(json) => {
                // A shrinking rewrite; if it still fails there is nothing
                // further to reclaim, so leave the record as-is.
                if let Err(e) = store.set(KEY_SESSIONS, &json) {
                    eprintln!("quizd: session prune rewrite failed: {}", e);
                }
            }
            Err(e) => eprintln!("quizd: session prune serialize failed: {}", e),
        }
    }

    summary.current_session_cleared = clear_stale_current_session(store, now);
    summary
}

fn clear_stale_current_session(store: &mut dyn Store, now: i64) -> bool {
    let Some(raw) = store.get(KEY_CURRENT_SESSION) else {
        return false;
    };
    match serde_json::from_str::<Session>(&raw) {
        Ok(session) => {
            if now - session.start_time > CURRENT_SESSION_MAX_AGE_HOURS * MS_PER_HOUR {
                store.remove(KEY_CURRENT_SESSION);
                return true;
            }
            false
        }
        Err(e) => {
            eprintln!("quizd: clearing unparseable current session: {}", e);
            store.remove(KEY_CURRENT_SESSION);
            true
        }
    }
}

fn read_sessions(store: &dyn Store) -> Vec<Session> {
    let Some(raw) = store.get(KEY_SESSIONS) else {
        return Vec::new();
    };
    match serde_json::from_str(&raw) {
        Ok(sessions) => sessions,
        Err(e) => {
            eprintln!("quizd: sessions record unreadable, treating as empty: {}", e);
            Vec::new()
        }
    }
}
