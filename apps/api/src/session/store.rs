//! Session-scoped UI state: the last extraction and the user's skill annotations.
//!
//! Nothing here is persisted. A session lives until it is deleted, sits idle
//! past the configured timeout, or the process exits.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::skills::models::{ExtractedSkillSet, SelectedSkillAnnotation, SkillCategory};

/// Request to mark an extracted skill as possessed.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectSkillRequest {
    pub category: SkillCategory,
    pub skill: String,
    #[serde(default)]
    pub notes: String,
}

/// Snapshot returned to the front end.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub extracted_skills: Option<ExtractedSkillSet>,
    pub selected_skills: BTreeMap<String, SelectedSkillAnnotation>,
    pub extraction_in_flight: bool,
}

#[derive(Debug, Clone)]
pub struct SkillSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    extracted: Option<ExtractedSkillSet>,
    selected: BTreeMap<String, SelectedSkillAnnotation>,
    extraction_in_flight: bool,
    last_active: Instant,
}

impl SkillSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            extracted: None,
            selected: BTreeMap::new(),
            extraction_in_flight: false,
            last_active: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn extracted(&self) -> Option<&ExtractedSkillSet> {
        self.extracted.as_ref()
    }

    pub fn selected(&self) -> &BTreeMap<String, SelectedSkillAnnotation> {
        &self.selected
    }

    pub fn is_selected(&self, category: SkillCategory, skill: &str) -> bool {
        self.selected.contains_key(&category.selection_key(skill))
    }

    /// Replaces the previous extraction. Existing selections are kept.
    pub fn set_extracted(&mut self, skills: ExtractedSkillSet) {
        self.extracted = Some(skills);
    }

    /// Marks a skill from the current extraction as possessed.
    ///
    /// The skill must exist in the extraction under `category`, and a skill can
    /// only be selected once until selections are cleared.
    pub fn select(
        &mut self,
        request: SelectSkillRequest,
    ) -> Result<SelectedSkillAnnotation, AppError> {
        let extracted = self.extracted.as_ref().ok_or_else(|| {
            AppError::Validation("No skills have been extracted in this session yet".to_string())
        })?;

        let entry = extracted
            .find(request.category, &request.skill)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Skill '{}' not found in {:?} skills",
                    request.skill, request.category
                ))
            })?;

        if self.is_selected(request.category, &request.skill) {
            return Err(AppError::Conflict(format!(
                "Skill '{}' is already selected",
                request.skill
            )));
        }

        let annotation = SelectedSkillAnnotation {
            skill: entry.skill.clone(),
            category: request.category,
            context: entry.context.clone(),
            notes: request.notes,
            selected_at: Utc::now(),
        };
        self.selected
            .insert(request.category.selection_key(&annotation.skill), annotation.clone());

        Ok(annotation)
    }

    /// Removes every selection. Returns how many were removed.
    pub fn clear_selected(&mut self) -> usize {
        let removed = self.selected.len();
        self.selected.clear();
        removed
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.id,
            created_at: self.created_at,
            extracted_skills: self.extracted().cloned(),
            selected_skills: self.selected.clone(),
            extraction_in_flight: self.extraction_in_flight,
        }
    }
}

impl Default for SkillSession {
    fn default() -> Self {
        Self::new()
    }
}

/// All live sessions, shared across handlers.
///
/// Locks are never held across an `.await`.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SkillSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, SkillSession>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, SkillSession>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create(&self) -> SessionView {
        let session = SkillSession::new();
        let view = session.view();
        self.write().insert(session.id(), session);
        info!("Session {} created", view.session_id);
        view
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Reading a session counts as activity.
    pub fn view(&self, session_id: Uuid) -> Result<SessionView, AppError> {
        self.with_session(session_id, |session| Ok(session.view()))
    }

    pub fn remove(&self, session_id: Uuid) -> Result<(), AppError> {
        self.write()
            .remove(&session_id)
            .map(|_| info!("Session {session_id} ended"))
            .ok_or_else(|| session_not_found(session_id))
    }

    /// Runs `f` against one session under the write lock and marks it active.
    pub fn with_session<T>(
        &self,
        session_id: Uuid,
        f: impl FnOnce(&mut SkillSession) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut sessions = self.write();
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;
        session.last_active = Instant::now();
        f(session)
    }

    /// Drops sessions that have been idle for longer than `max_idle`.
    /// A session with an extraction in flight is never dropped.
    /// Returns how many sessions were removed.
    pub fn expire_idle(&self, max_idle: Duration) -> usize {
        match Instant::now().checked_sub(max_idle) {
            Some(cutoff) => self.expire_idle_before(cutoff),
            None => 0,
        }
    }

    fn expire_idle_before(&self, cutoff: Instant) -> usize {
        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|_, session| {
            session.extraction_in_flight || session.last_active >= cutoff
        });
        before - sessions.len()
    }

    /// Runs `expire_idle` in the background for as long as the runtime lives.
    pub fn spawn_idle_sweeper(&self, max_idle: Duration) -> JoinHandle<()> {
        let store = self.clone();
        let period = (max_idle / 4).max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let expired = store.expire_idle(max_idle);
                if expired > 0 {
                    info!("Expired {expired} idle session(s)");
                }
            }
        })
    }

    /// Claims the session's single extraction slot. The slot is released when
    /// the returned guard drops, whether the extraction succeeded or not.
    pub fn begin_extraction(&self, session_id: Uuid) -> Result<ExtractionGuard, AppError> {
        self.with_session(session_id, |session| {
            if session.extraction_in_flight {
                return Err(AppError::Conflict(
                    "An extraction is already running for this session".to_string(),
                ));
            }
            session.extraction_in_flight = true;
            Ok(())
        })?;

        debug!("Extraction started for session {session_id}");
        Ok(ExtractionGuard {
            store: self.clone(),
            session_id,
        })
    }
}

/// Holds a session's extraction slot; see `SessionStore::begin_extraction`.
pub struct ExtractionGuard {
    store: SessionStore,
    session_id: Uuid,
}

impl ExtractionGuard {
    /// Stores the result in the session. The slot is released on drop.
    pub fn complete(self, skills: ExtractedSkillSet) -> Result<(), AppError> {
        self.store.with_session(self.session_id, |session| {
            session.set_extracted(skills);
            Ok(())
        })
    }
}

impl Drop for ExtractionGuard {
    fn drop(&mut self) {
        // The session may have been deleted while the call was running.
        if let Some(session) = self.store.write().get_mut(&self.session_id) {
            session.extraction_in_flight = false;
        }
        debug!("Extraction finished for session {}", self.session_id);
    }
}

fn session_not_found(session_id: Uuid) -> AppError {
    AppError::NotFound(format!("Session {session_id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::models::SkillEntry;

    fn sample_skills() -> ExtractedSkillSet {
        ExtractedSkillSet {
            technical_skills: vec![SkillEntry {
                skill: "Python".to_string(),
                context: "backend services".to_string(),
            }],
            soft_skills: vec![SkillEntry {
                skill: "Leadership".to_string(),
                context: "leading small teams".to_string(),
            }],
            domain_knowledge: vec![],
        }
    }

    fn select(category: SkillCategory, skill: &str, notes: &str) -> SelectSkillRequest {
        SelectSkillRequest {
            category,
            skill: skill.to_string(),
            notes: notes.to_string(),
        }
    }

    #[test]
    fn test_select_copies_context_and_notes() {
        let mut session = SkillSession::new();
        session.set_extracted(sample_skills());

        let annotation = session
            .select(select(SkillCategory::Technical, "Python", "5 years of Django"))
            .unwrap();

        assert_eq!(annotation.skill, "Python");
        assert_eq!(annotation.category, SkillCategory::Technical);
        assert_eq!(annotation.context, "backend services");
        assert_eq!(annotation.notes, "5 years of Django");
        assert!(session.is_selected(SkillCategory::Technical, "Python"));
        assert!(session.selected().contains_key("tech_Python"));
    }

    #[test]
    fn test_select_twice_is_conflict() {
        let mut session = SkillSession::new();
        session.set_extracted(sample_skills());
        session
            .select(select(SkillCategory::Soft, "Leadership", ""))
            .unwrap();

        let err = session
            .select(select(SkillCategory::Soft, "Leadership", "again"))
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(session.selected().len(), 1);
    }

    #[test]
    fn test_select_unknown_skill_is_not_found() {
        let mut session = SkillSession::new();
        session.set_extracted(sample_skills());

        // Present, but under a different category
        let err = session
            .select(select(SkillCategory::Domain, "Python", ""))
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_select_before_extraction_is_validation_error() {
        let mut session = SkillSession::new();
        let err = session
            .select(select(SkillCategory::Technical, "Python", ""))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_new_extraction_keeps_selections() {
        let mut session = SkillSession::new();
        session.set_extracted(sample_skills());
        session
            .select(select(SkillCategory::Technical, "Python", ""))
            .unwrap();

        session.set_extracted(ExtractedSkillSet::default());

        assert_eq!(session.extracted(), Some(&ExtractedSkillSet::default()));
        assert_eq!(session.selected().len(), 1);
    }

    #[test]
    fn test_clear_selected_then_reselect() {
        let mut session = SkillSession::new();
        session.set_extracted(sample_skills());
        session
            .select(select(SkillCategory::Technical, "Python", ""))
            .unwrap();
        session
            .select(select(SkillCategory::Soft, "Leadership", ""))
            .unwrap();

        assert_eq!(session.clear_selected(), 2);
        assert!(session.selected().is_empty());
        assert!(session
            .select(select(SkillCategory::Technical, "Python", "redo"))
            .is_ok());
    }

    #[test]
    fn test_store_create_view_remove() {
        let store = SessionStore::new();
        let created = store.create();
        assert_eq!(store.len(), 1);

        let view = store.view(created.session_id).unwrap();
        assert!(view.extracted_skills.is_none());
        assert!(view.selected_skills.is_empty());

        store.remove(created.session_id).unwrap();
        assert!(matches!(
            store.view(created.session_id),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.remove(created.session_id),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        let a = store.create().session_id;
        let b = store.create().session_id;

        store
            .with_session(a, |s| {
                s.set_extracted(sample_skills());
                Ok(())
            })
            .unwrap();

        assert!(store.view(a).unwrap().extracted_skills.is_some());
        assert!(store.view(b).unwrap().extracted_skills.is_none());
    }

    #[test]
    fn test_only_one_extraction_in_flight() {
        let store = SessionStore::new();
        let id = store.create().session_id;

        let guard = store.begin_extraction(id).unwrap();
        assert!(store.view(id).unwrap().extraction_in_flight);
        assert!(matches!(
            store.begin_extraction(id),
            Err(AppError::Conflict(_))
        ));

        drop(guard);
        assert!(!store.view(id).unwrap().extraction_in_flight);
        assert!(store.begin_extraction(id).is_ok());
    }

    #[test]
    fn test_guard_complete_stores_result_and_releases_slot() {
        let store = SessionStore::new();
        let id = store.create().session_id;

        let guard = store.begin_extraction(id).unwrap();
        guard.complete(sample_skills()).unwrap();

        let view = store.view(id).unwrap();
        assert_eq!(view.extracted_skills, Some(sample_skills()));
        assert!(!view.extraction_in_flight);
    }

    #[test]
    fn test_guard_tolerates_deleted_session() {
        let store = SessionStore::new();
        let id = store.create().session_id;

        let guard = store.begin_extraction(id).unwrap();
        store.remove(id).unwrap();

        assert!(matches!(
            guard.complete(sample_skills()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_idle_sessions_are_expired() {
        let store = SessionStore::new();
        store.create();
        store.create();

        let expired = store.expire_idle_before(Instant::now() + Duration::from_secs(1));

        assert_eq!(expired, 2);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_recent_sessions_survive_expiry() {
        let store = SessionStore::new();
        let id = store.create().session_id;

        assert_eq!(store.expire_idle(Duration::from_secs(3600)), 0);
        assert!(store.view(id).is_ok());
    }

    #[test]
    fn test_expiry_skips_session_with_extraction_in_flight() {
        let store = SessionStore::new();
        let busy = store.create().session_id;
        let idle = store.create().session_id;
        let guard = store.begin_extraction(busy).unwrap();

        let expired = store.expire_idle_before(Instant::now() + Duration::from_secs(1));

        assert_eq!(expired, 1);
        assert!(store.view(busy).is_ok());
        assert!(matches!(store.view(idle), Err(AppError::NotFound(_))));
        guard.complete(ExtractedSkillSet::default()).unwrap();
    }

    #[tokio::test]
    async fn test_sweeper_removes_sessions_in_background() {
        let store = SessionStore::new();
        store.create();

        let sweeper = store.spawn_idle_sweeper(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(1500)).await;
        sweeper.abort();

        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_begin_extraction_unknown_session() {
        let store = SessionStore::new();
        assert!(matches!(
            store.begin_extraction(Uuid::new_v4()),
            Err(AppError::NotFound(_))
        ));
    }
}
