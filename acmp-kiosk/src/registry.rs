//! Member registry
//!
//! Maintains the authoritative, normalized, searchable member set fetched
//! from the remote registry service. Network failures never surface to the
//! check-in flow: any failed load falls back to a fixed built-in demo
//! dataset and flips the registry into demo mode.

use crate::error::{Error, Result};
use crate::state::Notifier;
use acmp_common::events::Severity;
use acmp_common::member::{
    normalize_registration, Member, Occupation, RawMember, DEFAULT_FIELD,
};
use chrono::{Duration as ChronoDuration, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Fixed timeout on the member-list fetch
const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Delay before the one-time demo-mode notification is published
const FALLBACK_NOTIFY_DELAY: Duration = Duration::from_secs(1);

/// Name pool for members synthesized in demo mode
const TEMPORARY_FIRST_NAMES: &[&str] = &["Aminata", "Ibrahima", "Mariam", "Ousmane", "Aïcha"];
const TEMPORARY_LAST_NAMES: &[&str] = &["Ba", "Sow", "Keita", "Camara", "Diallo"];

/// Expected envelope of the remote member-list endpoint
#[derive(Debug, Deserialize)]
struct MemberListEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Vec<RawMember>>,
    #[serde(default)]
    #[allow(dead_code)]
    message: Option<String>,
}

/// Per-occupation member counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OccupationCounts {
    pub student: usize,
    pub employee: usize,
    pub entrepreneur: usize,
    pub unemployed: usize,
    pub other: usize,
}

/// Derived registry statistics (pure read, no side effects)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub total: usize,
    pub by_occupation: OccupationCounts,
    pub with_profile_image: usize,
    pub joined_last_30_days: usize,
}

struct RegistryInner {
    members: Vec<Member>,
    demo_mode: bool,
}

/// The member registry.
///
/// One instance per kiosk; the member set is read-mostly and only mutated by
/// `load()`.
pub struct MemberRegistry {
    client: reqwest::Client,
    base_url: String,
    inner: RwLock<RegistryInner>,
    /// Single-flight guard: true while a load is in flight
    loading: AtomicBool,
    /// The demo-mode notification is published at most once per process
    fallback_notified: AtomicBool,
    notifier: Arc<dyn Notifier>,
}

impl MemberRegistry {
    pub fn new(base_url: String, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| Error::Registry(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            inner: RwLock::new(RegistryInner {
                members: Vec::new(),
                demo_mode: false,
            }),
            loading: AtomicBool::new(false),
            fallback_notified: AtomicBool::new(false),
            notifier,
        })
    }

    /// Load (or reload) the member set from the remote registry.
    ///
    /// Always returns a usable set: any failure (non-2xx, malformed envelope,
    /// timeout, network error) falls back to the built-in demo dataset and
    /// sets demo mode. Concurrent calls while a load is in flight return the
    /// currently-held set without re-issuing the request.
    pub async fn load(&self) -> Vec<Member> {
        if self
            .loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Member load already in flight, returning current set");
            return self.members().await;
        }

        let outcome = self.fetch_members().await;

        let members = {
            let mut inner = self.inner.write().await;
            match outcome {
                Ok(cleaned) => {
                    info!("Loaded {} members from registry", cleaned.len());
                    inner.members = cleaned;
                    inner.demo_mode = false;
                }
                Err(e) => {
                    warn!("Member registry unreachable ({e}), using demo dataset");
                    inner.members = demo_members();
                    inner.demo_mode = true;
                    self.schedule_fallback_notification();
                }
            }
            inner.members.clone()
        };

        self.loading.store(false, Ordering::SeqCst);
        members
    }

    async fn fetch_members(&self) -> Result<Vec<Member>> {
        let response = self
            .client
            .get(&self.base_url)
            .send()
            .await
            .map_err(|e| Error::Registry(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Registry(format!("registry returned {status}")));
        }

        let envelope: MemberListEnvelope = response
            .json()
            .await
            .map_err(|e| Error::Registry(format!("malformed body: {e}")))?;

        if !envelope.success {
            return Err(Error::Registry("envelope success=false".to_string()));
        }

        let raw = envelope
            .data
            .ok_or_else(|| Error::Registry("envelope missing data".to_string()))?;

        // Records without a registration number can never be resolved; drop them
        Ok(raw.into_iter().filter_map(RawMember::clean).collect())
    }

    /// Publish the demo-mode notice once, 1s later, without blocking the load
    fn schedule_fallback_notification(&self) {
        if self.fallback_notified.swap(true, Ordering::SeqCst) {
            return;
        }
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            tokio::time::sleep(FALLBACK_NOTIFY_DELAY).await;
            notifier.notify(
                "Serveur indisponible, mode démonstration activé.",
                Severity::Warning,
            );
        });
    }

    /// Resolve a scanned or typed identifier to a member record.
    ///
    /// In demo mode a miss synthesizes a temporary member (flagged
    /// `is_temporary`) so the attendance flow can proceed with incomplete
    /// demo data.
    pub async fn resolve(&self, identifier: &str) -> Result<Member> {
        let needle = normalize_registration(identifier);
        if needle.is_empty() {
            return Err(Error::InvalidInput("empty identifier".to_string()));
        }

        let inner = self.inner.read().await;

        if let Some(member) = inner
            .members
            .iter()
            .find(|m| normalize_registration(&m.registration_number) == needle)
        {
            return Ok(member.clone());
        }

        if inner.demo_mode {
            debug!("No match for {needle} in demo mode, synthesizing temporary member");
            return Ok(synthesize_temporary(&needle));
        }

        Err(Error::MemberNotFound(needle))
    }

    /// Snapshot of the current member set
    pub async fn members(&self) -> Vec<Member> {
        self.inner.read().await.members.clone()
    }

    /// Whether the registry is serving the built-in demo dataset
    pub async fn demo_mode(&self) -> bool {
        self.inner.read().await.demo_mode
    }

    /// Derived statistics over the current member set
    pub async fn stats(&self) -> RegistryStats {
        let inner = self.inner.read().await;
        let cutoff = Utc::now() - ChronoDuration::days(30);

        let mut by_occupation = OccupationCounts::default();
        for member in &inner.members {
            match member.occupation {
                Occupation::Student => by_occupation.student += 1,
                Occupation::Employee => by_occupation.employee += 1,
                Occupation::Entrepreneur => by_occupation.entrepreneur += 1,
                Occupation::Unemployed => by_occupation.unemployed += 1,
                Occupation::Other => by_occupation.other += 1,
            }
        }

        RegistryStats {
            total: inner.members.len(),
            by_occupation,
            with_profile_image: inner
                .members
                .iter()
                .filter(|m| m.profile_image.is_some())
                .count(),
            joined_last_30_days: inner
                .members
                .iter()
                .filter(|m| m.join_date > cutoff)
                .count(),
        }
    }

    /// Test/bootstrap hook: replace the member set directly
    #[cfg(test)]
    pub async fn install_members(&self, members: Vec<Member>, demo_mode: bool) {
        let mut inner = self.inner.write().await;
        inner.members = members;
        inner.demo_mode = demo_mode;
    }
}

fn synthesize_temporary(registration: &str) -> Member {
    let mut rng = rand::thread_rng();
    let first = TEMPORARY_FIRST_NAMES
        .choose(&mut rng)
        .copied()
        .unwrap_or("Visiteur");
    let last = TEMPORARY_LAST_NAMES.choose(&mut rng).copied().unwrap_or("");

    Member {
        registration_number: registration.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        occupation: Occupation::Other,
        phone_number: DEFAULT_FIELD.to_string(),
        study_or_work_place: DEFAULT_FIELD.to_string(),
        profile_image: None,
        join_date: Utc::now(),
        is_temporary: true,
    }
}

/// Fixed built-in demo dataset served when the remote source is unreachable
pub fn demo_members() -> Vec<Member> {
    let now = Utc::now();
    let entry = |reg: &str,
                 first: &str,
                 last: &str,
                 occupation: Occupation,
                 place: &str,
                 image: Option<&str>,
                 joined_days_ago: i64| Member {
        registration_number: reg.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        occupation,
        phone_number: DEFAULT_FIELD.to_string(),
        study_or_work_place: place.to_string(),
        profile_image: image.map(str::to_string),
        join_date: now - ChronoDuration::days(joined_days_ago),
        is_temporary: false,
    };

    vec![
        entry("ACM01", "Awa", "Diop", Occupation::Student, "Lycée Jean Moulin", Some("awa.jpg"), 12),
        entry("ACM02", "Moussa", "Ndiaye", Occupation::Employee, "Mairie du 12e", None, 90),
        entry("ACM03", "Claire", "Martin", Occupation::Entrepreneur, "Atelier Claire", Some("claire.jpg"), 200),
        entry("ACM04", "Karim", "Benali", Occupation::Unemployed, DEFAULT_FIELD, None, 25),
        entry("ACM05", "Fatou", "Sarr", Occupation::Student, "Université Paris 8", None, 150),
        entry("ACM06", "Jean", "Dupont", Occupation::Other, DEFAULT_FIELD, None, 400),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use acmp_common::member::REGISTRATION_PREFIX;

    struct NullNotifier;
    impl Notifier for NullNotifier {
        fn notify(&self, _message: &str, _severity: Severity) {}
    }

    fn test_registry() -> MemberRegistry {
        // Unroutable endpoint: loads fail fast with a connection error
        MemberRegistry::new("http://127.0.0.1:1/api/members".to_string(), Arc::new(NullNotifier))
            .unwrap()
    }

    #[test]
    fn test_demo_dataset_shape() {
        let members = demo_members();
        assert_eq!(members.len(), 6);
        for member in &members {
            assert!(member.registration_number.starts_with(REGISTRATION_PREFIX));
            assert!(!member.is_temporary);
        }
    }

    #[tokio::test]
    async fn test_load_failure_falls_back_to_demo() {
        let registry = test_registry();

        let members = registry.load().await;
        assert_eq!(members.len(), 6);
        assert!(registry.demo_mode().await);
    }

    #[tokio::test]
    async fn test_resolve_exact_and_normalized() {
        let registry = test_registry();
        registry.install_members(demo_members(), false).await;

        let member = registry.resolve("ACM01").await.unwrap();
        assert_eq!(member.first_name, "Awa");

        // Heterogeneous spellings of the same identifier
        for spelling in ["acm-01", "01", "m01", " ACM 01 "] {
            let resolved = registry.resolve(spelling).await.unwrap();
            assert_eq!(resolved.registration_number, "ACM01", "spelling {spelling:?}");
        }
    }

    #[tokio::test]
    async fn test_resolve_miss_without_demo_mode() {
        let registry = test_registry();
        registry.install_members(demo_members(), false).await;

        match registry.resolve("ACM99").await {
            Err(Error::MemberNotFound(id)) => assert_eq!(id, "ACM99"),
            other => panic!("expected MemberNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolve_miss_in_demo_mode_synthesizes_temporary() {
        let registry = test_registry();
        registry.install_members(demo_members(), true).await;

        let member = registry.resolve("acm-07").await.unwrap();
        assert_eq!(member.registration_number, "ACM07");
        assert!(member.is_temporary);
        assert!(!member.first_name.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_rejects_empty_identifier() {
        let registry = test_registry();
        registry.install_members(demo_members(), true).await;
        assert!(matches!(
            registry.resolve("  --- ").await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_stats_histogram() {
        let registry = test_registry();
        registry.install_members(demo_members(), false).await;

        let stats = registry.stats().await;
        assert_eq!(stats.total, 6);
        assert_eq!(stats.by_occupation.student, 2);
        assert_eq!(stats.by_occupation.employee, 1);
        assert_eq!(stats.by_occupation.entrepreneur, 1);
        assert_eq!(stats.by_occupation.unemployed, 1);
        assert_eq!(stats.by_occupation.other, 1);
        assert_eq!(stats.with_profile_image, 2);
        assert_eq!(stats.joined_last_30_days, 2);
    }
}
