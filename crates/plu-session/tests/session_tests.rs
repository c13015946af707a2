//! End-to-end session behaviour over in-memory collaborators.
//!
//! Time is paused; the scripted fetcher resolves the classification flags
//! within the first second, the map at 3.5 s and the document at 4.5 s.

use plu_artifact::{ArtifactKind, ArtifactStatus, PanelTab};
use plu_core::{AssistantConfig, ConversationBranch, ConversationId, StoredBranch};
use plu_enrichment::EnrichmentStage;
use plu_session::{
    run_simulation, PersistedEnrichmentStatus, ScriptedFetcher, SessionError, SessionEvent,
    SessionView,
};
use plu_test_utils::{
    cache_data, completed_record, completed_record_with_tab, two_part_multipolygon, TestEnvironment,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    std::iter::from_fn(|| events.try_recv().ok()).collect()
}

#[tokio::test(start_paused = true)]
async fn rnu_conversation_runs_to_completion() {
    let t = TestEnvironment::new(ConversationBranch::Rnu);
    let session = t.orchestrator().start_conversation("Lyon").await.unwrap();
    let mut events = session.subscribe();

    assert_eq!(session.view().caption(), Some("Vérification de la zone..."));
    assert!(!session.chat_input_enabled());

    sleep(ms(2100)).await;
    assert_eq!(session.view().caption(), Some("Récupération du RNU..."));

    sleep(ms(2500)).await;
    assert_eq!(
        session.view(),
        SessionView::Ready {
            branch: ConversationBranch::Rnu,
            active_tab: PanelTab::Map,
        }
    );
    assert!(session.chat_input_enabled());
    assert!(session.is_panel_open());

    let record = t.backend.get(&session.id()).unwrap();
    assert_eq!(record.branch_type, StoredBranch::Rnu);
    assert!(record.is_rnu);
    assert_eq!(record.enrichment_status, PersistedEnrichmentStatus::Completed);
    assert_eq!(record.primary_document_id.as_deref(), Some("doc-69123-ua1"));
    assert!(record.document_metadata.unwrap().map_geometry_available);

    let cached = t.env.cache.get_cached_conversation_data(&session.id()).await.unwrap();
    assert_eq!(cached.city_name.as_deref(), Some("Lyon"));
    assert_eq!(cached.document_summary.as_deref(), Some("Hauteur maximale 16 m, emprise au sol 60 %"));

    let artifacts = session.artifacts().unwrap();
    for kind in ArtifactKind::ALL {
        assert_eq!(artifacts.status_of(kind), ArtifactStatus::Ready, "{kind}");
    }

    assert_eq!(
        drain(&mut events),
        vec![
            SessionEvent::BranchResolved {
                branch: ConversationBranch::Rnu
            },
            SessionEvent::Completed {
                branch: ConversationBranch::Rnu
            },
            SessionEvent::PanelOpened { tab: PanelTab::Map },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn simulation_matches_every_branch() {
    for branch in ConversationBranch::ALL {
        let report = run_simulation(
            AssistantConfig::default(),
            branch,
            Arc::new(ScriptedFetcher::for_branch(branch)),
            Duration::from_secs(30),
        )
        .await
        .unwrap();

        assert!(report.matches_expected(), "{branch}: {:?}", report.observed_captions);
        assert_eq!(report.retries, 0);
        assert_eq!(report.persistence_failures, 0);
    }
}

#[tokio::test(start_paused = true)]
async fn stage_failure_offers_retry_then_completes() {
    let fetcher = ScriptedFetcher::for_branch(ConversationBranch::NonRnuSource)
        .with_failure(EnrichmentStage::Map, "tile server unavailable");

    let report = run_simulation(
        AssistantConfig::default(),
        ConversationBranch::NonRnuSource,
        Arc::new(fetcher),
        Duration::from_secs(30),
    )
    .await
    .unwrap();

    assert_eq!(report.retries, 1);
    assert!(report.matches_expected());
    assert!(report.transitions.iter().any(|t| matches!(
        t.view,
        SessionView::Loading {
            retry_available: true,
            ..
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn error_never_advances_to_terminal_view() {
    let t = TestEnvironment::with_fetcher(
        ScriptedFetcher::for_branch(ConversationBranch::NonRnuSource)
            .with_failure(EnrichmentStage::Document, "document service unavailable"),
    );
    let session = t.orchestrator().start_conversation("Lyon").await.unwrap();

    sleep(ms(10_000)).await;
    assert_eq!(
        session.view(),
        SessionView::Loading {
            step: plu_enrichment::LoadingStep::CheckingAnalysis,
            retry_available: true,
        }
    );
    assert_eq!(
        t.backend.get(&session.id()).unwrap().enrichment_status,
        PersistedEnrichmentStatus::Failed
    );
    assert_eq!(
        session.artifacts().unwrap().status_of(ArtifactKind::Document),
        ArtifactStatus::Error
    );

    assert!(session.retry());
    assert!(!session.retry());
    sleep(ms(5000)).await;

    assert!(session.view().is_ready());
    assert_eq!(t.fetcher.calls(EnrichmentStage::Document), 2);
    assert_eq!(t.fetcher.calls(EnrichmentStage::City), 1);
}

#[tokio::test(start_paused = true)]
async fn completed_conversation_skips_loading_and_restores_tab() {
    let t = TestEnvironment::new(ConversationBranch::NonRnuAnalysis);
    let record = completed_record_with_tab(ConversationBranch::NonRnuAnalysis, 2, PanelTab::Document);
    t.backend.insert(record.clone());

    let session = t.orchestrator().mount(&record.id).await.unwrap();
    let views = session.subscribe_view();
    let mut events = session.subscribe();

    assert_eq!(
        session.view(),
        SessionView::Ready {
            branch: ConversationBranch::NonRnuAnalysis,
            active_tab: PanelTab::Document,
        }
    );
    assert_eq!(session.view().caption(), None);
    assert!(!session.chat_input_enabled());

    sleep(ms(1600)).await;
    assert!(session.readiness().document_ready);
    assert!(!session.chat_input_enabled());
    assert!(!session.is_panel_open());

    sleep(ms(1500)).await;
    assert!(session.chat_input_enabled());
    assert!(session.is_panel_open());

    sleep(ms(10_000)).await;
    assert_eq!(
        drain(&mut events),
        vec![SessionEvent::PanelOpened {
            tab: PanelTab::Document
        }]
    );
    assert!(!views.has_changed().unwrap());
    for stage in EnrichmentStage::ALL {
        assert_eq!(t.fetcher.calls(stage), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn valid_cache_bypasses_in_progress_row() {
    let t = TestEnvironment::new(ConversationBranch::NonRnuSource);
    let mut record = completed_record(ConversationBranch::NonRnuSource, 0);
    record.enrichment_status = PersistedEnrichmentStatus::InProgress;
    t.backend.insert(record.clone());
    t.env
        .cache
        .set_cached_conversation_data(&record.id, cache_data(false))
        .await
        .unwrap();

    let session = t.orchestrator().mount(&record.id).await.unwrap();

    assert_eq!(
        session.view(),
        SessionView::Ready {
            branch: ConversationBranch::NonRnuSource,
            active_tab: PanelTab::Map,
        }
    );
    assert!(session.chat_input_enabled());
    assert!(!session.is_panel_open());

    let artifacts = session.artifacts().unwrap();
    assert!(artifacts.map().is_ready());
    assert_eq!(artifacts.zone().data().unwrap().insee_code.as_deref(), Some("75056"));
}

#[tokio::test(start_paused = true)]
async fn cached_multipolygon_outline_restores_every_part() {
    let t = TestEnvironment::new(ConversationBranch::NonRnuAnalysis);
    let record = completed_record(ConversationBranch::NonRnuAnalysis, 0);
    t.backend.insert(record.clone());
    let cached = plu_cache::ConversationCacheData {
        zone_geometry: Some(two_part_multipolygon()),
        ..cache_data(true)
    };
    t.env
        .cache
        .set_cached_conversation_data(&record.id, cached)
        .await
        .unwrap();

    let session = t.orchestrator().mount(&record.id).await.unwrap();

    let artifacts = session.artifacts().unwrap();
    let map = artifacts.map().data().unwrap();
    let rings = map.polygons();
    assert_eq!(rings.len(), 2);
    assert_eq!(rings[0][0].to_array(), [45.70, 4.80]);
    assert_eq!(rings[1][0].to_array(), [45.80, 4.90]);
}

#[tokio::test(start_paused = true)]
async fn superseded_handle_leaves_newer_mount_intact() {
    let t = TestEnvironment::new(ConversationBranch::NonRnuAnalysis);
    let record = completed_record_with_tab(ConversationBranch::NonRnuAnalysis, 2, PanelTab::Document);
    t.backend.insert(record.clone());
    let orchestrator = t.orchestrator();

    let stale = orchestrator.mount(&record.id).await.unwrap();
    let live = orchestrator.mount(&record.id).await.unwrap();
    assert!(!stale.is_current());
    assert!(live.is_current());

    stale.unmount();

    let artifacts = live.artifacts().unwrap();
    assert_eq!(artifacts.active_tab(), PanelTab::Document);
    assert_eq!(live.active_tab(), PanelTab::Document);
    assert_eq!(
        live.view(),
        SessionView::Ready {
            branch: ConversationBranch::NonRnuAnalysis,
            active_tab: PanelTab::Document,
        }
    );

    live.unmount();
    assert!(!t.env.artifacts.contains(&record.id));
}

#[tokio::test(start_paused = true)]
async fn superseded_enrichment_does_not_reset_remount() {
    let t = TestEnvironment::new(ConversationBranch::Rnu);
    let orchestrator = t.orchestrator();
    let first = orchestrator.start_conversation("Lyon").await.unwrap();
    let id = first.id();

    sleep(ms(1000)).await;
    let second = orchestrator.mount(&id).await.unwrap();
    first.unmount();
    assert!(t.env.artifacts.contains(&id));

    sleep(ms(5000)).await;
    assert!(second.view().is_ready());
    let artifacts = second.artifacts().unwrap();
    for kind in ArtifactKind::ALL {
        assert_eq!(artifacts.status_of(kind), ArtifactStatus::Ready, "{kind}");
    }
}

#[tokio::test(start_paused = true)]
async fn unfinished_conversation_restarts_from_first_step() {
    let t = TestEnvironment::new(ConversationBranch::Rnu);
    let first = t.orchestrator().start_conversation("Lyon").await.unwrap();
    let id = first.id();

    sleep(ms(2100)).await;
    assert_eq!(first.view().caption(), Some("Récupération du RNU..."));
    first.unmount();

    let second = t.orchestrator().mount(&id).await.unwrap();
    assert_eq!(second.view().caption(), Some("Vérification de la zone..."));

    sleep(ms(1000)).await;
    assert_eq!(second.view().caption(), Some("Vérification de la zone..."));
    sleep(ms(1100)).await;
    assert_eq!(second.view().caption(), Some("Récupération du RNU..."));
}

#[tokio::test(start_paused = true)]
async fn unmount_discards_late_results() {
    let t = TestEnvironment::new(ConversationBranch::Rnu);
    let session = t.orchestrator().start_conversation("Lyon").await.unwrap();
    let id = session.id();
    let views = session.subscribe_view();

    sleep(ms(1000)).await;
    session.unmount();
    assert!(!t.env.artifacts.contains(&id));

    sleep(ms(10_000)).await;
    assert!(!t.env.artifacts.contains(&id));
    assert_eq!(*views.borrow(), SessionView::Loading {
        step: plu_enrichment::LoadingStep::CheckingZone,
        retry_available: false,
    });

    let record = t.backend.get(&id).unwrap();
    assert_eq!(record.branch_type, StoredBranch::Rnu);
    assert_eq!(record.enrichment_status, PersistedEnrichmentStatus::InProgress);
    assert!(t.env.cache.get_cached_conversation_data(&id).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn persistence_failures_are_reported_not_retried() {
    let t = TestEnvironment::new(ConversationBranch::NonRnuAnalysis);
    let session = t.orchestrator().start_conversation("Lyon").await.unwrap();
    let mut events = session.subscribe();
    t.backend.set_fail_writes(true);

    sleep(ms(5000)).await;
    assert!(session.view().is_ready());

    let failed: Vec<&'static str> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            SessionEvent::PersistenceFailed { operation, .. } => Some(operation),
            _ => None,
        })
        .collect();
    assert_eq!(failed, vec!["enrichment_status", "branch_resolution", "completion"]);

    let record = t.backend.get(&session.id()).unwrap();
    assert_eq!(record.branch_type, StoredBranch::Pending);
    assert_eq!(record.enrichment_status, PersistedEnrichmentStatus::Pending);
    // Cache lives in separate storage and is still written
    assert!(t.env.cache.get_cached_conversation_data(&session.id()).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn tab_changes_are_persisted() {
    let t = TestEnvironment::new(ConversationBranch::Rnu);
    let session = t.orchestrator().start_conversation("Lyon").await.unwrap();
    sleep(ms(5000)).await;

    session.set_active_tab(PanelTab::Document).await.unwrap();
    assert_eq!(
        session.view(),
        SessionView::Ready {
            branch: ConversationBranch::Rnu,
            active_tab: PanelTab::Document,
        }
    );
    let panel = t.backend.get(&session.id()).unwrap().context_metadata.panel;
    assert_eq!(panel.map(|p| p.active_tab), Some(PanelTab::Document));

    assert_eq!(session.open_artifact(ArtifactKind::Zone).await.unwrap(), PanelTab::Map);
    let panel = t.backend.get(&session.id()).unwrap().context_metadata.panel;
    assert_eq!(panel.map(|p| p.active_tab), Some(PanelTab::Map));

    t.backend.set_fail_writes(true);
    let err = session.set_active_tab(PanelTab::Document).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(session.active_tab(), PanelTab::Document);
}

#[tokio::test]
async fn mounting_unknown_conversation_fails() {
    let t = TestEnvironment::new(ConversationBranch::Rnu);
    let id = ConversationId::new();

    let err = t.orchestrator().mount(&id).await.unwrap_err();

    assert!(matches!(err, SessionError::NotFound(missing) if missing == id));
}
