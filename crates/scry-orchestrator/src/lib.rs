//! Orchestration pipeline chaining identity resolution, live-game
//! membership polling, and match analysis.
//!
//! The pipeline is an actor: it owns every cache slot, runs on one task,
//! and talks to the outside world through a command channel in and a watch
//! channel plus event bus out. Stages are evaluated strictly in dependency
//! order; a stage is only ever fetched when its enablement predicate over
//! the previous stage holds.

mod bus;
mod poller;
mod query;

pub use bus::LocalBus;
pub use poller::{MembershipSnapshot, MembershipStage};
pub use query::{QuerySlot, SharedFetch, StageSnapshot};

use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use scry_client::AnalysisApi;
use scry_ops::EventStore;
use scry_types::{
    analysis::MatchAnalysis,
    config::PipelineConfig,
    events::{
        EventKind, EventPayload, LifecycleEvent, LifecyclePhase, MembershipEvent,
        MembershipTransition, StageEvent, StageOutcome, SystemEvent,
    },
    identity::RiotId,
    summoner::Summoner,
    FetchError, Result,
};

/// Instructions accepted by the running pipeline.
#[derive(Debug, Clone)]
pub enum PipelineCommand {
    Search(RiotId),
    Refresh,
    Shutdown,
}

/// Everything a consumer needs to render, pushed over the watch channel.
#[derive(Debug, Clone, Default)]
pub struct PipelineSnapshot {
    pub identity: Option<RiotId>,
    pub summoner: StageSnapshot<Summoner>,
    pub membership: MembershipSnapshot,
    pub analysis: StageSnapshot<MatchAnalysis>,
}

impl PipelineSnapshot {
    /// The single surfaced error. Summoner and analysis failures block the
    /// chain and must be shown; membership hiccups self-heal within a poll
    /// cycle and stay quiet.
    pub fn display_error(&self) -> Option<&FetchError> {
        self.summoner
            .error
            .as_ref()
            .or(self.analysis.error.as_ref())
    }

    pub fn is_loading(&self) -> bool {
        self.summoner.is_fetching || self.membership.is_checking || self.analysis.is_fetching
    }
}

pub struct Pipeline<A: AnalysisApi> {
    api: Arc<A>,
    config: PipelineConfig,
    bus: LocalBus,
    store: EventStore,
    updates: watch::Sender<PipelineSnapshot>,
    identity: Option<RiotId>,
    summoner: QuerySlot<RiotId, Summoner>,
    membership: MembershipStage,
    analysis: QuerySlot<String, MatchAnalysis>,
}

impl<A: AnalysisApi + 'static> Pipeline<A> {
    pub fn new(
        api: Arc<A>,
        config: PipelineConfig,
        bus: LocalBus,
        store: EventStore,
        updates: watch::Sender<PipelineSnapshot>,
    ) -> Self {
        let summoner = QuerySlot::new(config.summoner_ttl());
        let membership = MembershipStage::new(config.poll_interval(), config.membership_hold());
        let analysis = QuerySlot::new(config.analysis_ttl());
        Self {
            api,
            config,
            bus,
            store,
            updates,
            identity: None,
            summoner,
            membership,
            analysis,
        }
    }

    /// Event loop: commands plus the fixed poll schedule. Dropping the
    /// command channel (or an explicit `Shutdown`) tears the loop down with
    /// no further calls.
    pub async fn run(mut self, mut commands: mpsc::Receiver<PipelineCommand>) -> Result<()> {
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    None | Some(PipelineCommand::Shutdown) => {
                        self.publish(SystemEvent::new(
                            EventKind::Lifecycle,
                            EventPayload::Lifecycle(LifecycleEvent {
                                phase: LifecyclePhase::Shutdown,
                                details: None,
                            }),
                        ))
                        .await;
                        break;
                    }
                    Some(PipelineCommand::Search(id)) => {
                        self.submit(id).await;
                        ticker.reset();
                        self.advance().await;
                    }
                    Some(PipelineCommand::Refresh) => {
                        self.refresh().await;
                        ticker.reset();
                        self.advance().await;
                    }
                },
                _ = ticker.tick() => {
                    self.advance().await;
                }
            }
        }
        Ok(())
    }

    /// Point the pipeline at a player. Submitting the identity already
    /// shown is an explicit re-search and bypasses every fresh cache.
    pub async fn submit(&mut self, id: RiotId) {
        if self.identity.as_ref() == Some(&id) {
            self.refresh().await;
            return;
        }
        info!("Searching for {}", id);
        self.identity = Some(id.clone());
        self.summoner.reset();
        self.membership.reset();
        self.analysis.reset();
        self.publish(SystemEvent::new(
            EventKind::Lifecycle,
            EventPayload::Lifecycle(LifecycleEvent {
                phase: LifecyclePhase::SearchSubmitted,
                details: Some(id.to_string()),
            }),
        ))
        .await;
        self.push_snapshot();
    }

    /// Explicit re-fetch of the whole chain for the current identity.
    pub async fn refresh(&mut self) {
        let Some(id) = self.identity.clone() else {
            return;
        };
        self.summoner.mark_stale();
        // The stale mark only takes effect while the verdict is Present;
        // analysis is never refetched for a player who left their game.
        self.analysis.mark_stale();
        self.membership.force_next();
        self.publish(SystemEvent::new(
            EventKind::Lifecycle,
            EventPayload::Lifecycle(LifecycleEvent {
                phase: LifecyclePhase::Refreshed,
                details: Some(id.to_string()),
            }),
        ))
        .await;
        self.push_snapshot();
    }

    /// One evaluation of the dependency chain, in order.
    pub async fn advance(&mut self) {
        let Some(id) = self.identity.clone() else {
            return;
        };

        let summoner = match self.resolve_summoner(&id).await {
            Ok(summoner) => summoner,
            Err(_) => {
                // Downstream stages stay disabled until a resubmission.
                self.push_snapshot();
                return;
            }
        };

        self.poll_membership(&summoner.puuid).await;

        if self.membership.is_present() {
            let _ = self.resolve_analysis(&summoner.puuid).await;
        }
        self.push_snapshot();
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            identity: self.identity.clone(),
            summoner: self.summoner.snapshot(),
            membership: self.membership.snapshot(Instant::now()),
            analysis: self.analysis.snapshot(),
        }
    }

    async fn resolve_summoner(&mut self, id: &RiotId) -> Result<Summoner, FetchError> {
        let now = Instant::now();
        if let Some(outcome) = self.summoner.lookup(id, now) {
            return outcome;
        }

        let fetch = match self.summoner.pending(id) {
            Some(pending) => pending,
            None => {
                self.stage_event(EventKind::Summoner, id.to_string(), StageOutcome::Started)
                    .await;
                let api = self.api.clone();
                let key = id.clone();
                let fetch = self.summoner.begin(
                    id.clone(),
                    async move { api.summoner_by_riot_id(&key.name, &key.tag).await }.boxed(),
                );
                self.push_snapshot();
                fetch
            }
        };

        let outcome = fetch.await;
        self.summoner.complete(id, outcome.clone(), Instant::now());
        match &outcome {
            Ok(summoner) => {
                debug!("Resolved {} to puuid {}", id, summoner.puuid);
                self.stage_event(EventKind::Summoner, id.to_string(), StageOutcome::Succeeded)
                    .await;
            }
            Err(err) => {
                warn!("Summoner lookup for {} failed: {}", id, err);
                self.stage_event(
                    EventKind::Summoner,
                    id.to_string(),
                    StageOutcome::Failed(err.to_string()),
                )
                .await;
            }
        }
        outcome
    }

    async fn poll_membership(&mut self, puuid: &str) {
        let now = Instant::now();
        if !self.membership.is_due(puuid, now) {
            return;
        }

        self.membership.begin(puuid, now);
        self.membership_event(puuid, MembershipTransition::Checking)
            .await;
        self.push_snapshot();

        let outcome = self.api.live_game(puuid).await;
        let transition = match &outcome {
            Ok(game) => MembershipTransition::Present {
                game_id: game.game_id,
            },
            Err(err) if err.is_not_found() => MembershipTransition::Absent,
            Err(err) => MembershipTransition::Held {
                reason: err.to_string(),
            },
        };

        let left_game = self.membership.apply(puuid, outcome, Instant::now());
        if left_game {
            // Analysis of a finished game is dead state.
            self.analysis.reset();
        }
        if let MembershipTransition::Held { reason } = &transition {
            debug!("Membership poll held previous verdict: {}", reason);
        }
        self.membership_event(puuid, transition).await;
        self.push_snapshot();
    }

    async fn resolve_analysis(&mut self, puuid: &str) -> Result<MatchAnalysis, FetchError> {
        let key = puuid.to_string();
        let now = Instant::now();
        if let Some(outcome) = self.analysis.lookup(&key, now) {
            return outcome;
        }

        let fetch = match self.analysis.pending(&key) {
            Some(pending) => pending,
            None => {
                self.stage_event(EventKind::Analysis, key.clone(), StageOutcome::Started)
                    .await;
                let api = self.api.clone();
                let target = key.clone();
                let fetch = self.analysis.begin(
                    key.clone(),
                    async move { api.analyze_match(&target).await }.boxed(),
                );
                self.push_snapshot();
                fetch
            }
        };

        let outcome = fetch.await;
        self.analysis.complete(&key, outcome.clone(), Instant::now());
        match &outcome {
            Ok(analysis) => {
                debug!(
                    "Analysis ready for game {} ({} scored, {} hidden)",
                    analysis.game_id,
                    analysis.blue_team.len() + analysis.red_team.len(),
                    analysis.hidden_players.len()
                );
                self.stage_event(EventKind::Analysis, key.clone(), StageOutcome::Succeeded)
                    .await;
            }
            Err(err) => {
                warn!("Match analysis for {} failed: {}", key, err);
                self.stage_event(
                    EventKind::Analysis,
                    key.clone(),
                    StageOutcome::Failed(err.to_string()),
                )
                .await;
            }
        }
        outcome
    }

    async fn stage_event(&self, kind: EventKind, key: String, outcome: StageOutcome) {
        let payload = StageEvent { key, outcome };
        let payload = match kind {
            EventKind::Analysis => EventPayload::Analysis(payload),
            _ => EventPayload::Summoner(payload),
        };
        self.publish(SystemEvent::new(kind, payload)).await;
    }

    async fn membership_event(&self, puuid: &str, transition: MembershipTransition) {
        self.publish(SystemEvent::new(
            EventKind::Membership,
            EventPayload::Membership(MembershipEvent {
                puuid: puuid.to_string(),
                transition,
            }),
        ))
        .await;
    }

    async fn publish(&self, event: SystemEvent) {
        self.bus.publish(event.clone());
        self.store.record_event(event).await;
    }

    fn push_snapshot(&self) {
        self.updates.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scry_types::live::LiveGame;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Scripted backend: queued outcomes per endpoint, with call counting.
    /// An empty queue falls back to a benign default.
    #[derive(Default)]
    struct ScriptedApi {
        summoner_calls: AtomicUsize,
        live_calls: AtomicUsize,
        analysis_calls: AtomicUsize,
        summoner_script: StdMutex<VecDeque<Result<Summoner, FetchError>>>,
        live_script: StdMutex<VecDeque<Result<LiveGame, FetchError>>>,
        analysis_script: StdMutex<VecDeque<Result<MatchAnalysis, FetchError>>>,
    }

    impl ScriptedApi {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn script_summoner(&self, outcome: Result<Summoner, FetchError>) {
            self.summoner_script.lock().unwrap().push_back(outcome);
        }

        fn script_live(&self, outcome: Result<LiveGame, FetchError>) {
            self.live_script.lock().unwrap().push_back(outcome);
        }

        fn script_analysis(&self, outcome: Result<MatchAnalysis, FetchError>) {
            self.analysis_script.lock().unwrap().push_back(outcome);
        }
    }

    #[async_trait]
    impl AnalysisApi for ScriptedApi {
        async fn summoner_by_riot_id(
            &self,
            _name: &str,
            _tag: &str,
        ) -> Result<Summoner, FetchError> {
            self.summoner_calls.fetch_add(1, Ordering::SeqCst);
            self.summoner_script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(summoner()))
        }

        async fn live_game(&self, _puuid: &str) -> Result<LiveGame, FetchError> {
            self.live_calls.fetch_add(1, Ordering::SeqCst);
            self.live_script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::status(404, "not in game")))
        }

        async fn analyze_match(&self, _puuid: &str) -> Result<MatchAnalysis, FetchError> {
            self.analysis_calls.fetch_add(1, Ordering::SeqCst);
            self.analysis_script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(analysis()))
        }
    }

    fn summoner() -> Summoner {
        Summoner {
            puuid: "puuid-1".into(),
            display_name: "Faker".into(),
            tag: "KR1".into(),
            level: 612,
            rank_tier: None,
            rank_division: None,
            league_points: None,
        }
    }

    fn game() -> LiveGame {
        LiveGame {
            game_id: 99,
            game_mode: "Ranked Solo/Duo".into(),
            participants: vec![],
        }
    }

    fn analysis() -> MatchAnalysis {
        MatchAnalysis {
            game_id: 99,
            game_mode: "Ranked Solo/Duo".into(),
            blue_team: vec![],
            red_team: vec![],
            hidden_players: vec![],
        }
    }

    fn pipeline(
        api: Arc<ScriptedApi>,
    ) -> (Pipeline<ScriptedApi>, watch::Receiver<PipelineSnapshot>) {
        let (tx, rx) = watch::channel(PipelineSnapshot::default());
        let config = PipelineConfig {
            summoner_ttl_secs: 300,
            analysis_ttl_secs: 120,
            poll_interval_secs: 30,
            membership_hold_secs: 28,
            slow_hint_ms: 1500,
        };
        let pipeline = Pipeline::new(api, config, LocalBus::new(16), EventStore::new(), tx);
        (pipeline, rx)
    }

    fn riot_id() -> RiotId {
        RiotId::new("Faker", "KR1")
    }

    #[tokio::test]
    async fn failed_resolution_keeps_downstream_disabled() {
        let api = ScriptedApi::new();
        api.script_summoner(Err(FetchError::status(404, "Summoner not found")));
        let (mut pipeline, rx) = pipeline(api.clone());

        pipeline.submit(riot_id()).await;
        pipeline.advance().await;
        // Later cycles must not sneak a retry in either.
        pipeline.advance().await;

        assert_eq!(api.summoner_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.live_calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.analysis_calls.load(Ordering::SeqCst), 0);

        let snapshot = rx.borrow();
        assert!(matches!(
            snapshot.display_error(),
            Some(FetchError::Status { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn absent_verdict_disables_analysis() {
        let api = ScriptedApi::new();
        api.script_live(Err(FetchError::status(404, "not in game")));
        let (mut pipeline, rx) = pipeline(api.clone());

        pipeline.submit(riot_id()).await;
        pipeline.advance().await;

        assert_eq!(api.analysis_calls.load(Ordering::SeqCst), 0);
        let snapshot = rx.borrow();
        assert!(snapshot.membership.is_definitively_absent);
        assert!(snapshot.display_error().is_none());
    }

    #[tokio::test]
    async fn present_verdict_flows_through_to_analysis() {
        let api = ScriptedApi::new();
        api.script_live(Ok(game()));
        let (mut pipeline, rx) = pipeline(api.clone());

        pipeline.submit(riot_id()).await;
        pipeline.advance().await;

        assert_eq!(api.analysis_calls.load(Ordering::SeqCst), 1);
        let snapshot = rx.borrow();
        assert!(snapshot.membership.verdict.as_ref().unwrap().is_present());
        assert_eq!(snapshot.analysis.data.as_ref().unwrap().game_id, 99);
    }

    #[tokio::test]
    async fn transient_poll_failure_keeps_present_without_surfacing() {
        let api = ScriptedApi::new();
        api.script_live(Ok(game()));
        api.script_live(Err(FetchError::transport("flaky wifi")));
        let (mut pipeline, rx) = pipeline(api.clone());

        pipeline.submit(riot_id()).await;
        pipeline.advance().await;

        pipeline.membership.force_next();
        pipeline.advance().await;

        assert_eq!(api.live_calls.load(Ordering::SeqCst), 2);
        let snapshot = rx.borrow();
        assert!(snapshot.membership.verdict.as_ref().unwrap().is_present());
        assert!(snapshot.display_error().is_none());
        // The cached analysis stayed fresh; no duplicate fetch happened.
        assert_eq!(api.analysis_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn leaving_the_game_clears_analysis() {
        let api = ScriptedApi::new();
        api.script_live(Ok(game()));
        api.script_live(Err(FetchError::status(404, "not in game")));
        let (mut pipeline, rx) = pipeline(api.clone());

        pipeline.submit(riot_id()).await;
        pipeline.advance().await;
        assert!(rx.borrow().analysis.data.is_some());

        pipeline.membership.force_next();
        pipeline.advance().await;

        let snapshot = rx.borrow();
        assert!(snapshot.membership.is_definitively_absent);
        assert!(snapshot.analysis.data.is_none());
    }

    #[tokio::test]
    async fn identical_resubmission_bypasses_fresh_caches() {
        let api = ScriptedApi::new();
        api.script_live(Ok(game()));
        api.script_live(Ok(game()));
        let (mut pipeline, _rx) = pipeline(api.clone());

        pipeline.submit(riot_id()).await;
        pipeline.advance().await;
        assert_eq!(api.summoner_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.analysis_calls.load(Ordering::SeqCst), 1);

        // Everything is still well within its TTL.
        pipeline.submit(riot_id()).await;
        pipeline.advance().await;

        assert_eq!(api.summoner_calls.load(Ordering::SeqCst), 2);
        assert_eq!(api.live_calls.load(Ordering::SeqCst), 2);
        assert_eq!(api.analysis_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn switching_identity_resets_previous_state() {
        let api = ScriptedApi::new();
        api.script_live(Ok(game()));
        let (mut pipeline, rx) = pipeline(api.clone());

        pipeline.submit(riot_id()).await;
        pipeline.advance().await;
        assert!(rx.borrow().summoner.data.is_some());

        pipeline.submit(RiotId::new("SomeoneElse", "EUW")).await;
        {
            let snapshot = rx.borrow();
            assert_eq!(snapshot.identity.as_ref().unwrap().name, "SomeoneElse");
            assert!(snapshot.summoner.data.is_none());
            assert!(snapshot.membership.verdict.is_none());
            assert!(snapshot.analysis.data.is_none());
        }

        pipeline.advance().await;
        assert_eq!(api.summoner_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn run_loop_processes_search_then_shutdown() {
        let api = ScriptedApi::new();
        let (pipeline, rx) = pipeline(api.clone());
        let (tx, commands) = mpsc::channel(8);

        let handle = tokio::spawn(pipeline.run(commands));
        tx.send(PipelineCommand::Search(riot_id())).await.unwrap();
        tx.send(PipelineCommand::Shutdown).await.unwrap();
        handle.await.unwrap().unwrap();

        assert_eq!(api.summoner_calls.load(Ordering::SeqCst), 1);
        assert!(rx.borrow().summoner.data.is_some());
    }
}
