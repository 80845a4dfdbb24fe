//! PollScheduler tests against a scripted snapshot source

#![cfg(feature = "server")]

#[cfg(test)]
mod tests {
    use live_map::{
        types::{Category, CategoryGroup, Entity, LiveMapConfig, WorldPoint},
        FeedError, LiveMapService, PollOutcome, PollScheduler, Snapshot, SnapshotError,
        SnapshotSource,
    };
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio_test::{assert_pending, assert_ready};

    /// Hands out queued results in order; an empty queue answers HTTP 503.
    #[derive(Default)]
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<Snapshot, FeedError>>>,
        fetches: Mutex<Vec<CategoryGroup>>,
    }

    impl ScriptedSource {
        fn push(&self, result: Result<Snapshot, FeedError>) {
            self.script.lock().push_back(result);
        }
    }

    impl SnapshotSource for ScriptedSource {
        async fn fetch(&self, group: CategoryGroup) -> Result<Snapshot, FeedError> {
            self.fetches.lock().push(group);
            let next = self.script.lock().pop_front();
            next.unwrap_or(Err(FeedError::Http(503)))
        }
    }

    /// Each fetch waits on the next queued gate until the test releases it.
    #[derive(Default)]
    struct GatedSource {
        gates: Mutex<VecDeque<oneshot::Receiver<Result<Snapshot, FeedError>>>>,
    }

    impl GatedSource {
        fn gate(&self) -> oneshot::Sender<Result<Snapshot, FeedError>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().push_back(rx);
            tx
        }
    }

    impl SnapshotSource for GatedSource {
        async fn fetch(&self, _group: CategoryGroup) -> Result<Snapshot, FeedError> {
            let gate = self.gates.lock().pop_front();
            match gate {
                Some(rx) => rx.await.unwrap_or(Err(FeedError::Http(499))),
                None => Err(FeedError::Http(503)),
            }
        }
    }

    fn make_scheduler(config: LiveMapConfig) -> (PollScheduler<ScriptedSource>, Arc<ScriptedSource>) {
        let service = Arc::new(Mutex::new(LiveMapService::new(config)));
        let source = Arc::new(ScriptedSource::default());
        (PollScheduler::new(service, source.clone()), source)
    }

    fn players(names: &[&str]) -> Snapshot {
        let entities = names
            .iter()
            .enumerate()
            .map(|(i, n)| {
                Entity::new(*n, Category::Player, WorldPoint::new(100.0 * (i + 1) as f64, 50.0))
            })
            .collect();
        Snapshot::new(CategoryGroup::Players, entities)
    }

    // -----------------------------------------------------------------------
    // Intervals
    // -----------------------------------------------------------------------

    #[test]
    fn default_intervals() {
        let (scheduler, _) = make_scheduler(LiveMapConfig::default());
        assert_eq!(
            scheduler.interval_for(CategoryGroup::Players),
            Some(Duration::from_millis(400))
        );
        assert_eq!(
            scheduler.interval_for(CategoryGroup::Garages),
            Some(Duration::from_millis(20_000))
        );
        assert_eq!(scheduler.interval_for(CategoryGroup::Npcs), None);
    }

    #[test]
    fn npc_timer_only_when_enabled() {
        let (scheduler, _) = make_scheduler(LiveMapConfig {
            npcs_enabled: true,
            ..Default::default()
        });
        assert_eq!(
            scheduler.interval_for(CategoryGroup::Npcs),
            Some(Duration::from_millis(5_000))
        );
    }

    // -----------------------------------------------------------------------
    // Polling
    // -----------------------------------------------------------------------

    #[test]
    fn poll_once_applies_fetched_snapshot() {
        let (scheduler, source) = make_scheduler(LiveMapConfig::default());
        source.push(Ok(players(&["alice", "bob"])));

        let outcome = tokio_test::block_on(scheduler.poll_once(CategoryGroup::Players));

        match outcome {
            PollOutcome::Applied(report) => assert_eq!(report.created.len(), 2),
            other => panic!("expected an applied pass, got {other:?}"),
        }
        let svc = scheduler.service().lock();
        assert_eq!(svc.summary().total, 2);
        assert_eq!(svc.panel_rows().len(), 2);
        assert_eq!(*source.fetches.lock(), [CategoryGroup::Players]);
    }

    #[test]
    fn failed_fetches_keep_previous_state() {
        let (scheduler, source) = make_scheduler(LiveMapConfig::default());
        source.push(Ok(players(&["alice", "bob"])));
        source.push(Err(FeedError::Http(500)));
        source.push(Err(FeedError::Decode(SnapshotError::MissingList)));

        tokio_test::block_on(async {
            scheduler.poll_once(CategoryGroup::Players).await;
            assert_eq!(
                scheduler.poll_once(CategoryGroup::Players).await,
                PollOutcome::Failed
            );
            assert_eq!(
                scheduler.poll_once(CategoryGroup::Players).await,
                PollOutcome::Failed
            );
        });

        let svc = scheduler.service().lock();
        assert_eq!(svc.engine(CategoryGroup::Players).rendered().len(), 2);
        assert_eq!(svc.stats().failed_polls, 2);
        assert_eq!(svc.stats().passes_applied, 1);
    }

    #[test]
    fn later_result_replaces_earlier_one() {
        let (scheduler, source) = make_scheduler(LiveMapConfig::default());
        source.push(Ok(players(&["alice", "bob"])));
        source.push(Ok(players(&["carol"])));

        tokio_test::block_on(async {
            scheduler.poll_once(CategoryGroup::Players).await;
            scheduler.poll_once(CategoryGroup::Players).await;
        });

        let svc = scheduler.service().lock();
        let ids: Vec<_> = svc
            .engine(CategoryGroup::Players)
            .rendered()
            .ids()
            .map(String::from)
            .collect();
        assert_eq!(ids, ["carol"]);
    }

    #[test]
    fn paused_service_still_fetches_but_skips_apply() {
        let (scheduler, source) = make_scheduler(LiveMapConfig {
            start_paused: true,
            ..Default::default()
        });
        source.push(Ok(players(&["alice"])));

        let outcome = tokio_test::block_on(scheduler.poll_once(CategoryGroup::Players));

        assert_eq!(outcome, PollOutcome::Paused);
        assert!(source.script.lock().is_empty());
        assert!(scheduler
            .service()
            .lock()
            .engine(CategoryGroup::Players)
            .rendered()
            .is_empty());
    }

    #[test]
    fn groups_are_independent() {
        let (scheduler, source) = make_scheduler(LiveMapConfig::default());
        source.push(Ok(players(&["alice"])));
        source.push(Ok(Snapshot::new(
            CategoryGroup::Garages,
            vec![Entity::new(
                "d835",
                Category::Garage,
                WorldPoint::new(12_345.0, 67_890.0),
            )],
        )));

        tokio_test::block_on(async {
            scheduler.poll_once(CategoryGroup::Players).await;
            scheduler.poll_once(CategoryGroup::Garages).await;
        });

        let stats = scheduler.service().lock().stats();
        assert_eq!(stats.players, 1);
        assert_eq!(stats.garages, 1);
        assert_eq!(stats.npcs, 0);
    }

    #[test]
    fn overlapping_polls_apply_in_completion_order() {
        let service = Arc::new(Mutex::new(LiveMapService::new(LiveMapConfig::default())));
        let source = Arc::new(GatedSource::default());
        let scheduler = PollScheduler::new(service, source.clone());
        let older = source.gate();
        let newer = source.gate();

        let mut first = tokio_test::task::spawn(scheduler.poll_once(CategoryGroup::Players));
        assert_pending!(first.poll());
        let mut second = tokio_test::task::spawn(scheduler.poll_once(CategoryGroup::Players));
        assert_pending!(second.poll());
        assert_eq!(scheduler.dispatched(CategoryGroup::Players), 2);

        // The newer dispatch answers first.
        assert!(newer.send(Ok(players(&["bob"]))).is_ok());
        assert!(second.is_woken());
        let outcome = assert_ready!(second.poll());
        assert!(matches!(outcome, PollOutcome::Applied(_)));
        assert_eq!(scheduler.latest_applied(CategoryGroup::Players), 2);

        // The older one lands afterwards and still wins.
        assert!(older.send(Ok(players(&["alice"]))).is_ok());
        let outcome = assert_ready!(first.poll());
        assert!(matches!(outcome, PollOutcome::Applied(_)));
        assert_eq!(scheduler.latest_applied(CategoryGroup::Players), 2);

        let svc = scheduler.service().lock();
        let ids: Vec<_> = svc
            .engine(CategoryGroup::Players)
            .rendered()
            .ids()
            .map(String::from)
            .collect();
        assert_eq!(ids, ["alice"]);
        assert_eq!(svc.stats().passes_applied, 2);
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn spawn_starts_players_and_garages_by_default() {
        let (scheduler, source) = make_scheduler(LiveMapConfig::default());
        let scheduler = Arc::new(scheduler);

        let timers = scheduler.spawn();
        assert_eq!(timers.len(), 2);

        tokio::time::sleep(Duration::from_millis(450)).await;
        {
            let fetches = source.fetches.lock();
            let count = |g| fetches.iter().filter(|f| **f == g).count();
            assert!(count(CategoryGroup::Players) >= 2);
            assert_eq!(count(CategoryGroup::Garages), 1);
            assert_eq!(count(CategoryGroup::Npcs), 0);
        }

        for t in timers {
            t.abort();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_adds_npc_timer_when_enabled() {
        let (scheduler, _) = make_scheduler(LiveMapConfig {
            npcs_enabled: true,
            ..Default::default()
        });
        let timers = Arc::new(scheduler).spawn();
        assert_eq!(timers.len(), 3);

        for t in timers {
            t.abort();
        }
    }
}
