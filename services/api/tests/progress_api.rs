use chrono::{DateTime, Duration, TimeZone, Utc};
use fitness_api::adapters::{HttpProgressClient, InMemoryRepository};
use fitness_api::web::{self, AppState};
use fitness_core::{
    Celebration, Clock, Day, Exercise, Item, ItemKind, ManualScheduler, Notice, Notifier,
    PlayerConfig, PortError, ProgressPlayer, ProgressRepository, ProgressSync,
};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const SESSION: &str = "test-session";

struct TestServer {
    base_url: String,
    repo: Arc<InMemoryRepository>,
    user_id: Uuid,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(None).await
    }

    async fn start_with(clock: Option<Arc<dyn Clock>>) -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        let user_id = Uuid::new_v4();
        repo.insert_session(SESSION, user_id).await;

        let dyn_repo: Arc<dyn ProgressRepository> = repo.clone();
        let mut state = AppState::new(dyn_repo);
        if let Some(clock) = clock {
            state = state.with_clock(clock);
        }
        let app = web::router(Arc::new(state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            repo,
            user_id,
        }
    }

    fn client(&self) -> HttpProgressClient {
        HttpProgressClient::new(&self.base_url, SESSION).unwrap()
    }

    async fn assign(&self, item: &Item) {
        self.repo.insert_item(item.clone()).await;
        self.repo.assign(self.user_id, item.id).await;
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    fn celebrations(&self) -> Vec<Celebration> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter_map(|n| match n {
                Notice::Celebration(c) => Some(*c),
                Notice::Warning(_) => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// A clock that only moves when told to.
struct SteppingClock {
    now: Mutex<DateTime<Utc>>,
}

impl SteppingClock {
    fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()),
        }
    }

    fn skip_days(&self, days: i64) {
        *self.now.lock().unwrap() += Duration::days(days);
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

fn core_blast() -> Item {
    Item {
        id: Uuid::new_v4(),
        kind: ItemKind::Class,
        title: "Core Blast".to_string(),
        thumbnail: None,
        difficulty: Some("beginner".to_string()),
        duration_label: Some("15 min".to_string()),
        days: vec![Day {
            title: "Day 1".to_string(),
            index: 1,
            exercises: vec![
                Exercise::timed("A", "Plank", 30),
                Exercise::reps("B", "Crunches", 12, 3),
            ],
        }],
    }
}

fn two_day_program() -> Item {
    Item {
        id: Uuid::new_v4(),
        kind: ItemKind::Program,
        title: "Strength Base".to_string(),
        thumbnail: None,
        difficulty: None,
        duration_label: None,
        days: vec![
            Day {
                title: "Day 1".to_string(),
                index: 1,
                exercises: vec![Exercise::timed("p1", "Squat hold", 20)],
            },
            Day {
                title: "Day 2".to_string(),
                index: 2,
                exercises: vec![Exercise::reps("p2", "Lunges", 10, 2)],
            },
        ],
    }
}

fn player_for(
    server: &TestServer,
    kind: ItemKind,
) -> (
    ProgressPlayer<HttpProgressClient>,
    Arc<ManualScheduler>,
    Arc<RecordingNotifier>,
) {
    let scheduler = Arc::new(ManualScheduler::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let player = ProgressPlayer::new(
        kind,
        Arc::new(server.client()),
        scheduler.clone(),
        notifier.clone(),
        PlayerConfig::default(),
    );
    (player, scheduler, notifier)
}

#[tokio::test]
async fn timer_expiry_and_manual_completion_finish_the_class() {
    let server = TestServer::start().await;
    let item = core_blast();
    server.assign(&item).await;
    let (mut player, scheduler, notifier) = player_for(&server, ItemKind::Class);

    player.load_items().await;
    player.select(item.id).await.unwrap();
    assert_eq!(player.remaining_secs(), 30);

    player.start().unwrap();
    scheduler.advance(30);
    player.pump_timer_events().await;

    assert!(player.progress().is_completed("A"));
    assert_eq!(player.exercise_index(), 1);
    assert_eq!(player.remaining_secs(), 24);

    player.complete_current().await.unwrap();

    assert_eq!(player.item_percent(), 100);
    assert_eq!(notifier.celebrations(), vec![Celebration::ItemComplete]);
    assert!(server
        .repo
        .item_completed_at(server.user_id, item.id)
        .await
        .is_some());

    let stored = server.client().fetch_progress(ItemKind::Class, item.id).await.unwrap();
    assert_eq!(stored.completed_exercises.len(), 2);
    assert_eq!(stored.streak, 1);
    assert!(stored.achievements.contains("finisher"));
}

#[tokio::test]
async fn repeat_and_restart_are_visible_on_refetch() {
    let server = TestServer::start().await;
    let item = two_day_program();
    server.assign(&item).await;
    let (mut player, _scheduler, notifier) = player_for(&server, ItemKind::Program);

    player.load_items().await;
    player.select(item.id).await.unwrap();
    player.complete_current().await.unwrap();
    assert_eq!(notifier.celebrations(), vec![Celebration::DayComplete { day_index: 0 }]);
    assert_eq!(player.day_index(), 1);

    player.complete_current().await.unwrap();
    player.repeat_day().await.unwrap();

    let client = server.client();
    let after_repeat = client.fetch_progress(ItemKind::Program, item.id).await.unwrap();
    assert!(after_repeat.is_completed("p1"));
    assert!(!after_repeat.is_completed("p2"));

    player.restart_item().await.unwrap();
    let after_restart = client.fetch_progress(ItemKind::Program, item.id).await.unwrap();
    assert!(after_restart.completed_exercises.is_empty());
    assert_eq!(after_restart.streak, 0);

    player.select(item.id).await.unwrap();
    assert_eq!(player.item_percent(), 0);
    assert_eq!((player.day_index(), player.exercise_index()), (0, 0));
}

#[tokio::test]
async fn progress_is_created_lazily_and_items_are_scoped_by_kind() {
    let server = TestServer::start().await;
    let class = core_blast();
    let program = two_day_program();
    server.assign(&class).await;
    server.assign(&program).await;
    let client = server.client();

    let classes = client.fetch_items(ItemKind::Class).await.unwrap();
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].id, class.id);
    assert!(client.fetch_items(ItemKind::Challenge).await.unwrap().is_empty());

    let progress = client.fetch_progress(ItemKind::Class, class.id).await.unwrap();
    assert!(progress.completed_exercises.is_empty());
    assert!(server
        .repo
        .get_progress(server.user_id, class.id)
        .await
        .unwrap()
        .is_some());

    let wrong_kind = client.fetch_progress(ItemKind::Program, class.id).await;
    assert!(matches!(wrong_kind, Err(PortError::NotFound(_))));
}

#[tokio::test]
async fn rejects_requests_without_a_valid_session() {
    let server = TestServer::start().await;
    let stranger = HttpProgressClient::new(&server.base_url, "nope").unwrap();

    let result = stranger.fetch_items(ItemKind::Class).await;
    assert!(matches!(result, Err(PortError::Unauthorized)));

    let status = reqwest::get(format!("{}/api/classes/user", server.base_url))
        .await
        .unwrap()
        .status();
    assert_eq!(status, reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn foreign_exercise_ids_and_unknown_items_are_rejected() {
    let server = TestServer::start().await;
    let item = core_blast();
    server.assign(&item).await;
    let client = server.client();

    let foreign = client.post_completion(ItemKind::Class, item.id, "Z").await;
    assert!(matches!(foreign, Err(PortError::Invalid(_))));

    let foreign_bulk = client
        .post_bulk(ItemKind::Class, item.id, &["A".to_string(), "Z".to_string()])
        .await;
    assert!(matches!(foreign_bulk, Err(PortError::Invalid(_))));

    let missing = client.fetch_progress(ItemKind::Class, Uuid::new_v4()).await;
    assert!(matches!(missing, Err(PortError::NotFound(_))));

    let stored = client.fetch_progress(ItemKind::Class, item.id).await.unwrap();
    assert!(stored.completed_exercises.is_empty());
}

#[tokio::test]
async fn duplicate_completions_are_idempotent_over_http() {
    let server = TestServer::start().await;
    let item = core_blast();
    server.assign(&item).await;
    let client = server.client();

    let first = client.post_completion(ItemKind::Class, item.id, "A").await.unwrap();
    let second = client.post_completion(ItemKind::Class, item.id, "A").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(second.completed_exercises.len(), 1);
}

#[tokio::test]
async fn today_goals_round_trip() {
    let server = TestServer::start().await;
    let client = server.client();

    let goal = client.add_today_goal("Drink water").await.unwrap();
    assert!(!goal.completed);
    assert_eq!(goal.user_id, server.user_id);

    let updated = client.set_today_goal_completed(goal.id, true).await.unwrap();
    assert!(updated.completed);

    let goals = client.today_goals().await.unwrap();
    assert_eq!(goals, vec![updated]);

    assert!(matches!(client.add_today_goal("  ").await, Err(PortError::Invalid(_))));

    client.delete_today_goal(goal.id).await.unwrap();
    assert!(client.today_goals().await.unwrap().is_empty());
    assert!(matches!(
        client.delete_today_goal(goal.id).await,
        Err(PortError::NotFound(_))
    ));
}

#[tokio::test]
async fn streak_follows_consecutive_completion_days() {
    let clock = Arc::new(SteppingClock::new());
    let server = TestServer::start_with(Some(clock.clone())).await;
    let item = two_day_program();
    server.assign(&item).await;
    let client = server.client();

    let first = client.post_completion(ItemKind::Program, item.id, "p1").await.unwrap();
    assert_eq!(first.streak, 1);

    clock.skip_days(1);
    let second = client.post_completion(ItemKind::Program, item.id, "p2").await.unwrap();
    assert_eq!(second.streak, 2);
    assert_eq!(second.last_completed_date, Some(clock.today()));

    // A repeat keeps the streak; a gap resets it on the next completion.
    client
        .post_bulk(ItemKind::Program, item.id, &["p1".to_string()])
        .await
        .unwrap();
    clock.skip_days(2);
    let third = client.post_completion(ItemKind::Program, item.id, "p2").await.unwrap();
    assert_eq!(third.streak, 1);
}

#[tokio::test]
async fn items_assigned_to_someone_else_are_invisible() {
    let server = TestServer::start().await;
    let item = core_blast();
    server.repo.insert_item(item.clone()).await;
    server.repo.assign(Uuid::new_v4(), item.id).await;
    let client = server.client();

    assert!(matches!(
        client.fetch_progress(ItemKind::Class, item.id).await,
        Err(PortError::NotFound(_))
    ));
    assert!(matches!(
        client.post_completion(ItemKind::Class, item.id, "A").await,
        Err(PortError::NotFound(_))
    ));
    assert!(matches!(
        client.mark_item_complete(ItemKind::Class, item.id).await,
        Err(PortError::NotFound(_))
    ));
    assert!(server
        .repo
        .get_progress(server.user_id, item.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn reading_progress_never_clobbers_a_recorded_completion() {
    let server = TestServer::start().await;
    let item = core_blast();
    server.assign(&item).await;
    let client = server.client();

    let recorded = client.post_completion(ItemKind::Class, item.id, "A").await.unwrap();
    let fetched = client.fetch_progress(ItemKind::Class, item.id).await.unwrap();
    assert_eq!(fetched, recorded);
    assert_eq!(
        server.repo.get_progress(server.user_id, item.id).await.unwrap(),
        Some(recorded)
    );
}

#[tokio::test]
async fn today_goals_keep_creation_order() {
    let server = TestServer::start().await;
    let client = server.client();

    for text in ["Stretch", "Drink water", "Walk"] {
        client.add_today_goal(text).await.unwrap();
    }
    let texts: Vec<String> = client
        .today_goals()
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.text)
        .collect();
    assert_eq!(texts, ["Stretch", "Drink water", "Walk"]);
}
