//! End-to-end: backfill from in-memory sources, then poll the board.

use std::sync::Arc;

use artwise_core::domain::{Direction, JobActivity};
use artwise_core::fakes::{MemoryActivity, MemoryFeed, MemoryMaterials, MemoryStageDetails};
use artwise_core::{
    ActivityEntry, Author, Background, BoardConfig, BoardUpdate, BuildNumber, BuildStatus,
    FeedEntry, FeedPage, HaringBoard, PipelineMonitor, SnapshotProvider, Sources, StageResult,
};
use chrono::{Duration, TimeZone, Utc};

fn passing(build: u64) -> FeedEntry {
    FeedEntry {
        id: format!("s{build}"),
        build_number: build.to_string(),
        stage_name: "build".to_string(),
        run_number: 1,
        updated: Utc.with_ymd_and_hms(2014, 7, 18, 16, 0, 0).unwrap() + Duration::minutes(build as i64),
        result: Some(StageResult::Passed),
        author: Some(Author::new("Max Mustermann")),
        material_ref: None,
    }
}

fn job(build: u64, activity: JobActivity) -> ActivityEntry {
    ActivityEntry {
        name: "artwise :: build".to_string(),
        stage_name: "build".to_string(),
        build_number: BuildNumber::new(build),
        activity,
        last_build_status: BuildStatus::Success,
        author: None,
    }
}

fn monitor(builds: u64, activity: Arc<MemoryActivity>) -> Arc<PipelineMonitor> {
    let feed = MemoryFeed::new().with_first_page(FeedPage {
        entries: (1..=builds).map(passing).collect(),
        next: None,
    });
    let sources = Sources {
        feed: Arc::new(feed),
        stages: Arc::new(MemoryStageDetails::new()),
        materials: Arc::new(MemoryMaterials::new()),
        activity,
    };
    Arc::new(PipelineMonitor::new(sources, BoardConfig::default()))
}

fn snapshot(update: BoardUpdate) -> artwise_core::Assembly {
    match update {
        BoardUpdate::Snapshot(assembly) => assembly,
        BoardUpdate::WarmingUp => panic!("expected a snapshot"),
    }
}

#[tokio::test]
async fn test_warming_up_until_backfilled() {
    let monitor = monitor(3, Arc::new(MemoryActivity::new()));
    let board = HaringBoard::new(monitor.clone());

    assert_eq!(board.poll().await.unwrap(), BoardUpdate::WarmingUp);
    monitor.backfill().await.unwrap();
    assert!(matches!(board.poll().await.unwrap(), BoardUpdate::Snapshot(_)));
}

#[tokio::test]
async fn test_full_board_of_one_author_gets_four_in_a_row() {
    let monitor = monitor(30, Arc::new(MemoryActivity::new()));
    monitor.backfill().await.unwrap();
    let board = HaringBoard::new(monitor);

    let assembly = snapshot(board.poll().await.unwrap());

    assert_eq!(assembly.figures.len(), 24);
    assert_eq!(assembly.background, Some(Background::Green));
    assert!(assembly.announcement_figure.is_some());
    assert_eq!(assembly.figures[0].key, Some(BuildNumber::new(30)));

    let first = assembly.figures[0].four.expect("starter marked");
    assert_eq!(first.direction, Direction::Diagonal);
    assert!(first.starter);
    for index in [7, 14, 21] {
        let mark = assembly.figures[index].four.unwrap();
        assert!(!mark.starter);
    }
    assert_eq!(assembly.figures.iter().filter(|f| f.four.is_some()).count(), 4);
}

#[tokio::test]
async fn test_building_job_turns_board_blue_and_skips_detection() {
    let activity = Arc::new(MemoryActivity::new());
    activity.set_jobs(vec![job(31, JobActivity::Building)]);
    let monitor = monitor(30, activity);
    monitor.backfill().await.unwrap();
    let board = HaringBoard::new(monitor);

    let assembly = snapshot(board.poll().await.unwrap());

    assert_eq!(assembly.figures.len(), 24);
    assert_eq!(assembly.background, Some(Background::Blue));
    assert!(assembly.figures[0].is_dotted());
    assert!(assembly.figures.iter().all(|f| f.four.is_none()));
}

#[tokio::test]
async fn test_activity_takes_initials_from_matching_run() {
    let activity = Arc::new(MemoryActivity::new());
    activity.set_jobs(vec![job(3, JobActivity::Sleeping)]);
    let monitor = monitor(3, activity);
    monitor.backfill().await.unwrap();
    let board = HaringBoard::new(monitor);

    let assembly = snapshot(board.poll().await.unwrap());

    assert_eq!(assembly.figures.len(), 4);
    assert_eq!(assembly.figures[0].initials.as_deref(), Some("mmu"));
}
