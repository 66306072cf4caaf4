//! History assembler: turns history plus live activity into board figures.
//!
//! Activity figures always come first, followed by the newest history runs,
//! so the grid never holds more than its capacity.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use tracing::debug;

use crate::domain::{
    ActivityEntry, Background, Border, BuildStatus, Color, Figure, FigureType, History,
    PipelineRun,
};

/// Something that can be drawn as a figure.
#[derive(Debug, Clone, Copy)]
pub enum FigureSource<'a> {
    Run(&'a PipelineRun),
    Activity(&'a ActivityEntry),
}

impl FigureSource<'_> {
    pub fn was_successful(&self) -> bool {
        match self {
            FigureSource::Run(run) => run.was_successful(),
            FigureSource::Activity(entry) => entry.was_successful(),
        }
    }

    pub fn initials(&self) -> Option<String> {
        match self {
            FigureSource::Run(run) => run.initials().map(str::to_string),
            FigureSource::Activity(entry) => entry.author.as_ref().and_then(|a| a.initials()),
        }
    }
}

/// Figures ready for the board.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assembly {
    pub figures: Vec<Figure>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub announcement_figure: Option<Figure>,
}

/// Assemble at most `capacity` figures from `history` and `activity`.
///
/// `now` only decides the seasonal variant of the announcement figure.
pub fn assemble(
    history: &History,
    activity: &[ActivityEntry],
    capacity: usize,
    now: DateTime<Utc>,
) -> Assembly {
    let shown_activity = &activity[..activity.len().min(capacity)];
    let mut activity_figures: Vec<Figure> = shown_activity.iter().map(activity_figure).collect();

    let window = capacity - activity_figures.len();
    let history_figures: Vec<Figure> = history
        .iter_descending()
        .take(window)
        .map(|run| history_figure(history, run))
        .collect();

    reconcile_initials(&mut activity_figures, &history_figures);

    let background = if shown_activity.iter().any(ActivityEntry::is_building) {
        Some(Background::Blue)
    } else {
        history.latest().map(|run| {
            if run.was_successful() {
                Background::Green
            } else {
                Background::Orange
            }
        })
    };

    let all_passed = history.iter_descending().take(window).all(PipelineRun::was_successful);
    let announcement_figure = all_passed.then(|| announcement_figure(now));

    activity_figures.extend(history_figures);
    Assembly {
        figures: activity_figures,
        background,
        announcement_figure,
    }
}

/// Copy initials from history figures onto activity figures with the same key.
fn reconcile_initials(activity_figures: &mut [Figure], history_figures: &[Figure]) {
    for figure in activity_figures.iter_mut() {
        let matching = history_figures
            .iter()
            .find(|h| h.key.is_some() && h.key == figure.key);
        match matching {
            Some(history_figure) => {
                if history_figure.initials.is_some() {
                    figure.initials = history_figure.initials.clone();
                }
            }
            None => debug!(key = ?figure.key, "No history figure for activity"),
        }
    }
}

fn history_figure(history: &History, run: &PipelineRun) -> Figure {
    let source = FigureSource::Run(run);
    let previous_successful = history
        .previous(&run.build_number)
        .map(PipelineRun::was_successful)
        .unwrap_or(true);

    let mut figure = Figure::new(
        if source.was_successful() {
            Color::Cold
        } else {
            Color::Warm
        },
        FigureType::for_outcome(source.was_successful(), previous_successful),
        Border::Solid,
    );
    figure.info = Some(run.label());
    figure.info2 = run.info().map(str::to_string);
    figure.initials = source.initials();
    figure.key = Some(run.build_number);
    figure
}

fn activity_figure(entry: &ActivityEntry) -> Figure {
    let source = FigureSource::Activity(entry);
    let color = match entry.last_build_status {
        BuildStatus::Success => Color::Cold,
        BuildStatus::Failure => Color::Warm,
        _ => Color::Grey,
    };
    let figure_type = if entry.is_building() {
        FigureType::Building
    } else {
        FigureType::for_outcome(source.was_successful(), true)
    };

    let mut figure = Figure::new(color, figure_type, Border::Dotted);
    figure.info = Some(entry.stage_name.clone());
    figure.info2 = Some(activity_info(entry));
    figure.initials = source.initials();
    figure.key = Some(entry.build_number);
    figure
}

fn activity_info(entry: &ActivityEntry) -> String {
    let title = format!("[{}] {}", entry.build_number, entry.name);
    if entry.is_building() {
        return format!("{} is building", title);
    }
    let mut info = format!("{} | {}", title, entry.last_build_status);
    if !entry.was_successful() {
        if let Some(author) = &entry.author {
            info.push_str(&format!(" | changes by {}", author.name));
        }
    }
    info
}

fn is_winter(now: DateTime<Utc>) -> bool {
    matches!(now.month(), 12 | 1)
}

fn announcement_figure(now: DateTime<Utc>) -> Figure {
    let figure_type = if is_winter(now) {
        FigureType::WinterGreatSuccess
    } else {
        FigureType::GreatSuccess
    };
    let mut figure = Figure::new(Color::Blue, figure_type, Border::Dotted);
    figure.word1 = Some("great".to_string());
    figure.word2 = Some("success".to_string());
    figure
}
