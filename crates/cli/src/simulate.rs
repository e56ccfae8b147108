//! Toy event generation and the demonstration selection.
//!
//! Each worker owns private filter lists and a disjoint slice of the
//! sample; only the saved statistics are combined afterwards.

use cutflow::filters::{CategoryTally, FnObjectSelection, FnSelection, Retain};
use cutflow::{
    EventFilter, EventFilterList, FilterHook, FilterList, FilterState, ObjectFilter,
    ObjectFilterList, Verdict,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A reconstructed jet.
#[derive(Debug, Clone, Copy)]
pub struct Jet {
    pub pt: f64,
    pub eta: f64,
}

/// A simulated collision event.
#[derive(Debug, Clone)]
pub struct ToyEvent {
    pub met: f64,
    pub weight: f64,
    pub jets: Vec<Jet>,
}

/// Selection settings shared by all workers.
#[derive(Debug, Clone, Copy)]
pub struct Selection {
    pub min_met: f64,
    pub min_jet_pt: f64,
    pub max_jet_eta: f64,
    /// Keep the MET stage in the cut-flow but stop it from vetoing
    pub disable_met_cut: bool,
}

/// Statistics produced by one worker.
pub struct WorkerResult {
    pub events: FilterList<FilterState>,
    pub objects: FilterList<FilterState>,
}

/// Draw the event with global index `index`.
///
/// Seeding per event keeps the sample identical whatever the worker split.
fn generate(seed: u64, index: u64) -> ToyEvent {
    let mut rng = StdRng::seed_from_u64(seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15));

    let met = -30.0 * (1.0 - rng.random::<f64>()).ln();
    let weight = if rng.random::<f64>() < 0.02 {
        0.0
    } else {
        rng.random_range(0.5..1.5)
    };
    let n_jets = rng.random_range(0..6);
    let jets = (0..n_jets)
        .map(|_| Jet {
            pt: 20.0 - 25.0 * (1.0 - rng.random::<f64>()).ln(),
            eta: rng.random_range(-4.0..4.0),
        })
        .collect();

    ToyEvent { met, weight, jets }
}

fn jet_bin(event: &ToyEvent) -> &'static str {
    match event.jets.len() {
        0 => "0j",
        1 => "1j",
        2 => "2j",
        _ => "3j+",
    }
}

pub fn build_event_cuts(selection: Selection, selected: Arc<AtomicU64>) -> EventFilterList<ToyEvent> {
    let min_met = selection.min_met;
    let count_selected = FilterHook::bind(
        |selected: &Arc<AtomicU64>| {
            selected.fetch_add(1, Ordering::Relaxed);
        },
        selected,
    );

    EventFilterList::new()
        .with_filter(
            EventFilter::new("entry", CategoryTally::new(["0j", "1j", "2j", "3j+"], jet_bin))
                .with_count_func("weight", |e: &ToyEvent| e.weight),
        )
        .with_filter(
            EventFilter::new(
                "nonzero_weight",
                FnSelection::new(|e: &ToyEvent| {
                    if e.weight == 0.0 {
                        Verdict::Abstain
                    } else {
                        Verdict::Accept
                    }
                }),
            )
            .with_count_func("weight", |e: &ToyEvent| e.weight),
        )
        .with_filter(
            EventFilter::new(
                "met",
                FnSelection::new(move |e: &ToyEvent| Verdict::from(e.met > min_met)),
            )
            .passthrough(selection.disable_met_cut)
            .with_count_func("weight", |e: &ToyEvent| e.weight),
        )
        .with_filter(
            EventFilter::new(
                "has_jets",
                FnSelection::new(|e: &ToyEvent| Verdict::from(!e.jets.is_empty())),
            )
            .with_hook(count_selected)
            .with_count_func("weight", |e: &ToyEvent| e.weight),
        )
}

pub fn build_object_cuts(selection: Selection) -> ObjectFilterList<ToyEvent, Jet> {
    let min_pt = selection.min_jet_pt;
    let max_eta = selection.max_jet_eta;

    FilterList::new()
        .with_filter(ObjectFilter::new(
            "jet_pt",
            Retain::new(move |_: &ToyEvent, jet: &Jet| jet.pt > min_pt),
        ))
        .with_filter(ObjectFilter::new(
            "jet_eta",
            Retain::new(move |_: &ToyEvent, jet: &Jet| jet.eta.abs() < max_eta),
        ))
        .with_filter(
            ObjectFilter::new(
                "dijet",
                FnObjectSelection::new(|_: &ToyEvent, jets: Vec<Jet>| {
                    if jets.len() >= 2 { jets } else { Vec::new() }
                }),
            )
            .count_events(true)
            .with_count_func("weight", |e: &ToyEvent| e.weight),
        )
}

/// Process the events with global indices `range`.
pub fn run_worker(
    seed: u64,
    range: Range<u64>,
    selection: Selection,
    selected: Arc<AtomicU64>,
) -> WorkerResult {
    let mut event_cuts = build_event_cuts(selection, selected);
    let mut object_cuts = build_object_cuts(selection);

    for index in range.clone() {
        let event = generate(seed, index);
        if event_cuts.apply(&event) {
            object_cuts.apply(&event, event.jets.clone());
        }
    }
    event_cuts.finalize();

    tracing::debug!(
        start = range.start,
        end = range.end,
        selected = event_cuts.passing(),
        "worker finished"
    );

    WorkerResult {
        events: event_cuts.states().into(),
        objects: object_cuts.states().into(),
    }
}

/// Split `0..events` into at most `workers` contiguous, disjoint ranges.
pub fn partition(events: u64, workers: usize) -> Vec<Range<u64>> {
    let workers = workers.max(1) as u64;
    let chunk = events.div_ceil(workers).max(1);
    (0..workers)
        .map(|w| (w * chunk).min(events)..((w + 1) * chunk).min(events))
        .filter(|range| !range.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutflow::{Accounting, Filter};

    fn selection() -> Selection {
        Selection {
            min_met: 25.0,
            min_jet_pt: 30.0,
            max_jet_eta: 2.5,
            disable_met_cut: false,
        }
    }

    #[test]
    fn test_partition_covers_all_events() {
        let ranges = partition(10, 3);
        assert_eq!(ranges, vec![0..4, 4..8, 8..10]);
        assert_eq!(partition(2, 8), vec![0..1, 1..2]);
        assert!(partition(0, 4).is_empty());
    }

    #[test]
    fn test_split_runs_agree_with_single_run() {
        let selected = Arc::new(AtomicU64::new(0));
        let whole = run_worker(7, 0..2000, selection(), selected.clone());

        let parts: Vec<WorkerResult> = partition(2000, 3)
            .into_iter()
            .map(|range| run_worker(7, range, selection(), selected.clone()))
            .collect();
        let (events, objects): (Vec<_>, Vec<_>) =
            parts.into_iter().map(|r| (r.events, r.objects)).unzip();

        let merged_events: FilterList<Filter> = FilterList::merge_all(events).unwrap();
        let merged_objects: FilterList<Filter> = FilterList::merge_all(objects).unwrap();

        assert_eq!(merged_events.total(), whole.events.total());
        assert_eq!(merged_events.passing(), whole.events.passing());
        assert_eq!(merged_objects.passing(), whole.objects.passing());
        assert_eq!(selected.load(Ordering::Relaxed), 2 * whole.events.passing());
    }

    #[test]
    fn test_disabled_met_cut_passes_everything() {
        let mut cuts = build_event_cuts(
            Selection {
                disable_met_cut: true,
                ..selection()
            },
            Arc::new(AtomicU64::new(0)),
        );
        let event = ToyEvent {
            met: 1.0,
            weight: 1.0,
            jets: Vec::new(),
        };
        cuts.apply(&event);
        assert_eq!(cuts[2].filter().passing(), 1);
    }
}
