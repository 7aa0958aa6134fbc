use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use episim::model;
use episim::{
    Census, Context, ContextCensusExt, ContextPlacesExt, ContextPopulationExt, ContextRandomExt,
    DiseaseState, Parameters, SimError,
};

fn load(name: &str) -> Parameters {
    Parameters::from_json_file(&Path::new("tests/data").join(name)).unwrap()
}

/// Builds the model and returns every census it takes.
fn run(parameters: Parameters, seed: u64) -> (Context, Vec<Census>) {
    let mut context = Context::new();
    context.init_random(seed);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    context.add_census_observer(move |_, census| sink.borrow_mut().push(*census));
    model::init_with_parameters(&mut context, parameters).unwrap();
    context.execute();
    let censuses = seen.borrow().clone();
    (context, censuses)
}

#[test]
fn ten_initial_infections_die_on_day_eight() {
    let (_, censuses) = run(load("ten_infected.json"), 17);
    assert_eq!(censuses.len(), 10);

    let day_zero = &censuses[0];
    assert_eq!(day_zero.day, 0.0);
    assert_eq!(day_zero.counts[DiseaseState::Uninfected], 90);
    assert_eq!(day_zero.counts[DiseaseState::Latent], 10);

    for census in &censuses[..8] {
        assert_eq!(census.counts[DiseaseState::Dead], 0, "day {}", census.day);
    }
    let day_eight = &censuses[8];
    assert_eq!(day_eight.day, 8.0);
    assert_eq!(day_eight.counts[DiseaseState::Dead], 10);
    assert_eq!(day_eight.counts[DiseaseState::Recovered], 0);
}

#[test]
fn counts_always_sum_to_population() {
    for seed in 0..5 {
        let (context, censuses) = run(load("small_town.json"), seed);
        let population = context.get_population_size();
        assert_eq!(population, 200);
        assert_eq!(censuses.len(), 11);
        for census in &censuses {
            assert_eq!(census.counts.total(), population);
        }
        assert_eq!(censuses.last().unwrap().time, 240.0);
    }
}

#[test]
fn same_seed_same_epidemic() {
    let (_, first) = run(load("small_town.json"), 2024);
    let (_, second) = run(load("small_town.json"), 2024);
    assert_eq!(first, second);
}

#[test]
fn states_only_advance_between_censuses() {
    let (_, censuses) = run(load("small_town.json"), 9);
    for pair in censuses.windows(2) {
        let (before, after) = (pair[0].counts, pair[1].counts);
        assert!(after[DiseaseState::Uninfected] <= before[DiseaseState::Uninfected]);
        assert!(after[DiseaseState::Recovered] >= before[DiseaseState::Recovered]);
        assert!(after[DiseaseState::Dead] >= before[DiseaseState::Dead]);
    }
}

#[test]
fn contagious_counts_match_occupants() {
    let (context, _) = run(load("small_town.json"), 5);
    for index in 0..context.get_place_count() {
        let place = context.get_place(episim::PlaceId::new(index));
        let contagious = place
            .occupants
            .iter()
            .filter(|agent| context.get_disease_state(**agent).is_infectious())
            .count();
        assert_eq!(place.contagious, contagious);
    }
}

#[test]
fn nobody_is_infected_without_transmission() {
    let mut parameters = load("small_town.json");
    for kind in &mut parameters.place_kinds {
        kind.transmissivity = 0.0;
    }
    let (_, censuses) = run(parameters, 1);
    let last = censuses.last().unwrap();
    assert_eq!(last.counts[DiseaseState::Uninfected], 196);
}

#[test]
fn invalid_parameters_are_refused() {
    let parameters = load("invalid.json");
    let mut context = Context::new();
    context.init_random(0);
    let Err(SimError::Validation(problems)) = model::init_with_parameters(&mut context, parameters)
    else {
        panic!("expected validation failures");
    };
    assert_eq!(problems.len(), 3, "{problems:?}");
    assert_eq!(context.get_population_size(), 0);
}
