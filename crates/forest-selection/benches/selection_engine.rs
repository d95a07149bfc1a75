//! Benchmarks the binary-search selection engine (spec §4.1) over a
//! moderately large stand, following the teacher's top-level
//! `benches/benchmarks.rs` `criterion_group!`/`criterion_main!` shape.
use forest_selection::{Profile, ProfileXMode, ScalingMode, SelectFrom, SelectionSet, Target, TargetType};
use forest_transport::ColumnSource;

struct Rows {
    diameter: Vec<f64>,
    stems: Vec<f64>,
}

impl ColumnSource for Rows {
    fn len(&self) -> usize {
        self.diameter.len()
    }
    fn is_empty(&self) -> bool {
        self.diameter.is_empty()
    }
    fn column(&self, name: &str) -> Option<&[f64]> {
        match name {
            "d" => Some(&self.diameter),
            "f" => Some(&self.stems),
            _ => None,
        }
    }
}

fn thousand_row_stand() -> Rows {
    let diameter = (0..1000).map(|i| 5.0 + (i as f64) * 0.05).collect();
    let stems = vec![40.0; 1000];
    Rows { diameter, stems }
}

fn thinning_set() -> SelectionSet {
    let profile = Profile::new(vec![0.0, 1.0], vec![0.1, 0.5], ProfileXMode::Relative, None);
    SelectionSet::new(vec![true; 1000], "d", Target::unbounded(), profile)
}

fn selecting_units_odds_units(c: &mut criterion::Criterion) {
    let data = thousand_row_stand();
    let sets = vec![thinning_set()];
    let target = Target::new("f", TargetType::Relative, 0.3);
    c.bench_function("select_units across 1000 rows, odds_units", |b| {
        b.iter(|| forest_selection::select_units(&data, &target, &sets, "f", SelectFrom::All, ScalingMode::OddsUnits))
    });
}

fn selecting_units_scale(c: &mut criterion::Criterion) {
    let data = thousand_row_stand();
    let sets = vec![thinning_set()];
    let target = Target::new("f", TargetType::Relative, 0.3);
    c.bench_function("select_units across 1000 rows, scale", |b| {
        b.iter(|| forest_selection::select_units(&data, &target, &sets, "f", SelectFrom::All, ScalingMode::Scale))
    });
}

criterion::criterion_group! {
    name = benches;
    config = criterion::Criterion::default().sample_size(20);
    targets = selecting_units_odds_units, selecting_units_scale,
}
criterion::criterion_main!(benches);
