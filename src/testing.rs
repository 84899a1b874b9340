// ============================================================
// Shared test fixtures
// ============================================================
// Compiled only under `cargo test`.
//
//   example_record / example_json — a known row of student-mat.csv
//                                   (true G3 = 6)
//   synthetic_dataset             — seeded random records whose
//                                   target is 0.2*G1 + 0.8*G2
//   write_csv                     — dumps records in the dataset's
//                                   own `;`-separated yes/no format
//   linear_artifact               — a staged linear pipeline fitted on
//                                   synthetic rows, ready to serve

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::{json, Value};
use std::path::Path;

use crate::domain::category::{
    Address, Categorical, FamilySize, Guardian, Job, ParentStatus, Reason, School, Sex,
};
use crate::domain::feature_record::{FeatureRecord, FIELD_NAMES};
use crate::domain::model_version::{ModelVersion, Stage};
use crate::ml::model::ModelSpec;
use crate::ml::pipeline::{ModelArtifact, Pipeline};

const FLAG_FIELDS: [&str; 8] = [
    "schoolsup", "famsup", "paid", "activities", "nursery", "higher", "internet", "romantic",
];

pub fn example_record() -> FeatureRecord {
    FeatureRecord {
        school:     School::Gp,
        sex:        Sex::Female,
        age:        18,
        address:    Address::Urban,
        famsize:    FamilySize::MoreThanThree,
        pstatus:    ParentStatus::Apart,
        medu:       4,
        fedu:       4,
        mjob:       Job::AtHome,
        fjob:       Job::Teacher,
        reason:     Reason::Course,
        guardian:   Guardian::Mother,
        traveltime: 2,
        studytime:  2,
        failures:   0,
        schoolsup:  false,
        famsup:     false,
        paid:       false,
        activities: false,
        nursery:    true,
        higher:     true,
        internet:   false,
        romantic:   false,
        famrel:     4,
        freetime:   3,
        goout:      4,
        dalc:       1,
        walc:       1,
        health:     3,
        absences:   6,
        g1:         5,
        g2:         6,
    }
}

pub fn example_json() -> Value {
    json!({
        "school": "GP", "sex": "F", "age": 18, "address": "U", "famsize": "GT3",
        "Pstatus": "A", "Medu": 4, "Fedu": 4, "Mjob": "at_home", "Fjob": "teacher",
        "reason": "course", "guardian": "mother", "traveltime": 2, "studytime": 2,
        "failures": 0, "schoolsup": 0, "famsup": 0, "paid": 0, "activities": 0,
        "nursery": 1, "higher": 1, "internet": 0, "romantic": 0, "famrel": 4,
        "freetime": 3, "goout": 4, "Dalc": 1, "Walc": 1, "health": 3,
        "absences": 6, "G1": 5, "G2": 6
    })
}

fn pick<C: Categorical>(rng: &mut StdRng) -> C {
    let label = C::LABELS[rng.gen_range(0..C::LABELS.len())];
    C::parse(label).expect("label comes from the vocabulary")
}

fn random_record(rng: &mut StdRng) -> FeatureRecord {
    FeatureRecord {
        school:     pick(rng),
        sex:        pick(rng),
        age:        rng.gen_range(15..=22),
        address:    pick(rng),
        famsize:    pick(rng),
        pstatus:    pick(rng),
        medu:       rng.gen_range(0..=4),
        fedu:       rng.gen_range(0..=4),
        mjob:       pick(rng),
        fjob:       pick(rng),
        reason:     pick(rng),
        guardian:   pick(rng),
        traveltime: rng.gen_range(1..=4),
        studytime:  rng.gen_range(1..=4),
        failures:   rng.gen_range(0..=3),
        schoolsup:  rng.gen_bool(0.2),
        famsup:     rng.gen_bool(0.6),
        paid:       rng.gen_bool(0.4),
        activities: rng.gen_bool(0.5),
        nursery:    rng.gen_bool(0.8),
        higher:     rng.gen_bool(0.9),
        internet:   rng.gen_bool(0.8),
        romantic:   rng.gen_bool(0.3),
        famrel:     rng.gen_range(1..=5),
        freetime:   rng.gen_range(1..=5),
        goout:      rng.gen_range(1..=5),
        dalc:       rng.gen_range(1..=5),
        walc:       rng.gen_range(1..=5),
        health:     rng.gen_range(1..=5),
        absences:   rng.gen_range(0..=30),
        g1:         rng.gen_range(3..=19),
        g2:         rng.gen_range(0..=19),
    }
}

/// Final grade as a noiseless function of the two prior grades.
pub fn synthetic_target(record: &FeatureRecord) -> f64 {
    0.2 * f64::from(record.g1) + 0.8 * f64::from(record.g2)
}

pub fn synthetic_dataset(n: usize, seed: u64) -> (Vec<FeatureRecord>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let records: Vec<FeatureRecord> = (0..n).map(|_| random_record(&mut rng)).collect();
    let targets = records.iter().map(synthetic_target).collect();
    (records, targets)
}

/// Write records the way student-mat.csv stores them: `;`-separated,
/// binary columns as "yes"/"no", target in a trailing G3 column.
pub fn write_csv(path: &Path, records: &[FeatureRecord], targets: &[f64]) {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .expect("create csv");

    let mut header: Vec<&str> = FIELD_NAMES.to_vec();
    header.push("G3");
    writer.write_record(&header).expect("write header");

    for (record, target) in records.iter().zip(targets) {
        let value = serde_json::to_value(record).expect("serialize record");
        let mut row: Vec<String> = FIELD_NAMES
            .iter()
            .map(|field| match &value[*field] {
                Value::String(s) => s.clone(),
                Value::Number(n) if FLAG_FIELDS.contains(field) => {
                    if n.as_u64() == Some(1) { "yes".to_string() } else { "no".to_string() }
                }
                other => other.to_string(),
            })
            .collect();
        row.push(target.to_string());
        writer.write_record(&row).expect("write row");
    }
    writer.flush().expect("flush csv");
}

pub fn linear_artifact() -> ModelArtifact {
    let (records, targets) = synthetic_dataset(300, 42);
    let pipeline = Pipeline::fit(&ModelSpec::LinearRegression, &records, &targets)
        .expect("fit linear pipeline");
    let now = chrono::Utc::now();
    ModelArtifact {
        version: ModelVersion {
            name:       "StudentPerformanceModel".to_string(),
            version:    1,
            stage:      Stage::Staging,
            model_kind: pipeline.model.clone(),
            run:        None,
            created_at: now,
            updated_at: now,
        },
        pipeline,
    }
}
